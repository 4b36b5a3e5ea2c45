//! Minimal wire helpers for the loopback agents used in tests.

pub const SEQUENCE: u8 = 0x30;
pub const INTEGER: u8 = 0x02;
pub const OCTET_STRING: u8 = 0x04;
pub const OBJECT_IDENTIFIER: u8 = 0x06;
pub const COUNTER32: u8 = 0x41;
pub const COUNTER64: u8 = 0x46;
pub const NO_SUCH_OBJECT: u8 = 0x80;
pub const GET_RESPONSE: u8 = 0xa2;
pub const REPORT: u8 = 0xa8;

pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.extend_from_slice(&[0x81, len as u8]);
    } else {
        out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

pub fn integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    tlv(INTEGER, &bytes[start..])
}

pub fn unsigned(tag: u8, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(7);
    let mut content = Vec::new();
    if bytes[start] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(&bytes[start..]);
    tlv(tag, &content)
}

pub fn octets(bytes: &[u8]) -> Vec<u8> {
    tlv(OCTET_STRING, bytes)
}

/// Content bytes of an OBJECT IDENTIFIER.
pub fn oid_content(arcs: &[u32]) -> Vec<u8> {
    let mut out = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for &arc in &arcs[2..] {
        let mut chunk = vec![(arc & 0x7f) as u8];
        let mut rest = arc >> 7;
        while rest > 0 {
            chunk.push((rest & 0x7f) as u8 | 0x80);
            rest >>= 7;
        }
        chunk.reverse();
        out.extend(chunk);
    }
    out
}

pub fn seq(parts: &[&[u8]]) -> Vec<u8> {
    tlv(SEQUENCE, &parts.concat())
}

/// Walks TLVs; panics on malformed input since only test agents use it.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn next(&mut self) -> (u8, &'a [u8]) {
        let tag = self.buf[self.pos];
        let first = self.buf[self.pos + 1];
        let (len, header) = if first & 0x80 == 0 {
            (usize::from(first), 2)
        } else {
            let count = usize::from(first & 0x7f);
            let len = self.buf[self.pos + 2..self.pos + 2 + count]
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
            (len, 2 + count)
        };
        let start = self.pos + header;
        self.pos = start + len;
        (tag, &self.buf[start..start + len])
    }

    pub fn int(&mut self) -> i64 {
        let (_, bytes) = self.next();
        let init: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
        bytes.iter().fold(init, |acc, b| (acc << 8) | i64::from(*b))
    }
}

/// The parts of a v1/v2c GetRequest an agent needs to answer it.
pub struct CommunityRequest {
    pub version: i64,
    pub community: Vec<u8>,
    pub request_id: i64,
    pub oid: Vec<u8>,
}

pub fn parse_community_request(datagram: &[u8]) -> CommunityRequest {
    let (_, message) = Reader::new(datagram).next();
    let mut message = Reader::new(message);
    let version = message.int();
    let (_, community) = message.next();
    let (_, pdu) = message.next();
    let mut pdu = Reader::new(pdu);
    let request_id = pdu.int();
    pdu.next();
    pdu.next();
    let (_, list) = pdu.next();
    let (_, varbind) = Reader::new(list).next();
    let (_, oid) = Reader::new(varbind).next();
    CommunityRequest {
        version,
        community: community.to_vec(),
        request_id,
        oid: oid.to_vec(),
    }
}

pub fn community_response(request: &CommunityRequest, value: &[u8]) -> Vec<u8> {
    let varbind = seq(&[&tlv(OBJECT_IDENTIFIER, &request.oid), value]);
    let pdu = tlv(
        GET_RESPONSE,
        &[
            integer(request.request_id),
            integer(0),
            integer(0),
            seq(&[&varbind]),
        ]
        .concat(),
    );
    seq(&[&integer(request.version), &octets(&request.community), &pdu])
}

/// The parts of a plaintext v3 request an agent needs to answer it.
pub struct UserRequest {
    pub msg_id: i64,
    pub flags: u8,
    pub user: Vec<u8>,
    pub request_id: i64,
}

pub fn parse_user_request(datagram: &[u8]) -> UserRequest {
    let (_, message) = Reader::new(datagram).next();
    let mut message = Reader::new(message);
    message.int();
    let (_, global) = message.next();
    let mut global = Reader::new(global);
    let msg_id = global.int();
    global.int();
    let (_, flags) = global.next();
    let (_, params) = message.next();
    let (_, params) = Reader::new(params).next();
    let mut params = Reader::new(params);
    params.next();
    params.int();
    params.int();
    let (_, user) = params.next();
    let (_, scoped) = message.next();
    let mut scoped = Reader::new(scoped);
    scoped.next();
    scoped.next();
    let (_, pdu) = scoped.next();
    let request_id = Reader::new(pdu).int();
    UserRequest {
        msg_id,
        flags: flags.first().copied().unwrap_or(0),
        user: user.to_vec(),
        request_id,
    }
}

/// An unauthenticated v3 Report carrying one usmStats counter.
pub fn user_report(request: &UserRequest, engine_id: &[u8], usm_stat: u32) -> Vec<u8> {
    let global = seq(&[
        &integer(request.msg_id),
        &integer(65507),
        &octets(&[0x00]),
        &integer(3),
    ]);
    let params = seq(&[
        &octets(engine_id),
        &integer(1),
        &integer(1200),
        &octets(&request.user),
        &octets(b""),
        &octets(b""),
    ]);
    let counter = tlv(
        OBJECT_IDENTIFIER,
        &oid_content(&[1, 3, 6, 1, 6, 3, 15, 1, 1, usm_stat, 0]),
    );
    let varbind = seq(&[&counter, &unsigned(COUNTER32, 1)]);
    let pdu = tlv(
        REPORT,
        &[
            integer(request.request_id),
            integer(0),
            integer(0),
            seq(&[&varbind]),
        ]
        .concat(),
    );
    let scoped = seq(&[&octets(engine_id), &octets(b""), &pdu]);
    seq(&[&integer(3), &global, &octets(&params), &scoped])
}
