use super::{Oid, ParseOidError, SnmpError, Value, VarBind};
use crate::config::{Auth, AuthProtocol, PrivProtocol};
use snmp2::{v3, AsyncSession};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::lookup_host;
use tokio::time::{self, Instant};
use tracing::debug;

/// sysUpTime.0, read once after v3 discovery to prove the credentials.
const SYNC_OID: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 3, 0];

/// One SNMP session against one agent.
///
/// The socket is released by [`Session::close`] or when the session is
/// dropped, whichever comes first.
pub struct Session {
    host: String,
    peer: SocketAddr,
    timeout: Duration,
    auth: Auth,
    inner: Option<AsyncSession>,
}

impl Session {
    /// Opens a session.
    ///
    /// v1/v2c sessions need no exchange with the agent. v3 sessions discover
    /// the agent's engine and then read one scalar so that unknown users and
    /// wrong passwords are reported here.
    pub async fn open(
        auth: &Auth,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, SnmpError> {
        let peer = resolve(host, port).await?;
        let mut session = Self {
            host: host.to_string(),
            peer,
            timeout,
            auth: auth.clone(),
            inner: None,
        };
        let deadline = Instant::now() + timeout;
        session.inner = Some(session.connect(deadline).await?);
        debug!(host = %session.host, peer = %peer, version = auth.version_label(), "snmp session opened");

        if matches!(auth, Auth::V3AuthNoPriv { .. } | Auth::V3AuthPriv { .. }) {
            session.request(&Oid::from_arcs(&SYNC_OID)).await?;
            debug!(host = %session.host, "snmp v3 credentials accepted");
        }
        Ok(session)
    }

    fn timed_out(&self) -> SnmpError {
        SnmpError::Timeout {
            host: self.host.clone(),
            timeout: self.timeout,
        }
    }

    /// Builds a fresh library session on a new socket.
    async fn connect(&self, deadline: Instant) -> Result<AsyncSession, SnmpError> {
        let request_id = starting_request_id();
        let connecting = async {
            let session = match &self.auth {
                Auth::V1 { community } => {
                    AsyncSession::new_v1(self.peer, community.as_bytes(), request_id).await?
                }
                Auth::V2c { community } => {
                    AsyncSession::new_v2c(self.peer, community.as_bytes(), request_id).await?
                }
                Auth::V3AuthNoPriv {
                    user,
                    auth_password,
                    auth_protocol,
                } => {
                    let security = security(user, auth_password, *auth_protocol, None);
                    discover(self.peer, request_id, security).await?
                }
                Auth::V3AuthPriv {
                    user,
                    auth_password,
                    auth_protocol,
                    priv_password,
                    priv_protocol,
                } => {
                    let privacy = Some((*priv_protocol, priv_password.as_str()));
                    let security = security(user, auth_password, *auth_protocol, privacy);
                    discover(self.peer, request_id, security).await?
                }
            };
            Ok::<_, SnmpError>(session)
        };
        match time::timeout_at(deadline, connecting).await {
            Ok(result) => result,
            Err(_elapsed) => Err(self.timed_out()),
        }
    }

    /// Sends one GET and waits for its answer until the deadline.
    ///
    /// Datagrams that cannot be the answer (garbage, foreign or stale
    /// messages) are skipped: the library session is replaced by one on a
    /// fresh socket and the request is sent again.
    async fn request(&mut self, oid: &Oid) -> Result<Vec<VarBind>, SnmpError> {
        let target = library_oid(oid)?;
        let deadline = Instant::now() + self.timeout;
        loop {
            let answered = {
                let inner = self.inner.as_mut().ok_or(SnmpError::Closed)?;
                match time::timeout_at(deadline, inner.get(&target)).await {
                    Err(_elapsed) => None,
                    Ok(Ok(response)) => Some(owned_response(response)),
                    Ok(Err(err)) => Some(Err(SnmpError::Agent(err))),
                }
            };
            let Some(outcome) = answered else {
                return Err(self.timed_out());
            };
            match outcome {
                Err(SnmpError::Agent(snmp2::Error::AuthUpdated)) => {
                    debug!(host = %self.host, "snmp engine time resynchronized");
                }
                Err(err) if err.is_stray() => {
                    debug!(host = %self.host, error = %err, "discarding unusable response");
                    let fresh = self.connect(deadline).await?;
                    self.inner = Some(fresh);
                }
                other => return other,
            }
        }
    }

    /// Reads one scalar. The agent's varbinds are returned as received.
    pub async fn get(&mut self, oid: &Oid) -> Result<Vec<VarBind>, SnmpError> {
        let started = Instant::now();
        let varbinds = self.request(oid).await?;
        debug!(
            host = %self.host,
            oid = %oid,
            elapsed = %humantime::format_duration(started.elapsed()),
            "snmp get answered"
        );
        Ok(varbinds)
    }

    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!(host = %self.host, "snmp session closed");
        }
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, SnmpError> {
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|source| SnmpError::Resolve {
            host: host.to_string(),
            source,
        })?;
    addrs
        .next()
        .ok_or_else(|| SnmpError::NoAddress(host.to_string()))
}

fn starting_request_id() -> i32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| (d.subsec_nanos() & 0x3fff_ffff) as i32)
        .unwrap_or(1)
        .max(1)
}

fn security(
    user: &str,
    auth_password: &str,
    auth_protocol: AuthProtocol,
    privacy: Option<(PrivProtocol, &str)>,
) -> v3::Security {
    let auth_protocol = match auth_protocol {
        AuthProtocol::Md5 => v3::AuthProtocol::Md5,
        AuthProtocol::Sha => v3::AuthProtocol::Sha1,
    };
    let security = v3::Security::new(user.as_bytes(), auth_password.as_bytes())
        .with_auth_protocol(auth_protocol);
    match privacy {
        Some((protocol, password)) => {
            let cipher = match protocol {
                PrivProtocol::Des => v3::Cipher::Des,
                PrivProtocol::Aes => v3::Cipher::Aes128,
            };
            security.with_auth(v3::Auth::AuthPriv {
                cipher,
                privacy_password: password.as_bytes().to_vec(),
            })
        }
        None => security.with_auth(v3::Auth::AuthNoPriv),
    }
}

async fn discover(
    peer: SocketAddr,
    request_id: i32,
    security: v3::Security,
) -> Result<AsyncSession, SnmpError> {
    let mut session = AsyncSession::new_v3(peer, request_id, security).await?;
    session.init().await.map_err(SnmpError::Agent)?;
    Ok(session)
}

fn library_oid(oid: &Oid) -> Result<snmp2::Oid<'static>, SnmpError> {
    let arcs: Vec<u64> = oid.arcs().iter().map(|&arc| u64::from(arc)).collect();
    snmp2::Oid::from(&arcs).map_err(|_| SnmpError::Oid(ParseOidError(oid.to_string())))
}

fn owned_response(response: snmp2::Pdu<'_>) -> Result<Vec<VarBind>, SnmpError> {
    if response.error_status != 0 {
        return Err(SnmpError::ErrorStatus {
            status: error_status_name(i64::from(response.error_status)),
            index: i64::from(response.error_index),
        });
    }
    response
        .varbinds
        .map(|(oid, value)| Ok((oid.to_id_string().parse::<Oid>()?, Value::from(value))))
        .collect()
}

/// Name of an SNMP error-status code (RFC 3416).
fn error_status_name(status: i64) -> &'static str {
    match status {
        0 => "noError",
        1 => "tooBig",
        2 => "noSuchName",
        3 => "badValue",
        4 => "readOnly",
        5 => "genErr",
        6 => "noAccess",
        7 => "wrongType",
        8 => "wrongLength",
        9 => "wrongEncoding",
        10 => "wrongValue",
        11 => "noCreation",
        12 => "inconsistentValue",
        13 => "resourceUnavailable",
        14 => "commitFailed",
        15 => "undoFailed",
        16 => "authorizationError",
        17 => "notWritable",
        18 => "inconsistentName",
        _ => "unknown",
    }
}
