//! SNMP GET client used to read the capacity scalars.
//!
//! Message encoding and the v3 user-based security model come from `snmp2`;
//! this module keeps owned copies of what the agent returned so that the rest
//! of the crate never borrows from a session buffer.

pub mod session;
#[cfg(test)]
mod testing;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use session::Session;

/// An object identifier, e.g. `1.3.6.1.2.1.1.3.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn from_arcs(arcs: &[u32]) -> Self {
        Self(arcs.to_vec())
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid object identifier '{0}'")]
pub struct ParseOidError(String);

impl FromStr for Oid {
    type Err = ParseOidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        let arcs = trimmed
            .split('.')
            .map(|arc| arc.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseOidError(s.to_string()))?;
        let valid = arcs.len() >= 2 && arcs[0] <= 2 && (arcs[0] == 2 || arcs[1] < 40);
        if !valid {
            return Err(ParseOidError(s.to_string()));
        }
        Ok(Self(arcs))
    }
}

/// A value bound to an OID in a varbind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// Any other type; never a capacity.
    Other,
}

impl Value {
    /// The value as an unsigned count, if it carries one.
    ///
    /// Some agents publish large counters as decimal strings, so octet
    /// strings holding only digits are accepted too.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(v) => u64::try_from(*v).ok(),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(u64::from(*v)),
            Value::Counter64(v) => Some(*v),
            Value::OctetString(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }
}

impl From<snmp2::Value<'_>> for Value {
    fn from(value: snmp2::Value<'_>) -> Self {
        match value {
            snmp2::Value::Integer(v) => Value::Integer(v),
            snmp2::Value::OctetString(bytes) => Value::OctetString(bytes.to_vec()),
            snmp2::Value::Null => Value::Null,
            snmp2::Value::Counter32(v) => Value::Counter32(v),
            snmp2::Value::Unsigned32(v) => Value::Gauge32(v),
            snmp2::Value::Timeticks(v) => Value::TimeTicks(v),
            snmp2::Value::Counter64(v) => Value::Counter64(v),
            snmp2::Value::NoSuchObject => Value::NoSuchObject,
            snmp2::Value::NoSuchInstance => Value::NoSuchInstance,
            snmp2::Value::EndOfMibView => Value::EndOfMibView,
            _ => Value::Other,
        }
    }
}

/// A varbind as returned by the agent.
pub type VarBind = (Oid, Value);

#[derive(Debug, Error)]
pub enum SnmpError {
    #[error("unable to resolve host '{host}': {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },
    #[error("no address found for host '{0}'")]
    NoAddress(String),
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no response from remote host '{host}' within {timeout:?}")]
    Timeout { host: String, timeout: Duration },
    #[error(transparent)]
    Oid(#[from] ParseOidError),
    #[error("received {status} error-status at index {index}")]
    ErrorStatus { status: &'static str, index: i64 },
    #[error("agent error: {0:?}")]
    Agent(snmp2::Error),
    #[error("session is closed")]
    Closed,
}

impl SnmpError {
    /// Whether the error came from a datagram that cannot be the answer to
    /// the request just sent: garbage, a foreign message, or a stale reply.
    pub fn is_stray(&self) -> bool {
        matches!(
            self,
            SnmpError::Agent(
                snmp2::Error::AsnParse
                    | snmp2::Error::AsnInvalidLen
                    | snmp2::Error::AsnWrongType
                    | snmp2::Error::AsnUnsupportedType
                    | snmp2::Error::AsnEof
                    | snmp2::Error::AsnIntOverflow
                    | snmp2::Error::UnsupportedVersion
                    | snmp2::Error::RequestIdMismatch
                    | snmp2::Error::CommunityMismatch
            )
        )
    }
}
