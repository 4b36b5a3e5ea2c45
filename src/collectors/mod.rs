pub mod capacity;

use crate::snmp::{self, Oid, SnmpError, VarBind};
use async_trait::async_trait;
use thiserror::Error;

/// Used and total capacity of one pool or cluster, as reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacitySample {
    pub used: u64,
    pub total: u64,
}

impl CapacitySample {
    pub fn free(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }

    /// Used capacity relative to the *free* capacity, in percent.
    ///
    /// `None` when nothing is free: either the agent reports no capacity at
    /// all or used has reached total.
    pub fn percent_used(&self) -> Option<f64> {
        match self.free() {
            0 => None,
            free => Some(self.used as f64 / free as f64 * 100.0),
        }
    }
}

/// The part of an SNMP session the fetcher needs.
#[async_trait]
pub trait MetricSession: Send {
    async fn get(&mut self, oid: &Oid) -> Result<Vec<VarBind>, SnmpError>;

    fn close(&mut self);
}

#[async_trait]
impl MetricSession for snmp::Session {
    async fn get(&mut self, oid: &Oid) -> Result<Vec<VarBind>, SnmpError> {
        snmp::Session::get(self, oid).await
    }

    fn close(&mut self) {
        snmp::Session::close(self);
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("ERROR opening session: {0}")]
    Session(#[source] SnmpError),
    #[error("ERROR: {0}")]
    Query(#[source] SnmpError),
    #[error("{0}")]
    MissingBinding(&'static str),
    #[error("No answer from host")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_relative_to_free_capacity() {
        let sample = CapacitySample { used: 50, total: 100 };
        assert_eq!(sample.free(), 50);
        assert_eq!(sample.percent_used(), Some(100.0));

        let sample = CapacitySample { used: 0, total: 100 };
        assert_eq!(sample.percent_used(), Some(0.0));
    }

    #[test]
    fn nothing_free_has_no_percentage() {
        assert_eq!(CapacitySample { used: 0, total: 0 }.percent_used(), None);
        assert_eq!(CapacitySample { used: 100, total: 100 }.percent_used(), None);

        let overfull = CapacitySample { used: 120, total: 100 };
        assert_eq!(overfull.free(), 0);
        assert_eq!(overfull.percent_used(), None);
    }

    #[test]
    fn probe_errors_render_like_plugin_messages() {
        let err = ProbeError::Session(SnmpError::NoAddress("nas01".to_string()));
        assert!(err.to_string().starts_with("ERROR opening session: "));
        assert_eq!(
            ProbeError::MissingBinding("No cluster usage data").to_string(),
            "No cluster usage data"
        );
        assert_eq!(ProbeError::Timeout.to_string(), "No answer from host");
    }
}
