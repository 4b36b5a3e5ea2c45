use super::{CapacitySample, MetricSession, ProbeError};
use crate::config::{CheckMode, Config};
use crate::snmp::{Oid, Session};
use std::future::Future;
use std::time::Duration;
use tokio::time;
use tracing::debug;

/// A scalar the agent publishes, with the message used when it is absent.
#[derive(Debug, Clone, Copy)]
pub struct Scalar {
    pub name: &'static str,
    pub arcs: &'static [u32],
    pub missing: &'static str,
}

impl Scalar {
    pub fn oid(&self) -> Oid {
        Oid::from_arcs(self.arcs)
    }
}

// NUTANIX-MIB: spitUsedCapacity / spitTotalCapacity of the first storage
// pool, clusterTotalStorageCapacity / clusterUsedStorageCapacity.
pub const POOL_USED: Scalar = Scalar {
    name: "pool_used",
    arcs: &[1, 3, 6, 1, 4, 1, 41263, 7, 1, 5, 1],
    missing: "No storage pool usage data",
};

pub const POOL_TOTAL: Scalar = Scalar {
    name: "pool_total",
    arcs: &[1, 3, 6, 1, 4, 1, 41263, 7, 1, 4, 1],
    missing: "No Storage pool capacity data",
};

pub const CLUSTER_TOTAL: Scalar = Scalar {
    name: "cluster_total",
    arcs: &[1, 3, 6, 1, 4, 1, 41263, 504, 0],
    missing: "No cluster capacity data",
};

pub const CLUSTER_USED: Scalar = Scalar {
    name: "cluster_used",
    arcs: &[1, 3, 6, 1, 4, 1, 41263, 505, 0],
    missing: "No cluster usage data",
};

async fn fetch_scalar<S>(session: &mut S, scalar: &Scalar) -> Result<u64, ProbeError>
where
    S: MetricSession + ?Sized,
{
    let oid = scalar.oid();
    let varbinds = session.get(&oid).await.map_err(ProbeError::Query)?;
    let bound = varbinds.iter().find(|(bound, _)| *bound == oid).map(|(_, value)| value);
    if let Some(exception) = bound.filter(|value| value.is_exception()) {
        debug!(metric = scalar.name, oid = %oid, value = ?exception, "agent has no value");
    }
    let value = bound
        .and_then(|value| value.as_u64())
        .ok_or(ProbeError::MissingBinding(scalar.missing))?;
    debug!(metric = scalar.name, oid = %oid, value, "capacity scalar fetched");
    Ok(value)
}

/// Pool reads used then total; cluster reads total then used.
pub async fn fetch_sample<S>(session: &mut S, mode: CheckMode) -> Result<CapacitySample, ProbeError>
where
    S: MetricSession + ?Sized,
{
    let sample = match mode {
        CheckMode::Pool => {
            let used = fetch_scalar(session, &POOL_USED).await?;
            let total = fetch_scalar(session, &POOL_TOTAL).await?;
            CapacitySample { used, total }
        }
        CheckMode::Cluster => {
            let total = fetch_scalar(session, &CLUSTER_TOTAL).await?;
            let used = fetch_scalar(session, &CLUSTER_USED).await?;
            CapacitySample { used, total }
        }
    };
    Ok(sample)
}

async fn fetch_all<S>(
    session: &mut S,
    modes: &[CheckMode],
) -> Result<Vec<(CheckMode, CapacitySample)>, ProbeError>
where
    S: MetricSession + ?Sized,
{
    let mut samples = Vec::with_capacity(modes.len());
    for &mode in modes {
        let sample = fetch_sample(session, mode).await?;
        debug!(mode = %mode, used = sample.used, total = sample.total, "capacity sample collected");
        samples.push((mode, sample));
    }
    Ok(samples)
}

/// Fetches every mode in order and closes the session, whatever the outcome.
pub async fn collect_capacity<S>(
    session: &mut S,
    modes: &[CheckMode],
) -> Result<Vec<(CheckMode, CapacitySample)>, ProbeError>
where
    S: MetricSession + ?Sized,
{
    let result = fetch_all(session, modes).await;
    session.close();
    result
}

pub async fn probe(cfg: &Config) -> Result<Vec<(CheckMode, CapacitySample)>, ProbeError> {
    let mut session = Session::open(&cfg.auth, &cfg.host, cfg.port, cfg.timeout)
        .await
        .map_err(ProbeError::Session)?;
    collect_capacity(&mut session, &cfg.modes).await
}

/// Runs `fut` under a hard deadline. Dropping the future releases its socket.
pub async fn with_watchdog<F, T>(deadline: Duration, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    match time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_elapsed) => {
            debug!(deadline = %humantime::format_duration(deadline), "watchdog expired");
            Err(ProbeError::Timeout)
        }
    }
}
