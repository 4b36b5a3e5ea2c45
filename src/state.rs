use crate::collectors::CapacitySample;
use crate::config::{CheckMode, Thresholds};
use crate::metrics::PerfData;
use std::fmt;

/// Plugin status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    pub fn exit(self) -> ! {
        std::process::exit(self.code())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Outcome of evaluating one mode.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub mode: CheckMode,
    pub status: Status,
    pub sample: CapacitySample,
    pub percent: Option<f64>,
    pub thresholds: Thresholds,
}

/// Compares used capacity against the thresholds; critical wins over warning.
pub fn evaluate(mode: CheckMode, sample: CapacitySample, thresholds: &Thresholds) -> CheckReport {
    let percent = sample.percent_used();
    let status = match percent {
        Some(p) if p > thresholds.critical => Status::Critical,
        Some(p) if p > thresholds.warning => Status::Warning,
        Some(_) => Status::Ok,
        None if sample.total == 0 => Status::Unknown,
        None => Status::Critical,
    };
    CheckReport {
        mode,
        status,
        sample,
        percent,
        thresholds: *thresholds,
    }
}

impl CheckReport {
    pub fn status_line(&self, perfdata: bool) -> String {
        let subject = self.mode.subject();
        let mut line = match (self.percent, self.status) {
            (Some(p), Status::Critical) => format!(
                "{subject} used capacity {p:.2}% > {:.2}% : {}",
                self.thresholds.critical, self.status
            ),
            (Some(p), Status::Warning) => format!(
                "{subject} used capacity {p:.2}% > {:.2}% : {}",
                self.thresholds.warning, self.status
            ),
            (Some(p), status) => format!("{subject} used capacity {p:.2}% : {status}"),
            (None, Status::Unknown) => format!("{subject} reported no capacity : UNKNOWN"),
            (None, status) => format!("{subject} has no free capacity : {status}"),
        };
        if perfdata {
            let perf = PerfData::percent(self.mode.perf_label(), self.percent, self.thresholds);
            line.push_str(&format!(" | {perf}"));
        }
        line
    }

    pub fn diagnostics(&self) -> String {
        let percent = self
            .percent
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "total: {}, used: {}, percent: {percent}, free: {}",
            self.sample.total,
            self.sample.used,
            self.sample.free()
        )
    }
}
