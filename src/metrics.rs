//! Nagios performance data: `label=value[uom];warn;crit;min`.

use crate::config::Thresholds;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct PerfData {
    pub label: &'static str,
    /// `None` renders as `U`, the plugin convention for an unknown value.
    pub value: Option<f64>,
    pub thresholds: Thresholds,
}

impl PerfData {
    pub fn percent(label: &'static str, value: Option<f64>, thresholds: Thresholds) -> Self {
        Self {
            label,
            value,
            thresholds,
        }
    }
}

impl fmt::Display for PerfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{}={value:.2}%", self.label)?,
            None => write!(f, "{}=U", self.label)?,
        }
        write!(
            f,
            ";{};{};0",
            self.thresholds.warning, self.thresholds.critical
        )
    }
}
