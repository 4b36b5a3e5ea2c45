use crate::Cli;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 161;
pub const MIN_TIMEOUT_SECS: u64 = 2;
pub const MAX_TIMEOUT_SECS: u64 = 60;
/// Extra time the whole run gets on top of the per-request timeout.
pub const WATCHDOG_MARGIN_SECS: u64 = 10;

/// Everything one invocation needs, validated and immutable.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    /// Modes in evaluation order: cluster before pool.
    pub modes: Vec<CheckMode>,
    pub thresholds: Thresholds,
    pub auth: Auth,
    pub verbose: bool,
    pub perfdata: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    Cluster,
    Pool,
}

impl CheckMode {
    pub fn subject(self) -> &'static str {
        match self {
            CheckMode::Cluster => "Cluster",
            CheckMode::Pool => "Storage pool",
        }
    }

    pub fn perf_label(self) -> &'static str {
        match self {
            CheckMode::Cluster => "cluster_used",
            CheckMode::Pool => "pool_used",
        }
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckMode::Cluster => f.write_str("cluster"),
            CheckMode::Pool => f.write_str("pool"),
        }
    }
}

/// Warning and critical levels in percent; `warning <= critical`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthProtocol {
    #[default]
    Md5,
    Sha,
}

impl FromStr for AuthProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(AuthProtocol::Md5),
            "sha" | "sha1" => Ok(AuthProtocol::Sha),
            _ => Err(ConfigError::AuthProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthProtocol::Md5 => f.write_str("md5"),
            AuthProtocol::Sha => f.write_str("sha"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrivProtocol {
    #[default]
    Des,
    Aes,
}

impl FromStr for PrivProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "des" => Ok(PrivProtocol::Des),
            "aes" | "aes128" => Ok(PrivProtocol::Aes),
            _ => Err(ConfigError::PrivProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for PrivProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivProtocol::Des => f.write_str("des"),
            PrivProtocol::Aes => f.write_str("aes"),
        }
    }
}

/// How the session authenticates. Exactly one variant per configuration.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    V1 {
        community: String,
    },
    V2c {
        community: String,
    },
    V3AuthNoPriv {
        user: String,
        auth_password: String,
        auth_protocol: AuthProtocol,
    },
    V3AuthPriv {
        user: String,
        auth_password: String,
        auth_protocol: AuthProtocol,
        priv_password: String,
        priv_protocol: PrivProtocol,
    },
}

impl Auth {
    pub fn version_label(&self) -> &'static str {
        match self {
            Auth::V1 { .. } => "1",
            Auth::V2c { .. } => "2c",
            Auth::V3AuthNoPriv { .. } | Auth::V3AuthPriv { .. } => "3",
        }
    }
}

// Secrets stay out of verbose output.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::V1 { .. } => f.write_str("V1"),
            Auth::V2c { .. } => f.write_str("V2c"),
            Auth::V3AuthNoPriv {
                user,
                auth_protocol,
                ..
            } => f
                .debug_struct("V3AuthNoPriv")
                .field("user", user)
                .field("auth_protocol", auth_protocol)
                .finish_non_exhaustive(),
            Auth::V3AuthPriv {
                user,
                auth_protocol,
                priv_protocol,
                ..
            } => f
                .debug_struct("V3AuthPriv")
                .field("user", user)
                .field("auth_protocol", auth_protocol)
                .field("priv_protocol", priv_protocol)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error(
        "timeout must be a number between {} and {}, got '{}'",
        MIN_TIMEOUT_SECS,
        MAX_TIMEOUT_SECS,
        .0
    )]
    Timeout(String),
    #[error("host name/address not specified")]
    MissingHost,
    #[error("can't mix community string (v1/v2c) and login/password (v3) authentication")]
    MixedAuth,
    #[error("no credentials: give a community string (-C) or a login and password (-l, -x)")]
    MissingCredentials,
    #[error("v3 authentication needs both a login (-l) and a password (-x)")]
    IncompleteV3,
    #[error("v3 protocols (-L) need a login (-l)")]
    ProtocolsWithoutLogin,
    #[error("unknown authentication protocol '{0}', expected md5 or sha")]
    AuthProtocol(String),
    #[error("unknown privacy protocol '{0}', expected des or aes")]
    PrivProtocol(String),
    #[error("privacy protocol '{0}' needs a privacy password (-X)")]
    MissingPrivPassword(PrivProtocol),
    #[error("check option (-o) must select pool or cluster, got '{0}'")]
    Mode(String),
    #[error("warning (-w) and critical (-c) thresholds are required")]
    MissingThresholds,
    #[error("{name} threshold '{value}' is not a number")]
    Threshold { name: &'static str, value: String },
    #[error("warning threshold {warning} must not be greater than critical threshold {critical}")]
    ThresholdOrder { warning: f64, critical: f64 },
}

impl Config {
    /// Validates the parsed command line.
    ///
    /// Checks run in a fixed order so that the first problem reported is
    /// stable: timeout, host, authentication, check mode, thresholds.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let timeout = parse_timeout(cli.timeout.as_deref())?;
        let host = cli
            .hostname
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingHost)?
            .to_string();
        let auth = build_auth(cli)?;
        let modes = parse_modes(cli.option.as_deref())?;
        let thresholds = parse_thresholds(cli.warn.as_deref(), cli.critical.as_deref())?;

        Ok(Self {
            host,
            port: cli.port,
            timeout,
            modes,
            thresholds,
            auth,
            verbose: cli.verbose,
            perfdata: cli.perfparse,
        })
    }

    /// Deadline for the whole session, covering every request.
    pub fn watchdog(&self) -> Duration {
        self.timeout + Duration::from_secs(WATCHDOG_MARGIN_SECS)
    }
}

const fn default_timeout_secs() -> u64 {
    5
}

fn parse_timeout(raw: Option<&str>) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default_timeout_secs()));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if (MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&secs) => {
            Ok(Duration::from_secs(secs))
        }
        _ => Err(ConfigError::Timeout(raw.to_string())),
    }
}

fn build_auth(cli: &Cli) -> Result<Auth, ConfigError> {
    let community_family = cli.community.is_some() || cli.v2c;
    let user_family = cli.login.is_some() || cli.passwd.is_some() || cli.privpass.is_some();
    if community_family && user_family {
        return Err(ConfigError::MixedAuth);
    }
    if cli.protocols.is_some() && cli.login.is_none() {
        return Err(ConfigError::ProtocolsWithoutLogin);
    }

    if community_family {
        let community = cli
            .community
            .clone()
            .ok_or(ConfigError::MissingCredentials)?;
        return Ok(if cli.v2c {
            Auth::V2c { community }
        } else {
            Auth::V1 { community }
        });
    }

    let (user, auth_password) = match (&cli.login, &cli.passwd) {
        (Some(user), Some(password)) => (user.clone(), password.clone()),
        _ if !user_family => return Err(ConfigError::MissingCredentials),
        _ => return Err(ConfigError::IncompleteV3),
    };
    let (auth_protocol, priv_protocol) = match cli.protocols.as_deref() {
        Some(raw) => parse_protocols(raw)?,
        None => (AuthProtocol::default(), None),
    };

    match (&cli.privpass, priv_protocol) {
        (Some(priv_password), protocol) => Ok(Auth::V3AuthPriv {
            user,
            auth_password,
            auth_protocol,
            priv_password: priv_password.clone(),
            priv_protocol: protocol.unwrap_or_default(),
        }),
        (None, Some(protocol)) => Err(ConfigError::MissingPrivPassword(protocol)),
        (None, None) => Ok(Auth::V3AuthNoPriv {
            user,
            auth_password,
            auth_protocol,
        }),
    }
}

/// Parses `authproto[,privproto]`.
fn parse_protocols(raw: &str) -> Result<(AuthProtocol, Option<PrivProtocol>), ConfigError> {
    let (auth, privacy) = match raw.split_once(',') {
        Some((auth, privacy)) => (auth, Some(privacy)),
        None => (raw, None),
    };
    let auth = auth.parse()?;
    let privacy = privacy
        .filter(|p| !p.trim().is_empty())
        .map(str::parse)
        .transpose()?;
    Ok((auth, privacy))
}

/// Selects modes by substring so that e.g. `pool,cluster` runs both.
fn parse_modes(raw: Option<&str>) -> Result<Vec<CheckMode>, ConfigError> {
    let raw = raw.unwrap_or_default();
    let mut modes = Vec::with_capacity(2);
    if raw.contains("cluster") {
        modes.push(CheckMode::Cluster);
    }
    if raw.contains("pool") {
        modes.push(CheckMode::Pool);
    }
    if modes.is_empty() {
        return Err(ConfigError::Mode(raw.to_string()));
    }
    Ok(modes)
}

fn parse_threshold(name: &'static str, raw: &str) -> Result<f64, ConfigError> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ConfigError::Threshold {
            name,
            value: raw.to_string(),
        }),
    }
}

fn parse_thresholds(warn: Option<&str>, crit: Option<&str>) -> Result<Thresholds, ConfigError> {
    let (Some(warn), Some(crit)) = (warn, crit) else {
        return Err(ConfigError::MissingThresholds);
    };
    let warning = parse_threshold("warning", warn)?;
    let critical = parse_threshold("critical", crit)?;
    if warning > critical {
        return Err(ConfigError::ThresholdOrder { warning, critical });
    }
    Ok(Thresholds { warning, critical })
}
