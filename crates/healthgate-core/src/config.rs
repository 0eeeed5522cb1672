//! healthgate.toml configuration parser.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::duration::parse_duration;
use crate::error::{ConfigError, ConfigResult};

/// Default number of attempts per round before giving up.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 60;
/// Default delay between failing attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5_000);
/// Default number of consecutive clean rounds required.
pub const DEFAULT_ASSURANCE_ATTEMPTS: u32 = 2;
/// Default delay between clean rounds.
pub const DEFAULT_ASSURANCE_DELAY: Duration = Duration::from_millis(1_000);
/// Default HTTP connection timeout.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(5_000);
/// Default TCP reachability timeout.
pub const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_millis(1_000);
/// Default user agent sent by HTTP probes.
pub const DEFAULT_USER_AGENT: &str = concat!("healthgate/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthgateConfig {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default, rename = "probe", skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<ProbeConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub verbose: Option<bool>,
    pub wait_before: Option<String>,
    pub wait_after: Option<String>,
    pub retry: Option<RetryConfig>,
    pub assurance: Option<RetryConfig>,
}

/// One retry tier: how many attempts, and how long to wait between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    pub delay: Option<String>,
    pub backoff: Option<Backoff>,
    /// Upper bound for exponential backoff.
    pub max_delay: Option<String>,
}

/// How the delay grows with the attempt index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    #[default]
    Constant,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connection_timeout: Option<String>,
    pub user_agent: Option<String>,
}

/// A single `[[probe]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub name: String,
    #[serde(flatten)]
    pub target: ProbeTarget,
}

/// What a probe checks, selected by the `kind` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeTarget {
    /// The URL must answer with an expected status and body.
    Http {
        url: String,
        method: Option<String>,
        status: Option<Vec<u16>>,
        contains: Option<Vec<String>>,
        headers: Option<BTreeMap<String, String>>,
        timeout: Option<String>,
    },
    /// The URL must not answer at all.
    NoHttp {
        url: String,
        method: Option<String>,
        headers: Option<BTreeMap<String, String>>,
        timeout: Option<String>,
    },
    /// A TCP connection to host:port must succeed.
    Host {
        host: String,
        port: u16,
        timeout: Option<String>,
    },
    /// A TCP connection to host:port must fail.
    NoHost {
        host: String,
        port: u16,
        timeout: Option<String>,
    },
}

impl HealthgateConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: HealthgateConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every duration and count up front so a bad file fails before
    /// any probe runs.
    pub fn validate(&self) -> ConfigResult<()> {
        let eval = &self.evaluation;
        check_duration("evaluation.wait_before", eval.wait_before.as_deref())?;
        check_duration("evaluation.wait_after", eval.wait_after.as_deref())?;
        if let Some(retry) = &eval.retry {
            retry.validate("evaluation.retry")?;
        }
        if let Some(assurance) = &eval.assurance {
            assurance.validate("evaluation.assurance")?;
        }
        check_duration("http.connection_timeout", self.http.connection_timeout.as_deref())?;

        for (index, probe) in self.probes.iter().enumerate() {
            if probe.name.trim().is_empty() {
                warn!(index, "probe has an empty name; reports will be hard to read");
            }
            let field = format!("probe[{index}].timeout");
            match &probe.target {
                ProbeTarget::Http {
                    url,
                    timeout,
                    status,
                    ..
                } => {
                    check_url(index, url)?;
                    check_duration(&field, timeout.as_deref())?;
                    if status.as_ref().is_some_and(|codes| codes.is_empty()) {
                        return Err(ConfigError::Invalid {
                            field: format!("probe[{index}].status"),
                            reason: "at least one status code is required".to_string(),
                        });
                    }
                }
                ProbeTarget::NoHttp { url, timeout, .. } => {
                    check_url(index, url)?;
                    check_duration(&field, timeout.as_deref())?;
                }
                ProbeTarget::Host { host, timeout, .. }
                | ProbeTarget::NoHost { host, timeout, .. } => {
                    if host.trim().is_empty() {
                        return Err(ConfigError::Invalid {
                            field: format!("probe[{index}].host"),
                            reason: "must not be empty".to_string(),
                        });
                    }
                    check_duration(&field, timeout.as_deref())?;
                }
            }
        }
        Ok(())
    }

    /// Whether attempt exhaustion should fail hard. Defaults to `true`.
    pub fn verbose(&self) -> bool {
        self.evaluation.verbose.unwrap_or(true)
    }

    pub fn wait_before(&self) -> ConfigResult<Duration> {
        optional_duration(self.evaluation.wait_before.as_deref(), Duration::ZERO)
    }

    pub fn wait_after(&self) -> ConfigResult<Duration> {
        optional_duration(self.evaluation.wait_after.as_deref(), Duration::ZERO)
    }

    /// The attempt tier, with defaults filled in.
    pub fn retry(&self) -> RetryConfig {
        self.evaluation
            .retry
            .clone()
            .unwrap_or_default()
            .with_defaults(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }

    /// The assurance tier, with defaults filled in.
    pub fn assurance(&self) -> RetryConfig {
        self.evaluation
            .assurance
            .clone()
            .unwrap_or_default()
            .with_defaults(DEFAULT_ASSURANCE_ATTEMPTS, DEFAULT_ASSURANCE_DELAY)
    }

    pub fn connection_timeout(&self) -> ConfigResult<Duration> {
        optional_duration(
            self.http.connection_timeout.as_deref(),
            DEFAULT_CONNECTION_TIMEOUT,
        )
    }

    pub fn user_agent(&self) -> &str {
        self.http.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Scaffold a starter healthgate.toml that probes a local service.
    pub fn scaffold() -> Self {
        HealthgateConfig {
            evaluation: EvaluationConfig {
                verbose: Some(true),
                wait_before: Some("0s".to_string()),
                wait_after: Some("0s".to_string()),
                retry: Some(RetryConfig {
                    attempts: Some(DEFAULT_RETRY_ATTEMPTS),
                    delay: Some("5s".to_string()),
                    backoff: Some(Backoff::Constant),
                    max_delay: None,
                }),
                assurance: Some(RetryConfig {
                    attempts: Some(DEFAULT_ASSURANCE_ATTEMPTS),
                    delay: Some("1s".to_string()),
                    backoff: Some(Backoff::Constant),
                    max_delay: None,
                }),
            },
            http: HttpConfig {
                connection_timeout: Some("5s".to_string()),
                user_agent: None,
            },
            probes: vec![
                ProbeConfig {
                    name: "service".to_string(),
                    target: ProbeTarget::Http {
                        url: "http://127.0.0.1:8080/healthz".to_string(),
                        method: None,
                        status: Some(vec![200]),
                        contains: None,
                        headers: None,
                        timeout: None,
                    },
                },
                ProbeConfig {
                    name: "service-port".to_string(),
                    target: ProbeTarget::Host {
                        host: "127.0.0.1".to_string(),
                        port: 8080,
                        timeout: Some("1s".to_string()),
                    },
                },
            ],
        }
    }
}

impl RetryConfig {
    fn validate(&self, field: &str) -> ConfigResult<()> {
        if self.attempts == Some(0) {
            return Err(ConfigError::Invalid {
                field: format!("{field}.attempts"),
                reason: "must be at least 1".to_string(),
            });
        }
        check_duration(&format!("{field}.delay"), self.delay.as_deref())?;
        check_duration(&format!("{field}.max_delay"), self.max_delay.as_deref())
    }

    fn with_defaults(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts.get_or_insert(attempts);
        self.delay
            .get_or_insert_with(|| crate::duration::format_duration(delay));
        self.backoff.get_or_insert(Backoff::Constant);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.unwrap_or(1).max(1)
    }

    pub fn delay(&self) -> ConfigResult<Duration> {
        optional_duration(self.delay.as_deref(), Duration::ZERO)
    }

    pub fn max_delay(&self) -> ConfigResult<Option<Duration>> {
        self.max_delay.as_deref().map(parse_duration).transpose()
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff.unwrap_or_default()
    }
}

impl ProbeTarget {
    /// Short label for the probe kind, as written in the config file.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeTarget::Http { .. } => "http",
            ProbeTarget::NoHttp { .. } => "no_http",
            ProbeTarget::Host { .. } => "host",
            ProbeTarget::NoHost { .. } => "no_host",
        }
    }
}

fn optional_duration(value: Option<&str>, default: Duration) -> ConfigResult<Duration> {
    value.map(parse_duration).transpose().map(|d| d.unwrap_or(default))
}

fn check_duration(field: &str, value: Option<&str>) -> ConfigResult<()> {
    match value {
        Some(raw) => parse_duration(raw).map(|_| ()).map_err(|_| ConfigError::Invalid {
            field: field.to_string(),
            reason: format!("'{raw}' is not a duration"),
        }),
        None => Ok(()),
    }
}

/// Probes speak plain HTTP/1 only.
fn check_url(index: usize, url: &str) -> ConfigResult<()> {
    if url.starts_with("http://") {
        return Ok(());
    }
    let reason = if url.starts_with("https://") {
        format!("'{url}' uses https, which is not supported")
    } else {
        format!("'{url}' is not an http URL")
    };
    Err(ConfigError::Invalid {
        field: format!("probe[{index}].url"),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = HealthgateConfig::parse("").unwrap();
        assert!(config.probes.is_empty());
        assert!(config.verbose());
        assert_eq!(config.wait_before().unwrap(), Duration::ZERO);
        assert_eq!(config.wait_after().unwrap(), Duration::ZERO);

        let retry = config.retry();
        assert_eq!(retry.attempts(), 60);
        assert_eq!(retry.delay().unwrap(), Duration::from_secs(5));
        assert_eq!(retry.backoff(), Backoff::Constant);

        let assurance = config.assurance();
        assert_eq!(assurance.attempts(), 2);
        assert_eq!(assurance.delay().unwrap(), Duration::from_secs(1));

        assert_eq!(config.connection_timeout().unwrap(), Duration::from_secs(5));
        assert!(config.user_agent().starts_with("healthgate/"));
    }

    #[test]
    fn test_parse_probes() {
        let toml_str = r#"
[evaluation]
verbose = false
wait_before = "2s"

[evaluation.retry]
attempts = 10
delay = "500ms"
backoff = "exponential"
max_delay = "10s"

[[probe]]
name = "api"
kind = "http"
url = "http://127.0.0.1:8080/healthz"
status = [200, 204]
contains = ["ok"]
headers = { authorization = "Bearer token" }

[[probe]]
name = "db"
kind = "host"
host = "127.0.0.1"
port = 5432

[[probe]]
name = "old-api"
kind = "no_http"
url = "http://127.0.0.1:9090/"
"#;
        let config = HealthgateConfig::parse(toml_str).unwrap();
        assert!(!config.verbose());
        assert_eq!(config.wait_before().unwrap(), Duration::from_secs(2));

        let retry = config.retry();
        assert_eq!(retry.attempts(), 10);
        assert_eq!(retry.delay().unwrap(), Duration::from_millis(500));
        assert_eq!(retry.backoff(), Backoff::Exponential);
        assert_eq!(retry.max_delay().unwrap(), Some(Duration::from_secs(10)));

        // Assurance tier untouched: defaults.
        assert_eq!(config.assurance().attempts(), 2);

        assert_eq!(config.probes.len(), 3);
        assert_eq!(config.probes[0].name, "api");
        match &config.probes[0].target {
            ProbeTarget::Http {
                status, headers, ..
            } => {
                assert_eq!(status.as_deref(), Some(&[200, 204][..]));
                assert_eq!(
                    headers.as_ref().and_then(|h| h.get("authorization")),
                    Some(&"Bearer token".to_string())
                );
            }
            other => panic!("unexpected target: {other:?}"),
        }
        assert_eq!(config.probes[1].target.kind(), "host");
        assert_eq!(config.probes[2].target.kind(), "no_http");
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let toml_str = r#"
[evaluation.assurance]
attempts = 0
"#;
        let err = HealthgateConfig::parse(toml_str).unwrap_err();
        assert!(err.to_string().contains("evaluation.assurance.attempts"));
    }

    #[test]
    fn test_rejects_bad_duration() {
        let toml_str = r#"
[evaluation]
wait_after = "later"
"#;
        let err = HealthgateConfig::parse(toml_str).unwrap_err();
        assert!(err.to_string().contains("evaluation.wait_after"));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let toml_str = r#"
[[probe]]
name = "ftp"
kind = "http"
url = "ftp://example.com"
"#;
        assert!(HealthgateConfig::parse(toml_str).is_err());
    }

    #[test]
    fn test_rejects_https_url() {
        for kind in ["http", "no_http"] {
            let toml_str = format!(
                "[[probe]]\nname = \"secure\"\nkind = \"{kind}\"\nurl = \"https://127.0.0.1:1/\"\n"
            );
            let err = HealthgateConfig::parse(&toml_str).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{kind}: {err}");
            assert!(err.to_string().contains("probe[0].url"), "{err}");
            assert!(err.to_string().contains("https"), "{err}");
        }
    }

    #[test]
    fn test_rejects_missing_port() {
        let toml_str = r#"
[[probe]]
name = "db"
kind = "host"
host = "localhost"
"#;
        assert!(matches!(
            HealthgateConfig::parse(toml_str),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_scaffold_round_trips() {
        let config = HealthgateConfig::scaffold();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("healthz"));

        let parsed = HealthgateConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healthgate.toml");
        std::fs::write(
            &path,
            "[[probe]]\nname = \"db\"\nkind = \"no_host\"\nhost = \"10.0.0.1\"\nport = 22\n",
        )
        .unwrap();

        let config = HealthgateConfig::from_file(&path).unwrap();
        assert_eq!(config.probes.len(), 1);

        let missing = HealthgateConfig::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
