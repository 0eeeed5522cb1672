//! Turns `[[probe]]` config entries into probes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use tracing::debug;

use healthgate_core::config::DEFAULT_HOST_TIMEOUT;
use healthgate_core::{
    ConfigError, ConfigResult, HealthgateConfig, ProbeConfig, ProbeTarget, parse_duration,
};
use healthgate_health::{HealthChecker, Probe};

use crate::endpoint::{HttpCheck, HttpProbe, NoHttpProbe};
use crate::host::{HostProbe, NoHostProbe};

/// Settings from the `[http]` section applied to every HTTP probe.
#[derive(Debug, Clone)]
pub struct HttpDefaults {
    pub connection_timeout: Duration,
    pub user_agent: String,
}

impl HttpDefaults {
    pub fn from_config(config: &HealthgateConfig) -> ConfigResult<Self> {
        Ok(Self {
            connection_timeout: config.connection_timeout()?,
            user_agent: config.user_agent().to_string(),
        })
    }
}

/// Build one probe from its config entry.
pub fn build_probe(config: &ProbeConfig, defaults: &HttpDefaults) -> ConfigResult<Arc<dyn Probe>> {
    let probe: Arc<dyn Probe> = match &config.target {
        ProbeTarget::Http {
            url,
            method,
            status,
            contains,
            headers,
            timeout,
        } => {
            let mut check = http_check(
                &config.name,
                url,
                method.as_deref(),
                headers.as_ref(),
                timeout.as_deref(),
                defaults,
            )?;
            if let Some(codes) = status {
                check = check.responds_with(codes.iter().copied());
            }
            if let Some(texts) = contains {
                check = check.contains_texts(texts.iter().cloned());
            }
            Arc::new(HttpProbe::new(&config.name, check))
        }
        ProbeTarget::NoHttp {
            url,
            method,
            headers,
            timeout,
        } => {
            let check = http_check(
                &config.name,
                url,
                method.as_deref(),
                headers.as_ref(),
                timeout.as_deref(),
                defaults,
            )?;
            Arc::new(NoHttpProbe::new(&config.name, check))
        }
        ProbeTarget::Host {
            host,
            port,
            timeout,
        } => Arc::new(
            HostProbe::new(&config.name, host, *port).timeout(host_timeout(timeout.as_deref())?),
        ),
        ProbeTarget::NoHost {
            host,
            port,
            timeout,
        } => Arc::new(
            NoHostProbe::new(&config.name, host, *port)
                .timeout(host_timeout(timeout.as_deref())?),
        ),
    };
    debug!(probe = %config.name, kind = config.target.kind(), "built probe");
    Ok(probe)
}

/// Build every probe declared in the config.
pub fn build_probes(config: &HealthgateConfig) -> ConfigResult<Vec<Arc<dyn Probe>>> {
    let defaults = HttpDefaults::from_config(config)?;
    config
        .probes
        .iter()
        .map(|probe| build_probe(probe, &defaults))
        .collect()
}

/// A `HealthChecker` with every configured probe registered.
pub fn build_checker(config: &HealthgateConfig) -> ConfigResult<HealthChecker> {
    let mut checker = HealthChecker::new();
    for probe in build_probes(config)? {
        checker.register_probe(probe);
    }
    Ok(checker)
}

fn http_check(
    name: &str,
    url: &str,
    method: Option<&str>,
    headers: Option<&BTreeMap<String, String>>,
    timeout: Option<&str>,
    defaults: &HttpDefaults,
) -> ConfigResult<HttpCheck> {
    let mut check = HttpCheck::new(url)
        .user_agent(defaults.user_agent.as_str())
        .timeout(match timeout {
            Some(raw) => parse_duration(raw)?,
            None => defaults.connection_timeout,
        });
    if let Some(method) = method {
        let parsed = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
            ConfigError::Invalid {
                field: format!("probe '{name}' method"),
                reason: format!("'{method}' is not an HTTP method"),
            }
        })?;
        check = check.method(parsed);
    }
    for (key, value) in headers.into_iter().flatten() {
        check = check.header(key, value);
    }
    Ok(check)
}

fn host_timeout(raw: Option<&str>) -> ConfigResult<Duration> {
    raw.map(parse_duration)
        .transpose()
        .map(|d| d.unwrap_or(DEFAULT_HOST_TIMEOUT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_every_kind() {
        let config = HealthgateConfig::parse(
            r#"
[http]
connection_timeout = "2s"
user_agent = "probe-test"

[[probe]]
name = "api"
kind = "http"
url = "http://127.0.0.1:8080/healthz"
method = "head"
status = [200, 204]
contains = ["ok"]

[[probe]]
name = "legacy"
kind = "no_http"
url = "http://127.0.0.1:9090/"

[[probe]]
name = "db"
kind = "host"
host = "127.0.0.1"
port = 5432

[[probe]]
name = "ssh"
kind = "no_host"
host = "127.0.0.1"
port = 22
timeout = "250ms"
"#,
        )
        .unwrap();

        let probes = build_probes(&config).unwrap();
        let names: Vec<_> = probes.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["api", "legacy", "db", "ssh"]);

        let defaults = HttpDefaults::from_config(&config).unwrap();
        assert_eq!(defaults.connection_timeout, Duration::from_secs(2));
        let check = http_check(
            "api",
            "http://127.0.0.1:8080/healthz",
            Some("head"),
            None,
            None,
            &defaults,
        )
        .unwrap();
        assert_eq!(check.method, Method::HEAD);
        assert_eq!(check.user_agent, "probe-test");
        assert_eq!(check.timeout, Duration::from_secs(2));

        let checker = build_checker(&config).unwrap();
        assert_eq!(checker.len(), 4);
    }

    #[test]
    fn rejects_bad_method() {
        let defaults = HttpDefaults {
            connection_timeout: Duration::from_secs(1),
            user_agent: "t".to_string(),
        };
        let err = http_check(
            "api",
            "http://x/",
            Some("GE T"),
            None,
            None,
            &defaults,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not an HTTP method"));
    }
}
