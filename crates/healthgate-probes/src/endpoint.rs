//! HTTP probes.
//!
//! Requests go over a fresh hyper HTTP/1 connection per attempt, so a
//! probe never observes a pooled connection that outlived the service.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use bytes::Bytes;
use http::uri::Authority;
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty, Limited};
use tracing::debug;

use healthgate_core::config::{DEFAULT_CONNECTION_TIMEOUT, DEFAULT_USER_AGENT};
use healthgate_health::Probe;

/// Default cap on a buffered response body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// What was received from the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Request options plus the assertions a response must satisfy.
#[derive(Debug, Clone)]
pub struct HttpCheck {
    pub url: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub user_agent: String,
    pub timeout: Duration,
    /// Accepted status codes.
    pub statuses: Vec<u16>,
    /// Texts the body must contain, all of them.
    pub texts: Vec<String>,
    /// Responses with a larger body fail the request.
    pub max_body_bytes: usize,
}

impl HttpCheck {
    /// GET `url`, expecting 200.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: BTreeMap::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_CONNECTION_TIMEOUT,
            statuses: vec![StatusCode::OK.as_u16()],
            texts: Vec::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Replace the accepted status codes.
    pub fn responds_with(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn contains_text(mut self, text: impl Into<String>) -> Self {
        self.texts.push(text.into());
        self
    }

    pub fn contains_texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.texts.extend(texts.into_iter().map(Into::into));
        self
    }

    /// Check a response against the expected statuses and texts.
    pub fn verify(&self, response: &HttpResponse) -> anyhow::Result<()> {
        if !self.statuses.contains(&response.status.as_u16()) {
            bail!(
                "unexpected status {}, expected one of {:?}",
                response.status,
                self.statuses
            );
        }
        if let Some(missing) = self.texts.iter().find(|t| !response.body.contains(t.as_str())) {
            bail!("response body does not contain '{missing}'");
        }
        Ok(())
    }

    /// Short description used in status details, e.g. `GET http://x/`.
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    /// Send the request once and read the whole body.
    pub async fn send(&self) -> anyhow::Result<HttpResponse> {
        let uri = parse_http_uri(&self.url)?;
        tokio::time::timeout(self.timeout, self.send_uri(uri))
            .await
            .with_context(|| format!("timed out after {:?}", self.timeout))?
    }

    async fn send_uri(&self, uri: Uri) -> anyhow::Result<HttpResponse> {
        let authority = uri
            .authority()
            .context("URL has no host")?
            .clone();
        let address = format!("{}:{}", authority.host(), authority.port_u16().unwrap_or(80));

        let stream = tokio::net::TcpStream::connect(&address)
            .await
            .with_context(|| format!("connection to {address} failed"))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .context("HTTP handshake failed")?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "probe connection closed with error");
            }
        });

        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();
        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(path)
            .header(http::header::HOST, host_header(&authority))
            .header(http::header::USER_AGENT, self.user_agent.as_str());
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder
            .body(Empty::<Bytes>::new())
            .context("invalid request")?;

        let response = sender
            .send_request(request)
            .await
            .context("request failed")?;
        let status = response.status();
        let body = Limited::new(response.into_body(), self.max_body_bytes)
            .collect()
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("failed to read response body")?
            .to_bytes();

        debug!(url = %self.url, %status, bytes = body.len(), "probe response");
        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// `host[:port]`, without any userinfo the URL carried.
fn host_header(authority: &Authority) -> String {
    match authority.port_u16() {
        Some(port) => format!("{}:{port}", authority.host()),
        None => authority.host().to_string(),
    }
}

fn parse_http_uri(url: &str) -> anyhow::Result<Uri> {
    let uri: Uri = url
        .parse()
        .with_context(|| format!("invalid URL '{url}'"))?;
    match uri.scheme_str() {
        Some("http") => Ok(uri),
        Some(other) => bail!("unsupported URL scheme '{other}' in '{url}'"),
        None => bail!("URL '{url}' has no scheme"),
    }
}

/// Passes when the endpoint answers and every assertion holds.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    name: String,
    check: HttpCheck,
}

impl HttpProbe {
    pub fn new(name: impl Into<String>, check: HttpCheck) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }

    pub fn check(&self) -> &HttpCheck {
        &self.check
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> anyhow::Result<String> {
        let target = self.check.describe();
        let response = self.check.send().await.with_context(|| target.clone())?;
        self.check
            .verify(&response)
            .with_context(|| format!("{target} -> {}", response.status))?;
        Ok(format!("{target} -> {}", response.status))
    }
}

/// Passes when the endpoint does not answer at all.
#[derive(Debug, Clone)]
pub struct NoHttpProbe {
    name: String,
    check: HttpCheck,
}

impl NoHttpProbe {
    pub fn new(name: impl Into<String>, check: HttpCheck) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

#[async_trait]
impl Probe for NoHttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> anyhow::Result<String> {
        // A malformed URL is a configuration problem, not "unavailable".
        parse_http_uri(&self.check.url)?;

        match self.check.send().await {
            Ok(response) => bail!(
                "HTTP {} '{}' is available ({})",
                self.check.method,
                self.check.url,
                response.status
            ),
            Err(e) => {
                debug!(url = %self.check.url, error = %e, "endpoint unavailable as expected");
                Ok(format!("{} -> unavailable", self.check.describe()))
            }
        }
    }
}
