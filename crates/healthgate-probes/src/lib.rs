//! healthgate-probes — concrete probes for the Healthgate engine.
//!
//! | kind      | passes when                                         |
//! |-----------|-----------------------------------------------------|
//! | `http`    | the URL answers with an expected status and body    |
//! | `no_http` | the URL does not answer at all                      |
//! | `host`    | a TCP connection to host:port succeeds              |
//! | `no_host` | a TCP connection to host:port fails                 |
//!
//! Every probe implements [`healthgate_health::Probe`], so they can be mixed
//! with closure probes in one `HealthChecker`. Only plain `http://` URLs are
//! supported.

pub mod builder;
pub mod endpoint;
pub mod host;

pub use builder::{HttpDefaults, build_checker, build_probe, build_probes};
pub use endpoint::{HttpCheck, HttpProbe, HttpResponse, NoHttpProbe};
pub use host::{HostProbe, NoHostProbe, is_host_reachable};
