//! Upstream HTTP transport.
//!
//! The default client is built once and shared: it owns the connection pool
//! and is safe to use from every request task concurrently. Requests that
//! carry timeout directives get a client built just for them, which is
//! dropped with the request.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};

use crate::config::{TimeoutConfig, TransportConfig};
use crate::resilience::{TimeoutDirectives, TimeoutPolicy};

#[derive(Debug, Clone)]
pub struct UpstreamTransport {
    shared: Client,
    defaults: TimeoutPolicy,
    settings: TransportConfig,
}

impl UpstreamTransport {
    pub fn new(timeouts: &TimeoutConfig, settings: &TransportConfig) -> Result<Self, reqwest::Error> {
        let defaults = TimeoutPolicy::from_config(timeouts);
        let shared = builder(settings, defaults).build()?;

        Ok(Self {
            shared,
            defaults,
            settings: settings.clone(),
        })
    }

    /// Timeouts applied when a request carries no directives.
    pub fn defaults(&self) -> TimeoutPolicy {
        self.defaults
    }

    /// Client for one upstream call. Cloning the shared client only bumps a
    /// reference count.
    pub fn client_for(&self, directives: TimeoutDirectives) -> Result<Client, reqwest::Error> {
        if directives.is_empty() {
            return Ok(self.shared.clone());
        }

        let policy = self.defaults.with_directives(directives);
        tracing::debug!(
            connect = ?policy.connect,
            read = ?policy.read,
            "Building request-scoped upstream client"
        );
        builder(&self.settings, policy).build()
    }
}

fn builder(settings: &TransportConfig, policy: TimeoutPolicy) -> ClientBuilder {
    let redirects = if settings.follow_redirects {
        Policy::default()
    } else {
        Policy::none()
    };

    let mut builder = Client::builder()
        .redirect(redirects)
        .pool_idle_timeout(Duration::from_secs(settings.pool_idle_secs));

    if !settings.use_system_proxy {
        builder = builder.no_proxy();
    }
    if let Some(connect) = policy.connect.as_duration() {
        builder = builder.connect_timeout(connect);
    }
    if let Some(read) = policy.read.as_duration() {
        builder = builder.read_timeout(read);
    }
    builder
}
