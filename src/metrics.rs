//! Per-endpoint StatsD telemetry: one timer and one counter for every
//! handled request, plus error counters for rejected ones.

use std::net::UdpSocket;
use std::panic::RefUnwindSafe;
use std::time::Duration;

use anyhow::Context;
use cadence::prelude::*;
use cadence::{MetricSink, QueuingMetricSink, StatsdClient, UdpMetricSink};
use tracing::debug;

use crate::config::MetricsConfig;

pub const USER_CREATE: &str = "endpoint.user.create";
pub const USER_VERIFY: &str = "endpoint.user.verify";
pub const USER_GET: &str = "endpoint.user.get";
pub const USER_UPDATE: &str = "endpoint.user.update";
pub const USER_DELETE: &str = "endpoint.user.delete";
pub const PIC_UPLOAD: &str = "endpoint.user.pic.upload";
pub const PIC_DELETE: &str = "endpoint.user.pic.delete";
pub const PIC_UNSUPPORTED_METHOD: &str = "endpoint.user.pic.unsupported.method";

pub struct Metrics {
    client: StatsdClient,
}

impl Metrics {
    /// Non-blocking UDP client; sends are queued and never fail a request.
    pub fn udp(cfg: &MetricsConfig) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").context("bind statsd socket")?;
        socket
            .set_nonblocking(true)
            .context("statsd socket non-blocking")?;
        let udp = UdpMetricSink::from((cfg.host.as_str(), cfg.port), socket)
            .context("resolve statsd host")?;
        Ok(Self::from_sink(&cfg.prefix, QueuingMetricSink::from(udp)))
    }

    pub fn from_sink<S>(prefix: &str, sink: S) -> Self
    where
        S: MetricSink + Send + Sync + RefUnwindSafe + 'static,
    {
        Self {
            client: StatsdClient::from_sink(prefix, sink),
        }
    }

    pub fn incr(&self, key: &str) {
        if let Err(e) = self.client.incr(key) {
            debug!(%key, error = %e, "statsd counter dropped");
        }
    }

    pub fn time(&self, key: &str, elapsed: Duration) {
        if let Err(e) = self.client.time(key, elapsed) {
            debug!(%key, error = %e, "statsd timer dropped");
        }
    }

    /// `{endpoint}.time` and `{endpoint}.count` for a completed request.
    pub fn completed(&self, endpoint: &str, elapsed: Duration) {
        self.time(&format!("{endpoint}.time"), elapsed);
        self.incr(&format!("{endpoint}.count"));
    }

    /// `{endpoint}.auth.error`
    pub fn auth_error(&self, endpoint: &str) {
        self.incr(&format!("{endpoint}.auth.error"));
    }

    /// `{endpoint}.error`
    pub fn error(&self, endpoint: &str) {
        self.incr(&format!("{endpoint}.error"));
    }
}
