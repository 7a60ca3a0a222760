//! Minimal metrics registry for a hub session.
//!
//! Counter/gauge types with dynamic labels backed by `DashMap`. Labels are
//! flattened into sorted key vectors to keep deterministic ordering.

use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::observer::{Observer, SessionEvent};
use crate::transport::conn::ConnState;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn series(name: &str, key: &[(String, String)]) -> String {
    if key.is_empty() {
        return name.to_string();
    }
    let label_str = key
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{}{{{}}}", name, label_str)
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value for one label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{} {}", series(name, r.key()), val);
        }
    }
}

#[derive(Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge\n{} {}", name, name, self.get());
    }
}

#[derive(Default)]
pub struct SessionMetrics {
    pub relayed: CounterVec,
    pub rejected: CounterVec,
    pub transport_errors: CounterVec,
    pub handshake_failures: CounterVec,
    pub reconnect_attempts: CounterVec,
    pub connected: Gauge,
}

impl SessionMetrics {
    /// Fold one session event into the counters.
    pub fn record(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Relayed { direction } => {
                self.relayed.inc(&[("direction", direction.as_str())]);
            }
            SessionEvent::Rejected { direction, .. } => {
                self.rejected.inc(&[("direction", direction.as_str())]);
            }
            SessionEvent::TransportError { .. } => self.transport_errors.inc(&[]),
            SessionEvent::HandshakeFailed { .. } => self.handshake_failures.inc(&[]),
            SessionEvent::RetryScheduled { .. } => self.reconnect_attempts.inc(&[]),
            SessionEvent::StateChanged { to, .. } => {
                self.connected.set(i64::from(*to == ConnState::Connected));
            }
            _ => {}
        }
    }

    /// Render all metrics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.relayed.render("prisclient_relayed_total", &mut out);
        self.rejected.render("prisclient_rejected_total", &mut out);
        self.transport_errors.render("prisclient_transport_errors_total", &mut out);
        self.handshake_failures.render("prisclient_handshake_failures_total", &mut out);
        self.reconnect_attempts.render("prisclient_reconnect_attempts_total", &mut out);
        self.connected.render("prisclient_connected", &mut out);
        out
    }
}

/// Records every event into [`SessionMetrics`] before passing it on.
pub struct MeteredObserver {
    inner: Arc<dyn Observer>,
    metrics: Arc<SessionMetrics>,
}

impl MeteredObserver {
    pub fn new(inner: Arc<dyn Observer>, metrics: Arc<SessionMetrics>) -> Self {
        Self { inner, metrics }
    }

    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl Observer for MeteredObserver {
    fn report(&self, event: &SessionEvent) {
        self.metrics.record(event);
        self.inner.report(event);
    }
}
