//! In-process counters for job outcomes and protocol actions

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics handle shared by the controller and the HTTP ingress
#[derive(Debug, Default)]
pub struct Metrics {
    events_received: AtomicU64,
    jobs_accepted: AtomicU64,
    jobs_rejected: AtomicU64,
    jobs_delivered: AtomicU64,
    payment_requests: AtomicU64,
    execution_failures: AtomicU64,
    action_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "events_received", "Metric incremented");
    }

    pub fn job_accepted(&self) {
        self.jobs_accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_accepted", "Metric incremented");
    }

    pub fn job_rejected(&self) {
        self.jobs_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_rejected", "Metric incremented");
    }

    pub fn job_delivered(&self) {
        self.jobs_delivered.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_delivered", "Metric incremented");
    }

    pub fn payment_requested(&self) {
        self.payment_requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "payment_requests", "Metric incremented");
    }

    pub fn execution_failed(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "execution_failures", "Metric incremented");
    }

    pub fn action_failed(&self) {
        self.action_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "action_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            jobs_accepted: self.jobs_accepted.load(Ordering::Relaxed),
            jobs_rejected: self.jobs_rejected.load(Ordering::Relaxed),
            jobs_delivered: self.jobs_delivered.load(Ordering::Relaxed),
            payment_requests: self.payment_requests.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            action_failures: self.action_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub jobs_accepted: u64,
    pub jobs_rejected: u64,
    pub jobs_delivered: u64,
    pub payment_requests: u64,
    pub execution_failures: u64,
    pub action_failures: u64,
}
