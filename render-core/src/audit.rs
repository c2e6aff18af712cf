/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Write-only structured event sink (spec §2's "Audit/Metrics Sink").
//!
//! Every priority change, assignment, preemption, failure and checkpoint
//! goes through an [`AuditSink`]. The sink is write-only by design — this
//! crate never reads its own audit trail back to make a decision, so an
//! implementation is free to batch, drop to disk, or forward to a metrics
//! backend without affecting scheduling behavior.

use std::collections::HashMap;

use tracing::info;

use crate::model::{ClientId, JobId, NodeId};

/// Category of an [`AuditEvent`], matching the event list in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditEventType {
    PriorityChanged,
    JobSubmitted,
    JobAssigned,
    JobPreempted,
    JobResumed,
    JobCompleted,
    JobFailed,
    JobCancelled,
    NodeFailure,
    JobUpdated,
    ClientAdded,
    ClientRemoved,
    NodeAdded,
    NodeRemoved,
    ResourceAllocationScaled,
    EnergyModeChanged,
    SchedulingCycleCompleted,
}

/// A single structured audit record.
///
/// `extra` carries event-specific structured fields (e.g. `"reason"` on a
/// `JobFailed` event, `"previous_progress"` on a `JobUpdated` event) —
/// mirrors the Python `AuditLogger.log_event(event_type, message, **kwargs)`
/// shape, but typed instead of `**kwargs`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub message: String,
    pub client_id: Option<ClientId>,
    pub node_id: Option<NodeId>,
    pub job_id: Option<JobId>,
    pub extra: HashMap<String, String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, message: impl Into<String>) -> Self {
        Self {
            event_type,
            message: message.into(),
            client_id: None,
            node_id: None,
            job_id: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Receiver for audit events. Implementations may batch internally; the
/// scheduler never relies on `record` returning before the cycle ends.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Forwards every event to `tracing` at `info` level and keeps nothing.
/// The sink any embedding host reaches for first — structured fields are
/// already in a shape a log aggregator can index.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            event_type = ?event.event_type,
            client_id = ?event.client_id,
            node_id = ?event.node_id,
            job_id = ?event.job_id,
            extra = ?event.extra,
            "{}",
            event.message
        );
    }
}

/// Retains every event it receives, in order. Used by tests that assert on
/// the audit trail rather than only on final state.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit sink mutex poisoned").clone()
    }

    pub fn count(&self, event_type: AuditEventType) -> usize {
        self.events()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().expect("audit sink mutex poisoned").push(event);
    }
}

/// Discards every event. Useful for harness runs that only care about the
/// resulting `Plan`s, and for benchmarks that want to exclude audit-sink
/// overhead.
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}
