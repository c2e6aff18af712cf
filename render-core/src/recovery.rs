/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Failure Recovery Manager (spec §4.6): the atomic response to a node
//! reporting a fault mid-job.
//!
//! One public operation: [`FailureRecoveryManager::handle_node_failure`].
//! Its steps run in a fixed order and never partially apply — the method
//! takes `&mut` references to both the registry and the graph, so nothing
//! else observes the farm between steps.

use tracing::warn;

use crate::audit::{AuditEvent, AuditEventType, AuditSink};
use crate::error::CoreError;
use crate::graph::JobGraph;
use crate::model::{CheckpointRecord, JobStatus, NodeId};
use crate::registry::NodeRegistry;

#[derive(Debug, Clone, Copy)]
pub struct FailureRecoveryManager {
    pub max_job_error_count: u32,
}

impl FailureRecoveryManager {
    pub fn new(max_job_error_count: u32) -> Self {
        Self { max_job_error_count }
    }

    /// Responds to `node_id` reporting `error` (spec §4.6):
    /// 1. if the node was running a job, requeue it with `error_count + 1`;
    ///    progress is preserved exactly only if the job `supports_checkpoint`
    ///    and has a recorded checkpoint — otherwise it rewinds to 0 (spec §9,
    ///    "Preserved-progress-after-failure": the spec's own recommendation,
    ///    not the source's optimistic-resumption behavior);
    /// 2. mark the node `Error` with no current job;
    /// 3. if the job's error count has now reached [`Self::max_job_error_count`],
    ///    fail it outright instead of requeuing it.
    ///
    /// A node with no job running (already idle, or already in `Error`) is
    /// still marked `Error` — a bare hardware fault report with nothing
    /// scheduled on it is not itself an error condition for this method.
    pub fn handle_node_failure(
        &self,
        node_id: &NodeId,
        error: impl Into<String>,
        registry: &mut NodeRegistry,
        graph: &mut JobGraph,
        audit: &dyn AuditSink,
    ) -> Result<(), CoreError> {
        let error = error.into();
        let current_job_id = registry.get(node_id).ok_or_else(|| CoreError::UnknownNode(node_id.clone()))?.current_job_id.clone();

        if let Some(job_id) = &current_job_id {
            let job = graph.get(job_id).ok_or_else(|| CoreError::UnknownJob(job_id.clone()))?;
            let new_error_count = job.error_count + 1;
            let resumable_checkpoint = job.supports_checkpoint.then(|| job.last_checkpoint().cloned()).flatten();

            if new_error_count >= self.max_job_error_count {
                graph.set_status(job_id, JobStatus::Failed, None)?;
                warn!(job = %job_id, node = %node_id, error_count = new_error_count, "job failed: maximum error count reached");
                audit.record(
                    AuditEvent::new(AuditEventType::JobFailed, format!("exceeded maximum error count ({new_error_count})"))
                        .with_job(job_id.clone())
                        .with_node(node_id.clone())
                        .with_extra("error_count", new_error_count.to_string()),
                );
            } else {
                let resume_progress = resumable_checkpoint.as_ref().map(|c| c.progress).unwrap_or(0.0);
                let checkpoint = (resume_progress > 0.0).then(|| CheckpointRecord {
                    job_id: job_id.clone(),
                    node_id: node_id.clone(),
                    checkpoint_time: resumable_checkpoint.as_ref().map(|c| c.checkpoint_time).unwrap_or(0.0),
                    progress: resume_progress,
                    error_count: new_error_count,
                });
                if checkpoint.is_none() {
                    graph.get_mut(job_id).expect("looked up above").progress = 0.0;
                }
                graph.set_status(job_id, JobStatus::Queued, checkpoint)?;
                let requeued = graph.get_mut(job_id).expect("just set its status");
                requeued.error_count = new_error_count;
                warn!(
                    job = %job_id, node = %node_id, error_count = new_error_count,
                    progress = requeued.progress, "job requeued after node failure"
                );
                audit.record(
                    AuditEvent::new(AuditEventType::JobUpdated, format!("requeued after node failure (error count {new_error_count})"))
                        .with_job(job_id.clone())
                        .with_node(node_id.clone())
                        .with_extra("error_count", new_error_count.to_string()),
                );
            }
        }

        registry.mark_error(node_id, error.clone())?;
        audit.record(
            AuditEvent::new(AuditEventType::NodeFailure, error)
                .with_node(node_id.clone()),
        );

        Ok(())
    }
}
