/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Progress & Checkpoint Tracker (spec §4.7): the contract-enforcing entry
//! point over [`JobGraph`]'s owned checkpoint fields.
//!
//! [`JobGraph::update_progress`] and [`JobGraph::mark_checkpoint`] are
//! low-level storage operations with no opinion on monotonicity; this
//! module is where spec §3(b) — "progress never decreases except on
//! recovery, and then only down to the last checkpoint's progress" — is
//! actually enforced for host-driven progress reports.

use tracing::debug;

use crate::error::CoreError;
use crate::graph::JobGraph;
use crate::model::{JobId, NodeId};

#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressTracker;

impl ProgressTracker {
    pub fn new() -> Self {
        Self
    }

    /// Applies a host-reported progress update for `job_id`.
    ///
    /// Rejects `pct` below the job's last checkpoint with
    /// [`CoreError::InvalidProgress`] — a progress report can only move a
    /// job forward, or repeat the same value. Returns `Some(node_id)` if
    /// this update completed the job, same as [`JobGraph::update_progress`].
    pub fn report_progress(&self, graph: &mut JobGraph, job_id: &JobId, pct: f64) -> Result<Option<NodeId>, CoreError> {
        let job = graph.get(job_id).ok_or_else(|| CoreError::UnknownJob(job_id.clone()))?;
        if let Some(checkpoint) = job.last_checkpoint() {
            if pct < checkpoint.progress {
                return Err(CoreError::InvalidProgress {
                    job: job_id.clone(),
                    attempted: pct,
                    checkpoint: checkpoint.progress,
                });
            }
        }
        graph.update_progress(job_id, pct)
    }

    /// Records a checkpoint for `job_id` on `node_id` at `checkpoint_time`,
    /// unless the job doesn't support checkpointing — in which case this is
    /// a silent no-op (spec §4.7: "checkpointing a job with
    /// `supports_checkpoint = false` has no effect").
    pub fn checkpoint(&self, graph: &mut JobGraph, job_id: &JobId, node_id: NodeId, checkpoint_time: f64) -> Result<(), CoreError> {
        let job = graph.get(job_id).ok_or_else(|| CoreError::UnknownJob(job_id.clone()))?;
        if !job.supports_checkpoint {
            debug!(job = %job_id, "checkpoint requested on a job that does not support checkpointing, ignored");
            return Ok(());
        }
        graph.mark_checkpoint(job_id, node_id, checkpoint_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Job, JobPriority, JobRequirements, JobStatus};

    fn job_graph_with_checkpointable_job() -> JobGraph {
        let mut graph = JobGraph::new();
        let mut job = Job::new("j1", "c1", JobPriority::Medium, 0.0, 10.0, 2.0, JobRequirements::default());
        job.supports_checkpoint = true;
        graph.submit(job).unwrap();
        graph.get_mut(&"j1".into()).unwrap().status = JobStatus::Running;
        graph
    }

    #[test]
    fn report_progress_accepts_forward_movement() {
        let mut graph = job_graph_with_checkpointable_job();
        let tracker = ProgressTracker::new();
        tracker.report_progress(&mut graph, &"j1".into(), 40.0).unwrap();
        assert_eq!(graph.get(&"j1".into()).unwrap().progress, 40.0);
    }

    #[test]
    fn report_progress_rejects_regression_below_last_checkpoint() {
        let mut graph = job_graph_with_checkpointable_job();
        let tracker = ProgressTracker::new();
        tracker.report_progress(&mut graph, &"j1".into(), 60.0).unwrap();
        tracker.checkpoint(&mut graph, &"j1".into(), "n1".into(), 3.0).unwrap();

        let err = tracker.report_progress(&mut graph, &"j1".into(), 30.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidProgress { .. }));
        assert_eq!(graph.get(&"j1".into()).unwrap().progress, 60.0, "rejected update leaves progress untouched");
    }

    #[test]
    fn checkpoint_on_non_checkpointable_job_is_a_no_op() {
        let mut graph = JobGraph::new();
        graph
            .submit(Job::new("j1", "c1", JobPriority::Medium, 0.0, 10.0, 2.0, JobRequirements::default()))
            .unwrap();
        let tracker = ProgressTracker::new();
        tracker.checkpoint(&mut graph, &"j1".into(), "n1".into(), 1.0).unwrap();
        assert!(graph.get(&"j1".into()).unwrap().last_checkpoint().is_none());
    }

    #[test]
    fn checkpoint_records_a_new_entry_for_checkpointable_job() {
        let mut graph = job_graph_with_checkpointable_job();
        let tracker = ProgressTracker::new();
        tracker.report_progress(&mut graph, &"j1".into(), 25.0).unwrap();
        tracker.checkpoint(&mut graph, &"j1".into(), "n1".into(), 1.5).unwrap();
        let checkpoint = graph.get(&"j1".into()).unwrap().last_checkpoint().unwrap();
        assert_eq!(checkpoint.progress, 25.0);
        assert_eq!(checkpoint.checkpoint_time, 1.5);
    }
}
