/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::collections::HashSet;

use super::{ClientId, JobId, NodeId};

/// Lifecycle status of a [`Job`].
///
/// ```text
/// PENDING ──► QUEUED ──► RUNNING ──► COMPLETED
///               ▲           │
///               │           ├──node fault──► QUEUED (error_count++)
///               │           │                 └──error_count≥MAX──► FAILED
///               │           └──preempt──► PAUSED ──► QUEUED
///               └───────────────────────────────┘
/// ```
/// Any non-terminal status may transition to `Cancelled` on administrative
/// cancellation. `Failed`, `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Scheduling priority. `Critical > High > Medium > Low`; the derived `Ord`
/// follows declaration order, so `Critical` sorts least — callers that want
/// "highest priority first" must sort ascending, not descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum JobPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl JobPriority {
    /// One step towards `Critical`. Saturates — elevating `Critical` is a
    /// no-op, matching spec §4.5 step 1 ("if status ≠ CRITICAL, elevate").
    pub fn elevate(self) -> Self {
        match self {
            JobPriority::Critical => JobPriority::Critical,
            JobPriority::High => JobPriority::Critical,
            JobPriority::Medium => JobPriority::High,
            JobPriority::Low => JobPriority::Medium,
        }
    }

    /// One step away from `Critical`. Saturates at `Low`.
    pub fn demote(self) -> Self {
        match self {
            JobPriority::Critical => JobPriority::High,
            JobPriority::High => JobPriority::Medium,
            JobPriority::Medium => JobPriority::Low,
            JobPriority::Low => JobPriority::Low,
        }
    }

    /// Number of elevation steps between `self` and `other`, positive when
    /// `other` outranks `self`. Used by the preemption gap check (spec
    /// §4.5 step 6: "gap ≥ 2 levels, or any CRITICAL").
    pub fn gap_above(self, other: JobPriority) -> i32 {
        self.rank() as i32 - other.rank() as i32
    }

    fn rank(self) -> u8 {
        match self {
            JobPriority::Critical => 0,
            JobPriority::High => 1,
            JobPriority::Medium => 2,
            JobPriority::Low => 3,
        }
    }
}

/// Capability requirements a [`Job`] imposes on the node it runs on.
///
/// `scene_complexity` is a plain opaque score (the original Python fixtures
/// pass plain integers like `scene_complexity=8`); it feeds
/// [`crate::energy`]'s cost estimate but is not itself part of capability
/// matching. `specialized_for` is the capability-matching set — a job
/// requires a subset of whatever tags the candidate node advertises.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JobRequirements {
    pub requires_gpu: bool,
    pub memory_gb: u64,
    pub cpu_cores: u32,
    pub scene_complexity: u32,
    pub specialized_for: HashSet<String>,
}

/// A checkpoint snapshot recorded on a `RUNNING -> QUEUED` transition,
/// whether from an administrative pause or a node failure (spec §3.4).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CheckpointRecord {
    pub job_id: JobId,
    pub node_id: NodeId,
    pub checkpoint_time: f64,
    pub progress: f64,
    pub error_count: u32,
}

/// A render job submitted by a [`super::Client`].
///
/// Invariants (spec §3):
/// (a) `status == Running` ⇔ `assigned_node_id` is `Some` and that node is
///     `Busy` with this job — enforced jointly by [`crate::registry`] and
///     [`crate::graph`], never by this struct alone.
/// (b) `progress` never decreases except on recovery, and then only down
///     to the last checkpoint's progress (or 0 with no checkpoint).
/// (c) a job with a cyclic dependency is `Failed` on intake, never
///     scheduled — enforced by [`crate::graph::JobGraph::submit`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Job {
    pub id: JobId,
    pub client_id: ClientId,
    pub status: JobStatus,
    pub priority: JobPriority,
    pub submission_time: f64,
    pub deadline: f64,
    pub estimated_duration_hours: f64,
    pub progress: f64,
    pub requirements: JobRequirements,
    pub dependencies: Vec<JobId>,
    pub assigned_node_id: Option<NodeId>,
    pub error_count: u32,

    pub can_be_preempted: bool,
    pub supports_checkpoint: bool,
    pub supports_progressive_output: bool,
    pub energy_intensive: bool,

    pub last_checkpoint_time: Option<f64>,
    pub output_path: Option<String>,

    /// Owned checkpoint history; survives as long as the job does (spec
    /// §3.4: "Checkpoint records are owned by the Job").
    pub checkpoints: Vec<CheckpointRecord>,
}

impl Job {
    pub fn new(
        id: impl Into<JobId>,
        client_id: impl Into<ClientId>,
        priority: JobPriority,
        submission_time: f64,
        deadline: f64,
        estimated_duration_hours: f64,
        requirements: JobRequirements,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            status: JobStatus::Pending,
            priority,
            submission_time,
            deadline,
            estimated_duration_hours,
            progress: 0.0,
            requirements,
            dependencies: Vec::new(),
            assigned_node_id: None,
            error_count: 0,
            can_be_preempted: true,
            supports_checkpoint: false,
            supports_progressive_output: false,
            energy_intensive: false,
            last_checkpoint_time: None,
            output_path: None,
            checkpoints: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Clamps to `[0, 100]`; callers decide whether a resulting `100.0`
    /// should also drive the `Completed` transition (spec §4.2:
    /// `update_progress` does this as part of its own contract, not this
    /// getter).
    pub fn clamp_progress(pct: f64) -> f64 {
        pct.clamp(0.0, 100.0)
    }

    /// Most recently recorded checkpoint, if any.
    pub fn last_checkpoint(&self) -> Option<&CheckpointRecord> {
        self.checkpoints.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            "j1",
            "c1",
            JobPriority::Medium,
            0.0,
            8.0,
            1.0,
            JobRequirements::default(),
        )
    }

    #[test]
    fn priority_ordering_places_critical_first() {
        let mut ps = vec![JobPriority::Low, JobPriority::Critical, JobPriority::High];
        ps.sort();
        assert_eq!(ps, vec![JobPriority::Critical, JobPriority::High, JobPriority::Low]);
    }

    #[test]
    fn elevate_saturates_at_critical() {
        assert_eq!(JobPriority::High.elevate(), JobPriority::Critical);
        assert_eq!(JobPriority::Critical.elevate(), JobPriority::Critical);
    }

    #[test]
    fn demote_saturates_at_low() {
        assert_eq!(JobPriority::Low.demote(), JobPriority::Low);
        assert_eq!(JobPriority::High.demote(), JobPriority::Medium);
    }

    #[test]
    fn gap_above_measures_elevation_steps() {
        assert_eq!(JobPriority::Low.gap_above(JobPriority::Critical), 3);
        assert_eq!(JobPriority::Medium.gap_above(JobPriority::High), 1);
        assert_eq!(JobPriority::Medium.gap_above(JobPriority::Low), -1);
    }

    #[test]
    fn new_job_starts_pending_with_zero_progress() {
        let j = job();
        assert_eq!(j.status, JobStatus::Pending);
        assert_eq!(j.progress, 0.0);
        assert!(j.assigned_node_id.is_none());
        assert!(!j.is_terminal());
    }

    #[test]
    fn terminal_statuses_are_recognized() {
        let mut j = job();
        j.status = JobStatus::Failed;
        assert!(j.is_terminal());
        j.status = JobStatus::Completed;
        assert!(j.is_terminal());
        j.status = JobStatus::Cancelled;
        assert!(j.is_terminal());
        j.status = JobStatus::Paused;
        assert!(!j.is_terminal());
    }

    #[test]
    fn clamp_progress_bounds_to_0_100() {
        assert_eq!(Job::clamp_progress(-5.0), 0.0);
        assert_eq!(Job::clamp_progress(150.0), 100.0);
        assert_eq!(Job::clamp_progress(42.0), 42.0);
    }

    #[test]
    fn last_checkpoint_returns_most_recent() {
        let mut j = job();
        j.checkpoints.push(CheckpointRecord {
            job_id: j.id.clone(),
            node_id: "n1".into(),
            checkpoint_time: 1.0,
            progress: 20.0,
            error_count: 0,
        });
        j.checkpoints.push(CheckpointRecord {
            job_id: j.id.clone(),
            node_id: "n1".into(),
            checkpoint_time: 2.0,
            progress: 45.0,
            error_count: 1,
        });
        assert_eq!(j.last_checkpoint().unwrap().progress, 45.0);
    }
}
