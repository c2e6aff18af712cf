/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Job Graph (spec §4.2): owns every [`Job`] and its dependency edges,
//! exclusively.
//!
//! Dependencies are stored as adjacency lists keyed by id (each job already
//! carries its own `dependencies: Vec<JobId>`) rather than parent pointers
//! between `Node` and `Job` — this crate never lets a `Job` or `Node`
//! reference another in-memory value directly, only by stable id (spec §3,
//! "Ownership summary"). Cycles are rejected at intake with an incremental
//! DFS from the new job across the edges already present, per spec §9.

use std::collections::{BTreeMap, HashSet};

use tracing::{info, warn};

use crate::error::CoreError;
use crate::model::{CheckpointRecord, Job, JobId, JobStatus};

#[derive(Debug, Default)]
pub struct JobGraph {
    jobs: BTreeMap<JobId, Job>,
}

impl JobGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `job` into the graph. If `job.dependencies` would introduce a
    /// cycle, the job is still stored — with `status = Failed` — and
    /// [`CoreError::CircularDependency`] is returned so the caller can audit
    /// the rejection; a cyclic job is never silently dropped (spec §3:
    /// "a job with a cyclic dependency is FAILED on intake, never
    /// scheduled").
    pub fn submit(&mut self, mut job: Job) -> Result<(), CoreError> {
        if self.creates_cycle(&job.id, &job.dependencies) {
            warn!(job = %job.id, "circular dependency detected on intake");
            job.status = JobStatus::Failed;
            let id = job.id.clone();
            self.jobs.insert(id.clone(), job);
            return Err(CoreError::CircularDependency { job: id });
        }

        job.status = JobStatus::Queued;
        info!(job = %job.id, client = %job.client_id, "job submitted");
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    pub fn get(&self, job_id: &JobId) -> Option<&Job> {
        self.jobs.get(job_id)
    }

    pub fn get_mut(&mut self, job_id: &JobId) -> Option<&mut Job> {
        self.jobs.get_mut(job_id)
    }

    /// Clamps `pct` to `[0, 100]`. Returns `Some(node_id)` if this update
    /// pushed the job to 100% and therefore to `Completed` — the caller
    /// (`host::Scheduler`) is responsible for releasing that node in the
    /// registry, since the graph does not own nodes.
    pub fn update_progress(&mut self, job_id: &JobId, pct: f64) -> Result<Option<crate::model::NodeId>, CoreError> {
        let job = self.require_mut(job_id)?;
        job.progress = Job::clamp_progress(pct);

        if job.progress >= 100.0 && job.status != JobStatus::Completed {
            job.status = JobStatus::Completed;
            let released = job.assigned_node_id.take();
            info!(job = %job_id, node = ?released, "job completed");
            return Ok(released);
        }
        Ok(None)
    }

    /// Records a checkpoint at the job's *current* progress and error
    /// count. Low-level storage only — [`crate::progress::ProgressTracker`]
    /// is the public entry point that enforces monotonicity and the
    /// `supports_checkpoint` no-op rule.
    pub fn mark_checkpoint(&mut self, job_id: &JobId, node_id: crate::model::NodeId, checkpoint_time: f64) -> Result<(), CoreError> {
        let job = self.require_mut(job_id)?;
        let record = CheckpointRecord {
            job_id: job_id.clone(),
            node_id,
            checkpoint_time,
            progress: job.progress,
            error_count: job.error_count,
        };
        job.last_checkpoint_time = Some(checkpoint_time);
        job.checkpoints.push(record);
        Ok(())
    }

    /// Transitions `job_id` to `new_status`. A `Running -> Queued`
    /// transition must carry `checkpoint` unless the job's progress is
    /// already `0.0` — callers (the scheduler's preemption path, the
    /// failure recovery manager) are expected to uphold this; violating it
    /// indicates a caller bug, not a runtime condition a host can trigger,
    /// so it is a `debug_assert` rather than an error variant.
    pub fn set_status(
        &mut self,
        job_id: &JobId,
        new_status: JobStatus,
        checkpoint: Option<CheckpointRecord>,
    ) -> Result<(), CoreError> {
        let job = self.require_mut(job_id)?;

        debug_assert!(
            !(job.status == JobStatus::Running
                && new_status == JobStatus::Queued
                && checkpoint.is_none()
                && job.progress != 0.0),
            "RUNNING -> QUEUED without a checkpoint requires progress == 0"
        );

        if let Some(record) = checkpoint {
            job.progress = record.progress;
            job.error_count = record.error_count;
            job.last_checkpoint_time = Some(record.checkpoint_time);
            job.checkpoints.push(record);
        }

        if new_status != JobStatus::Running {
            job.assigned_node_id = None;
        }

        job.status = new_status;
        Ok(())
    }

    /// Transitions `job_id` to `Running` on `node_id`. Used by the
    /// scheduler's assignment and preemption-resolution steps; a plain
    /// `set_status(Running, ...)` call would not know which node to
    /// populate `assigned_node_id` with.
    pub fn assign_to_node(&mut self, job_id: &JobId, node_id: crate::model::NodeId) -> Result<(), CoreError> {
        let job = self.require_mut(job_id)?;
        job.status = JobStatus::Running;
        job.assigned_node_id = Some(node_id);
        Ok(())
    }

    /// `true` iff every dependency of `job_id` has reached `Completed`.
    /// A dependency id with no corresponding job is treated as unsatisfied
    /// rather than an error — a host may submit jobs whose dependencies
    /// have not arrived yet.
    pub fn dependencies_satisfied(&self, job_id: &JobId) -> bool {
        let Some(job) = self.jobs.get(job_id) else {
            return false;
        };
        job.dependencies
            .iter()
            .all(|dep| matches!(self.jobs.get(dep), Some(d) if d.status == JobStatus::Completed))
    }

    /// Every `Queued`/`Paused` job whose dependencies are satisfied, in
    /// ascending `JobId` order. All eligible jobs here have no remaining
    /// unmet dependency, so there is no further partial order to respect —
    /// the ascending-id tie-break keeps the result deterministic cycle over
    /// cycle.
    pub fn topological_ready_set(&self) -> Vec<JobId> {
        self.jobs
            .values()
            .filter(|j| matches!(j.status, JobStatus::Queued | JobStatus::Paused))
            .filter(|j| self.dependencies_satisfied(&j.id))
            .map(|j| j.id.clone())
            .collect()
    }

    /// All jobs, in deterministic (ascending id) order.
    pub fn snapshot(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// `true` iff adding `new_deps` as the dependency list for `new_job`
    /// would create a cycle, detected by DFS across the edges already
    /// stored plus the proposed ones.
    fn creates_cycle(&self, new_job: &JobId, new_deps: &[JobId]) -> bool {
        let mut visited = HashSet::new();
        let mut stack = new_deps.to_vec();

        while let Some(current) = stack.pop() {
            if &current == new_job {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(job) = self.jobs.get(&current) {
                stack.extend(job.dependencies.iter().cloned());
            }
        }
        false
    }

    fn require_mut(&mut self, job_id: &JobId) -> Result<&mut Job, CoreError> {
        self.jobs
            .get_mut(job_id)
            .ok_or_else(|| CoreError::UnknownJob(job_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobPriority, JobRequirements};

    fn job(id: &str, deps: &[&str]) -> Job {
        let mut j = Job::new(
            id,
            "c1",
            JobPriority::Medium,
            0.0,
            8.0,
            1.0,
            JobRequirements::default(),
        );
        j.dependencies = deps.iter().map(|d| JobId::from(*d)).collect();
        j
    }

    #[test]
    fn submit_accepts_acyclic_chain() {
        let mut g = JobGraph::new();
        g.submit(job("a", &[])).unwrap();
        g.submit(job("b", &["a"])).unwrap();
        assert_eq!(g.get(&"b".into()).unwrap().status, JobStatus::Queued);
    }

    #[test]
    fn submit_rejects_self_cycle() {
        let mut g = JobGraph::new();
        let err = g.submit(job("a", &["a"])).unwrap_err();
        assert!(matches!(err, CoreError::CircularDependency { .. }));
        assert_eq!(g.get(&"a".into()).unwrap().status, JobStatus::Failed);
    }

    #[test]
    fn submit_rejects_indirect_cycle() {
        let mut g = JobGraph::new();
        g.submit(job("a", &["b"])).unwrap();
        let err = g.submit(job("b", &["a"])).unwrap_err();
        assert!(matches!(err, CoreError::CircularDependency { .. }));
    }

    #[test]
    fn dependencies_satisfied_requires_all_deps_completed() {
        let mut g = JobGraph::new();
        g.submit(job("a", &[])).unwrap();
        g.submit(job("b", &["a"])).unwrap();
        assert!(!g.dependencies_satisfied(&"b".into()));

        g.get_mut(&"a".into()).unwrap().status = JobStatus::Completed;
        assert!(g.dependencies_satisfied(&"b".into()));
    }

    #[test]
    fn update_progress_clamps_and_completes_at_100() {
        let mut g = JobGraph::new();
        g.submit(job("a", &[])).unwrap();
        g.get_mut(&"a".into()).unwrap().assigned_node_id = Some("n1".into());
        g.get_mut(&"a".into()).unwrap().status = JobStatus::Running;

        let released = g.update_progress(&"a".into(), 150.0).unwrap();
        assert_eq!(released, Some("n1".into()));
        assert_eq!(g.get(&"a".into()).unwrap().status, JobStatus::Completed);
        assert_eq!(g.get(&"a".into()).unwrap().progress, 100.0);
    }

    #[test]
    fn topological_ready_set_excludes_unsatisfied_dependencies() {
        let mut g = JobGraph::new();
        g.submit(job("a", &[])).unwrap();
        g.submit(job("b", &["a"])).unwrap();
        assert_eq!(g.topological_ready_set(), vec![JobId::from("a")]);

        g.get_mut(&"a".into()).unwrap().status = JobStatus::Completed;
        assert_eq!(g.topological_ready_set(), vec![JobId::from("b")]);
    }

    #[test]
    fn set_status_applies_checkpoint_and_rewinds_progress() {
        let mut g = JobGraph::new();
        g.submit(job("a", &[])).unwrap();
        g.get_mut(&"a".into()).unwrap().status = JobStatus::Running;
        g.get_mut(&"a".into()).unwrap().progress = 70.0;

        let checkpoint = CheckpointRecord {
            job_id: "a".into(),
            node_id: "n1".into(),
            checkpoint_time: 5.0,
            progress: 50.0,
            error_count: 1,
        };
        g.set_status(&"a".into(), JobStatus::Queued, Some(checkpoint)).unwrap();

        let a = g.get(&"a".into()).unwrap();
        assert_eq!(a.status, JobStatus::Queued);
        assert_eq!(a.progress, 50.0);
        assert_eq!(a.error_count, 1);
        assert!(a.assigned_node_id.is_none());
    }

    #[test]
    fn unknown_job_operations_return_unknown_job() {
        let mut g = JobGraph::new();
        assert!(matches!(
            g.update_progress(&"ghost".into(), 10.0),
            Err(CoreError::UnknownJob(_))
        ));
    }
}
