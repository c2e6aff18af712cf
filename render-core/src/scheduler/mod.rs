/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deadline Scheduler (spec §4.5): the central decision engine.
//!
//! One public operation: [`DeadlineScheduler::run_cycle`]. It never mutates
//! its inputs from behind the scenes and never talks to the clock or audit
//! sink except through what is passed in — two calls with identical
//! `(now, registry, graph, allocations)` snapshots produce identical `Plan`s
//! (spec §8's determinism property).
//!
//! The seven steps below are numbered to match spec §4.5 exactly:
//! 1. priority update (slack-based elevation/demotion, hard deadline miss)
//! 2. eligibility filter (capability match, dependencies satisfied)
//! 3. quota overlay (per-client running count vs. this cycle's allocation)
//! 4. ordering (priority ascending by rank, deadline ascending, submission
//!    time ascending)
//! 5. assignment (energy-optimizer-ranked idle candidates)
//! 6. preemption (gap ≥ 2 levels or any `Critical`, checkpoint capture)
//! 7. commit (one audit event per action)
//!
//! Steps 1 and 7 mutate `graph`/`registry` directly as they go rather than
//! through a staged commit buffer: `run_cycle` takes `&mut` references, so
//! nothing else can observe the farm mid-cycle regardless of how the
//! mutations are sequenced internally.

pub mod error;

pub use error::SkipReason;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::audit::{AuditEvent, AuditEventType, AuditSink};
use crate::energy::EnergyOptimizer;
use crate::graph::JobGraph;
use crate::model::{ClientId, JobId, JobPriority, JobStatus, NodeId};
use crate::partitioner::ResourceAllocation;
use crate::registry::NodeRegistry;

/// A single scheduling decision produced by one `run_cycle` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Assign { job: JobId, node: NodeId },
    Preempt { job: JobId, node: NodeId },
    Resume { job: JobId, node: NodeId },
    Skip { job: JobId, reason: SkipReason },
}

/// The ordered list of decisions from one cycle. Discarded at the end of
/// the cycle by the host — nothing in this crate keeps a `Plan` around
/// (spec §3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Tunables the scheduler needs at construction time. Deliberately not
/// [`crate::config::SchedulerConfig`] itself — the scheduler only needs a
/// slice of the full host configuration, and a fresh `Scheduler` in a test
/// should be constructible without pulling in YAML loading (spec §9:
/// "each component receives exactly the configuration slice it needs").
#[derive(Debug, Clone, Copy)]
pub struct SchedulerTunables {
    pub deadline_safety_margin_hours: f64,
    pub enable_preemption: bool,
}

impl Default for SchedulerTunables {
    fn default() -> Self {
        Self {
            deadline_safety_margin_hours: 2.0,
            enable_preemption: true,
        }
    }
}

#[derive(Debug)]
pub struct DeadlineScheduler {
    tunables: SchedulerTunables,
}

impl DeadlineScheduler {
    pub fn new(tunables: SchedulerTunables) -> Self {
        Self { tunables }
    }

    /// Runs one scheduling cycle at time `now` (hours since the clock's
    /// epoch) and returns the resulting [`Plan`].
    ///
    /// `allocations` is this cycle's per-client node grant, already computed
    /// by [`crate::partitioner::ResourcePartitioner::allocate`] — the
    /// scheduler does not recompute it.
    pub fn run_cycle(
        &self,
        now: f64,
        registry: &mut NodeRegistry,
        graph: &mut JobGraph,
        allocations: &BTreeMap<ClientId, ResourceAllocation>,
        energy: &EnergyOptimizer,
        audit: &dyn AuditSink,
    ) -> Plan {
        self.update_priorities(now, graph, audit);

        let ready = graph.topological_ready_set();
        let mut running_by_client: BTreeMap<ClientId, usize> = BTreeMap::new();
        for job in graph.snapshot() {
            if job.status == JobStatus::Running {
                *running_by_client.entry(job.client_id.clone()).or_insert(0) += 1;
            }
        }

        let mut ordered = ready;
        ordered.sort_by(|a, b| {
            let ja = graph.get(a).expect("ready set only contains known jobs");
            let jb = graph.get(b).expect("ready set only contains known jobs");
            ja.priority
                .cmp(&jb.priority)
                .then_with(|| ja.deadline.partial_cmp(&jb.deadline).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| ja.submission_time.partial_cmp(&jb.submission_time).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| ja.id.cmp(&jb.id))
        });

        let mut actions = Vec::with_capacity(ordered.len());
        for job_id in ordered {
            let action = self.schedule_one(&job_id, now, registry, graph, allocations, energy, &mut running_by_client, audit);
            actions.push(action);
        }

        Plan { actions }
    }

    /// Step 1: re-rank every non-terminal job's priority from how close it
    /// is to missing its deadline, and fail outright any job whose deadline
    /// has already passed with no elevation left to give it.
    fn update_priorities(&self, now: f64, graph: &mut JobGraph, audit: &dyn AuditSink) {
        let ids: Vec<JobId> = graph
            .snapshot()
            .filter(|j| !j.is_terminal())
            .map(|j| j.id.clone())
            .collect();

        for id in ids {
            let (deadline, priority, progress, duration, status) = {
                let job = graph.get(&id).expect("id collected from snapshot above");
                (job.deadline, job.priority, job.progress, job.estimated_duration_hours, job.status)
            };

            if status == JobStatus::Running && now > deadline && priority == JobPriority::Critical {
                let _ = graph.set_status(&id, JobStatus::Failed, None);
                audit.record(
                    AuditEvent::new(AuditEventType::JobFailed, "missed deadline with no further elevation available")
                        .with_job(id.clone()),
                );
                continue;
            }

            let remaining = duration * (1.0 - progress / 100.0).max(0.0);
            let slack = deadline - (now + remaining + self.tunables.deadline_safety_margin_hours);

            let new_priority = if slack <= 0.0 && priority != JobPriority::Critical {
                Some(priority.elevate())
            } else if slack > self.tunables.deadline_safety_margin_hours * 2.0 && progress >= 75.0 {
                let demoted = priority.demote();
                (demoted != priority).then_some(demoted)
            } else {
                None
            };

            if let Some(new_priority) = new_priority {
                debug!(job = %id, from = ?priority, to = ?new_priority, slack = slack, "priority changed");
                graph.get_mut(&id).expect("id collected from snapshot above").priority = new_priority;
                audit.record(
                    AuditEvent::new(AuditEventType::PriorityChanged, format!("{priority:?} -> {new_priority:?}"))
                        .with_job(id.clone())
                        .with_extra("slack_hours", format!("{slack:.2}")),
                );
            }
        }
    }

    /// Steps 2 through 6 for a single ready job: filter, quota check,
    /// assignment, and finally preemption if nothing else frees a node.
    #[allow(clippy::too_many_arguments)]
    fn schedule_one(
        &self,
        job_id: &JobId,
        now: f64,
        registry: &mut NodeRegistry,
        graph: &mut JobGraph,
        allocations: &BTreeMap<ClientId, ResourceAllocation>,
        energy: &EnergyOptimizer,
        running_by_client: &mut BTreeMap<ClientId, usize>,
        audit: &dyn AuditSink,
    ) -> Action {
        let job = graph.get(job_id).expect("job_id came from this cycle's ready set").clone();

        let allocation = allocations.get(&job.client_id);
        let allocated_nodes: &[NodeId] = allocation.map(|a| a.allocated_nodes.as_slice()).unwrap_or(&[]);
        let allocation_count = allocated_nodes.len();
        let running = running_by_client.get(&job.client_id).copied().unwrap_or(0);
        let quota_available = running < allocation_count;

        let hour_of_day = now.rem_euclid(24.0);

        if energy.should_defer_to_off_peak(&job, hour_of_day) {
            return Action::Skip { job: job_id.clone(), reason: SkipReason::NoSuitableNode };
        }

        let idle_candidates: Vec<NodeId> = if quota_available {
            allocated_nodes
                .iter()
                .filter(|id| {
                    registry
                        .get(id)
                        .map(|n| n.is_online() && n.capabilities.meets(&job.requirements))
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        if !idle_candidates.is_empty() {
            let scored: Vec<(crate::model::Node, f64, f64)> = idle_candidates
                .iter()
                .map(|id| {
                    let node = registry.get(id).expect("just filtered as present").clone();
                    let cost = energy.energy_cost(&job, &node, hour_of_day);
                    (node, cost, hour_of_day)
                })
                .collect();
            let ranked = energy.rank(job.priority, &scored);
            let chosen = ranked[0].id.clone();

            registry.assign(&chosen, job_id.clone()).expect("node filtered as online above");
            graph.assign_to_node(job_id, chosen.clone()).expect("job_id came from this cycle's ready set");
            *running_by_client.entry(job.client_id.clone()).or_insert(0) += 1;

            if job.status == JobStatus::Paused {
                audit.record(
                    AuditEvent::new(AuditEventType::JobResumed, format!("resumed on node {chosen}"))
                        .with_job(job_id.clone())
                        .with_node(chosen.clone())
                        .with_client(job.client_id.clone()),
                );
                return Action::Resume { job: job_id.clone(), node: chosen };
            }

            audit.record(
                AuditEvent::new(AuditEventType::JobAssigned, format!("assigned to node {chosen}"))
                    .with_job(job_id.clone())
                    .with_node(chosen.clone())
                    .with_client(job.client_id.clone()),
            );
            return Action::Assign { job: job_id.clone(), node: chosen };
        }

        if self.tunables.enable_preemption {
            if let Some(action) = self.try_preempt(&job, now, allocated_nodes, registry, graph, running_by_client, audit) {
                return action;
            }
        }

        if !quota_available {
            return Action::Skip {
                job: job_id.clone(),
                reason: SkipReason::QuotaExhausted { allocation: allocation_count, running },
            };
        }

        let capability_node = allocated_nodes
            .iter()
            .find(|id| registry.get(id).map(|n| n.capabilities.meets(&job.requirements)).unwrap_or(false));

        match capability_node {
            Some(node) => Action::Skip {
                job: job_id.clone(),
                reason: SkipReason::CapabilityMismatch { node: node.clone() },
            },
            None => Action::Skip { job: job_id.clone(), reason: SkipReason::NoSuitableNode },
        }
    }

    /// Step 6: look for a node in `job`'s allocation running a job this one
    /// outranks by enough to preempt, capture a checkpoint (or preserve
    /// progress for progressive-output jobs), and hand the node to `job`.
    #[allow(clippy::too_many_arguments)]
    fn try_preempt(
        &self,
        job: &crate::model::Job,
        now: f64,
        allocated_nodes: &[NodeId],
        registry: &mut NodeRegistry,
        graph: &mut JobGraph,
        running_by_client: &mut BTreeMap<ClientId, usize>,
        audit: &dyn AuditSink,
    ) -> Option<Action> {
        let mut candidate: Option<(NodeId, JobId)> = None;

        for node_id in allocated_nodes {
            let Some(node) = registry.get(node_id) else { continue };
            if node.status != crate::model::NodeStatus::Busy || !node.capabilities.meets(&job.requirements) {
                continue;
            }
            let Some(running_job_id) = node.current_job_id.clone() else { continue };
            let Some(running_job) = graph.get(&running_job_id) else { continue };

            let outranks = job.priority == JobPriority::Critical || running_job.priority.gap_above(job.priority) >= 2;
            if running_job.can_be_preempted && outranks {
                candidate = Some((node_id.clone(), running_job_id));
                break;
            }
        }

        let (node_id, preempted_job_id) = candidate?;
        let preempted = graph.get(&preempted_job_id)?.clone();

        if preempted.supports_checkpoint {
            let checkpoint = crate::model::CheckpointRecord {
                job_id: preempted_job_id.clone(),
                node_id: node_id.clone(),
                checkpoint_time: now,
                progress: preempted.progress,
                error_count: preempted.error_count,
            };
            graph.set_status(&preempted_job_id, JobStatus::Paused, Some(checkpoint)).ok()?;
        } else if preempted.supports_progressive_output {
            graph.set_status(&preempted_job_id, JobStatus::Paused, None).ok()?;
        } else {
            // can_be_preempted is true but the job can't actually preserve
            // any work; preemption would silently discard its progress, so
            // this candidate is rejected and the search moves on in a
            // future cycle rather than here, to keep this method simple.
            return None;
        }

        registry.release(&node_id).ok()?;
        if let Some(count) = running_by_client.get_mut(&preempted.client_id) {
            *count = count.saturating_sub(1);
        }
        audit.record(
            AuditEvent::new(AuditEventType::JobPreempted, format!("preempted by {}", job.id))
                .with_job(preempted_job_id.clone())
                .with_node(node_id.clone()),
        );

        registry.assign(&node_id, job.id.clone()).ok()?;
        graph.assign_to_node(&job.id, node_id.clone()).ok()?;
        *running_by_client.entry(job.client_id.clone()).or_insert(0) += 1;

        info!(job = %job.id, node = %node_id, preempted = %preempted_job_id, "preemptive assignment");
        audit.record(
            AuditEvent::new(AuditEventType::JobAssigned, format!("assigned to node {node_id} via preemption"))
                .with_job(job.id.clone())
                .with_node(node_id.clone())
                .with_client(job.client_id.clone()),
        );

        Some(Action::Preempt { job: preempted_job_id, node: node_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{InMemoryAuditSink, NullAuditSink};
    use crate::energy::EnergyMode;
    use crate::model::{Client, Job, JobRequirements, Node, NodeCapabilities, ServiceTier};
    use crate::partitioner::ResourcePartitioner;

    fn scheduler() -> DeadlineScheduler {
        DeadlineScheduler::new(SchedulerTunables::default())
    }

    fn energy() -> EnergyOptimizer {
        EnergyOptimizer::new(EnergyMode::Balanced, 8.0, 20.0, 0.15, 0.08)
    }

    fn client(id: &str, guaranteed: f64, max: f64) -> Client {
        Client::new(id, id, ServiceTier::Standard, guaranteed, max)
    }

    fn allocations_for(clients: &[Client], nodes: &[Node]) -> BTreeMap<ClientId, ResourceAllocation> {
        ResourcePartitioner::new(true, 50.0).allocate(clients, nodes, &NullAuditSink)
    }

    fn job(id: &str, client_id: &str, priority: JobPriority, deadline: f64) -> Job {
        Job::new(id, client_id, priority, 0.0, deadline, 2.0, JobRequirements::default())
    }

    #[test]
    fn single_job_single_node_is_assigned() {
        let mut registry = NodeRegistry::new();
        registry.add_node("n1".into(), NodeCapabilities::default());
        let mut graph = JobGraph::new();
        graph.submit(job("j1", "c1", JobPriority::Medium, 100.0)).unwrap();

        let clients = vec![client("c1", 100.0, 100.0)];
        let nodes: Vec<Node> = registry.snapshot().cloned().collect();
        let allocations = allocations_for(&clients, &nodes);

        let plan = scheduler().run_cycle(0.0, &mut registry, &mut graph, &allocations, &energy(), &NullAuditSink);
        assert_eq!(plan.actions, vec![Action::Assign { job: "j1".into(), node: "n1".into() }]);
        assert_eq!(graph.get(&"j1".into()).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn job_with_unsatisfied_dependency_is_never_offered() {
        let mut registry = NodeRegistry::new();
        registry.add_node("n1".into(), NodeCapabilities::default());
        let mut graph = JobGraph::new();
        graph.submit(job("a", "c1", JobPriority::Medium, 100.0)).unwrap();
        let mut dependent = job("b", "c1", JobPriority::Medium, 100.0);
        dependent.dependencies = vec!["a".into()];
        graph.submit(dependent).unwrap();

        let clients = vec![client("c1", 100.0, 100.0)];
        let nodes: Vec<Node> = registry.snapshot().cloned().collect();
        let allocations = allocations_for(&clients, &nodes);

        let plan = scheduler().run_cycle(0.0, &mut registry, &mut graph, &allocations, &energy(), &NullAuditSink);
        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(&plan.actions[0], Action::Assign { job, .. } if job.as_str() == "a"));
    }

    #[test]
    fn quota_exhausted_skips_further_jobs_for_the_client() {
        let mut registry = NodeRegistry::new();
        registry.add_node("n1".into(), NodeCapabilities::default());
        let mut graph = JobGraph::new();
        graph.submit(job("a", "c1", JobPriority::Medium, 100.0)).unwrap();
        graph.submit(job("b", "c1", JobPriority::Medium, 100.0)).unwrap();

        let clients = vec![client("c1", 100.0, 100.0), client("c2", 0.0, 0.0)];
        let nodes: Vec<Node> = registry.snapshot().cloned().collect();
        let allocations = allocations_for(&clients, &nodes);

        let plan = scheduler().run_cycle(0.0, &mut registry, &mut graph, &allocations, &energy(), &NullAuditSink);
        assert_eq!(plan.actions.len(), 2);
        assert!(matches!(&plan.actions[0], Action::Assign { .. }));
        assert!(matches!(
            &plan.actions[1],
            Action::Skip { reason: SkipReason::QuotaExhausted { .. }, .. }
        ));
    }

    #[test]
    fn critical_job_preempts_a_preemptible_low_priority_job() {
        let mut registry = NodeRegistry::new();
        registry.add_node("n1".into(), NodeCapabilities::default());
        let mut graph = JobGraph::new();

        let mut running = job("low", "c1", JobPriority::Low, 1000.0);
        running.status = JobStatus::Running;
        running.assigned_node_id = Some("n1".into());
        running.supports_checkpoint = true;
        running.progress = 40.0;
        graph.submit(Job::new("low", "c1", JobPriority::Low, 0.0, 1000.0, 2.0, JobRequirements::default())).unwrap();
        *graph.get_mut(&"low".into()).unwrap() = running;
        registry.assign(&"n1".into(), "low".into()).unwrap();

        graph.submit(job("urgent", "c1", JobPriority::Critical, 1.0)).unwrap();

        let clients = vec![client("c1", 100.0, 100.0)];
        let nodes: Vec<Node> = registry.snapshot().cloned().collect();
        let allocations = allocations_for(&clients, &nodes);

        let sink = InMemoryAuditSink::new();
        let plan = scheduler().run_cycle(0.0, &mut registry, &mut graph, &allocations, &energy(), &sink);

        assert!(plan.actions.iter().any(|a| matches!(a, Action::Preempt { job, .. } if job.as_str() == "low")));
        let low = graph.get(&"low".into()).unwrap();
        assert_eq!(low.status, JobStatus::Paused);
        assert_eq!(low.progress, 40.0, "checkpoint preserves progress at preemption time");
        let urgent = graph.get(&"urgent".into()).unwrap();
        assert_eq!(urgent.status, JobStatus::Running);
        assert_eq!(urgent.assigned_node_id, Some("n1".into()));
    }

    #[test]
    fn high_priority_job_preempts_a_low_priority_job_two_levels_below() {
        let mut registry = NodeRegistry::new();
        registry.add_node("n1".into(), NodeCapabilities::default());
        let mut graph = JobGraph::new();

        let mut running = job("low", "c1", JobPriority::Low, 1000.0);
        running.status = JobStatus::Running;
        running.assigned_node_id = Some("n1".into());
        running.supports_checkpoint = true;
        graph.submit(Job::new("low", "c1", JobPriority::Low, 0.0, 1000.0, 2.0, JobRequirements::default())).unwrap();
        *graph.get_mut(&"low".into()).unwrap() = running;
        registry.assign(&"n1".into(), "low".into()).unwrap();

        graph.submit(job("important", "c1", JobPriority::High, 1.0)).unwrap();

        let clients = vec![client("c1", 100.0, 100.0)];
        let nodes: Vec<Node> = registry.snapshot().cloned().collect();
        let allocations = allocations_for(&clients, &nodes);

        let plan = scheduler().run_cycle(0.0, &mut registry, &mut graph, &allocations, &energy(), &NullAuditSink);

        assert!(plan.actions.iter().any(|a| matches!(a, Action::Preempt { job, .. } if job.as_str() == "low")));
        assert_eq!(graph.get(&"important".into()).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn medium_priority_job_does_not_preempt_a_low_priority_job_one_level_below() {
        let mut registry = NodeRegistry::new();
        registry.add_node("n1".into(), NodeCapabilities::default());
        let mut graph = JobGraph::new();

        let mut running = job("low", "c1", JobPriority::Low, 1000.0);
        running.status = JobStatus::Running;
        running.assigned_node_id = Some("n1".into());
        running.supports_checkpoint = true;
        graph.submit(Job::new("low", "c1", JobPriority::Low, 0.0, 1000.0, 2.0, JobRequirements::default())).unwrap();
        *graph.get_mut(&"low".into()).unwrap() = running;
        registry.assign(&"n1".into(), "low".into()).unwrap();

        graph.submit(job("contender", "c1", JobPriority::Medium, 1.0)).unwrap();

        let clients = vec![client("c1", 100.0, 100.0)];
        let nodes: Vec<Node> = registry.snapshot().cloned().collect();
        let allocations = allocations_for(&clients, &nodes);

        let plan = scheduler().run_cycle(0.0, &mut registry, &mut graph, &allocations, &energy(), &NullAuditSink);

        assert!(plan.actions.iter().all(|a| !matches!(a, Action::Preempt { .. })), "gap of only 1 level must not trigger preemption");
        assert_eq!(graph.get(&"low".into()).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn non_preemptible_job_is_left_running() {
        let mut registry = NodeRegistry::new();
        registry.add_node("n1".into(), NodeCapabilities::default());
        let mut graph = JobGraph::new();

        let mut running = Job::new("low", "c1", JobPriority::Low, 0.0, 1000.0, 2.0, JobRequirements::default());
        running.status = JobStatus::Running;
        running.assigned_node_id = Some("n1".into());
        running.can_be_preempted = false;
        graph.submit(Job::new("low", "c1", JobPriority::Low, 0.0, 1000.0, 2.0, JobRequirements::default())).unwrap();
        *graph.get_mut(&"low".into()).unwrap() = running;
        registry.assign(&"n1".into(), "low".into()).unwrap();

        graph.submit(job("urgent", "c1", JobPriority::Critical, 1.0)).unwrap();

        let clients = vec![client("c1", 100.0, 100.0)];
        let nodes: Vec<Node> = registry.snapshot().cloned().collect();
        let allocations = allocations_for(&clients, &nodes);

        let plan = scheduler().run_cycle(0.0, &mut registry, &mut graph, &allocations, &energy(), &NullAuditSink);
        assert!(plan.actions.iter().any(|a| matches!(a, Action::Skip { .. })));
        assert_eq!(graph.get(&"low".into()).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn run_cycle_is_deterministic_for_identical_inputs() {
        let build = || {
            let mut registry = NodeRegistry::new();
            registry.add_node("n1".into(), NodeCapabilities::default());
            registry.add_node("n2".into(), NodeCapabilities::default());
            let mut graph = JobGraph::new();
            graph.submit(job("a", "c1", JobPriority::Medium, 50.0)).unwrap();
            graph.submit(job("b", "c1", JobPriority::High, 50.0)).unwrap();
            (registry, graph)
        };

        let clients = vec![client("c1", 100.0, 100.0)];

        let (mut r1, mut g1) = build();
        let nodes1: Vec<Node> = r1.snapshot().cloned().collect();
        let alloc1 = allocations_for(&clients, &nodes1);
        let plan1 = scheduler().run_cycle(0.0, &mut r1, &mut g1, &alloc1, &energy(), &NullAuditSink);

        let (mut r2, mut g2) = build();
        let nodes2: Vec<Node> = r2.snapshot().cloned().collect();
        let alloc2 = allocations_for(&clients, &nodes2);
        let plan2 = scheduler().run_cycle(0.0, &mut r2, &mut g2, &alloc2, &energy(), &NullAuditSink);

        assert_eq!(plan1, plan2);
    }
}
