/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler facade (spec §2, §5, §9): wires every component together and
//! is the only type a host needs to construct.
//!
//! There is no global state anywhere in this crate (spec §9). A host
//! builds one [`Scheduler`] with an injected [`Clock`] and [`AuditSink`],
//! posts [`InboundEvent`]s as they happen, and calls [`Scheduler::tick`]
//! on whatever cadence [`SchedulerConfig::scheduling_tick_seconds`]
//! suggests. Inbound events queue until the next tick; a tick applies all
//! of them in order, then runs one partition + schedule cycle and returns
//! the resulting [`Plan`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::audit::{AuditEvent, AuditEventType, AuditSink};
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::energy::EnergyOptimizer;
use crate::error::CoreError;
use crate::events::InboundEvent;
use crate::graph::JobGraph;
use crate::model::{Client, ClientId, Node};
use crate::partitioner::ResourcePartitioner;
use crate::progress::ProgressTracker;
use crate::recovery::FailureRecoveryManager;
use crate::registry::NodeRegistry;
use crate::scheduler::{DeadlineScheduler, Plan, SchedulerTunables};

pub struct Scheduler {
    clients: BTreeMap<ClientId, Client>,
    registry: NodeRegistry,
    graph: JobGraph,
    partitioner: ResourcePartitioner,
    energy: EnergyOptimizer,
    scheduler: DeadlineScheduler,
    recovery: FailureRecoveryManager,
    progress: ProgressTracker,
    queue: Vec<InboundEvent>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
}

impl Scheduler {
    pub fn new(config: &SchedulerConfig, clock: Arc<dyn Clock>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            clients: BTreeMap::new(),
            registry: NodeRegistry::new(),
            graph: JobGraph::new(),
            partitioner: ResourcePartitioner::new(config.allow_resource_borrowing, config.borrow_limit_pct),
            energy: EnergyOptimizer::new(
                config.initial_energy_mode,
                config.peak_hours_start,
                config.peak_hours_end,
                config.peak_energy_cost,
                config.off_peak_energy_cost,
            ),
            scheduler: DeadlineScheduler::new(SchedulerTunables {
                deadline_safety_margin_hours: config.deadline_safety_margin_hours,
                enable_preemption: config.enable_preemption,
            }),
            recovery: FailureRecoveryManager::new(config.max_job_error_count),
            progress: ProgressTracker::new(),
            queue: Vec::new(),
            clock,
            audit,
        }
    }

    /// Queues `event` to be applied at the start of the next [`Self::tick`].
    pub fn submit_event(&mut self, event: InboundEvent) {
        self.queue.push(event);
    }

    /// Current state of `job_id`, if it has been submitted. The audit sink
    /// is write-only and a `Plan` is discarded at the end of its cycle, so a
    /// host that wants to show live job state (a dashboard, a health check)
    /// has no other way to read it back.
    pub fn job(&self, job_id: &crate::model::JobId) -> Option<&crate::model::Job> {
        self.graph.get(job_id)
    }

    /// Current state of `node_id`, if it has been added.
    pub fn node(&self, node_id: &crate::model::NodeId) -> Option<&crate::model::Node> {
        self.registry.get(node_id)
    }

    /// Drains the event queue, then runs one partition + schedule cycle at
    /// the clock's current time. Errors surfaced while applying a queued
    /// event are logged and otherwise skipped — one bad event (e.g. a
    /// progress update for a job id that was since cancelled) must not
    /// block every other event behind it in the queue.
    pub fn tick(&mut self) -> Plan {
        let now = self.clock.now();
        self.drain_queue(now);

        let clients: Vec<Client> = self.clients.values().cloned().collect();
        let nodes: Vec<Node> = self.registry.snapshot().cloned().collect();
        let allocations = self.partitioner.allocate(&clients, &nodes, self.audit.as_ref());

        let plan = self.scheduler.run_cycle(
            now,
            &mut self.registry,
            &mut self.graph,
            &allocations,
            &self.energy,
            self.audit.as_ref(),
        );

        self.audit.record(
            AuditEvent::new(AuditEventType::SchedulingCycleCompleted, format!("{} actions", plan.actions.len()))
                .with_extra("now", format!("{now:.3}")),
        );

        plan
    }

    fn drain_queue(&mut self, now: f64) {
        let events = std::mem::take(&mut self.queue);
        for event in events {
            if let Err(err) = self.apply_event(event, now) {
                warn!(error = %err, "failed to apply queued event");
            }
        }
    }

    fn apply_event(&mut self, event: InboundEvent, now: f64) -> Result<(), CoreError> {
        match event {
            InboundEvent::SubmitClient(client) => {
                let id = client.id.clone();
                self.clients.insert(id.clone(), client);
                self.audit.record(AuditEvent::new(AuditEventType::ClientAdded, "client added").with_client(id));
                Ok(())
            }
            InboundEvent::RemoveClient(id) => {
                self.clients.remove(&id).ok_or_else(|| CoreError::UnknownClient(id.clone()))?;
                self.audit.record(AuditEvent::new(AuditEventType::ClientRemoved, "client removed").with_client(id));
                Ok(())
            }
            InboundEvent::AddNode { node_id, capabilities } => {
                self.registry.add_node(node_id.clone(), capabilities);
                self.audit.record(AuditEvent::new(AuditEventType::NodeAdded, "node added").with_node(node_id));
                Ok(())
            }
            InboundEvent::RemoveNode(node_id) => {
                self.registry.remove_node(&node_id)?;
                self.audit.record(AuditEvent::new(AuditEventType::NodeRemoved, "node removed").with_node(node_id));
                Ok(())
            }
            InboundEvent::MarkNodeOffline(node_id) => self.registry.mark_offline(&node_id),
            InboundEvent::MarkNodeOnline(node_id) => self.registry.mark_online(&node_id),
            InboundEvent::SetEnergyMode(mode) => {
                self.energy.set_mode(mode);
                self.audit.record(
                    AuditEvent::new(AuditEventType::EnergyModeChanged, format!("energy mode set to {mode:?}"))
                        .with_extra("mode", format!("{mode:?}")),
                );
                Ok(())
            }
            InboundEvent::SubmitJob(job) => {
                let id = job.id.clone();
                let result = self.graph.submit(job);
                self.audit.record(AuditEvent::new(AuditEventType::JobSubmitted, "job submitted").with_job(id));
                result
            }
            InboundEvent::UpdateJobProgress { job_id, pct } => {
                let released = self.progress.report_progress(&mut self.graph, &job_id, pct)?;
                if let Some(node_id) = released {
                    let _ = self.registry.release(&node_id);
                    self.audit.record(AuditEvent::new(AuditEventType::JobCompleted, "job completed").with_job(job_id).with_node(node_id));
                }
                Ok(())
            }
            InboundEvent::RecordCheckpoint(job_id) => {
                let node_id = self
                    .graph
                    .get(&job_id)
                    .and_then(|j| j.assigned_node_id.clone())
                    .ok_or_else(|| CoreError::UnknownJob(job_id.clone()))?;
                self.progress.checkpoint(&mut self.graph, &job_id, node_id, now)
            }
            InboundEvent::CancelJob(job_id) => {
                let released_node = self.graph.get(&job_id).and_then(|j| j.assigned_node_id.clone());
                self.graph.set_status(&job_id, crate::model::JobStatus::Cancelled, None)?;
                if let Some(node_id) = released_node {
                    let _ = self.registry.release(&node_id);
                }
                self.audit.record(AuditEvent::new(AuditEventType::JobCancelled, "job cancelled").with_job(job_id));
                Ok(())
            }
            InboundEvent::HandleNodeFailure { node_id, error } => {
                self.recovery.handle_node_failure(&node_id, error, &mut self.registry, &mut self.graph, self.audit.as_ref())
            }
            InboundEvent::Tick(_) => Ok(()),
        }
    }
}
