/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Inbound host events and outbound scheduling decisions (spec §6).
//!
//! Hosts never mutate [`crate::registry::NodeRegistry`] or
//! [`crate::graph::JobGraph`] directly. Every state change enters through an
//! [`InboundEvent`] posted to [`host::Scheduler::submit_event`](crate::host::Scheduler::submit_event),
//! queued until the next tick drains it. Every state change a tick decides
//! on leaves through an [`OutboundDecision`] inside that tick's
//! [`crate::scheduler::Plan`] — the host is responsible for enacting those
//! on actual compute infrastructure (starting a render process, killing
//! one, etc.); this crate only decides, it never executes.

use crate::energy::EnergyMode;
use crate::model::{Client, Job, JobId, NodeCapabilities, NodeId};
use crate::scheduler::Action;

/// An event posted by the host to be applied at the start of the next tick.
///
/// Derives `Serialize`/`Deserialize` so a scripted event feed (a YAML
/// document listing one of these per line) can drive the scheduler without
/// a hand-rolled parser — see `render-harness`, the manual event-feed
/// simulator that is this crate's only consumer of that capability so far.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundEvent {
    SubmitClient(Client),
    RemoveClient(crate::model::ClientId),
    AddNode {
        node_id: NodeId,
        capabilities: NodeCapabilities,
    },
    RemoveNode(NodeId),
    MarkNodeOffline(NodeId),
    MarkNodeOnline(NodeId),
    /// Changes the scheduler-wide energy mode (spec §4.4, §9's "Energy
    /// mode" glossary entry). Not part of spec §6's original inbound-event
    /// list — added because §6 also names `EnergyModeChanged` as an audit
    /// event type, and that event has no producer without some host-facing
    /// way to trigger a mode change at runtime (the alternative, a
    /// mode fixed for the scheduler's lifetime at construction, makes the
    /// audit event type dead on arrival).
    SetEnergyMode(EnergyMode),
    SubmitJob(Job),
    UpdateJobProgress {
        job_id: JobId,
        pct: f64,
    },
    RecordCheckpoint(JobId),
    CancelJob(JobId),
    HandleNodeFailure {
        node_id: NodeId,
        error: String,
    },
    /// Advances the clock and runs one scheduling cycle. Hosts that drive
    /// the scheduler on a timer post this themselves; `host::Scheduler::tick`
    /// also accepts a bare `now` without requiring this variant.
    Tick(f64),
}

/// A decision the scheduler made during a cycle, to be enacted by the host.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum OutboundDecision {
    AssignJob { job_id: JobId, node_id: NodeId },
    PreemptJob { job_id: JobId },
    ResumeJob { job_id: JobId },
    CompleteJob { job_id: JobId },
}

impl OutboundDecision {
    /// Translates one `Plan` action into the host-facing decision vocabulary
    /// of spec §6. `Skip` carries no outbound decision — it is an internal
    /// bookkeeping outcome the host never needs to act on.
    pub fn from_action(action: &Action) -> Option<Self> {
        match action {
            Action::Assign { job, node } => Some(Self::AssignJob { job_id: job.clone(), node_id: node.clone() }),
            Action::Preempt { job, .. } => Some(Self::PreemptJob { job_id: job.clone() }),
            Action::Resume { job, .. } => Some(Self::ResumeJob { job_id: job.clone() }),
            Action::Skip { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SkipReason;

    #[test]
    fn from_action_maps_assign_preempt_resume() {
        assert_eq!(
            OutboundDecision::from_action(&Action::Assign { job: "j1".into(), node: "n1".into() }),
            Some(OutboundDecision::AssignJob { job_id: "j1".into(), node_id: "n1".into() })
        );
        assert_eq!(
            OutboundDecision::from_action(&Action::Preempt { job: "j1".into(), node: "n1".into() }),
            Some(OutboundDecision::PreemptJob { job_id: "j1".into() })
        );
        assert_eq!(
            OutboundDecision::from_action(&Action::Resume { job: "j1".into(), node: "n1".into() }),
            Some(OutboundDecision::ResumeJob { job_id: "j1".into() })
        );
    }

    #[test]
    fn from_action_skips_have_no_outbound_decision() {
        assert_eq!(
            OutboundDecision::from_action(&Action::Skip { job: "j1".into(), reason: SkipReason::NoSuitableNode }),
            None
        );
    }

    #[test]
    fn inbound_event_round_trips_through_yaml() {
        let event = InboundEvent::AddNode { node_id: "n1".into(), capabilities: NodeCapabilities::default() };
        let yaml = serde_yaml::to_string(&event).unwrap();
        let parsed: InboundEvent = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn set_energy_mode_round_trips_through_yaml() {
        let event = InboundEvent::SetEnergyMode(crate::energy::EnergyMode::Efficiency);
        let yaml = serde_yaml::to_string(&event).unwrap();
        let parsed: InboundEvent = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, event);
    }
}
