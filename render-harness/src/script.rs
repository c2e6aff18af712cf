/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Event-script YAML format for the harness binary.
//!
//! Kept as a private, harness-local deserialization layer rather than
//! deriving `Deserialize` straight onto `render_core`'s `Job`/`Client`
//! (which it already does for the library's own use) — a hand-written
//! scenario script should not have to spell out every internal field
//! (`error_count`, `checkpoints`, ...) a freshly submitted job or client
//! always starts at its default value anyway. This mirrors the teacher's
//! `NodeConfigFile`/`NodeConfigEntry` split: a YAML-shaped private struct,
//! converted into the real domain type once parsed.
//!
//! Expected shape — a flat, ordered list under `events:`:
//! ```yaml
//! events:
//!   - submit_client: { id: c1, name: "Studio A", tier: standard, guaranteed_pct: 50.0, max_pct: 80.0 }
//!   - add_node: { id: n1, capabilities: { gpu_count: 1, memory_gb: 64, cpu_cores: 16 } }
//!   - submit_job: { id: j1, client_id: c1, priority: high, deadline: 8.0, estimated_duration_hours: 1.0 }
//!   - tick: { now: 0.0 }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use render_core::energy::EnergyMode;
use render_core::events::InboundEvent;
use render_core::model::{
    Client, Job, JobId, JobPriority, JobRequirements, NodeCapabilities, NodeId, ServiceTier,
};

#[derive(Debug, Deserialize)]
struct ScriptFile {
    events: Vec<ScriptEvent>,
}

/// One line of a scenario script. Variant names match `InboundEvent`'s
/// (snake_case) except `tick`, which the harness intercepts directly
/// rather than queuing — see `main`'s run loop.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptEvent {
    SubmitClient {
        id: String,
        name: String,
        #[serde(default)]
        tier: ServiceTierSpec,
        guaranteed_pct: f64,
        max_pct: f64,
    },
    RemoveClient {
        id: String,
    },
    AddNode {
        id: String,
        #[serde(default)]
        capabilities: NodeCapabilities,
    },
    RemoveNode {
        id: String,
    },
    MarkNodeOffline {
        id: String,
    },
    MarkNodeOnline {
        id: String,
    },
    SetEnergyMode {
        #[serde(default)]
        mode: EnergyModeSpec,
    },
    SubmitJob {
        id: String,
        client_id: String,
        #[serde(default)]
        priority: JobPrioritySpec,
        #[serde(default)]
        submission_time: f64,
        deadline: f64,
        estimated_duration_hours: f64,
        #[serde(default)]
        requirements: JobRequirements,
        #[serde(default)]
        dependencies: Vec<String>,
        #[serde(default = "default_true")]
        can_be_preempted: bool,
        #[serde(default)]
        supports_checkpoint: bool,
        #[serde(default)]
        supports_progressive_output: bool,
        #[serde(default)]
        energy_intensive: bool,
    },
    UpdateJobProgress {
        job_id: String,
        pct: f64,
    },
    RecordCheckpoint {
        job_id: String,
    },
    CancelJob {
        job_id: String,
    },
    HandleNodeFailure {
        node_id: String,
        error: String,
    },
    /// Not queued: the harness sets its `FixedClock` to `now` and calls
    /// `Scheduler::tick` directly, then prints the resulting `Plan`.
    Tick {
        now: f64,
    },
}

fn default_true() -> bool {
    true
}

/// Thin wrapper so a bare script can write `tier: standard` without
/// spelling out every field `ServiceTier` itself has no `Default` for.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTierSpec {
    Basic,
    #[default]
    Standard,
    Premium,
    Enterprise,
}

impl From<ServiceTierSpec> for ServiceTier {
    fn from(spec: ServiceTierSpec) -> Self {
        match spec {
            ServiceTierSpec::Basic => ServiceTier::Basic,
            ServiceTierSpec::Standard => ServiceTier::Standard,
            ServiceTierSpec::Premium => ServiceTier::Premium,
            ServiceTierSpec::Enterprise => ServiceTier::Enterprise,
        }
    }
}

/// Thin wrapper mirroring [`ServiceTierSpec`], for the same reason:
/// `EnergyMode` has no `Default` of its own a bare `mode: {}` could fall
/// back to.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyModeSpec {
    Performance,
    #[default]
    Balanced,
    Efficiency,
    NightSavings,
}

impl From<EnergyModeSpec> for EnergyMode {
    fn from(spec: EnergyModeSpec) -> Self {
        match spec {
            EnergyModeSpec::Performance => EnergyMode::Performance,
            EnergyModeSpec::Balanced => EnergyMode::Balanced,
            EnergyModeSpec::Efficiency => EnergyMode::Efficiency,
            EnergyModeSpec::NightSavings => EnergyMode::NightSavings,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPrioritySpec {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl From<JobPrioritySpec> for JobPriority {
    fn from(spec: JobPrioritySpec) -> Self {
        match spec {
            JobPrioritySpec::Critical => JobPriority::Critical,
            JobPrioritySpec::High => JobPriority::High,
            JobPrioritySpec::Medium => JobPriority::Medium,
            JobPrioritySpec::Low => JobPriority::Low,
        }
    }
}

impl ScriptEvent {
    /// Converts every variant but `Tick` into the `InboundEvent` the core
    /// queues. Panics on `Tick` — `main`'s run loop always matches that
    /// variant out before calling this, so reaching it here is a bug in
    /// the harness, not a malformed script.
    pub fn into_inbound(self) -> InboundEvent {
        match self {
            ScriptEvent::SubmitClient { id, name, tier, guaranteed_pct, max_pct } => {
                InboundEvent::SubmitClient(Client::new(id, name, tier.into(), guaranteed_pct, max_pct))
            }
            ScriptEvent::RemoveClient { id } => InboundEvent::RemoveClient(id.into()),
            ScriptEvent::AddNode { id, capabilities } => {
                InboundEvent::AddNode { node_id: NodeId::from(id), capabilities }
            }
            ScriptEvent::RemoveNode { id } => InboundEvent::RemoveNode(id.into()),
            ScriptEvent::MarkNodeOffline { id } => InboundEvent::MarkNodeOffline(id.into()),
            ScriptEvent::MarkNodeOnline { id } => InboundEvent::MarkNodeOnline(id.into()),
            ScriptEvent::SetEnergyMode { mode } => InboundEvent::SetEnergyMode(mode.into()),
            ScriptEvent::SubmitJob {
                id,
                client_id,
                priority,
                submission_time,
                deadline,
                estimated_duration_hours,
                requirements,
                dependencies,
                can_be_preempted,
                supports_checkpoint,
                supports_progressive_output,
                energy_intensive,
            } => {
                let mut job = Job::new(id, client_id, priority.into(), submission_time, deadline, estimated_duration_hours, requirements);
                job.dependencies = dependencies.into_iter().map(JobId::from).collect();
                job.can_be_preempted = can_be_preempted;
                job.supports_checkpoint = supports_checkpoint;
                job.supports_progressive_output = supports_progressive_output;
                job.energy_intensive = energy_intensive;
                InboundEvent::SubmitJob(job)
            }
            ScriptEvent::UpdateJobProgress { job_id, pct } => {
                InboundEvent::UpdateJobProgress { job_id: job_id.into(), pct }
            }
            ScriptEvent::RecordCheckpoint { job_id } => InboundEvent::RecordCheckpoint(job_id.into()),
            ScriptEvent::CancelJob { job_id } => InboundEvent::CancelJob(job_id.into()),
            ScriptEvent::HandleNodeFailure { node_id, error } => {
                InboundEvent::HandleNodeFailure { node_id: node_id.into(), error }
            }
            ScriptEvent::Tick { .. } => unreachable!("main's run loop handles Tick before calling into_inbound"),
        }
    }
}

impl From<ScriptEvent> for InboundEvent {
    fn from(event: ScriptEvent) -> Self {
        event.into_inbound()
    }
}

/// Parses `path` as a `ScriptFile` and returns its flat event list.
pub fn load(path: &Path) -> Result<Vec<ScriptEvent>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("cannot open event script: {}", path.display()))?;
    let file: ScriptFile = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse event script: {}", path.display()))?;
    Ok(file.events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_scenario_script() {
        let yaml = r#"
events:
  - submit_client: { id: c1, name: "Studio A", tier: premium, guaranteed_pct: 50.0, max_pct: 80.0 }
  - add_node: { id: n1, capabilities: { gpu_count: 1, memory_gb: 64, cpu_cores: 16 } }
  - submit_job: { id: j1, client_id: c1, priority: high, deadline: 8.0, estimated_duration_hours: 1.0 }
  - tick: { now: 0.0 }
  - update_job_progress: { job_id: j1, pct: 100.0 }
"#;
        let file: ScriptFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.events.len(), 5);
        assert!(matches!(file.events[0], ScriptEvent::SubmitClient { .. }));
        assert!(matches!(file.events[3], ScriptEvent::Tick { now } if now == 0.0));
    }

    #[test]
    fn submit_job_defaults_priority_and_flags() {
        let yaml = r#"
events:
  - submit_job: { id: j1, client_id: c1, deadline: 8.0, estimated_duration_hours: 1.0 }
"#;
        let file: ScriptFile = serde_yaml::from_str(yaml).unwrap();
        let event = file.events.into_iter().next().unwrap().into_inbound();
        match event {
            InboundEvent::SubmitJob(job) => {
                assert_eq!(job.priority, JobPriority::Medium);
                assert!(job.can_be_preempted);
                assert!(!job.supports_checkpoint);
            }
            _ => panic!("expected SubmitJob"),
        }
    }

    #[test]
    fn set_energy_mode_converts_mode() {
        let event = ScriptEvent::SetEnergyMode { mode: EnergyModeSpec::NightSavings };
        match event.into_inbound() {
            InboundEvent::SetEnergyMode(mode) => assert_eq!(mode, EnergyMode::NightSavings),
            _ => panic!("expected SetEnergyMode"),
        }
    }

    #[test]
    fn submit_client_converts_tier() {
        let event = ScriptEvent::SubmitClient {
            id: "c1".into(),
            name: "Studio A".into(),
            tier: ServiceTierSpec::Enterprise,
            guaranteed_pct: 10.0,
            max_pct: 20.0,
        };
        match event.into_inbound() {
            InboundEvent::SubmitClient(client) => assert_eq!(client.service_tier, ServiceTier::Enterprise),
            _ => panic!("expected SubmitClient"),
        }
    }
}
