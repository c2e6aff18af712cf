/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::collections::HashSet;

use super::{JobId, NodeId};

/// Lifecycle status of a compute [`Node`].
///
/// Transitions (spec §4.1): `ONLINE -> BUSY` on assign, `BUSY -> ONLINE` on
/// release, any state `-> ERROR` on a fault report, any state `-> OFFLINE`
/// on an administrative action. A node in `Error` returns to `Online` only
/// via an explicit [`crate::registry::NodeRegistry::mark_online`] call —
/// there is no automatic recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NodeStatus {
    Online,
    Busy,
    Offline,
    Error,
    Maintenance,
}

/// Hardware/capability profile of a render node.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeCapabilities {
    pub cpu_cores: u32,
    pub memory_gb: u64,
    pub gpu_model: Option<String>,
    pub gpu_count: u32,
    pub gpu_memory_gb: u64,
    pub gpu_compute_capability: f64,
    pub storage_gb: u64,
    pub specialized_for: HashSet<String>,
}

impl NodeCapabilities {
    /// Returns `true` iff this node can host a job with the given
    /// requirements, per spec §4.5 step 2's eligibility filter:
    /// `requires_gpu ⇒ gpu_count ≥ 1`, `memory_gb ≤ node.memory_gb`,
    /// `cpu_cores ≤ node.cpu_cores`, `specialized_for ⊆ node.specialized_for`.
    pub fn meets(&self, req: &super::JobRequirements) -> bool {
        if req.requires_gpu && self.gpu_count < 1 {
            return false;
        }
        if req.memory_gb > self.memory_gb {
            return false;
        }
        if req.cpu_cores > self.cpu_cores {
            return false;
        }
        req.specialized_for
            .iter()
            .all(|tag| self.specialized_for.contains(tag))
    }
}

/// A compute node in the render farm.
///
/// Invariants (spec §3):
/// (a) `status == Busy` ⇔ `current_job_id` is `Some` and that job is
///     `Running` on this node — enforced jointly by [`crate::registry`]
///     and [`crate::graph`], never by this struct alone.
/// (b) `status ∈ {Error, Offline}` ⇒ `current_job_id.is_none()`.
/// (c) at most one job references this node's id as its `assigned_node_id`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub status: NodeStatus,
    pub capabilities: NodeCapabilities,

    /// `[0, 100]`. Higher is more efficient (draws less power per unit
    /// work) — see [`crate::energy`] for how this feeds the cost model.
    pub power_efficiency_rating: f64,

    pub current_job_id: Option<JobId>,
    pub uptime_hours: f64,
    pub last_error: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, capabilities: NodeCapabilities) -> Self {
        Self {
            id: id.into(),
            status: NodeStatus::Online,
            capabilities,
            power_efficiency_rating: 100.0,
            current_job_id: None,
            uptime_hours: 0.0,
            last_error: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == NodeStatus::Online
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobRequirements;

    fn caps(cpu: u32, mem: u64, gpu: u32, tags: &[&str]) -> NodeCapabilities {
        NodeCapabilities {
            cpu_cores: cpu,
            memory_gb: mem,
            gpu_count: gpu,
            specialized_for: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn req(requires_gpu: bool, memory_gb: u64, cpu_cores: u32, tags: &[&str]) -> JobRequirements {
        JobRequirements {
            requires_gpu,
            memory_gb,
            cpu_cores,
            scene_complexity: 5,
            specialized_for: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn meets_rejects_missing_gpu() {
        let node = caps(16, 64, 0, &[]);
        assert!(!node.meets(&req(true, 8, 4, &[])));
    }

    #[test]
    fn meets_rejects_insufficient_memory_or_cpu() {
        let node = caps(4, 8, 1, &[]);
        assert!(!node.meets(&req(false, 16, 4, &[])));
        assert!(!node.meets(&req(false, 4, 8, &[])));
    }

    #[test]
    fn meets_requires_specialization_subset() {
        let node = caps(16, 64, 1, &["gpu_rendering"]);
        assert!(!node.meets(&req(true, 8, 4, &["gpu_rendering", "volumetrics"])));
        assert!(node.meets(&req(true, 8, 4, &["gpu_rendering"])));
        assert!(node.meets(&req(true, 8, 4, &[])));
    }

    #[test]
    fn new_node_starts_online_with_no_job() {
        let n = Node::new("n1", caps(8, 16, 0, &[]));
        assert!(n.is_online());
        assert!(n.current_job_id.is_none());
    }
}
