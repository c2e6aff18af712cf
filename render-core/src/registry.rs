/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Node Registry (spec §4.1): owns every [`Node`], exclusively.
//!
//! `BTreeMap` rather than `HashMap` — iteration order must be deterministic
//! for the same reason the teacher's scheduler uses `BTreeMap` for its
//! per-node CPU pools: two runs over the same input must produce the same
//! `Plan` (spec §8).

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::CoreError;
use crate::model::{Node, NodeCapabilities, NodeId, NodeStatus};

/// Owns every [`Node`] in the farm and enforces its status-transition
/// invariants (spec §3: a node in `Busy` has exactly one `current_job_id`
/// whose job is `Running`; a node in `Error`/`Offline` has none).
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<NodeId, Node>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node_id: NodeId, capabilities: NodeCapabilities) {
        info!(node = %node_id, "node added");
        self.nodes
            .insert(node_id.clone(), Node::new(node_id, capabilities));
    }

    pub fn remove_node(&mut self, node_id: &NodeId) -> Result<(), CoreError> {
        self.nodes
            .remove(node_id)
            .map(|_| info!(node = %node_id, "node removed"))
            .ok_or_else(|| CoreError::UnknownNode(node_id.clone()))
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn mark_offline(&mut self, node_id: &NodeId) -> Result<(), CoreError> {
        let node = self.require_mut(node_id)?;
        node.status = NodeStatus::Offline;
        node.current_job_id = None;
        info!(node = %node_id, "node marked offline");
        Ok(())
    }

    pub fn mark_online(&mut self, node_id: &NodeId) -> Result<(), CoreError> {
        let node = self.require_mut(node_id)?;
        node.status = NodeStatus::Online;
        node.last_error = None;
        info!(node = %node_id, "node marked online");
        Ok(())
    }

    pub fn mark_error(&mut self, node_id: &NodeId, reason: impl Into<String>) -> Result<(), CoreError> {
        let node = self.require_mut(node_id)?;
        node.status = NodeStatus::Error;
        node.current_job_id = None;
        node.last_error = Some(reason.into());
        warn!(node = %node_id, error = ?node.last_error, "node entered error state");
        Ok(())
    }

    /// Takes `node_id` out of rotation for administrative maintenance.
    /// Any state may transition to `Maintenance`; whatever job it was
    /// running is cleared, the same as `mark_offline`/`mark_error` — the
    /// host is responsible for having already reassigned or preempted that
    /// job before requesting maintenance.
    pub fn mark_maintenance(&mut self, node_id: &NodeId) -> Result<(), CoreError> {
        let node = self.require_mut(node_id)?;
        node.status = NodeStatus::Maintenance;
        node.current_job_id = None;
        info!(node = %node_id, "node marked for maintenance");
        Ok(())
    }

    /// Assigns `job_id` to `node_id`. The node must be `Online`; fails with
    /// [`CoreError::NodeBusy`] otherwise (including when the node is
    /// already running a different job).
    pub fn assign(&mut self, node_id: &NodeId, job_id: crate::model::JobId) -> Result<(), CoreError> {
        let node = self.require_mut(node_id)?;
        if node.status != NodeStatus::Online {
            return Err(CoreError::NodeBusy {
                node: node_id.clone(),
                job: node.current_job_id.clone().unwrap_or(job_id),
            });
        }
        node.status = NodeStatus::Busy;
        node.current_job_id = Some(job_id);
        Ok(())
    }

    /// Releases whatever job `node_id` is running, returning it to `Online`.
    /// A no-op (not an error) if the node is not currently `Busy` — callers
    /// that race a release against a node-failure transition should not have
    /// to check status first.
    pub fn release(&mut self, node_id: &NodeId) -> Result<(), CoreError> {
        let node = self.require_mut(node_id)?;
        if node.status == NodeStatus::Busy {
            node.status = NodeStatus::Online;
        }
        node.current_job_id = None;
        Ok(())
    }

    pub fn is_online(&self, node_id: &NodeId) -> bool {
        self.nodes.get(node_id).map(Node::is_online).unwrap_or(false)
    }

    /// All nodes, in deterministic (ascending id) order.
    pub fn snapshot(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn require_mut(&mut self, node_id: &NodeId) -> Result<&mut Node, CoreError> {
        self.nodes
            .get_mut(node_id)
            .ok_or_else(|| CoreError::UnknownNode(node_id.clone()))
    }
}
