/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Resource Partitioner (spec §4.3): converts client SLA tiers into a
//! per-cycle node allocation.
//!
//! Ported function-for-function from the Python
//! `ResourcePartitioner.allocate_resources` / `_calculate_client_demand` /
//! `_allocate_overflow_resources`: floor each client's guaranteed node
//! count, scale proportionally if oversubscribed, hand out guaranteed
//! nodes, then distribute whatever is left over by demand with a
//! round-robin tail for anything demand-proportional flooring missed.
//!
//! `allocate` produces a transient [`ResourceAllocation`] per client —
//! spec §3 is explicit that partitioner output, like scheduler plans and
//! energy scores, is discarded at the end of the cycle rather than owned
//! anywhere long-lived.

use std::collections::BTreeMap;

use tracing::warn;

use crate::audit::{AuditEvent, AuditEventType, AuditSink};
use crate::model::{Client, ClientId, Node, NodeId};

/// This cycle's resource grant for one client. Transient — recomputed
/// every cycle from scratch, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceAllocation {
    pub client_id: ClientId,
    pub allocated_percentage: f64,
    pub allocated_nodes: Vec<NodeId>,
    pub borrowed_percentage: f64,
    pub borrowed_from: BTreeMap<ClientId, f64>,
    pub lent_percentage: f64,
    pub lent_to: BTreeMap<ClientId, f64>,
}

#[derive(Debug, Default)]
pub struct ResourcePartitioner {
    pub allow_borrowing: bool,
    pub borrow_limit_pct: f64,
}

impl ResourcePartitioner {
    pub fn new(allow_borrowing: bool, borrow_limit_pct: f64) -> Self {
        Self {
            allow_borrowing,
            borrow_limit_pct,
        }
    }

    /// Allocates `nodes` across `clients` for one cycle. `clients` and
    /// `nodes` are iterated in the order given by the caller — callers
    /// pass a `BTreeMap`-backed snapshot so the order, and therefore the
    /// result, is deterministic.
    pub fn allocate(
        &self,
        clients: &[Client],
        nodes: &[Node],
        audit: &dyn AuditSink,
    ) -> BTreeMap<ClientId, ResourceAllocation> {
        let total_nodes = nodes.len();

        let mut guaranteed: BTreeMap<ClientId, usize> = BTreeMap::new();
        for client in clients {
            let nodes_for_client = (total_nodes as f64 * client.guaranteed_pct / 100.0).floor() as usize;
            guaranteed.insert(client.id.clone(), nodes_for_client);
        }

        let total_guaranteed: usize = guaranteed.values().sum();
        if total_guaranteed > total_nodes && total_guaranteed > 0 {
            let scale_factor = total_nodes as f64 / total_guaranteed as f64;
            for count in guaranteed.values_mut() {
                *count = (*count as f64 * scale_factor).floor() as usize;
            }
            warn!(
                scale_factor = scale_factor,
                original_total_guaranteed = total_guaranteed,
                scaled_total_guaranteed = guaranteed.values().sum::<usize>(),
                "guaranteed allocations scaled down due to resource constraints"
            );
            audit.record(
                AuditEvent::new(
                    AuditEventType::ResourceAllocationScaled,
                    format!("guaranteed allocations scaled down (factor {scale_factor:.2})"),
                )
                .with_extra("scale_factor", format!("{scale_factor:.4}")),
            );
        }

        let mut allocations: BTreeMap<ClientId, ResourceAllocation> = clients
            .iter()
            .map(|c| {
                let allocated_percentage = if total_nodes > 0 {
                    guaranteed[&c.id] as f64 / total_nodes as f64 * 100.0
                } else {
                    0.0
                };
                (
                    c.id.clone(),
                    ResourceAllocation {
                        client_id: c.id.clone(),
                        allocated_percentage,
                        ..Default::default()
                    },
                )
            })
            .collect();

        let mut available: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        for client in clients {
            let count = guaranteed[&client.id];
            let take = count.min(available.len());
            let selected: Vec<NodeId> = available.drain(0..take).collect();
            allocations.get_mut(&client.id).unwrap().allocated_nodes = selected;
        }

        let unallocated = available.len();
        if self.allow_borrowing && unallocated > 0 {
            let demand = self.calculate_client_demand(clients, total_nodes, &allocations);
            let overflow = self.allocate_overflow_resources(&demand, available);

            for (client_id, overflow_nodes) in overflow {
                if overflow_nodes.is_empty() {
                    continue;
                }
                let borrowed_pct = overflow_nodes.len() as f64 / total_nodes as f64 * 100.0;
                let alloc = allocations.get_mut(&client_id).unwrap();
                alloc.allocated_nodes.extend(overflow_nodes);
                alloc.allocated_percentage += borrowed_pct;
                alloc.borrowed_percentage = borrowed_pct;

                let other_count = clients.len().saturating_sub(1);
                if other_count > 0 {
                    let share = borrowed_pct / other_count as f64;
                    let borrowed_from: BTreeMap<ClientId, f64> = clients
                        .iter()
                        .map(|c| c.id.clone())
                        .filter(|id| id != &client_id)
                        .map(|id| (id, share))
                        .collect();

                    for (lender, amount) in &borrowed_from {
                        if let Some(lender_alloc) = allocations.get_mut(lender) {
                            *lender_alloc.lent_to.entry(client_id.clone()).or_insert(0.0) += amount;
                            lender_alloc.lent_percentage += amount;
                        }
                    }
                    allocations.get_mut(&client_id).unwrap().borrowed_from = borrowed_from;
                }
            }
        }

        for alloc in allocations.values() {
            tracing::debug!(
                client = %alloc.client_id,
                allocated_percentage = alloc.allocated_percentage,
                node_count = alloc.allocated_nodes.len(),
                "resources allocated"
            );
        }

        allocations
    }

    /// `true` iff `amount` percentage points can move from `from` to `to`
    /// without `from` lending more than `borrow_limit_pct` of its own
    /// guarantee, and without `to` exceeding its own `max_pct` ceiling.
    /// Exposed standalone (spec §4.3's own invariant needs it, and
    /// `allocate`'s scale-down pass uses the same check internally).
    pub fn can_borrow_resources(&self, from: &Client, to: &Client, amount: f64) -> bool {
        if !self.allow_borrowing {
            return false;
        }
        let max_borrowable = from.guaranteed_pct * (self.borrow_limit_pct / 100.0);
        if amount > max_borrowable {
            return false;
        }
        to.guaranteed_pct + amount <= to.max_pct
    }

    fn calculate_client_demand(
        &self,
        clients: &[Client],
        total_nodes: usize,
        allocations: &BTreeMap<ClientId, ResourceAllocation>,
    ) -> BTreeMap<ClientId, f64> {
        let _ = total_nodes;
        clients
            .iter()
            .map(|client| {
                let demand = if client.max_pct <= 0.0 {
                    0.0
                } else {
                    let current = allocations[&client.id].allocated_percentage;
                    if current >= client.max_pct {
                        0.0
                    } else {
                        (client.max_pct - current).min(client.guaranteed_pct * 0.5)
                    }
                };
                (client.id.clone(), demand)
            })
            .collect()
    }

    fn allocate_overflow_resources(
        &self,
        demand: &BTreeMap<ClientId, f64>,
        mut available: Vec<NodeId>,
    ) -> BTreeMap<ClientId, Vec<NodeId>> {
        let mut overflow: BTreeMap<ClientId, Vec<NodeId>> = BTreeMap::new();
        let total_demand: f64 = demand.values().sum();
        if total_demand <= 0.0 {
            return overflow;
        }

        let mut sorted: Vec<(ClientId, f64)> = demand.iter().map(|(k, v)| (k.clone(), *v)).collect();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));

        let available_len = available.len();
        for (client_id, demand_value) in &sorted {
            if *demand_value <= 0.0 || available.is_empty() {
                continue;
            }
            let demand_share = demand_value / total_demand;
            let node_share = ((demand_share * available_len as f64).floor() as usize).min(available.len());
            let taken: Vec<NodeId> = available.drain(0..node_share).collect();
            overflow.entry(client_id.clone()).or_default().extend(taken);
        }

        let mut round_robin: Vec<(ClientId, f64)> = sorted.into_iter().filter(|(_, d)| *d > 0.0).collect();
        while !available.is_empty() && !round_robin.is_empty() {
            let (client_id, demand_value) = round_robin.remove(0);
            if demand_value > 0.0 {
                overflow.entry(client_id.clone()).or_default().push(available.remove(0));
            }
            round_robin.push((client_id, demand_value));
        }

        overflow
    }
}
