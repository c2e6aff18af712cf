/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use super::ClientId;

/// Service-level tier a [`Client`] is contracted at.
///
/// Ordered `BASIC < STANDARD < PREMIUM < ENTERPRISE` — used by the
/// partitioner's descending-tier tie-break (spec §4.3 step 3) and nowhere
/// else; tier does not by itself grant resources, `guaranteed_pct` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum ServiceTier {
    Basic,
    Standard,
    Premium,
    Enterprise,
}

/// A tenant of the render farm.
///
/// Invariant: `guaranteed_pct <= max_pct`. The sum of `guaranteed_pct`
/// across all clients may legitimately exceed 100 — the
/// [`crate::partitioner::ResourcePartitioner`] scales proportionally rather
/// than rejecting the configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub service_tier: ServiceTier,

    /// Percentage of total node capacity this client is guaranteed,
    /// independent of demand. `[0, 100]`.
    pub guaranteed_pct: f64,

    /// Upper bound on this client's allocation even when borrowing.
    /// `[guaranteed_pct, 100]`.
    pub max_pct: f64,
}

impl Client {
    pub fn new(
        id: impl Into<ClientId>,
        name: impl Into<String>,
        service_tier: ServiceTier,
        guaranteed_pct: f64,
        max_pct: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            service_tier,
            guaranteed_pct,
            max_pct: max_pct.max(guaranteed_pct),
        }
    }
}
