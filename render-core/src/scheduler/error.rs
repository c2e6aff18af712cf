/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Informational reasons a job was skipped during a cycle.
//!
//! `SkipReason` is carried inside [`super::Action::Skip`] — it is never
//! raised as a [`crate::error::CoreError`] and the scheduler never fails a
//! cycle because of it (spec §7: "Internal scheduling errors become Skip
//! actions in the Plan... they are never fatal").

use std::fmt;

use crate::model::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No `Online` node meets the job's capability requirements this cycle.
    NoSuitableNode,

    /// The owning client's allocation for this cycle is already exhausted
    /// by its currently running jobs.
    QuotaExhausted { allocation: usize, running: usize },

    /// A node inside the client's allocation meets the job's capability
    /// requirements but isn't currently `Online`, and preemption did not
    /// free it.
    CapabilityMismatch { node: NodeId },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSuitableNode => write!(f, "no online node meets this job's requirements"),
            SkipReason::QuotaExhausted { allocation, running } => write!(
                f,
                "client quota exhausted: {running} running of {allocation} allocated"
            ),
            SkipReason::CapabilityMismatch { node } => {
                write!(f, "node {node} matches capabilities but is not online")
            }
        }
    }
}
