/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Host-facing error type for this crate.
//!
//! [`CoreError`] is the only error type any public API returns to a host.
//! Internal, expected outcomes that a host should not treat as a fault —
//! "this job isn't eligible this cycle because its quota is exhausted" —
//! are modeled separately as [`crate::scheduler::SkipReason`] and never
//! surface as a `CoreError`.

use thiserror::Error;

use crate::model::{ClientId, JobId, NodeId};

/// Failure returned from a `render-core` public entry point.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("unknown job: {0}")]
    UnknownJob(JobId),

    #[error("node {node} is already running job {job}")]
    NodeBusy { node: NodeId, job: JobId },

    #[error("submitting job {job} would create a circular dependency")]
    CircularDependency { job: JobId },

    #[error("progress update for job {job} ({attempted:.1}%) is below its last checkpoint ({checkpoint:.1}%)")]
    InvalidProgress {
        job: JobId,
        attempted: f64,
        checkpoint: f64,
    },
}
