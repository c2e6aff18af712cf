/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core data model: [`Client`], [`Node`], [`Job`] and their sub-types.
//!
//! Mirrors `render_farm_manager.core.models` from the Python original, with
//! the usual Rust tightening: typed enums instead of bare strings, newtype
//! ids instead of bare `String`, and `Option<T>` instead of sentinel values
//! (`None` job id instead of `""`, `None` checkpoint time instead of an
//! epoch timestamp).

mod client;
mod job;
mod node;

pub use client::{Client, ServiceTier};
pub use job::{CheckpointRecord, Job, JobPriority, JobRequirements, JobStatus};
pub use node::{Node, NodeCapabilities, NodeStatus};

use std::fmt;

/// Stable identifier for a [`Client`]. Newtype around `String` so a client id
/// can never be passed where a [`NodeId`] or [`JobId`] is expected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ClientId(pub String);

/// Stable identifier for a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeId(pub String);

/// Stable identifier for a [`Job`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct JobId(pub String);

macro_rules! id_newtype {
    ($ty:ident) => {
        impl $ty {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

id_newtype!(ClientId);
id_newtype!(NodeId);
id_newtype!(JobId);
