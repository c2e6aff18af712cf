/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler configuration loading (spec §6).
//!
//! The expected YAML structure is:
//! ```yaml
//! scheduling_tick_seconds: 1.0
//! deadline_safety_margin_hours: 2.0
//! enable_preemption: true
//! allow_resource_borrowing: true
//! borrow_limit_pct: 50.0
//! max_job_error_count: 3
//! peak_hours_start: 8.0
//! peak_hours_end: 20.0
//! peak_energy_cost: 0.15
//! off_peak_energy_cost: 0.08
//! initial_energy_mode: balanced
//! ```
//! Every field is optional; absent fields fall back to the defaults
//! documented on [`SchedulerConfig`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::energy::EnergyMode;

fn default_tick_seconds() -> f64 {
    1.0
}
fn default_safety_margin_hours() -> f64 {
    2.0
}
fn default_true() -> bool {
    true
}
fn default_borrow_limit_pct() -> f64 {
    50.0
}
fn default_max_job_error_count() -> u32 {
    3
}
fn default_peak_hours_start() -> f64 {
    8.0
}
fn default_peak_hours_end() -> f64 {
    20.0
}
fn default_peak_energy_cost() -> f64 {
    0.15
}
fn default_off_peak_energy_cost() -> f64 {
    0.08
}
fn default_energy_mode() -> EnergyMode {
    EnergyMode::Balanced
}

/// Every tunable a host needs to wire up the core (spec §6, "External
/// Interfaces" / configuration surface). [`scheduler::SchedulerTunables`]
/// and [`crate::energy::EnergyOptimizer`]/[`crate::partitioner::ResourcePartitioner`]
/// are each constructed from the slice of this struct they actually need —
/// this type exists so a host has one file to load, not so the rest of the
/// crate depends on it.
///
/// [`scheduler::SchedulerTunables`]: crate::scheduler::SchedulerTunables
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_seconds")]
    pub scheduling_tick_seconds: f64,

    #[serde(default = "default_safety_margin_hours")]
    pub deadline_safety_margin_hours: f64,

    #[serde(default = "default_true")]
    pub enable_preemption: bool,

    #[serde(default = "default_true")]
    pub allow_resource_borrowing: bool,

    #[serde(default = "default_borrow_limit_pct")]
    pub borrow_limit_pct: f64,

    #[serde(default = "default_max_job_error_count")]
    pub max_job_error_count: u32,

    #[serde(default = "default_peak_hours_start")]
    pub peak_hours_start: f64,

    #[serde(default = "default_peak_hours_end")]
    pub peak_hours_end: f64,

    #[serde(default = "default_peak_energy_cost")]
    pub peak_energy_cost: f64,

    #[serde(default = "default_off_peak_energy_cost")]
    pub off_peak_energy_cost: f64,

    #[serde(default = "default_energy_mode")]
    pub initial_energy_mode: EnergyMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduling_tick_seconds: default_tick_seconds(),
            deadline_safety_margin_hours: default_safety_margin_hours(),
            enable_preemption: true,
            allow_resource_borrowing: true,
            borrow_limit_pct: default_borrow_limit_pct(),
            max_job_error_count: default_max_job_error_count(),
            peak_hours_start: default_peak_hours_start(),
            peak_hours_end: default_peak_hours_end(),
            peak_energy_cost: default_peak_energy_cost(),
            off_peak_energy_cost: default_off_peak_energy_cost(),
            initial_energy_mode: default_energy_mode(),
        }
    }
}

impl SchedulerConfig {
    /// Parses `path` as YAML. Missing fields fall back to their documented
    /// defaults; a missing file or malformed YAML is an error.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "loading scheduler configuration");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot open configuration file: {}", path.display()))?;
        let config: SchedulerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML file: {}", path.display()))?;
        Ok(config)
    }
}
