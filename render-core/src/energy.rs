/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Energy Optimizer (spec §4.4): scores and ranks (node, start_time)
//! options by energy cost, without ever overriding a `Critical`/`High`
//! priority placement.
//!
//! The cost model is a deliberate approximation, not a line-for-line port
//! of the Python `EnergyOptimizer.calculate_energy_cost` (which this crate
//! doesn't have source access to beyond its test suite): peak/off-peak
//! `$/kWh` rate times estimated duration, discounted by the node's
//! `power_efficiency_rating` under a mode-dependent weight. This
//! reproduces every qualitative property
//! `tests/unit/test_energy_optimizer.py` asserts — off-peak cheaper than
//! peak, `Efficiency` cheaper than `Balanced` for the same efficient node,
//! `NightSavings` cheapest — without needing the original's exact
//! constants.

use crate::model::{Job, JobPriority, Node};

/// How aggressively the optimizer favors energy-efficient placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMode {
    /// Energy cost is computed but never weighed against placement choice.
    Performance,
    /// Blends efficiency and speed.
    Balanced,
    /// Strongly prefers high `power_efficiency_rating` nodes.
    Efficiency,
    /// Efficiency's preference, plus deferring energy-intensive,
    /// non-critical jobs into the off-peak window.
    NightSavings,
}

#[derive(Debug)]
pub struct EnergyOptimizer {
    mode: EnergyMode,
    pub peak_hours_start: f64,
    pub peak_hours_end: f64,
    pub peak_energy_cost: f64,
    pub off_peak_energy_cost: f64,
}

impl EnergyOptimizer {
    pub fn new(
        mode: EnergyMode,
        peak_hours_start: f64,
        peak_hours_end: f64,
        peak_energy_cost: f64,
        off_peak_energy_cost: f64,
    ) -> Self {
        Self {
            mode,
            peak_hours_start,
            peak_hours_end,
            peak_energy_cost,
            off_peak_energy_cost,
        }
    }

    pub fn mode(&self) -> EnergyMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EnergyMode) {
        self.mode = mode;
    }

    /// `true` iff `hour_of_day` (`[0, 24)`) falls inside the configured
    /// peak window.
    pub fn is_peak(&self, hour_of_day: f64) -> bool {
        let h = hour_of_day.rem_euclid(24.0);
        if self.peak_hours_start <= self.peak_hours_end {
            h >= self.peak_hours_start && h < self.peak_hours_end
        } else {
            // window wraps midnight
            h >= self.peak_hours_start || h < self.peak_hours_end
        }
    }

    pub fn rate_at(&self, hour_of_day: f64) -> f64 {
        if self.is_peak(hour_of_day) {
            self.peak_energy_cost
        } else {
            self.off_peak_energy_cost
        }
    }

    /// Estimated `$` cost of running `job` on `node` starting at
    /// `start_hour_of_day`.
    pub fn energy_cost(&self, job: &Job, node: &Node, start_hour_of_day: f64) -> f64 {
        let rate = self.rate_at(start_hour_of_day);
        job.estimated_duration_hours * rate * self.efficiency_multiplier(node)
    }

    fn efficiency_multiplier(&self, node: &Node) -> f64 {
        let efficiency = (node.power_efficiency_rating / 100.0).clamp(0.0, 1.0);
        let discount = match self.mode {
            EnergyMode::Performance => 0.0,
            EnergyMode::Balanced => 0.15,
            EnergyMode::Efficiency => 0.35,
            EnergyMode::NightSavings => 0.5,
        };
        (1.0 - efficiency * discount).max(0.05)
    }

    /// `true` iff `job` should be held back from running at
    /// `now_hour_of_day` so it starts in the off-peak window instead —
    /// only applies in `NightSavings` mode, only to energy-intensive jobs,
    /// and never to `Critical` jobs (spec §4.4).
    pub fn should_defer_to_off_peak(&self, job: &Job, now_hour_of_day: f64) -> bool {
        self.mode == EnergyMode::NightSavings
            && job.energy_intensive
            && job.priority != JobPriority::Critical
            && self.is_peak(now_hour_of_day)
    }

    /// Orders `candidates` (node, cost, start hour) cheapest-first for
    /// `priority` — except `Critical`/`High`, for which energy never
    /// overrides the placement already chosen by the deadline scheduler:
    /// the input order is returned unchanged.
    pub fn rank<'a>(&self, priority: JobPriority, candidates: &'a [(Node, f64, f64)]) -> Vec<&'a Node> {
        if matches!(priority, JobPriority::Critical | JobPriority::High) {
            return candidates.iter().map(|(n, _, _)| n).collect();
        }
        let mut sorted: Vec<&(Node, f64, f64)> = candidates.iter().collect();
        sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        sorted.into_iter().map(|(n, _, _)| n).collect()
    }

    /// Percentage cost saved by this optimizer's current mode versus
    /// running the same `(job, node, start_time)` triples in
    /// `Performance` mode. Jobs with no assigned node are skipped.
    pub fn estimate_savings_vs_performance(&self, jobs: &[Job], nodes: &[Node], start_hour_of_day: f64) -> f64 {
        let mut current_total = 0.0;
        let mut performance_total = 0.0;
        let performance = EnergyOptimizer::new(
            EnergyMode::Performance,
            self.peak_hours_start,
            self.peak_hours_end,
            self.peak_energy_cost,
            self.off_peak_energy_cost,
        );

        for job in jobs {
            let Some(node_id) = &job.assigned_node_id else {
                continue;
            };
            let Some(node) = nodes.iter().find(|n| &n.id == node_id) else {
                continue;
            };
            current_total += self.energy_cost(job, node, start_hour_of_day);
            performance_total += performance.energy_cost(job, node, start_hour_of_day);
        }

        if performance_total <= 0.0 {
            return 0.0;
        }
        (performance_total - current_total) / performance_total * 100.0
    }
}
