/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Manual event-feed simulator for `render-core` — **not** for production.
//!
//! Loads a YAML script of scripted events and an optional
//! [`SchedulerConfig`] file, then drives a [`render_core::host::Scheduler`]
//! through the script in order: every entry but `tick` queues an
//! [`InboundEvent`]; a `tick` entry advances a [`FixedClock`] to the given
//! time and runs one scheduling cycle, printing the resulting [`Plan`].
//!
//! This mirrors the role the teacher workspace carves out for its
//! `pullpiri-sim` / `node-sim` binaries — a scripted stand-in for the
//! embedding host `render-core`'s own docs describe — minus their gRPC
//! wire transport, which is out of scope per spec.md's network-framing
//! non-goal.

mod script;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use render_core::audit::InMemoryAuditSink;
use render_core::clock::FixedClock;
use render_core::config::SchedulerConfig;
use render_core::events::{InboundEvent, OutboundDecision};
use render_core::host::Scheduler;
use render_core::scheduler::{Action, Plan};

use script::ScriptEvent;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Manual event-feed simulator for render-core",
    long_about = "Feeds a scripted sequence of host events (clients, nodes, jobs, \
                  failures, ticks) into render-core and prints the Plan and audit \
                  trail each tick produces. NOT a production host — see \
                  render-core's own docs for what a real embedding host must do."
)]
struct Cli {
    /// YAML file listing scripted events in order (see `script` module docs).
    #[arg(long)]
    script: PathBuf,

    /// Scheduler configuration YAML. Falls back to `SchedulerConfig::default()`
    /// when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full audit trail after the script finishes.
    #[arg(long)]
    audit_trail: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = load_config_or_default(cli.config.as_ref())?;

    let events = script::load(&cli.script)?;
    info!(steps = events.len(), path = %cli.script.display(), "loaded event script");

    let clock = Arc::new(FixedClock::new(0.0));
    let audit = Arc::new(InMemoryAuditSink::new());
    let mut scheduler = Scheduler::new(&config, clock.clone(), audit.clone());

    let mut ticks = 0usize;
    for event in events {
        match event {
            ScriptEvent::Tick { now } => {
                clock.set(now);
                let plan = scheduler.tick();
                ticks += 1;
                print_plan(ticks, now, &plan);
            }
            other => scheduler.submit_event(InboundEvent::from(other)),
        }
    }

    println!("--- {ticks} tick(s) run ---");

    if cli.audit_trail {
        print_audit_trail(&audit);
    }

    Ok(())
}

fn print_plan(tick: usize, now: f64, plan: &Plan) {
    println!("--- tick {tick} (t={now:.3}h): {} action(s) ---", plan.actions.len());
    for action in &plan.actions {
        match OutboundDecision::from_action(action) {
            Some(decision) => println!("  {decision:?}"),
            None => print_skip(action),
        }
    }
}

fn print_skip(action: &Action) {
    if let Action::Skip { job, reason } = action {
        println!("  Skip {{ job: {job}, reason: {reason} }}");
    }
}

fn print_audit_trail(audit: &InMemoryAuditSink) {
    let events = audit.events();
    println!("--- audit trail ({} event(s)) ---", events.len());
    for event in events {
        let mut line = format!("  [{:?}] {}", event.event_type, event.message);
        if let Some(client) = &event.client_id {
            line.push_str(&format!(" client={client}"));
        }
        if let Some(node) = &event.node_id {
            line.push_str(&format!(" node={node}"));
        }
        if let Some(job) = &event.job_id {
            line.push_str(&format!(" job={job}"));
        }
        println!("{line}");
    }
}

fn load_config_or_default(path: Option<&PathBuf>) -> Result<SchedulerConfig> {
    match path {
        Some(p) => SchedulerConfig::load_from_file(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(SchedulerConfig::default()),
    }
}
