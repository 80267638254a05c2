//! Sync-all command implementation.

use super::Settings;
use catsync_engine::SyncAllReport;
use catsync_protocol::SyncOperation;

/// Runs the sync-all command.
pub fn run(settings: &Settings, dry_run: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if dry_run {
        let engine = settings.engine(false)?;
        let plan = engine.plan_all()?;
        match format {
            "json" => println!("{}", serde_json::to_string_pretty(&plan)?),
            _ => print_plan(settings, &plan),
        }
        return Ok(());
    }

    let engine = settings.engine(true)?;
    let report = engine.sync_all()?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report),
    }

    if let Some(reason) = &report.aborted {
        return Err(format!("Sync aborted: {reason}").into());
    }
    Ok(())
}

fn print_plan(settings: &Settings, plan: &[SyncOperation]) {
    println!("Planned operations for {}", settings.domain);
    if !settings.sync_enabled {
        println!("  (sync disabled, nothing to do)");
        return;
    }
    for op in plan {
        println!("  {op}");
    }
    println!();
    println!("  Total: {}", plan.len());
}

fn print_report(report: &SyncAllReport) {
    if !report.enabled {
        println!("Sync disabled for {}", report.domain);
        return;
    }

    println!("Sync of {} finished in {:.2?}", report.domain, report.duration);
    println!("  Attempted:         {}", report.attempted);
    println!("  Created:           {}", report.created());
    println!("  Updated:           {}", report.updated());
    println!("  Partially updated: {}", report.partially_updated);
    println!("  Failed:            {}", report.failures.len());

    if !report.failures.is_empty() {
        println!();
        println!("Failures:");
        for failure in &report.failures {
            let hint = if failure.retryable { " (retryable)" } else { "" };
            println!("  {}: {}{}", failure.local_id, failure.error, hint);
        }
    }
    if let Some(reason) = &report.aborted {
        println!();
        println!("✗ Aborted: {reason}");
    }
}
