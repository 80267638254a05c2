//! Cleanup command implementation.

use super::Settings;

/// Runs the cleanup command.
pub fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let engine = settings.engine(true)?;
    let report = engine.cleanup_orphans()?;

    for op in &report.deleted {
        println!("✓ {op}");
    }
    for failure in &report.failures {
        println!("✗ {}: {}", failure.local_id, failure.error);
    }
    println!();
    println!(
        "Deleted {} orphaned resources, {} failed",
        report.deleted.len(),
        report.failures.len()
    );

    if let Some(reason) = report.aborted {
        return Err(format!("Cleanup aborted: {reason}").into());
    }
    Ok(())
}
