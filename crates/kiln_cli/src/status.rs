//! `kiln status` — report stage freshness without building.

use kiln_pipeline::Pipeline;

use crate::project::{load_project, settings};
use crate::{GlobalArgs, ToolchainArgs};

/// Runs the `kiln status` command.
///
/// Prints one line per stage to stdout. Exit code 0 when every stage is
/// fresh, 1 otherwise.
pub fn run(args: &ToolchainArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let settings = settings(&project, args, false)?;
    let workspace = settings.workspace();
    let pipeline = Pipeline::new(settings);

    if global.verbose {
        eprintln!("   Workspace {}", workspace.source_dir().display());
    }
    let status = pipeline.status();
    for (stage, fresh) in &status {
        println!("{:>6} {stage}", if *fresh { "fresh" } else { "stale" });
        if global.verbose {
            let desc = pipeline.describe(*stage);
            eprintln!(
                "             {} inputs, {} outputs",
                desc.inputs.len(),
                desc.outputs.len()
            );
        }
    }
    Ok(if status.iter().all(|(_, fresh)| *fresh) { 0 } else { 1 })
}
