//! `kiln build` — run the incremental pipeline.

use kiln_pipeline::{Pipeline, StageOutcome};

use crate::project::{load_project, settings};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `kiln build` command.
///
/// Prints one status line per stage as it finishes. Returns exit code 0 on
/// success; pipeline failures are returned as errors.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let settings = settings(&project, &args.toolchain, args.rebuild)?;
    let workspace = settings.workspace();

    if !global.quiet {
        eprintln!("   Building kawa {}", settings.version);
        if settings.rebuild {
            eprintln!("  Rebuilding from {}", workspace.archive_path().display());
        }
    }

    let mut pipeline = Pipeline::new(settings);
    let report = pipeline.run_with(|result| {
        if global.quiet {
            return;
        }
        let label = match result.outcome {
            StageOutcome::Executed => "Ran",
            StageOutcome::Skipped => "Fresh",
        };
        eprintln!("{label:>12} {}", result.stage);
    })?;

    if !global.quiet {
        if report.is_noop() {
            eprintln!("  Up to date {}", workspace.dist_dir().display());
        } else {
            eprintln!("    Finished {}", workspace.main_jar().display());
            eprintln!("             {}", workspace.tools_jar().display());
        }
    }
    Ok(0)
}
