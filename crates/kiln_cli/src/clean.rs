//! `kiln clean` — discard a version's workspace.

use std::path::Path;

use crate::project::{load_project, settings};
use crate::{CleanArgs, GlobalArgs};

/// Runs the `kiln clean` command.
///
/// Removes the extracted tree (sources, tools, classes, jars). With `--all`,
/// removes the downloaded archive as well.
pub fn run(args: &CleanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let workspace = settings(&project, &args.toolchain, false)?.workspace();

    let target = if args.all {
        workspace.base_dir().to_path_buf()
    } else {
        workspace.source_dir()
    };
    let removed = remove_tree(&target)?;

    if !global.quiet {
        if removed {
            eprintln!("     Removed {}", target.display());
        } else {
            eprintln!("     Nothing to clean at {}", target.display());
        }
    }
    Ok(0)
}

/// Removes `dir` if it exists. Returns whether anything was removed.
fn remove_tree(dir: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    if !dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(dir)
        .map_err(|e| format!("cannot remove {}: {e}", dir.display()))?;
    Ok(true)
}
