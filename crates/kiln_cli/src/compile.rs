//! `kiln compile` — compile user sources with the built toolchain.

use kiln_pipeline::{compile_user_sources, Pipeline};

use crate::project::{compile_settings, load_project, settings};
use crate::{CompileArgs, GlobalArgs};

/// Runs the `kiln compile` command. Builds the toolchain first when its jar
/// is missing.
pub fn run(args: &CompileArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let settings = settings(&project, &args.toolchain, false)?;
    let request = compile_settings(&project, args)?;

    if !global.quiet {
        eprintln!(
            "   Compiling {} ({}) with kawa {}",
            request.src_dir.display(),
            request.language,
            settings.version
        );
    }

    let mut pipeline = Pipeline::new(settings);
    let count = compile_user_sources(&mut pipeline, &request)?;

    if !global.quiet {
        eprintln!(
            "    Compiled {count} file(s) into {}",
            request.dest_dir.display()
        );
    }
    Ok(0)
}
