//! Kiln CLI: builds a pinned Kawa toolchain from source.
//!
//! `kiln build` runs the incremental pipeline, `kiln status` shows which
//! stages are fresh, `kiln compile` compiles user sources with the built
//! toolchain, and `kiln clean` discards a version's workspace.

#![warn(missing_docs)]

mod build;
mod clean;
mod compile;
mod logging;
mod project;
mod status;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

/// Kiln — incremental builder for the Kawa toolchain.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kawa toolchain builder")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `kiln.toml`, or to the directory holding it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, compile and package the toolchain, skipping fresh stages.
    Build(BuildArgs),
    /// Show which stages are fresh without running anything.
    Status(ToolchainArgs),
    /// Compile user sources with the built toolchain.
    Compile(CompileArgs),
    /// Remove a version's extracted workspace.
    Clean(CleanArgs),
}

/// Selects the toolchain version and cache; overrides `kiln.toml`.
#[derive(Args, Debug, Default, Clone)]
pub struct ToolchainArgs {
    /// Toolchain release to build (e.g. `3.1.1`).
    #[arg(long = "version", value_name = "VERSION")]
    pub toolchain_version: Option<String>,

    /// Root directory of the per-version workspaces.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for `kiln build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Version and cache selection.
    #[command(flatten)]
    pub toolchain: ToolchainArgs,

    /// Discard the extracted workspace and build from the archive again.
    #[arg(long)]
    pub rebuild: bool,
}

/// Arguments for `kiln compile`.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Version and cache selection.
    #[command(flatten)]
    pub toolchain: ToolchainArgs,

    /// Directory of sources to compile.
    #[arg(long, value_name = "DIR")]
    pub src: Option<PathBuf>,

    /// Output directory for compiled classes.
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Source language (e.g. `scheme`).
    #[arg(long)]
    pub language: Option<String>,

    /// Extra compiler argument line.
    #[arg(long, value_name = "LINE", allow_hyphen_values = true)]
    pub args: Option<String>,
}

/// Arguments for `kiln clean`.
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Version and cache selection.
    #[command(flatten)]
    pub toolchain: ToolchainArgs,

    /// Also remove the downloaded archive.
    #[arg(long)]
    pub all: bool,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Status(ref args) => status::run(args, &global),
        Command::Compile(ref args) => compile::run(args, &global),
        Command::Clean(ref args) => clean::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_build_with_overrides() {
        let cli = Cli::parse_from([
            "kiln",
            "build",
            "--version",
            "3.1.1",
            "--cache-dir",
            "/tmp/kiln",
            "--rebuild",
        ]);
        match cli.command {
            Command::Build(args) => {
                assert_eq!(args.toolchain.toolchain_version.as_deref(), Some("3.1.1"));
                assert_eq!(args.toolchain.cache_dir, Some(PathBuf::from("/tmp/kiln")));
                assert!(args.rebuild);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_build_defaults() {
        let cli = Cli::parse_from(["kiln", "build"]);
        match cli.command {
            Command::Build(args) => {
                assert!(args.toolchain.toolchain_version.is_none());
                assert!(!args.rebuild);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_compile_with_hyphenated_args() {
        let cli = Cli::parse_from([
            "kiln",
            "compile",
            "--src",
            "src/scheme",
            "--dest",
            "out",
            "--language",
            "scheme",
            "--args",
            "--warn-undefined-variable --warn-unknown-member",
        ]);
        match cli.command {
            Command::Compile(args) => {
                assert_eq!(args.src, Some(PathBuf::from("src/scheme")));
                assert_eq!(args.language.as_deref(), Some("scheme"));
                assert_eq!(
                    args.args.as_deref(),
                    Some("--warn-undefined-variable --warn-unknown-member")
                );
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["kiln", "status", "-q", "--config", "ci/kiln.toml"]);
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("ci/kiln.toml")));
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn parse_clean_all() {
        let cli = Cli::parse_from(["kiln", "clean", "--all"]);
        assert!(matches!(cli.command, Command::Clean(CleanArgs { all: true, .. })));
    }
}
