//! Locating `kiln.toml` and turning flags into settings.

use std::path::{Path, PathBuf};

use kiln_config::{
    load_config, load_config_from_str, resolve_compile_settings, resolve_settings,
    CompileOverrides, CompileSettings, KilnConfig, Overrides, Settings, CONFIG_FILE,
};

use crate::{CompileArgs, GlobalArgs, ToolchainArgs};

/// The loaded configuration and the directory its relative paths resolve
/// against.
pub struct Project {
    /// Parsed `kiln.toml`, or defaults when there is none.
    pub config: KilnConfig,
    /// Directory holding `kiln.toml`, or the current directory.
    pub dir: PathBuf,
}

/// Loads the project configuration.
///
/// `--config` may name the file or its directory. Without it, `kiln.toml` in
/// the current directory is used if present; a missing file is not an error,
/// since everything can be given on the command line.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    match &global.config {
        Some(path) if path.is_file() => {
            let content = std::fs::read_to_string(path)?;
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok(Project {
                config: load_config_from_str(&content)?,
                dir,
            })
        }
        Some(dir) => Ok(Project {
            config: load_config(dir)?,
            dir: dir.clone(),
        }),
        None => {
            let dir = std::env::current_dir()?;
            let config = if dir.join(CONFIG_FILE).is_file() {
                load_config(&dir)?
            } else {
                KilnConfig::default()
            };
            Ok(Project { config, dir })
        }
    }
}

/// Pipeline settings from the project and the toolchain flags.
pub fn settings(
    project: &Project,
    toolchain: &ToolchainArgs,
    rebuild: bool,
) -> Result<Settings, Box<dyn std::error::Error>> {
    let overrides = Overrides {
        version: toolchain.toolchain_version.clone(),
        cache_dir: toolchain.cache_dir.clone(),
        rebuild,
    };
    Ok(resolve_settings(
        &project.config,
        &overrides,
        &project.dir,
        |key| std::env::var(key).ok(),
    )?)
}

/// User-compilation settings from the project and the compile flags.
pub fn compile_settings(
    project: &Project,
    args: &CompileArgs,
) -> Result<CompileSettings, Box<dyn std::error::Error>> {
    let overrides = CompileOverrides {
        src_dir: args.src.clone(),
        dest_dir: args.dest.clone(),
        language: args.language.clone(),
        args: args.args.clone(),
    };
    Ok(resolve_compile_settings(
        &project.config,
        &overrides,
        &project.dir,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(config: Option<PathBuf>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config,
        }
    }

    #[test]
    fn config_file_path_anchors_relative_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ci.toml");
        std::fs::write(
            &file,
            "[toolchain]\nversion = \"3.1.1\"\ncache_dir = \".kiln-cache\"\n",
        )
        .unwrap();
        let project = load_project(&global(Some(file))).unwrap();
        assert_eq!(project.dir, dir.path());
        let s = settings(&project, &ToolchainArgs::default(), false).unwrap();
        assert_eq!(s.cache_dir, dir.path().join(".kiln-cache"));
        assert_eq!(s.version.as_str(), "3.1.1");
    }

    #[test]
    fn config_dir_without_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_project(&global(Some(dir.path().to_path_buf()))).is_err());
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[toolchain]\nversion = \"3.1.1\"\ncache_dir = \"c\"\n",
        )
        .unwrap();
        let project = load_project(&global(Some(dir.path().to_path_buf()))).unwrap();
        let flags = ToolchainArgs {
            toolchain_version: Some("1.0.0".to_string()),
            cache_dir: None,
        };
        let s = settings(&project, &flags, true).unwrap();
        assert_eq!(s.version.as_str(), "1.0.0");
        assert!(s.rebuild);
    }
}
