//! Description of one external compiler or generator call.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const CLASSPATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const CLASSPATH_SEPARATOR: &str = ":";

/// Which JDK launcher to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// The Java compiler.
    Javac,
    /// The Java application launcher.
    Java,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Javac => f.write_str("javac"),
            Tool::Java => f.write_str("java"),
        }
    }
}

/// Locations of the JDK launchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaTools {
    /// Path to `javac`.
    pub javac: PathBuf,
    /// Path to `java`.
    pub java: PathBuf,
}

impl JavaTools {
    /// Uses `<home>/bin/{javac,java}`, or the bare names (resolved through
    /// `PATH`) when no home is given.
    pub fn from_home(home: Option<&Path>) -> Self {
        match home {
            Some(home) => Self {
                javac: home.join("bin").join("javac"),
                java: home.join("bin").join("java"),
            },
            None => Self {
                javac: PathBuf::from("javac"),
                java: PathBuf::from("java"),
            },
        }
    }

    /// Path of the launcher for `tool`.
    pub fn program(&self, tool: Tool) -> &Path {
        match tool {
            Tool::Javac => &self.javac,
            Tool::Java => &self.java,
        }
    }
}

/// One external process call: explicit sources, classpath, destination and
/// flags.
///
/// For [`Tool::Javac`] the argument order is
/// `-d <dest> -sourcepath <dir> -classpath <cp> <flags> <sources>`. For
/// [`Tool::Java`] it is `-cp <cp> <main> -d <dest> <flags> <sources>`, the
/// destination being passed to the program rather than the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Launcher to run.
    pub tool: Tool,
    /// Main class, for [`Tool::Java`].
    pub main_class: Option<String>,
    /// Classpath entries, in order.
    pub classpath: Vec<PathBuf>,
    /// Output directory.
    pub destination: Option<PathBuf>,
    /// Where `javac` looks for referenced sources.
    pub source_path: Option<PathBuf>,
    /// Flags placed before the sources.
    pub flags: Vec<String>,
    /// Source files, in order.
    pub sources: Vec<PathBuf>,
    /// Working directory of the process.
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    /// A `javac` call writing classes to `destination`.
    pub fn javac(destination: impl Into<PathBuf>) -> Self {
        Self {
            tool: Tool::Javac,
            main_class: None,
            classpath: Vec::new(),
            destination: Some(destination.into()),
            source_path: None,
            flags: Vec::new(),
            sources: Vec::new(),
            working_dir: None,
        }
    }

    /// A `java` call running `main_class`.
    pub fn java(main_class: impl Into<String>) -> Self {
        Self {
            tool: Tool::Java,
            main_class: Some(main_class.into()),
            classpath: Vec::new(),
            destination: None,
            source_path: None,
            flags: Vec::new(),
            sources: Vec::new(),
            working_dir: None,
        }
    }

    /// Appends classpath entries.
    pub fn classpath<I, P>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.classpath.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Sets the output directory.
    pub fn destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination = Some(dir.into());
        self
    }

    /// Sets the `javac` source path.
    pub fn source_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_path = Some(dir.into());
        self
    }

    /// Appends one flag.
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Appends several flags.
    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Appends source files.
    pub fn sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The classpath joined with the platform separator, if any.
    pub fn joined_classpath(&self) -> Option<OsString> {
        if self.classpath.is_empty() {
            return None;
        }
        let mut joined = OsString::new();
        for (i, entry) in self.classpath.iter().enumerate() {
            if i > 0 {
                joined.push(CLASSPATH_SEPARATOR);
            }
            joined.push(entry);
        }
        Some(joined)
    }

    /// Launcher arguments up to, but not including, the sources.
    pub fn leading_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self.tool {
            Tool::Javac => {
                if let Some(dest) = &self.destination {
                    args.push("-d".into());
                    args.push(dest.into());
                }
                if let Some(sp) = &self.source_path {
                    args.push("-sourcepath".into());
                    args.push(sp.into());
                }
                if let Some(cp) = self.joined_classpath() {
                    args.push("-classpath".into());
                    args.push(cp);
                }
            }
            Tool::Java => {
                if let Some(cp) = self.joined_classpath() {
                    args.push("-cp".into());
                    args.push(cp);
                }
                if let Some(main) = &self.main_class {
                    args.push(main.into());
                }
                if let Some(dest) = &self.destination {
                    args.push("-d".into());
                    args.push(dest.into());
                }
            }
        }
        args.extend(self.flags.iter().map(OsString::from));
        args
    }

    /// Every argument, sources last.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = self.leading_args();
        args.extend(self.sources.iter().map(OsString::from));
        args
    }

    /// Human-readable command line, for logs.
    pub fn display(&self, tools: &JavaTools) -> String {
        let mut line = tools.program(self.tool).display().to_string();
        for arg in self.leading_args() {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        match self.sources.len() {
            0 => {}
            1 => {
                line.push(' ');
                line.push_str(&self.sources[0].display().to_string());
            }
            n => line.push_str(&format!(" <{n} sources>")),
        }
        line
    }
}
