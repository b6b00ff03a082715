//! Modification-time helpers shared by every freshness check.
//!
//! Comparisons are "at least as new": an output whose mtime equals its
//! input's mtime is considered up to date, which matches filesystems with
//! coarse timestamp granularity.

use std::fs;
use std::io;
use std::path::Path;

use filetime::FileTime;

/// Returns the modification time of `path`, or `None` if it does not exist.
pub fn mtime(path: &Path) -> Option<FileTime> {
    fs::metadata(path)
        .ok()
        .map(|m| FileTime::from_last_modification_time(&m))
}

/// Returns the newest modification time among `paths`.
///
/// Missing paths are ignored. Returns `None` if none of them exist.
pub fn newest_mtime<P: AsRef<Path>>(paths: &[P]) -> Option<FileTime> {
    paths.iter().filter_map(|p| mtime(p.as_ref())).max()
}

/// Returns `true` if `output` exists and is at least as new as every input.
///
/// A missing input counts as infinitely new, so the output is stale.
pub fn is_up_to_date<P: AsRef<Path>>(output: &Path, inputs: &[P]) -> bool {
    let Some(out) = mtime(output) else {
        return false;
    };
    inputs
        .iter()
        .all(|input| matches!(mtime(input.as_ref()), Some(t) if t <= out))
}

/// Sets the modification time of `path` to now.
pub fn touch(path: &Path) -> io::Result<()> {
    filetime::set_file_mtime(path, FileTime::now())
}
