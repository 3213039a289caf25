use std::ffi::OsString;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use log::warn;

use crate::constants::{COUNT_FILE_SUFFIX, PARTED_DIR_SUFFIX, PART_FILE_PREFIX, PART_INDEX_WIDTH};
use crate::error::{Result, ShardTopError};

/// `part-00042` for index 42.
pub fn part_file_name(index: usize) -> String {
    format!("{}{:0width$}", PART_FILE_PREFIX, index, width = PART_INDEX_WIDTH)
}

/// The directory a file is partitioned into: `<path>-parted`.
pub fn parted_dir_path(path: &Path) -> PathBuf {
    with_suffix(path, PARTED_DIR_SUFFIX)
}

/// The count file of a shard: `<path>_cnt`.
pub fn count_file_path(path: &Path) -> PathBuf {
    with_suffix(path, COUNT_FILE_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

pub(crate) fn is_count_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(COUNT_FILE_SUFFIX))
        .unwrap_or(false)
}

/// Helper function to find the count files below a directory, sorted by path.
///
/// With `recursive` the whole tree is searched, otherwise only the directory itself.
pub(crate) fn find_count_paths(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let escaped_dir = Pattern::escape(&dir.to_string_lossy());
    let glob_pattern = if recursive {
        format!("{}/**/*{}", escaped_dir, COUNT_FILE_SUFFIX)
    } else {
        format!("{}/*{}", escaped_dir, COUNT_FILE_SUFFIX)
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob(&glob_pattern)
        .map_err(|e| ShardTopError::Other(format!("Invalid glob pattern: {}", e)))?
    {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!("Error with glob entry: {}", e),
        }
    }

    if paths.is_empty() {
        return Err(ShardTopError::Other(format!(
            "No count files found in {:?}",
            dir
        )));
    }

    paths.sort();
    Ok(paths)
}
