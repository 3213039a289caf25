//! The shape of a partition run on disk.
//!
//! A shard is either a plain file or, once it has been re-split because of
//! skew, a directory of further shards. Every leaf below a split directory
//! belongs to the same original shard.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ShardTopError};
use crate::sharding::count_file_path;
use crate::sharding::utils::is_count_file;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardTree {
    /// A shard file with no further nested splitting.
    Leaf(PathBuf),
    /// A directory produced by partitioning, holding its shards in index order.
    Split {
        dir: PathBuf,
        children: Vec<ShardTree>,
    },
}

impl ShardTree {
    /// Builds the tree rooted at `path` by inspecting the filesystem.
    ///
    /// Count files are not shards and are skipped. Children are ordered by name,
    /// which is index order for `part-NNNNN` files.
    pub fn discover(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(ShardTopError::at_path(path))?;
        if !metadata.is_dir() {
            return Ok(ShardTree::Leaf(path.to_path_buf()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(ShardTopError::at_path(path))? {
            let entry = entry.map_err(ShardTopError::at_path(path))?;
            let child = entry.path();
            if !is_count_file(&child) {
                entries.push(child);
            }
        }
        entries.sort();

        let children = entries
            .iter()
            .map(|child| ShardTree::discover(child))
            .collect::<Result<Vec<_>>>()?;

        Ok(ShardTree::Split {
            dir: path.to_path_buf(),
            children,
        })
    }

    pub fn path(&self) -> &Path {
        match self {
            ShardTree::Leaf(path) => path,
            ShardTree::Split { dir, .. } => dir,
        }
    }

    /// The last path component, used to identify the shard in logs and errors.
    pub fn name(&self) -> String {
        self.path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().display().to_string())
    }

    pub fn is_split(&self) -> bool {
        matches!(self, ShardTree::Split { .. })
    }

    /// Direct children; empty for a leaf.
    pub fn children(&self) -> &[ShardTree] {
        match self {
            ShardTree::Leaf(_) => &[],
            ShardTree::Split { children, .. } => children,
        }
    }

    /// The `<path>_cnt` file the counter writes for this shard.
    pub fn count_file_path(&self) -> PathBuf {
        count_file_path(self.path())
    }

    /// All leaf files below this node, depth first.
    pub fn leaf_paths(&self) -> Vec<PathBuf> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(&self, leaves: &mut Vec<PathBuf>) {
        match self {
            ShardTree::Leaf(path) => leaves.push(path.clone()),
            ShardTree::Split { children, .. } => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    /// Number of nested split levels below this node. A leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}
