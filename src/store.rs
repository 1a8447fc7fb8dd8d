//! Mirror store addressing and state probing
//!
//! The mirror store is a plain filesystem subtree holding one bare mirror per
//! remote repository, addressed deterministically by the repository's full
//! name. `owner/repo` maps to `root/owner/repo` with the owner preserved as a
//! nested directory. The store never deletes anything: repositories that
//! disappear remotely are retained locally.

use anyhow::{bail, Result};
use std::io;
use std::path::{Path, PathBuf};

/// What the filesystem reports for a mirror path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    /// Nothing exists at the path
    Absent,
    /// Something exists at the path (assumed to be a mirror until opened)
    Present,
}

/// The local mirror store rooted at a single directory
#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: PathBuf,
}

impl MirrorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic mirror path for a repository full name.
    ///
    /// Pure function of `full_name`: the same name always resolves to the
    /// same path and distinct names never collide. Names that would escape
    /// the store root are rejected.
    pub fn mirror_path(&self, full_name: &str) -> Result<PathBuf> {
        if full_name.is_empty() {
            bail!("Repository full name is empty");
        }
        if full_name.starts_with('/') {
            bail!("Repository full name {:?} is absolute", full_name);
        }

        let mut path = self.root.clone();
        for segment in full_name.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                bail!(
                    "Repository full name {:?} contains an invalid path segment",
                    full_name
                );
            }
            path.push(segment);
        }

        Ok(path)
    }

    /// Probe the filesystem for the mirror path.
    ///
    /// NotFound maps to `Absent`; any other probe failure (e.g. permission
    /// denied) propagates so the caller can treat it as a hard error for the
    /// item rather than misclassifying it as a missing mirror.
    pub fn probe(&self, path: &Path) -> io::Result<MirrorState> {
        match std::fs::metadata(path) {
            Ok(_) => Ok(MirrorState::Present),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(MirrorState::Absent),
            Err(e) => Err(e),
        }
    }

    /// Structural check that an existing directory is a bare mirror.
    ///
    /// Heuristic: a bare repository carries HEAD, objects/ and refs/ at its
    /// top level. A directory failing this check is a degenerate mirror and
    /// is left untouched for manual inspection.
    pub fn looks_like_mirror(&self, path: &Path) -> bool {
        path.join("HEAD").is_file()
            && path.join("objects").is_dir()
            && path.join("refs").is_dir()
    }

    /// Create the intermediate owner directories for a mirror path
    pub async fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}
