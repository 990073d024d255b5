//! Integrity manifest for a mirrored tree.
//!
//! After a run, the files it wrote (or, with [`Manifest::build`], every
//! regular file under the mirror root) are hashed with SHA-256 and recorded
//! as one `path, digest` line. The pass is sequential
//! and blocking; async callers should run it in `spawn_blocking`.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use repo_mirror::manifest::Manifest;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::build(Path::new("temp"))?;
//! manifest.write_to(Path::new("hashes.csv"))?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Errors while building or writing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The mirror tree could not be traversed.
    #[error("cannot walk {root}: {source}")]
    Walk {
        /// Mirror root being walked.
        root: PathBuf,
        /// The underlying traversal error.
        #[source]
        source: walkdir::Error,
    },

    /// A mirrored file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File being hashed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The manifest file could not be written.
    #[error("cannot write manifest {path}: {source}")]
    Write {
        /// Manifest output path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Mapping from mirrored file path to its lowercase hex SHA-256 digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    root: PathBuf,
    entries: BTreeMap<PathBuf, String>,
}

impl Manifest {
    /// Hashes every regular file under `root`.
    ///
    /// Symlinks are not followed. A missing root yields an empty manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Walk`] if a directory cannot be listed and
    /// [`ManifestError::Read`] if a file cannot be read.
    #[instrument(fields(root = %root.display()))]
    pub fn build(root: &Path) -> Result<Self, ManifestError> {
        let mut manifest = Self {
            root: root.to_path_buf(),
            entries: BTreeMap::new(),
        };
        if !root.exists() {
            debug!("mirror root does not exist; manifest is empty");
            return Ok(manifest);
        }

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|source| ManifestError::Walk {
                root: root.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_file() {
                manifest.insert(entry.path())?;
            }
        }

        info!(files = manifest.len(), "manifest built");
        Ok(manifest)
    }

    /// Hashes exactly `files`, which are paths under `root`.
    ///
    /// Used with a run's written paths, so files left on disk by earlier
    /// runs or by failed subtrees are never listed.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] if a listed file cannot be read.
    #[instrument(skip(files), fields(root = %root.display()))]
    pub fn from_files<I, P>(root: &Path, files: I) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut manifest = Self {
            root: root.to_path_buf(),
            entries: BTreeMap::new(),
        };
        for path in files {
            manifest.insert(path.as_ref())?;
        }
        info!(files = manifest.len(), "manifest built");
        Ok(manifest)
    }

    fn insert(&mut self, path: &Path) -> Result<(), ManifestError> {
        let digest = digest_file(path)?;
        let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
        self.entries.insert(relative, digest);
        Ok(())
    }

    /// Returns the mirror root the manifest was built from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the digest recorded for a path relative to the root.
    #[must_use]
    pub fn digest(&self, relative: &Path) -> Option<&str> {
        self.entries.get(relative).map(String::as_str)
    }

    /// Iterates `(relative path, digest)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.entries
            .iter()
            .map(|(path, digest)| (path.as_path(), digest.as_str()))
    }

    /// Number of files in the manifest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no files were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders one `<root>/<path>, <digest>` line per file.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (relative, digest) in &self.entries {
            out.push_str(&format!(
                "{}, {digest}\n",
                self.root.join(relative).display()
            ));
        }
        out
    }

    /// Writes the rendered manifest to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Write`] on any IO failure.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn write_to(&self, path: &Path) -> Result<(), ManifestError> {
        let to_error = |source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(to_error)?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(to_error)?);
        writer
            .write_all(self.render().as_bytes())
            .map_err(to_error)?;
        writer.flush().map_err(to_error)?;
        debug!(files = self.len(), "manifest written");
        Ok(())
    }
}

/// Returns the lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns [`ManifestError::Read`] if the file cannot be opened or read.
pub fn digest_file(path: &Path) -> Result<String, ManifestError> {
    let to_error = |source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(to_error)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(to_error)?;
    Ok(hex::encode(hasher.finalize()))
}
