//! Artifact tree: where received configuration files land.
//!
//! Devices push their files into a staging root, one subdirectory per
//! device:
//!
//! ```text
//! <staging>/
//!     core-sw1/running-config
//!     core-sw1/startup-config
//!     fw1/current-config
//! ```
//!
//! Receivers do not create directories, so [`ArtifactStore::prepare`] makes
//! them before the run. When the run is over, [`ArtifactStore::publish`]
//! moves the staged tree into the repository directory.

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{ArtifactError, DriverError, Result};

/// The staging root for one run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    staging: PathBuf,
}

impl ArtifactStore {
    pub fn new(staging: impl Into<PathBuf>) -> Self {
        Self {
            staging: staging.into(),
        }
    }

    /// The staging root.
    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// Staging directory of `device`.
    pub fn device_dir(&self, device: &str) -> Result<PathBuf> {
        if device.is_empty()
            || device == "."
            || device == ".."
            || device.contains(['/', '\\'])
        {
            return Err(ArtifactError::InvalidName(device.to_string()).into());
        }
        Ok(self.staging.join(device))
    }

    /// Create the staging root and one directory per device.
    pub async fn prepare<'a>(&self, devices: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for device in devices {
            let dir = self.device_dir(device)?;
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| io_error("create", &dir, source))?;
        }
        debug!("staging prepared at {}", self.staging.display());
        Ok(())
    }

    /// Move `received` (relative to the staging root) to
    /// `<staging>/<device>/<target>`.
    pub async fn relocate(&self, device: &str, received: &str, target: &str) -> Result<PathBuf> {
        let from = self.staging.join(received);
        let dir = self.device_dir(device)?;
        let to = dir.join(target);

        let moved = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::rename(&from, &to).await
        }
        .await;

        match moved {
            Ok(()) => {
                debug!("{device}: relocated {} to {}", from.display(), to.display());
                Ok(to)
            }
            Err(source) => Err(DriverError::Relocation { from, to, source }.into()),
        }
    }

    /// Move every staged file into `repository`, replacing existing files,
    /// then remove the staging root. Returns the number of files moved.
    pub async fn publish(&self, repository: &Path) -> Result<usize> {
        let mut moved = 0;
        let mut pending = vec![(self.staging.clone(), repository.to_path_buf())];

        while let Some((src_dir, dst_dir)) = pending.pop() {
            tokio::fs::create_dir_all(&dst_dir)
                .await
                .map_err(|source| io_error("create", &dst_dir, source))?;

            let mut entries = tokio::fs::read_dir(&src_dir)
                .await
                .map_err(|source| io_error("read", &src_dir, source))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|source| io_error("read", &src_dir, source))?
            {
                let src = entry.path();
                let dst = dst_dir.join(entry.file_name());
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|source| io_error("stat", &src, source))?;

                if file_type.is_dir() {
                    pending.push((src, dst));
                } else {
                    move_file(&src, &dst).await?;
                    moved += 1;
                }
            }
        }

        tokio::fs::remove_dir_all(&self.staging)
            .await
            .map_err(|source| io_error("remove", &self.staging, source))?;
        info!("published {moved} files to {}", repository.display());
        Ok(moved)
    }
}

/// Rename, falling back to copy and delete across filesystems.
async fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if tokio::fs::rename(src, dst).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(src, dst)
        .await
        .map_err(|source| io_error("copy", src, source))?;
    tokio::fs::remove_file(src)
        .await
        .map_err(|source| io_error("remove", src, source))?;
    Ok(())
}

fn io_error(op: &'static str, path: &Path, source: io::Error) -> ArtifactError {
    ArtifactError::Io {
        op,
        path: path.to_path_buf(),
        source,
    }
}
