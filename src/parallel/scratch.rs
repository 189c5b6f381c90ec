use crate::error::PipelineError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Per-run scratch directory holding each worker's partial output.
///
/// Every file handed out by [`ScratchSpace::allocate`] is tracked so it can be
/// removed on any exit path. Dropping the space without calling
/// [`ScratchSpace::release`] still removes everything, best effort.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: Option<TempDir>,
    path: PathBuf,
    files: Mutex<Vec<PathBuf>>,
}

impl ScratchSpace {
    pub fn create_in(parent: &Path) -> Result<Self, PipelineError> {
        let scratch_err = |source| PipelineError::Scratch {
            path: parent.to_path_buf(),
            source,
        };
        fs::create_dir_all(parent).map_err(scratch_err)?;
        let dir = tempfile::Builder::new()
            .prefix("shiftpipe-scratch-")
            .tempdir_in(parent)
            .map_err(scratch_err)?;

        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
            files: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reserve the `seq`-th output location of worker `worker_id`.
    ///
    /// Names come from worker identity only, never from chunk content.
    pub fn allocate(&self, worker_id: usize, seq: usize) -> PathBuf {
        let path = self.path.join(format!("w{worker_id:03}-{seq:05}.part"));
        self.lock().push(path.clone());
        path
    }

    #[cfg(test)]
    fn tracked(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    /// Delete one result that will never be reassembled.
    pub fn discard(&self, path: &Path) {
        if let Err(e) = remove_if_present(path) {
            tracing::warn!("Failed to discard scratch file {}: {e}", path.display());
        }
    }

    /// Remove every tracked file and the directory itself.
    pub fn release(mut self) -> Result<(), PipelineError> {
        self.remove_tracked()?;
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|source| PipelineError::Scratch {
                path: self.path.clone(),
                source,
            }),
            None => Ok(()),
        }
    }

    fn remove_tracked(&self) -> Result<(), PipelineError> {
        let files = std::mem::take(&mut *self.lock());
        for file in files {
            remove_if_present(&file).map_err(|source| PipelineError::Scratch {
                path: file.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if self.dir.is_some()
            && let Err(e) = self.remove_tracked()
        {
            tracing::warn!("Scratch cleanup incomplete: {e}");
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
