use anyhow::{Context, Result};
use log::warn;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Raw copy of everything a process writes on stdout and stderr.
///
/// Cloned into each stream reader. The first write failure is logged and
/// stops further teeing; the run itself carries on.
#[derive(Clone)]
pub struct OutputFile {
    path: PathBuf,
    file: Arc<Mutex<Option<File>>>,
}

impl OutputFile {
    /// Relative paths are taken from `cwd`, else from the project directory.
    pub fn resolve(raw: &str, cwd: Option<&Path>, project_dir: Option<&Path>) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match cwd.or(project_dir) {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }

    /// Opens (truncating) the file once, before the process is spawned.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to open output file: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(Some(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, bytes: &[u8]) {
        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        let Some(file) = guard.as_mut() else {
            return;
        };
        if let Err(e) = file.write_all(bytes) {
            warn!("Stopped writing output to {}: {}", self.path.display(), e);
            *guard = None;
        }
    }
}
