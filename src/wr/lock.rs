use crate::error::WrError;
use crate::wr::paths::WrPaths;
use crate::wr::util::now_epoch_secs;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPayload {
    pub pid: u32,
    pub build_uuid: String,
    pub start_time: i64,
}

/// Exclusive hold on the data directory for one engine run. Released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn acquire(paths: &WrPaths) -> Result<RunLock> {
    fs::create_dir_all(&paths.data_dir)
        .with_context(|| format!("failed to create {}", paths.data_dir.display()))?;

    let path = paths.lock_file.clone();
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        let holder = read_holder(&path)
            .map(|h| format!(" (pid {})", h.pid))
            .unwrap_or_default();
        return Err(WrError::LockHeld(format!("{}{holder}", path.display())).into());
    }

    let payload = LockPayload {
        pid: std::process::id(),
        build_uuid: env!("BUILD_UUID").to_string(),
        start_time: now_epoch_secs()?,
    };
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serde_json::to_string(&payload)?.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.flush()?;

    Ok(RunLock { file, path })
}

/// Holder recorded in the lock file, if a run is (or was) in progress.
pub fn read_holder(path: &Path) -> Option<LockPayload> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(raw.trim()).ok()
}
