use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::config::DirectoryConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

/// Creates the logs and data directories and checks the data one is writable.
pub fn ensure_directories(cfg: &DirectoryConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(&cfg.logs_dir)?;
    let data_dir = ensure_dir(&cfg.data_dir)?;
    check_writable(&data_dir)?;

    let db_path = data_dir.join(&cfg.db_filename);
    Ok(ResolvedPaths {
        logs_dir,
        data_dir,
        db_path,
    })
}

fn check_writable(dir: &Path) -> Result<()> {
    let marker = dir.join(".write-test");
    fs::write(&marker, b"ok")
        .with_context(|| format!("data directory {} is not writable", dir.display()))?;
    fs::remove_file(&marker)?;
    Ok(())
}

fn ensure_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("failed to create directory {}", path))?;
    }
    Ok(dir.canonicalize().unwrap_or(dir))
}
