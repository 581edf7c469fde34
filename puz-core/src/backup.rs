//! Timestamped backups of puzzle files modified in place
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::puzfile::PuzFile;

pub struct BackupManager {
    backup_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub filename: String,
    pub timestamp: DateTime<Local>,
    pub size: u64,
    pub is_valid: bool,
    pub is_scrambled: bool,
}

impl BackupManager {
    pub fn new(backup_dir: PathBuf) -> Self {
        Self { backup_dir }
    }

    /// Keeps backups in a `backup` directory next to `puzzle_path`.
    pub fn beside(puzzle_path: &Path) -> Self {
        let parent = puzzle_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(parent.join("backup"))
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Lists all .bak files sorted by timestamp (newest first)
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir).context("Failed to read backup directory")? {
            let entry = entry?;
            let path = entry.path();

            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("bak") {
                continue;
            }

            let metadata = fs::metadata(&path)?;
            let timestamp: DateTime<Local> = metadata.modified()?.into();

            let filename = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();

            let parsed = fs::read(&path).ok().and_then(|data| PuzFile::parse(&data).ok());

            backups.push(BackupInfo {
                path,
                filename,
                timestamp,
                size: metadata.len(),
                is_valid: parsed.is_some(),
                is_scrambled: parsed.is_some_and(|p| p.is_scrambled()),
            });
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(backups)
    }

    /// `<name>.bak` in the backup directory, or `<name>_N.bak` with the
    /// smallest free N when that is taken.
    fn free_path(&self, name: &str) -> PathBuf {
        let mut path = self.backup_dir.join(format!("{}.bak", name));
        let mut n = 1;
        while path.exists() {
            path = self.backup_dir.join(format!("{}_{}.bak", name, n));
            n += 1;
        }
        path
    }

    /// Copies `source_path` into the backup directory.
    /// Format: <file stem>_YYYY-MM-DD_HH-MM-SS[_N].bak
    pub fn create_backup(&self, source_path: &Path) -> Result<PathBuf> {
        if !source_path.exists() {
            bail!("Source file does not exist: {}", source_path.display());
        }

        fs::create_dir_all(&self.backup_dir).context("Failed to create backup directory")?;

        let stem = source_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("puzzle");
        let name = format!("{}_{}", stem, Local::now().format("%Y-%m-%d_%H-%M-%S"));
        let backup_path = self.free_path(&name);

        fs::copy(source_path, &backup_path).context("Failed to create backup")?;

        Ok(backup_path)
    }

    /// Copies a backup over `target_path`, keeping an emergency copy of
    /// whatever was there before.
    pub fn restore_backup(&self, backup_path: &Path, target_path: &Path) -> Result<()> {
        if !backup_path.exists() {
            bail!("Backup file does not exist: {}", backup_path.display());
        }

        if target_path.exists() {
            fs::create_dir_all(&self.backup_dir).context("Failed to create backup directory")?;

            let emergency = self.free_path(&format!(
                "emergency_before_restore_{}",
                Local::now().format("%Y-%m-%d_%H-%M-%S")
            ));
            fs::copy(target_path, &emergency).context("Failed to create emergency backup")?;
        }

        fs::copy(backup_path, target_path).context("Failed to restore backup")?;

        Ok(())
    }
}
