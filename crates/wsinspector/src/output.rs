//! Files written under `<out>/Checks/`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use wsinspector_core::InspectConfig;
use wsinspector_core::stat::UncertaintyMatrices;

pub const CHECKS_DIR: &str = "Checks";
pub const CHECKS_FILE: &str = "OutPutChecks.json";
pub const CONFIG_ECHO_FILE: &str = "inspect_config.yaml";

/// Write content to a file atomically using write-then-rename pattern.
pub fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[must_use]
pub fn checks_dir(out_dir: &Path) -> PathBuf {
    out_dir.join(CHECKS_DIR)
}

/// Machine-readable summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecksFile {
    pub generated_at: Timestamp,
    pub input: String,
    pub workspace: String,
    pub model_config: String,
    pub dataset: String,
    pub matrices: UncertaintyMatrices,
    #[serde(default)]
    pub skipped_samples: Vec<String>,
}

/// Write the checks JSON and the effective config; returns the checks path
pub fn write_checks(
    out_dir: &Path,
    checks: &ChecksFile,
    config: &InspectConfig,
) -> io::Result<PathBuf> {
    let dir = checks_dir(out_dir);
    fs::create_dir_all(&dir)?;

    let json = serde_json::to_string_pretty(checks)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let path = dir.join(CHECKS_FILE);
    atomic_write(&path, &json)?;

    let yaml = serde_saphyr::to_string(config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    atomic_write(&dir.join(CONFIG_ECHO_FILE), &yaml)?;

    tracing::info!(path = %path.display(), "wrote checks file");
    Ok(path)
}
