use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Environment variable that pins the data directory
pub const DATA_DIR_ENV: &str = "DAYLIST_DIR";

/// Name of local and global data directories
const DATA_DIR_NAME: &str = ".daylist";

/// Snapshot file holding the task list
const SNAPSHOT_FILE: &str = "adhd-tasks.json";

/// Get the data directory - honours DAYLIST_DIR, then a local .daylist,
/// then falls back to global ~/.daylist
pub fn get_data_dir() -> Result<PathBuf> {
    let current_dir = env::current_dir().context("Could not determine current directory")?;
    let env_dir = env::var_os(DATA_DIR_ENV).map(PathBuf::from);
    resolve_data_dir(env_dir, &current_dir, dirs::home_dir())
}

/// Pick the data directory from an explicit override, the working directory
/// and the home directory, in that order
pub fn resolve_data_dir(
    env_dir: Option<PathBuf>,
    current_dir: &Path,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(dir) = env_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }

    if let Some(local_dir) = find_local_dir(current_dir) {
        return Ok(local_dir);
    }

    let home = home.context("Could not determine home directory")?;
    Ok(home.join(DATA_DIR_NAME))
}

/// Find local .daylist directory by walking up the directory tree
fn find_local_dir(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let candidate = current.join(DATA_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }

        current = current.parent()?;
    }
}

/// Ensure the data directory exists
pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = get_data_dir()?;
    if !dir.exists() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    Ok(dir)
}

/// Initialize a local .daylist directory in the current directory
pub fn init_local_dir() -> Result<PathBuf> {
    let current_dir = env::current_dir().context("Could not determine current directory")?;
    let data_dir = current_dir.join(DATA_DIR_NAME);

    if data_dir.exists() {
        anyhow::bail!("Data directory already exists: {}", data_dir.display());
    }

    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create directory: {}", data_dir.display()))?;

    Ok(data_dir)
}

/// Get path to the task snapshot
pub fn snapshot_file() -> Result<PathBuf> {
    Ok(ensure_data_dir()?.join(SNAPSHOT_FILE))
}

/// Get path to config.json
pub fn config_file() -> Result<PathBuf> {
    Ok(ensure_data_dir()?.join("config.json"))
}

/// Get path to the lock held by a running watch session
pub fn session_file() -> Result<PathBuf> {
    Ok(ensure_data_dir()?.join("session.lock"))
}

/// File name for an export made on `date` (adhd-tasks-YYYY-MM-DD.json)
pub fn export_file_name(date: chrono::NaiveDate) -> String {
    format!("adhd-tasks-{}.json", date.format("%Y-%m-%d"))
}

/// Atomically write content to a file using temp file + rename
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(dir)
        .context("Failed to create temporary file")?;

    temp_file
        .write_all(content.as_bytes())
        .context("Failed to write to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .context("Failed to sync temporary file")?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to persist file: {}", path.display()))?;

    Ok(())
}

/// Read file content, return empty string if file doesn't exist
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(String::new());
    }
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Copy a file next to itself with a timestamp suffix.
/// Returns `None` when there was nothing to back up.
pub fn backup_file<P: AsRef<Path>>(path: P) -> Result<Option<PathBuf>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = path.with_extension(format!("bak.{}.json", timestamp));

    fs::copy(path, &backup_path)
        .with_context(|| format!("Failed to backup file: {}", path.display()))?;

    Ok(Some(backup_path))
}
