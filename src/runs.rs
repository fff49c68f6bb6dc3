//! Run directories: one per generation request, plus the retention sweep.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::constants::GENERATED_IMAGE_DIR;
use crate::error::MorpherError;

const RUN_ID_LEN: usize = 32;

/// The working directory of one request.
#[derive(Clone, Debug)]
pub struct Run {
    /// Random lowercase hex id
    pub id: String,
    /// `<runs_dir>/<id>`
    pub dir: PathBuf,
    runs_dir: PathBuf,
}

impl Run {
    /// Creates a fresh, uniquely named directory under `runs_dir`.
    pub async fn create(runs_dir: &Path) -> Result<Self, MorpherError> {
        tokio::fs::create_dir_all(runs_dir).await?;
        loop {
            let id = new_run_id();
            let dir = runs_dir.join(&id);
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => {
                    debug!("Created run {id}");
                    return Ok(Self {
                        id,
                        dir,
                        runs_dir: runs_dir.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The archive sits beside the run directory so it doesn't package itself.
    pub fn zip_path(&self) -> PathBuf {
        self.runs_dir.join(format!("{}.zip", self.id))
    }

    /// Where the reference image batch goes.
    pub fn generated_dir(&self) -> PathBuf {
        self.dir.join(GENERATED_IMAGE_DIR)
    }
}

/// 32 random lowercase hex digits.
pub fn new_run_id() -> String {
    let mut rng = rand::rng();
    (0..RUN_ID_LEN)
        .filter_map(|_| char::from_digit(rng.random_range(0..16), 16))
        .collect()
}

fn is_run_name(name: &str) -> bool {
    let id = name.strip_suffix(".zip").unwrap_or(name);
    id.len() == RUN_ID_LEN && id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// Deletes run directories and archives under `runs_dir` not modified within `ttl`.
///
/// Anything that doesn't look like a run is left alone. Failures are logged
/// and skipped. Returns how many entries were removed.
pub async fn sweep_expired(runs_dir: &Path, ttl: Duration) -> usize {
    let mut entries = match tokio::fs::read_dir(runs_dir).await {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Nothing to sweep in {}: {err}", runs_dir.display());
            return 0;
        }
    };
    let now = SystemTime::now();
    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!("Failed reading {}: {err}", runs_dir.display());
                break;
            }
        };
        let name = entry.file_name();
        if !name.to_str().is_some_and(is_run_name) {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let expired = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age >= ttl);
        if !expired {
            continue;
        }
        let path = entry.path();
        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => removed += 1,
            Err(err) => warn!("Failed to remove expired run {}: {err}", path.display()),
        }
    }
    if removed > 0 {
        info!("Swept {removed} expired run entries from {}", runs_dir.display());
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_lowercase_hex() {
        let id = new_run_id();
        assert_eq!(id.len(), RUN_ID_LEN);
        assert!(is_run_name(&id));
        assert_ne!(id, new_run_id());
    }

    #[test]
    fn run_name_matching() {
        assert!(is_run_name("0123456789abcdef0123456789abcdef"));
        assert!(is_run_name("0123456789abcdef0123456789abcdef.zip"));
        assert!(!is_run_name("0123456789ABCDEF0123456789ABCDEF"));
        assert!(!is_run_name("notes.txt"));
    }

    #[tokio::test]
    async fn runs_get_their_own_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runs = dir.path().join("runs");
        let first = Run::create(&runs).await.expect("first run");
        let second = Run::create(&runs).await.expect("second run");
        assert_ne!(first.dir, second.dir);
        assert!(first.dir.is_dir());
        assert_eq!(first.zip_path(), runs.join(format!("{}.zip", first.id)));
        assert_eq!(first.generated_dir(), first.dir.join("generated"));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_runs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let run = Run::create(dir.path()).await.expect("run");
        std::fs::write(run.zip_path(), b"zip").expect("zip");
        std::fs::write(dir.path().join("notes.txt"), b"keep").expect("notes");

        assert_eq!(sweep_expired(dir.path(), Duration::from_secs(3600)).await, 0);
        assert!(run.dir.exists());

        assert_eq!(sweep_expired(dir.path(), Duration::ZERO).await, 2);
        assert!(!run.dir.exists());
        assert!(!run.zip_path().exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn sweeping_a_missing_directory_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(sweep_expired(&dir.path().join("nope"), Duration::ZERO).await, 0);
    }
}
