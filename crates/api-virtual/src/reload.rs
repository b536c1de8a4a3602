//! Hot reload by polling config file modification times.

use crate::config::{body_files, config_files, VirtualConfig};
use crate::error::VirtualError;
use crate::routing::RouteTable;
use crate::server::AppState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Where the route table comes from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    path: PathBuf,
}

/// The config files and their mtimes at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(Vec<(PathBuf, Option<SystemTime>)>);

impl ConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate a fresh route table.
    pub fn load(&self) -> Result<RouteTable, VirtualError> {
        let config = VirtualConfig::load(&self.path)?;
        RouteTable::from_config(&config)
    }

    /// Config files plus the body files they reference, with mtimes.
    pub fn fingerprint(&self) -> Result<Fingerprint, VirtualError> {
        let mut files = config_files(&self.path)?;
        files.extend(body_files(&files));
        Ok(Fingerprint(
            files
                .into_iter()
                .map(|file| {
                    let modified = std::fs::metadata(&file).and_then(|m| m.modified()).ok();
                    (file, modified)
                })
                .collect(),
        ))
    }
}

/// Poll `state`'s config source every `interval`, reloading on change.
///
/// A failed reload keeps the previous table.
pub fn spawn_watcher(state: Arc<AppState>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = state.source().fingerprint().ok();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(
            "Watching {:?} for changes every {}ms",
            state.source().path(),
            interval.as_millis()
        );

        loop {
            ticker.tick().await;

            let current = match state.source().fingerprint() {
                Ok(fp) => Some(fp),
                Err(e) => {
                    debug!("Config not readable yet: {}", e);
                    None
                }
            };
            if current.is_none() || current == last {
                continue;
            }
            last = current;

            match state.reload().await {
                Ok(count) => info!("Reloaded {} virtual routes", count),
                Err(e) => warn!("Reload failed, keeping previous routes: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_tracks_file_set() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "routes: []\n").unwrap();
        let source = ConfigSource::new(dir.path());

        let before = source.fingerprint().unwrap();
        assert_eq!(before, source.fingerprint().unwrap());

        std::fs::write(dir.path().join("b.yaml"), "routes: []\n").unwrap();
        assert_ne!(before, source.fingerprint().unwrap());
    }

    #[test]
    fn test_fingerprint_tracks_body_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.yaml");
        std::fs::write(&path, "routes:\n  - { path: /a, response: { body_file: a.json } }\n")
            .unwrap();
        let source = ConfigSource::new(&path);

        // Missing body file still fingerprints; creating it is a change.
        let before = source.fingerprint().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        let created = source.fingerprint().unwrap();
        assert_ne!(before, created);

        let body = std::fs::File::options()
            .write(true)
            .open(dir.path().join("a.json"))
            .unwrap();
        body.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
        assert_ne!(created, source.fingerprint().unwrap());
    }

    #[test]
    fn test_load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.yaml");
        std::fs::write(&path, "routes:\n  - path: /ok\n").unwrap();
        assert_eq!(ConfigSource::new(&path).load().unwrap().len(), 1);

        std::fs::write(&path, "routes:\n  - path: nope\n").unwrap();
        assert!(ConfigSource::new(&path).load().is_err());
    }
}
