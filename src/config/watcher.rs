//! Hot reload of the gateway configuration file.
//!
//! Every create/modify event re-runs the full load: parse, environment
//! overrides, validation. Only a config that passes all three reaches the
//! server; a broken edit leaves the running config in place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::GatewayConfig;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What a single file event led to.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// Event kind that does not touch file contents.
    Ignored,
    /// A valid config was forwarded to the server.
    Applied,
    /// The file no longer loads; the running config stays.
    Rejected(ConfigError),
    /// Nobody is listening for updates any more.
    Closed,
}

/// Watches one config file and forwards validated configs on a channel.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end the server drains.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// React to one notify event.
    pub fn handle_event(&self, event: notify::Result<Event>) -> ReloadOutcome {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = ?e, "Config watch error");
                return ReloadOutcome::Ignored;
            }
        };
        if !(event.kind.is_modify() || event.kind.is_create()) {
            return ReloadOutcome::Ignored;
        }

        tracing::info!(path = ?self.path, "Config file change detected, reloading");
        match load_config(&self.path) {
            Ok(config) => {
                if self.update_tx.send(config).is_err() {
                    tracing::warn!("Config update receiver dropped");
                    return ReloadOutcome::Closed;
                }
                ReloadOutcome::Applied
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                ReloadOutcome::Rejected(e)
            }
        }
    }

    /// Start watching on notify's background thread.
    ///
    /// The returned watcher must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                self.handle_event(res);
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};
    use notify::EventKind;
    use std::fs;

    const VALID: &str = r#"
environment = "development"

[auth]
api_key = "watch-key-0123456789abcdef"
jwt_secret = "watch-secret-0123456789abcdef0123456789"

[rate_limit]
requests = 7
window_secs = 30
"#;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("gateway-watch-{}.toml", uuid::Uuid::new_v4()))
    }

    fn modified(path: &Path) -> notify::Result<Event> {
        Ok(Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.to_path_buf()))
    }

    #[test]
    fn test_valid_edit_is_forwarded() {
        let path = temp_path();
        fs::write(&path, VALID).unwrap();
        let (watcher, mut updates) = ConfigWatcher::new(&path);

        assert!(matches!(watcher.handle_event(modified(&path)), ReloadOutcome::Applied));
        let config = updates.try_recv().unwrap();
        assert_eq!(config.rate_limit.requests, 7);
        assert_eq!(config.rate_limit.window_secs, 30);

        let created = Ok(Event::new(EventKind::Create(CreateKind::File)));
        assert!(matches!(watcher.handle_event(created), ReloadOutcome::Applied));
        assert!(updates.try_recv().is_ok());

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_invalid_edit_keeps_running_config() {
        let path = temp_path();
        fs::write(&path, VALID.replace("requests = 7", "requests = 0")).unwrap();
        let (watcher, mut updates) = ConfigWatcher::new(&path);

        let outcome = watcher.handle_event(modified(&path));
        assert!(matches!(outcome, ReloadOutcome::Rejected(ConfigError::Validation(_))));
        assert!(updates.try_recv().is_err());

        fs::write(&path, "[rate_limit\n").unwrap();
        let outcome = watcher.handle_event(modified(&path));
        assert!(matches!(outcome, ReloadOutcome::Rejected(ConfigError::Parse(_))));
        assert!(updates.try_recv().is_err());

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_reads_and_errors_are_ignored() {
        let path = temp_path();
        let (watcher, mut updates) = ConfigWatcher::new(&path);

        let read = Ok(Event::new(EventKind::Access(AccessKind::Any)));
        assert!(matches!(watcher.handle_event(read), ReloadOutcome::Ignored));
        let failed = Err(notify::Error::generic("watch backend failed"));
        assert!(matches!(watcher.handle_event(failed), ReloadOutcome::Ignored));
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_reported() {
        let path = temp_path();
        fs::write(&path, VALID).unwrap();
        let (watcher, updates) = ConfigWatcher::new(&path);
        drop(updates);

        assert!(matches!(watcher.handle_event(modified(&path)), ReloadOutcome::Closed));

        fs::remove_file(&path).unwrap_or_default();
    }

    #[tokio::test]
    async fn test_file_change_reaches_receiver() {
        let path = temp_path();
        fs::write(&path, VALID).unwrap();
        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, VALID.replace("requests = 7", "requests = 9")).unwrap();

        let config = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match updates.recv().await {
                    Some(config) if config.rate_limit.requests == 9 => break config,
                    Some(_) => continue,
                    None => panic!("watcher channel closed"),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(config.rate_limit.window_secs, 30);

        fs::remove_file(&path).unwrap_or_default();
    }
}
