use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io, thread};

use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, DebouncedEventKind, new_debouncer};
use tracing::{debug, info, trace, warn};

use crate::actor::controller::{self, Event};
use crate::common::collections::HashSet;
use crate::common::config::Config;

const DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Config,
    Layouts,
}

/// Device and inode, so a config reached through a hard link still matches.
#[cfg(unix)]
fn file_id(meta: &fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_id(_: &fs::Metadata) -> Option<(u64, u64)> { None }

/// What the watcher cares about, resolved once so symlinked configs still match.
#[derive(Debug)]
struct Targets {
    config_file: PathBuf,
    real_config_file: Option<PathBuf>,
    real_config_id: Option<(u64, u64)>,
    layouts_dir: PathBuf,
    real_layouts_dir: Option<PathBuf>,
}

impl Targets {
    fn new(config_file: PathBuf, layouts_dir: PathBuf) -> Self {
        let real_config_file = fs::canonicalize(&config_file).ok();
        let real_config_id = real_config_file
            .as_ref()
            .and_then(|p| fs::metadata(p).ok())
            .and_then(|m| file_id(&m));
        let real_layouts_dir = fs::canonicalize(&layouts_dir).ok();
        Targets {
            config_file,
            real_config_file,
            real_config_id,
            layouts_dir,
            real_layouts_dir,
        }
    }

    /// Parent directories to watch. `notify` can't watch a file that is
    /// replaced by rename, so the directory is watched instead.
    fn watch_dirs(&self) -> HashSet<PathBuf> {
        let mut dirs = HashSet::default();
        for file in [Some(&self.config_file), self.real_config_file.as_ref()].into_iter().flatten() {
            if let Some(parent) = file.parent() {
                dirs.insert(parent.to_path_buf());
            }
        }
        dirs.insert(self.layouts_dir.clone());
        dirs
    }

    fn classify(&self, path: &Path) -> Option<Change> {
        if self.is_config(path) {
            return Some(Change::Config);
        }
        if self.is_layout(path) {
            return Some(Change::Layouts);
        }
        None
    }

    fn is_config(&self, path: &Path) -> bool {
        if path == self.config_file {
            return true;
        }
        if let Some(real) = &self.real_config_file {
            if path == real.as_path() {
                return true;
            }
            if fs::canonicalize(path).is_ok_and(|p| p == *real) {
                return true;
            }
            if self.real_config_id.is_some()
                && fs::metadata(path).ok().and_then(|m| file_id(&m)) == self.real_config_id
            {
                return true;
            }
        }
        false
    }

    fn is_layout(&self, path: &Path) -> bool {
        if path.extension().is_none_or(|ext| ext != "json") {
            return false;
        }
        let Some(parent) = path.parent() else { return false };
        parent == self.layouts_dir
            || self.real_layouts_dir.as_deref() == Some(parent)
            || fs::canonicalize(parent).ok() == self.real_layouts_dir
    }
}

pub struct FileWatcher {
    targets: Targets,
    events_tx: controller::Sender,
    enabled: bool,
}

impl FileWatcher {
    pub fn spawn(
        events_tx: controller::Sender,
        config: &Config,
        config_path: PathBuf,
    ) -> io::Result<thread::JoinHandle<()>> {
        let layouts_dir = config.settings.layouts_dir();
        if let Err(e) = fs::create_dir_all(&layouts_dir) {
            warn!("could not create {}: {e}", layouts_dir.display());
        }
        let watcher = FileWatcher {
            targets: Targets::new(config_path, layouts_dir),
            events_tx,
            enabled: config.settings.hot_reload,
        };
        thread::Builder::new().name("file-watcher".to_string()).spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
                Ok(rt) => rt,
                Err(e) => {
                    warn!("file-watcher: no runtime: {e}");
                    return;
                }
            };
            if let Err(e) = rt.block_on(watcher.run()) {
                warn!("file-watcher: error: {e:?}");
            }
        })
    }

    async fn run(mut self) -> notify::Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PathBuf>();

        let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| match res {
            Ok(events) => {
                for e in events {
                    if e.kind == DebouncedEventKind::Any {
                        _ = tx.send(e.path);
                    }
                }
            }
            Err(e) => warn!("watch error: {e:?}"),
        })?;

        let mut watched = self.targets.watch_dirs();
        for dir in &watched {
            match debouncer.watcher().watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => info!("watching {}", dir.display()),
                Err(e) => warn!("cannot watch {}: {e}", dir.display()),
            }
        }

        while let Some(path) = rx.recv().await {
            if self.events_tx.is_closed() {
                break;
            }
            let Some(change) = self.targets.classify(&path) else { continue };
            trace!(?change, "change detected: {}", path.display());

            match change {
                Change::Layouts if self.enabled => self.events_tx.send(Event::LayoutsChanged),
                Change::Layouts => {}
                Change::Config => {
                    let Some(config) = self.reread_config() else { continue };
                    let was_enabled = std::mem::replace(&mut self.enabled, config.settings.hot_reload);
                    if !was_enabled && !self.enabled {
                        debug!("hot reload disabled, ignoring config change");
                        continue;
                    }

                    let layouts_dir = config.settings.layouts_dir();
                    if layouts_dir != self.targets.layouts_dir {
                        self.targets = Targets::new(self.targets.config_file.clone(), layouts_dir);
                        let wanted = self.targets.watch_dirs();
                        for dir in watched.difference(&wanted) {
                            _ = debouncer.watcher().unwatch(dir);
                        }
                        for dir in wanted.difference(&watched) {
                            _ = fs::create_dir_all(dir);
                            if let Err(e) = debouncer.watcher().watch(dir, RecursiveMode::NonRecursive) {
                                warn!("cannot watch {}: {e}", dir.display());
                            }
                        }
                        watched = wanted;
                    }
                    self.events_tx.send(Event::ConfigChanged(Box::new(config)));
                }
            }
        }

        Ok(())
    }

    /// A config that fails to parse or validate is reported and otherwise ignored.
    fn reread_config(&self) -> Option<Config> {
        let config = match Config::read(&self.targets.config_file) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring config change: {e:#}");
                return None;
            }
        };
        let issues = config.validate();
        if !issues.is_empty() {
            for issue in &issues {
                warn!("config: {issue}");
            }
            return None;
        }
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn classifies_config_and_layout_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "").unwrap();
        let layouts = dir.path().join("layouts");
        fs::create_dir_all(&layouts).unwrap();
        let targets = Targets::new(config.clone(), layouts.clone());

        assert_eq!(targets.classify(&config), Some(Change::Config));
        assert_eq!(targets.classify(&layouts.join("work.json")), Some(Change::Layouts));
        assert_eq!(targets.classify(&layouts.join("work.json.tmp")), None);
        assert_eq!(targets.classify(&dir.path().join("other.toml")), None);
        assert_eq!(targets.classify(&dir.path().join("stray.json")), None);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_config_matches_its_target() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("dotfiles").join("zonesnap.toml");
        fs::create_dir_all(real.parent().unwrap()).unwrap();
        fs::write(&real, "").unwrap();
        let link = dir.path().join("config.toml");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let targets = Targets::new(link, dir.path().join("layouts"));

        assert_eq!(targets.classify(&real), Some(Change::Config));
        assert!(targets.watch_dirs().contains(real.parent().unwrap()));
    }

    #[cfg(unix)]
    #[test]
    fn hard_linked_config_matches_by_file_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "").unwrap();
        let other_name = dir.path().join("backup.toml");
        fs::hard_link(&config, &other_name).unwrap();
        let unrelated = dir.path().join("unrelated.toml");
        fs::write(&unrelated, "").unwrap();

        let targets = Targets::new(config, dir.path().join("layouts"));

        assert_eq!(targets.classify(&other_name), Some(Change::Config));
        assert_eq!(targets.classify(&unrelated), None);
    }

    #[test]
    fn invalid_config_is_not_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "[settings]\nrefresh_interval_secs = 0\n").unwrap();
        let (events_tx, _rx) = crate::actor::channel();
        let watcher = FileWatcher {
            targets: Targets::new(config.clone(), dir.path().join("layouts")),
            events_tx,
            enabled: true,
        };

        assert!(watcher.reread_config().is_none());

        fs::write(&config, "[settings]\nrefresh_interval_secs = 2\n").unwrap();
        let reread = watcher.reread_config().unwrap();
        assert_eq!(reread.settings.refresh_interval_secs, 2);
    }
}
