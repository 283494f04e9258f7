use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{trace, warn};

use super::geometry::Rect;
use super::window_server::{RawWindow, WindowHandle, WindowServer};
use crate::common::collections::HashSet;

/// Class or owner identifiers of shell, desktop and system windows.
static SYSTEM_CLASSES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // desktop manager, taskbars and file-manager chrome
        "Progman",
        "WorkerW",
        "Shell_TrayWnd",
        "Shell_SecondaryTrayWnd",
        "CabinetWClass",
        "ExploreWClass",
        // macOS system owners
        "Dock",
        "Window Server",
        "SystemUIServer",
        "Control Center",
        "Notification Center",
        "Spotlight",
        "loginwindow",
        "WindowManager",
    ]
    .into_iter()
    .collect()
});

/// Title prefixes of shell windows that report an ordinary class.
static SYSTEM_TITLE_PREFIXES: &[&str] = &["Program Manager", "Microsoft Text Input Application"];

/// A window the user can act on. Snapshots only; the handle may go stale at any time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub bounds: Rect,
    pub is_visible: bool,
    pub class: String,
    pub owner_pid: u32,
}

/// Static exclusion predicate plus the user's additions from config.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    apps: HashSet<String>,
    titles: Vec<Regex>,
}

impl ExclusionRules {
    pub fn new(apps: &[String], title_patterns: &[String]) -> Self {
        let titles = title_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid excluded_titles pattern {p:?}: {e}");
                    None
                }
            })
            .collect();
        ExclusionRules {
            apps: apps.iter().cloned().collect(),
            titles,
        }
    }

    pub fn is_excluded(&self, class: &str, title: &str) -> bool {
        SYSTEM_CLASSES.contains(class)
            || SYSTEM_TITLE_PREFIXES.iter().any(|prefix| title.starts_with(prefix))
            || self.apps.contains(class)
            || self.titles.iter().any(|re| re.is_match(title))
    }
}

pub struct WindowDirectory {
    rules: ExclusionRules,
    own_pid: u32,
}

impl WindowDirectory {
    pub fn new(rules: ExclusionRules) -> Self {
        WindowDirectory { rules, own_pid: std::process::id() }
    }

    pub fn set_rules(&mut self, rules: ExclusionRules) { self.rules = rules; }

    /// Snapshot of every visible, titled, user-relevant top-level window.
    pub fn list_windows(&self, server: &impl WindowServer) -> Vec<WindowInfo> {
        server.windows().into_iter().filter_map(|raw| self.accept(raw)).collect()
    }

    /// The filtered entry for `handle`, if it is currently a user-relevant window.
    pub fn lookup(&self, server: &impl WindowServer, handle: WindowHandle) -> Option<WindowInfo> {
        server
            .windows()
            .into_iter()
            .filter(|raw| raw.handle == handle)
            .find_map(|raw| self.accept(raw))
    }

    fn accept(&self, raw: RawWindow) -> Option<WindowInfo> {
        let title = raw.title.trim();
        let bounds = match raw.bounds {
            Some(b) if raw.is_visible && !title.is_empty() => b,
            _ => return None,
        };
        if raw.owner_pid == self.own_pid || self.rules.is_excluded(&raw.class, title) {
            trace!(handle = %raw.handle, class = %raw.class, "excluded window");
            return None;
        }
        Some(WindowInfo {
            handle: raw.handle,
            title: title.to_string(),
            bounds,
            is_visible: raw.is_visible,
            class: raw.class,
            owner_pid: raw.owner_pid,
        })
    }
}
