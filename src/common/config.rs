use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use strum::VariantNames;

use super::collections::HashMap;
use crate::actor::controller::Command;
use crate::model::layout_store::LayoutStore;
use crate::sys::geometry::Size;
use crate::sys::hotkey::Hotkey;
use crate::sys::window_directory::ExclusionRules;
use crate::sys::window_mover::WindowMover;

const DEFAULT_CONFIG: &str = include_str!("../../zonesnap.default.toml");

pub fn config_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("zonesnap")
        .join("config.toml")
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    keys: HashMap<String, Command>,
    /// Named modifier sets usable as a prefix in `keys`,
    /// e.g. `hyper = "Ctrl + Alt + Shift"` allows `"hyper + L"`.
    #[serde(default)]
    modifier_combinations: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub settings: Settings,
    pub keys: Vec<(Hotkey, Command)>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Seconds between periodic layout reloads while the daemon runs.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_min_window_dimension")]
    pub min_window_width: f64,
    #[serde(default = "default_min_window_dimension")]
    pub min_window_height: f64,
    /// Reload layouts and settings when their files change on disk.
    #[serde(default = "yes")]
    pub hot_reload: bool,
    /// Overrides the platform data directory for stored layouts.
    #[serde(default)]
    pub layouts_dir: Option<PathBuf>,
    /// Application names whose windows are never listed or moved.
    #[serde(default)]
    pub excluded_apps: Vec<String>,
    /// Regular expressions matched against window titles.
    #[serde(default)]
    pub excluded_titles: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            refresh_interval_secs: default_refresh_interval(),
            min_window_width: default_min_window_dimension(),
            min_window_height: default_min_window_dimension(),
            hot_reload: true,
            layouts_dir: None,
            excluded_apps: Vec::new(),
            excluded_titles: Vec::new(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.refresh_interval_secs == 0 {
            issues.push("refresh_interval_secs must be at least 1".to_string());
        }
        for (name, value) in [
            ("min_window_width", self.min_window_width),
            ("min_window_height", self.min_window_height),
        ] {
            if !value.is_finite() || value < 0.0 {
                issues.push(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        for pattern in &self.excluded_titles {
            if let Err(e) = regex::Regex::new(pattern) {
                issues.push(format!("excluded_titles entry {pattern:?} is not a valid regex: {e}"));
            }
        }
        if let Some(dir) = &self.layouts_dir {
            if dir.as_os_str().is_empty() {
                issues.push("layouts_dir must not be empty".to_string());
            }
        }

        issues
    }

    pub fn min_size(&self) -> Size { Size::new(self.min_window_width, self.min_window_height) }

    pub fn window_mover(&self) -> WindowMover { WindowMover::new(self.min_size()) }

    pub fn exclusion_rules(&self) -> ExclusionRules {
        ExclusionRules::new(&self.excluded_apps, &self.excluded_titles)
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.layouts_dir.clone().unwrap_or_else(LayoutStore::default_location)
    }

    pub fn layout_store(&self) -> LayoutStore { LayoutStore::new(self.layouts_dir()) }
}

fn yes() -> bool { true }

fn default_refresh_interval() -> u64 { 5 }

fn default_min_window_dimension() -> f64 { 100.0 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, otherwise falls back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() {
            Self::read(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn default() -> Config {
        match Self::parse(DEFAULT_CONFIG) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("built-in config failed to parse: {e:#}");
                Config {
                    settings: Settings::default(),
                    keys: Vec::new(),
                }
            }
        }
    }

    pub fn default_text() -> &'static str { DEFAULT_CONFIG }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile {
            settings: self.settings.clone(),
            keys: self
                .keys
                .iter()
                .map(|(hotkey, command)| (hotkey.to_string(), command.clone()))
                .collect(),
            modifier_combinations: HashMap::default(),
        };

        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();

        let mut seen: HashMap<&Hotkey, &Command> = HashMap::default();
        for (hotkey, command) in &self.keys {
            if hotkey.modifiers.is_empty() {
                issues.push(format!("hotkey {hotkey} has no modifiers and would swallow a plain key"));
            }
            if let Some(previous) = seen.insert(hotkey, command) {
                issues.push(format!(
                    "hotkey {hotkey} is bound to both {previous:?} and {command:?}"
                ));
            }
            if let Command::ApplyLayout(name) | Command::ApplyLayoutToFocused(name) = command {
                if name.trim().is_empty() {
                    issues.push(format!("hotkey {hotkey} applies a layout with an empty name"));
                }
            }
        }

        issues
    }

    fn expand_modifier_combinations(key: &str, combinations: &HashMap<String, String>) -> String {
        key.split('+')
            .map(str::trim)
            .map(|part| combinations.get(part).map(String::as_str).unwrap_or(part))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    fn levenshtein(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let mut prev: Vec<usize> = (0..=b.len()).collect();
        let mut cur = vec![0; b.len() + 1];
        for i in 1..=a.len() {
            cur[0] = i;
            for j in 1..=b.len() {
                let cost = usize::from(a[i - 1] != b[j - 1]);
                cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
            }
            std::mem::swap(&mut prev, &mut cur);
        }
        prev[b.len()]
    }

    /// Pulls the offending token out of serde's "unknown variant `...`" message.
    fn extract_unknown_variant(err: &str) -> Option<&str> {
        let needle = "unknown variant `";
        let start = err.find(needle)? + needle.len();
        let rest = &err[start..];
        rest.find('`').map(|end| &rest[..end])
    }

    fn suggest_similar_command(unknown: &str) -> Option<&'static str> {
        let unknown = unknown.to_lowercase();
        let (best, dist) = Command::VARIANTS
            .iter()
            .map(|cand| (*cand, Self::levenshtein(&unknown, cand)))
            .min_by_key(|(_, dist)| *dist)?;
        let threshold = std::cmp::max(3, best.len() / 2);
        (dist <= threshold).then_some(best)
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let c = match toml::from_str::<ConfigFile>(buf) {
            Ok(c) => c,
            Err(e) => {
                let msg = e.to_string();
                if let Some(suggestion) =
                    Self::extract_unknown_variant(&msg).and_then(Self::suggest_similar_command)
                {
                    bail!("{msg}\nDid you mean `{suggestion}`?");
                }
                bail!("{msg}");
            }
        };

        let mut keys = Vec::with_capacity(c.keys.len());
        for (key, cmd) in c.keys {
            let expanded = Self::expand_modifier_combinations(&key, &c.modifier_combinations);
            let Ok(hotkey) = Hotkey::from_str(&expanded) else {
                bail!("Could not parse hotkey: {key}");
            };
            keys.push((hotkey, cmd));
        }
        // HashMap order is arbitrary; keep registration deterministic
        keys.sort_by_key(|(hotkey, _)| hotkey.to_string());

        Ok(Config { settings: c.settings, keys })
    }
}
