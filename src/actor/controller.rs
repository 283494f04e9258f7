//! The controller owns every piece of mutable state that touches windows.
//!
//! Hotkeys, the file watcher and the refresh timer never call into the window
//! server themselves; they send an [`Event`] and the controller handles it on
//! its own thread, one event at a time.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::VariantNames;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, instrument, warn};

use crate::actor;
use crate::common::config::Config;
use crate::layout_engine::{
    ApplyError, ApplyReport, LayoutApplier, SnapCycler, SnapOutcome, SnapPosition, Targets,
};
use crate::model::layout::Layout;
use crate::model::layout_store::{LayoutStore, StoreError};
use crate::sys::window_directory::{WindowDirectory, WindowInfo};
use crate::sys::window_server::{self, WindowHandle, WindowServer};

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// Actions that can be bound to a hotkey.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// Advance the frontmost window to its next snap position.
    CycleSnap,
    Snap(SnapPosition),
    /// Place every listed window into the named layout.
    ApplyLayout(String),
    /// Place only the frontmost window, into the layout's first zone.
    ApplyLayoutToFocused(String),
    ReloadLayouts,
    /// Pause or resume handling of every other command.
    Toggle,
}

#[derive(Debug)]
pub enum Event {
    Command(Command),
    /// Re-list windows and reload layouts now instead of waiting for the timer.
    Refresh,
    LayoutsChanged,
    ConfigChanged(Box<Config>),
    Apply {
        name: String,
        /// `None` targets every listed window.
        target: Option<WindowHandle>,
        reply: oneshot::Sender<Result<ApplyReport, ControllerError>>,
    },
    Snapshot(oneshot::Sender<Snapshot>),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub enabled: bool,
    pub layouts: Vec<String>,
    pub windows: Vec<WindowInfo>,
}

#[derive(thiserror::Error, Debug)]
pub enum ControllerError {
    #[error("no layout named {0:?}")]
    UnknownLayout(String),
    #[error("no window selected")]
    NoWindowSelected,
    #[error("window {0} is not available")]
    WindowUnavailable(WindowHandle),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Window(#[from] window_server::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Controller<S> {
    server: S,
    config: Config,
    store: LayoutStore,
    directory: WindowDirectory,
    cycler: SnapCycler,
    applier: LayoutApplier,
    layouts: Vec<Layout>,
    windows: Vec<WindowInfo>,
    enabled: bool,
    receiver: Receiver,
}

impl<S: WindowServer> Controller<S> {
    pub fn new(server: S, config: Config) -> (Self, Sender) {
        let (sender, receiver) = actor::channel();
        let settings = &config.settings;
        let mut controller = Controller {
            server,
            store: settings.layout_store(),
            directory: WindowDirectory::new(settings.exclusion_rules()),
            cycler: SnapCycler::new(settings.window_mover()),
            applier: LayoutApplier::new(settings.window_mover()),
            config,
            layouts: Vec::new(),
            windows: Vec::new(),
            enabled: true,
            receiver,
        };
        controller.reload_layouts();
        (controller, sender)
    }

    pub fn store(&self) -> &LayoutStore { &self.store }

    pub fn layouts(&self) -> &[Layout] { &self.layouts }

    fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.config.settings.refresh_interval_secs.max(1))
    }

    /// Handles events until [`Event::Shutdown`] arrives or every sender is gone.
    pub async fn run(mut self) {
        let mut period = self.refresh_period();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = self.receiver.recv() => {
                    let Some((span, event)) = event else { break };
                    let _guard = span.enter();
                    if matches!(event, Event::Shutdown) {
                        info!("shutting down");
                        break;
                    }
                    self.handle_event(event);
                }
                _ = ticker.tick() => self.refresh(),
            }

            let wanted = self.refresh_period();
            if wanted != period {
                debug!(?wanted, "refresh interval changed");
                period = wanted;
                ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            }
        }
    }

    #[instrument(name = "controller::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Command(cmd) => self.handle_command(cmd),
            Event::Refresh => self.refresh(),
            Event::LayoutsChanged => self.reload_layouts(),
            Event::ConfigChanged(config) => self.apply_config(*config),
            Event::Apply { name, target, reply } => {
                let result = self.apply_layout(&name, target);
                _ = reply.send(result);
            }
            Event::Snapshot(reply) => _ = reply.send(self.snapshot()),
            Event::Shutdown => {}
        }
    }

    #[instrument(skip(self))]
    pub fn handle_command(&mut self, cmd: Command) {
        if !self.enabled && cmd != Command::Toggle {
            debug!("disabled, ignoring");
            return;
        }
        match cmd {
            Command::CycleSnap => {
                if let Err(e) = self.cycle_focused() {
                    warn!("cycle_snap: {e}");
                }
            }
            Command::Snap(position) => {
                if let Err(e) = self.snap_focused(position) {
                    warn!("snap: {e}");
                }
            }
            Command::ApplyLayout(name) => _ = self.apply_layout(&name, None),
            Command::ApplyLayoutToFocused(name) => match self.server.frontmost_window() {
                Some(handle) => _ = self.apply_layout(&name, Some(handle)),
                None => warn!("{}", ControllerError::NoWindowSelected),
            },
            Command::ReloadLayouts => self.reload_layouts(),
            Command::Toggle => {
                self.enabled = !self.enabled;
                info!(enabled = self.enabled, "toggled");
            }
        }
    }

    /// The frontmost window, unless it is filtered out of the directory.
    fn focused(&self) -> Result<WindowHandle, ControllerError> {
        let handle = self.server.frontmost_window().ok_or(ControllerError::NoWindowSelected)?;
        match self.directory.lookup(&self.server, handle) {
            Some(window) => Ok(window.handle),
            None => {
                debug!(%handle, "frontmost window is not managed");
                Err(ControllerError::NoWindowSelected)
            }
        }
    }

    pub fn cycle_focused(&self) -> Result<SnapOutcome, ControllerError> {
        let handle = self.focused()?;
        Ok(self.cycler.cycle(&self.server, handle)?)
    }

    pub fn snap_focused(&self, position: SnapPosition) -> Result<SnapOutcome, ControllerError> {
        let handle = self.focused()?;
        Ok(self.cycler.snap_to(&self.server, handle, position)?)
    }

    /// Applies a stored layout to `target`, or to every listed window.
    #[instrument(skip(self))]
    pub fn apply_layout(
        &mut self,
        name: &str,
        target: Option<WindowHandle>,
    ) -> Result<ApplyReport, ControllerError> {
        let result = self.try_apply_layout(name, target);
        match &result {
            Ok(report) if report.is_complete() => {
                info!(moved = report.moved, skipped = report.skipped(), "Applied: {name}");
            }
            Ok(report) => warn!(
                moved = report.moved,
                failed = report.failures.len(),
                skipped = report.skipped(),
                "Applied with failures: {name}"
            ),
            Err(e) => warn!("could not apply {name:?}: {e}"),
        }
        result
    }

    fn try_apply_layout(
        &mut self,
        name: &str,
        target: Option<WindowHandle>,
    ) -> Result<ApplyReport, ControllerError> {
        let layout = self.find_layout(name)?;
        let screen = self.server.screen_bounds();
        match target {
            Some(handle) => {
                let window = self
                    .directory
                    .lookup(&self.server, handle)
                    .ok_or(ControllerError::WindowUnavailable(handle))?;
                Ok(self.applier.apply(&self.server, &layout, Targets::One(&window), screen)?)
            }
            None => {
                self.windows = self.directory.list_windows(&self.server);
                Ok(self.applier.apply(&self.server, &layout, Targets::All(&self.windows), screen)?)
            }
        }
    }

    /// Looks in the cached list first, then goes to disk in case the layout was
    /// saved since the last reload.
    fn find_layout(&mut self, name: &str) -> Result<Layout, ControllerError> {
        if let Some(layout) = self.layouts.iter().find(|l| l.name == name) {
            return Ok(layout.clone());
        }
        let layout = self
            .store
            .load(name)?
            .ok_or_else(|| ControllerError::UnknownLayout(name.to_string()))?;
        self.reload_layouts();
        Ok(layout)
    }

    pub fn refresh(&mut self) {
        self.windows = self.directory.list_windows(&self.server);
        self.reload_layouts();
        debug!(windows = self.windows.len(), layouts = self.layouts.len(), "refreshed");
    }

    pub fn reload_layouts(&mut self) {
        self.layouts = self.store.load_all();
        debug!(count = self.layouts.len(), "layouts loaded");
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            enabled: self.enabled,
            layouts: self.layouts.iter().map(|l| l.name.clone()).collect(),
            windows: self.windows.clone(),
        }
    }

    #[instrument(skip_all)]
    fn apply_config(&mut self, config: Config) {
        if config.keys != self.config.keys {
            warn!("hotkey bindings changed; restart zonesnap to register them");
        }
        let settings = &config.settings;
        self.directory.set_rules(settings.exclusion_rules());
        self.cycler.set_mover(settings.window_mover());
        self.applier.set_mover(settings.window_mover());

        let layouts_dir_changed = settings.layouts_dir() != self.store.dir();
        if layouts_dir_changed {
            self.store = settings.layout_store();
        }
        self.config = config;
        if layouts_dir_changed {
            self.reload_layouts();
        }
        info!("config reloaded");
    }
}
