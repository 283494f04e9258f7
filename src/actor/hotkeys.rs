//! Global hotkeys. Carbon delivers presses on the main run loop; each press is
//! turned into an [`Event::Command`] for the controller thread.

use tracing::{debug, info, warn};

use crate::actor::controller::{self, Command, Event};
use crate::sys::carbon::{HotkeyListener, HotkeyRegistration};
use crate::sys::hotkey::Hotkey;

/// Keeps the registrations alive. Dropping it unregisters every hotkey.
#[derive(Debug)]
pub struct Hotkeys {
    _listener: HotkeyListener,
    _registrations: Vec<HotkeyRegistration>,
}

impl Hotkeys {
    /// Must be called on the main thread.
    pub fn register(
        bindings: &[(Hotkey, Command)],
        events_tx: controller::Sender,
    ) -> Result<Self, String> {
        let commands: Vec<Command> = bindings.iter().map(|(_, cmd)| cmd.clone()).collect();
        let listener = HotkeyListener::install(move |id| {
            match commands.get(id as usize) {
                Some(cmd) => {
                    debug!(?cmd, "hotkey pressed");
                    events_tx.send(Event::Command(cmd.clone()));
                }
                None => warn!(id, "press for an unknown hotkey id"),
            }
        })?;

        let mut registrations = Vec::with_capacity(bindings.len());
        for (id, (hotkey, cmd)) in bindings.iter().enumerate() {
            match HotkeyRegistration::register(hotkey, id as u32) {
                Ok(reg) => {
                    debug!(%hotkey, ?cmd, "registered");
                    registrations.push(reg);
                }
                // usually another app already owns the combination
                Err(e) => warn!("{e}"),
            }
        }
        info!("registered {} of {} hotkeys", registrations.len(), bindings.len());

        Ok(Hotkeys { _listener: listener, _registrations: registrations })
    }
}
