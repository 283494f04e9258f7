use tracing::{debug, instrument};

use super::geometry::{Rect, Size};
use super::window_server::{Result, WindowHandle, WindowServer, WindowState};

pub const DEFAULT_MIN_SIZE: Size = Size::new(100.0, 100.0);

#[derive(Debug, Clone, Copy)]
pub struct WindowMover {
    min_size: Size,
}

impl Default for WindowMover {
    fn default() -> Self { WindowMover { min_size: DEFAULT_MIN_SIZE } }
}

impl WindowMover {
    pub fn new(min_size: Size) -> Self { WindowMover { min_size } }

    pub fn min_size(&self) -> Size { self.min_size }

    /// Places `handle` at `target`, which is relative to `reference_screen`'s origin.
    ///
    /// Maximized and minimized windows ignore geometry calls, so they are restored
    /// first. Returns the frame that was applied.
    #[instrument(level = "debug", skip(self, server))]
    pub fn move_to_zone(
        &self,
        server: &impl WindowServer,
        handle: WindowHandle,
        target: Rect,
        reference_screen: Rect,
    ) -> Result<Rect> {
        let frame = target
            .translate(reference_screen.left, reference_screen.top)
            .with_min_size(self.min_size);

        match server.window_state(handle) {
            Ok(WindowState::Normal) => {}
            Ok(state) => {
                debug!(?state, "restoring before move");
                server.restore(handle)?;
            }
            Err(e) if e.is_stale() => return Err(e),
            Err(e) => debug!("could not query window state, moving anyway: {e}"),
        }

        server.set_frame(handle, frame)?;
        server.raise(handle)?;
        Ok(frame)
    }
}
