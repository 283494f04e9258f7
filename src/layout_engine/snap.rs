use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};
use tracing::{debug, instrument};

use crate::common::collections::HashMap;
use crate::sys::geometry::Rect;
use crate::sys::window_mover::WindowMover;
use crate::sys::window_server::{Result, WindowHandle, WindowServer};

/// Canonical snap targets, declared in cycle order.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SnapPosition {
    Full,
    LeftHalf,
    RightHalf,
    TopHalf,
    BottomHalf,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl SnapPosition {
    pub const CYCLE: [SnapPosition; 9] = [
        SnapPosition::Full,
        SnapPosition::LeftHalf,
        SnapPosition::RightHalf,
        SnapPosition::TopHalf,
        SnapPosition::BottomHalf,
        SnapPosition::TopLeft,
        SnapPosition::TopRight,
        SnapPosition::BottomLeft,
        SnapPosition::BottomRight,
    ];

    pub fn successor(self) -> SnapPosition {
        let i = Self::CYCLE.iter().position(|p| *p == self).unwrap_or(0);
        Self::CYCLE[(i + 1) % Self::CYCLE.len()]
    }

    /// `(x, y, width, height)` as fractions of the work area.
    pub fn fractions(self) -> (f64, f64, f64, f64) {
        use SnapPosition::*;
        match self {
            Full => (0.0, 0.0, 1.0, 1.0),
            LeftHalf => (0.0, 0.0, 0.5, 1.0),
            RightHalf => (0.5, 0.0, 0.5, 1.0),
            TopHalf => (0.0, 0.0, 1.0, 0.5),
            BottomHalf => (0.0, 0.5, 1.0, 0.5),
            TopLeft => (0.0, 0.0, 0.5, 0.5),
            TopRight => (0.5, 0.0, 0.5, 0.5),
            BottomLeft => (0.0, 0.5, 0.5, 0.5),
            BottomRight => (0.5, 0.5, 0.5, 0.5),
        }
    }

    pub fn resolve(self, work_area: Rect) -> Rect {
        let (x, y, w, h) = self.fractions();
        Rect::fraction_of(work_area, x, y, w, h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapOutcome {
    pub position: SnapPosition,
    /// The frame handed to the window server, after minimum-size clamping.
    pub frame: Rect,
}

/// Per-window snap state plus the logic that advances it.
///
/// The state map belongs to this instance. Entries appear on first use and are
/// never removed; a stale entry for a closed window is harmless.
pub struct SnapCycler {
    state: Mutex<HashMap<WindowHandle, SnapPosition>>,
    mover: WindowMover,
}

impl SnapCycler {
    pub fn new(mover: WindowMover) -> Self {
        SnapCycler {
            state: Mutex::new(HashMap::default()),
            mover,
        }
    }

    pub fn set_mover(&mut self, mover: WindowMover) { self.mover = mover; }

    /// Advances `handle` to the next position. A window with no recorded state
    /// counts as `Full`, so the first cycle lands on `LeftHalf`.
    #[instrument(level = "debug", skip(self, server))]
    pub fn cycle(&self, server: &impl WindowServer, handle: WindowHandle) -> Result<SnapOutcome> {
        // held for the whole transition so cycles of one window never interleave
        let mut state = self.state.lock();
        let current = state.get(&handle).copied().unwrap_or(SnapPosition::Full);
        let next = current.successor();
        let frame = self.place(server, handle, next)?;
        state.insert(handle, next);
        debug!(?current, ?next, "cycled");
        Ok(SnapOutcome { position: next, frame })
    }

    /// Moves `handle` straight to `position`; later cycles continue from there.
    #[instrument(level = "debug", skip(self, server))]
    pub fn snap_to(
        &self,
        server: &impl WindowServer,
        handle: WindowHandle,
        position: SnapPosition,
    ) -> Result<SnapOutcome> {
        let mut state = self.state.lock();
        let frame = self.place(server, handle, position)?;
        state.insert(handle, position);
        Ok(SnapOutcome { position, frame })
    }

    fn place(
        &self,
        server: &impl WindowServer,
        handle: WindowHandle,
        position: SnapPosition,
    ) -> Result<Rect> {
        let target = position.resolve(server.work_area());
        // already absolute, so the reference origin is zero
        self.mover.move_to_zone(server, handle, target, Rect::default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;
    use test_log::test;

    use super::*;
    use crate::sys::testing::FakeWindowServer;
    use crate::sys::window_server::Error;

    fn cycler() -> SnapCycler { SnapCycler::new(WindowMover::default()) }

    fn server() -> FakeWindowServer {
        FakeWindowServer::with_screen(
            Rect::new(0.0, 0.0, 1440.0, 900.0),
            Rect::new(0.0, 25.0, 1440.0, 875.0),
        )
    }

    #[test]
    fn cycle_order_matches_declaration_order() {
        assert_eq!(SnapPosition::iter().collect::<Vec<_>>(), SnapPosition::CYCLE.to_vec());
        assert_eq!(SnapPosition::BottomRight.successor(), SnapPosition::Full);
        assert_eq!(SnapPosition::Full.successor(), SnapPosition::LeftHalf);
    }

    #[test]
    fn positions_parse_from_their_config_names() {
        assert_eq!("left_half".parse::<SnapPosition>().unwrap(), SnapPosition::LeftHalf);
        assert_eq!(SnapPosition::BottomRight.to_string(), "bottom_right");
        assert!("middle".parse::<SnapPosition>().is_err());
    }

    #[test]
    fn fractions_resolve_against_work_area() {
        let work = Rect::new(0.0, 25.0, 1440.0, 875.0);
        assert_eq!(SnapPosition::LeftHalf.resolve(work), Rect::new(0.0, 25.0, 720.0, 875.0));
        assert_eq!(
            SnapPosition::TopRight.resolve(work),
            Rect::new(720.0, 25.0, 720.0, 437.5)
        );
        assert_eq!(
            SnapPosition::BottomHalf.resolve(work),
            Rect::new(0.0, 462.5, 1440.0, 437.5)
        );
        assert_eq!(SnapPosition::Full.resolve(work), work);
    }

    #[test]
    fn first_cycle_goes_to_left_half() {
        let server = server();
        let w = server.add_window("Editor", "Code");
        let out = cycler().cycle(&server, w).unwrap();
        assert_eq!(out.position, SnapPosition::LeftHalf);
        assert_eq!(server.frame(w), Some(Rect::new(0.0, 25.0, 720.0, 875.0)));
    }

    #[test]
    fn nine_cycles_return_to_first_rectangle() {
        let server = server();
        let w = server.add_window("Editor", "Code");
        let cycler = cycler();

        let frames: Vec<Rect> = (0..10).map(|_| cycler.cycle(&server, w).unwrap().frame).collect();

        assert_eq!(frames[9], frames[0]);
        assert_eq!(cycler.state.lock().get(&w).copied(), Some(SnapPosition::LeftHalf));
        assert_eq!(frames[8], SnapPosition::Full.resolve(server.work_area()));
    }

    #[test]
    fn handles_cycle_independently() {
        let server = server();
        let a = server.add_window("A", "Code");
        let b = server.add_window("B", "Mail");

        let isolated = cycler();
        let alone: Vec<Rect> = (0..5).map(|_| isolated.cycle(&server, a).unwrap().frame).collect();

        let shared = cycler();
        let mut interleaved_a = Vec::new();
        let mut interleaved_b = Vec::new();
        for i in 0..5 {
            interleaved_a.push(shared.cycle(&server, a).unwrap().frame);
            if i % 2 == 0 {
                interleaved_b.push(shared.cycle(&server, b).unwrap().frame);
                interleaved_b.push(shared.cycle(&server, b).unwrap().frame);
            }
        }

        assert_eq!(interleaved_a, alone);
        assert_eq!(interleaved_b[..5], alone[..]);
    }

    #[test]
    fn snap_to_sets_the_cycle_origin() {
        let server = server();
        let w = server.add_window("Editor", "Code");
        let cycler = cycler();

        cycler.snap_to(&server, w, SnapPosition::TopLeft).unwrap();
        let out = cycler.cycle(&server, w).unwrap();

        assert_eq!(out.position, SnapPosition::TopRight);
    }

    #[test]
    fn stale_window_keeps_its_state() {
        let server = server();
        let w = server.add_window("Editor", "Code");
        let cycler = cycler();
        cycler.cycle(&server, w).unwrap();
        server.close(w);

        assert_eq!(cycler.cycle(&server, w), Err(Error::StaleHandle(w)));
        assert_eq!(cycler.state.lock().get(&w).copied(), Some(SnapPosition::LeftHalf));
    }

    #[test]
    fn quarter_on_tiny_work_area_is_clamped() {
        let server = FakeWindowServer::with_screen(
            Rect::new(0.0, 0.0, 150.0, 150.0),
            Rect::new(0.0, 0.0, 150.0, 150.0),
        );
        let w = server.add_window("Editor", "Code");
        let out = cycler().snap_to(&server, w, SnapPosition::BottomRight).unwrap();
        assert_eq!(out.frame, Rect::new(75.0, 75.0, 100.0, 100.0));
    }
}
