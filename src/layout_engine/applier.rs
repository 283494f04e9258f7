use serde::Serialize;
use tracing::{debug, warn};

use crate::model::layout::Layout;
use crate::sys::geometry::Rect;
use crate::sys::window_directory::WindowInfo;
use crate::sys::window_mover::WindowMover;
use crate::sys::window_server::{Error, WindowHandle, WindowServer};

#[derive(Debug, Clone, Copy)]
pub enum Targets<'a> {
    /// The first zone only, applied to this window.
    One(&'a WindowInfo),
    /// The i-th window goes to the i-th zone.
    All(&'a [WindowInfo]),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    #[error("layout {0:?} has no zones")]
    EmptyLayout(String),
    #[error("no open windows found")]
    NoWindows,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyFailure {
    pub handle: WindowHandle,
    pub title: String,
    pub zone: usize,
    pub reason: String,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyReport {
    pub layout: String,
    pub moved: usize,
    pub failures: Vec<ApplyFailure>,
    /// Windows left alone because the layout ran out of zones.
    pub unassigned_windows: usize,
    pub unused_zones: usize,
}

impl ApplyReport {
    pub fn skipped(&self) -> usize { self.failures.len() + self.unassigned_windows }

    pub fn is_complete(&self) -> bool { self.failures.is_empty() }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutApplier {
    mover: WindowMover,
}

impl LayoutApplier {
    pub fn new(mover: WindowMover) -> Self { LayoutApplier { mover } }

    pub fn set_mover(&mut self, mover: WindowMover) { self.mover = mover; }

    /// Places `targets` into `layout`'s zones, which are relative to `screen`.
    ///
    /// Pairing is positional: window order is the directory's enumeration order.
    /// A window that fails to move is recorded and the rest carry on.
    pub fn apply(
        &self,
        server: &impl WindowServer,
        layout: &Layout,
        targets: Targets<'_>,
        screen: Rect,
    ) -> Result<ApplyReport, ApplyError> {
        let zones: Vec<Rect> = layout.applicable_zones().map(|z| z.bounds).collect();
        if zones.is_empty() {
            return Err(ApplyError::EmptyLayout(layout.name.clone()));
        }

        let windows: &[WindowInfo] = match targets {
            Targets::One(window) => std::slice::from_ref(window),
            Targets::All(windows) => windows,
        };
        if windows.is_empty() {
            return Err(ApplyError::NoWindows);
        }
        let zones = match targets {
            Targets::One(_) => &zones[..1],
            Targets::All(_) => &zones[..],
        };

        let pairs = windows.len().min(zones.len());
        let mut report = ApplyReport {
            layout: layout.name.clone(),
            moved: 0,
            failures: Vec::new(),
            unassigned_windows: windows.len() - pairs,
            unused_zones: zones.len() - pairs,
        };

        for (index, (window, zone)) in windows.iter().zip(zones).enumerate() {
            match self.mover.move_to_zone(server, window.handle, *zone, screen) {
                Ok(frame) => {
                    debug!(handle = %window.handle, zone = index, %frame, "placed window");
                    report.moved += 1;
                }
                Err(e) => {
                    warn!(title = %window.title, "could not place window in zone {index}: {e}");
                    report.failures.push(ApplyFailure {
                        handle: window.handle,
                        title: window.title.clone(),
                        zone: index,
                        reason: e.to_string(),
                        stale: matches!(e, Error::StaleHandle(_)),
                    });
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::model::layout::LayoutZone;
    use crate::sys::testing::FakeWindowServer;
    use crate::sys::window_directory::{ExclusionRules, WindowDirectory};

    const SCREEN: Rect = Rect::new(0.0, 0.0, 1920.0, 1080.0);

    fn layout(zones: &[Rect]) -> Layout {
        Layout::new(
            "test",
            SCREEN,
            zones.iter().map(|b| LayoutZone::new(*b, 0, 0)).collect(),
        )
    }

    fn halves() -> Layout {
        layout(&[Rect::new(0.0, 0.0, 960.0, 1080.0), Rect::new(960.0, 0.0, 960.0, 1080.0)])
    }

    fn windows(server: &FakeWindowServer) -> Vec<WindowInfo> {
        WindowDirectory::new(ExclusionRules::default()).list_windows(server)
    }

    #[test]
    fn three_windows_two_zones() {
        let server = FakeWindowServer::new();
        let a = server.add_window("A", "Code");
        let b = server.add_window("B", "Mail");
        let c = server.add_window("C", "Notes");
        let before = server.frame(c);

        let report =
            LayoutApplier::default().apply(&server, &halves(), Targets::All(&windows(&server)), SCREEN).unwrap();

        assert_eq!(report.moved, 2);
        assert_eq!(report.unassigned_windows, 1);
        assert_eq!(report.unused_zones, 0);
        assert_eq!(report.skipped(), 1);
        assert_eq!(server.moved(), vec![a, b]);
        assert_eq!(server.frame(a), Some(Rect::new(0.0, 0.0, 960.0, 1080.0)));
        assert_eq!(server.frame(b), Some(Rect::new(960.0, 0.0, 960.0, 1080.0)));
        assert_eq!(server.frame(c), before);
    }

    #[test]
    fn two_windows_three_zones() {
        let server = FakeWindowServer::new();
        server.add_window("A", "Code");
        server.add_window("B", "Mail");
        let thirds = layout(&[
            Rect::new(0.0, 0.0, 640.0, 1080.0),
            Rect::new(640.0, 0.0, 640.0, 1080.0),
            Rect::new(1280.0, 0.0, 640.0, 1080.0),
        ]);

        let report =
            LayoutApplier::default().apply(&server, &thirds, Targets::All(&windows(&server)), SCREEN).unwrap();

        assert_eq!(report.moved, 2);
        assert_eq!(report.unused_zones, 1);
        assert_eq!(report.unassigned_windows, 0);
        assert_eq!(server.moved().len(), 2);
    }

    #[test]
    fn stale_handle_is_isolated() {
        let server = FakeWindowServer::new();
        let a = server.add_window("A", "Code");
        let b = server.add_window("B", "Mail");
        let c = server.add_window("C", "Notes");
        let snapshot = windows(&server);
        server.close(b);
        let thirds = layout(&[
            Rect::new(0.0, 0.0, 640.0, 1080.0),
            Rect::new(640.0, 0.0, 640.0, 1080.0),
            Rect::new(1280.0, 0.0, 640.0, 1080.0),
        ]);

        let report =
            LayoutApplier::default().apply(&server, &thirds, Targets::All(&snapshot), SCREEN).unwrap();

        assert_eq!(report.moved, 2);
        assert_eq!(server.moved(), vec![a, c]);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!((failure.handle, failure.zone, failure.stale), (b, 1, true));
        assert_eq!(server.frame(c), Some(Rect::new(1280.0, 0.0, 640.0, 1080.0)));
    }

    #[test]
    fn other_failures_are_isolated_too() {
        let server = FakeWindowServer::new();
        let a = server.add_window("A", "Code");
        let b = server.add_window("B", "Mail");
        server.refuse_moves(a);

        let report =
            LayoutApplier::default().apply(&server, &halves(), Targets::All(&windows(&server)), SCREEN).unwrap();

        assert_eq!(report.moved, 1);
        assert!(!report.failures[0].stale);
        assert_eq!(server.frame(b), Some(Rect::new(960.0, 0.0, 960.0, 1080.0)));
    }

    #[test]
    fn empty_layout_is_rejected_without_mutation() {
        let server = FakeWindowServer::new();
        server.add_window("A", "Code");
        let all = windows(&server);

        for empty in [layout(&[]), layout(&[Rect::new(0.0, 0.0, 0.0, 0.0)])] {
            let err = LayoutApplier::default()
                .apply(&server, &empty, Targets::All(&all), SCREEN)
                .unwrap_err();
            assert_eq!(err, ApplyError::EmptyLayout("test".into()));
            let err =
                LayoutApplier::default().apply(&server, &empty, Targets::One(&all[0]), SCREEN).unwrap_err();
            assert_eq!(err, ApplyError::EmptyLayout("test".into()));
        }
        assert!(server.ops().is_empty());
    }

    #[test]
    fn no_windows_is_reported() {
        let server = FakeWindowServer::new();
        let err = LayoutApplier::default().apply(&server, &halves(), Targets::All(&[]), SCREEN).unwrap_err();
        assert_eq!(err, ApplyError::NoWindows);
    }

    #[test]
    fn single_target_uses_first_zone() {
        let server = FakeWindowServer::new();
        server.add_window("A", "Code");
        let b = server.add_window("B", "Mail");
        let all = windows(&server);

        let report =
            LayoutApplier::default().apply(&server, &halves(), Targets::One(&all[1]), SCREEN).unwrap();

        assert_eq!(report.moved, 1);
        assert_eq!(server.moved(), vec![b]);
        assert_eq!(server.frame(b), Some(Rect::new(0.0, 0.0, 960.0, 1080.0)));
    }

    #[test]
    fn single_target_stale_window_fails() {
        let server = FakeWindowServer::new();
        let a = server.add_window("A", "Code");
        let all = windows(&server);
        server.close(a);

        let report =
            LayoutApplier::default().apply(&server, &halves(), Targets::One(&all[0]), SCREEN).unwrap();

        assert_eq!(report.moved, 0);
        assert!(report.failures[0].stale);
    }

    #[test]
    fn tiny_zone_is_clamped() {
        let server = FakeWindowServer::new();
        let a = server.add_window("A", "Code");
        let tiny = layout(&[Rect::new(10.0, 10.0, 10.0, 10.0)]);

        LayoutApplier::default().apply(&server, &tiny, Targets::All(&windows(&server)), SCREEN).unwrap();

        let frame = server.frame(a).unwrap();
        assert!(frame.width >= 100.0 && frame.height >= 100.0);
    }

    #[test]
    fn zones_are_offset_by_screen_origin() {
        let server = FakeWindowServer::new();
        let a = server.add_window("A", "Code");
        let screen = Rect::new(0.0, 25.0, 1920.0, 1055.0);

        LayoutApplier::default()
            .apply(&server, &halves(), Targets::All(&windows(&server)), screen)
            .unwrap();

        assert_eq!(server.frame(a), Some(Rect::new(0.0, 25.0, 960.0, 1080.0)));
    }

    #[test]
    fn maximized_windows_are_restored_before_placement() {
        let server = FakeWindowServer::new();
        let a = server.add_window("A", "Code");
        server.set_state(a, crate::sys::window_server::WindowState::Maximized);

        LayoutApplier::default()
            .apply(&server, &halves(), Targets::All(&windows(&server)), SCREEN)
            .unwrap();

        assert_eq!(server.frame(a), Some(Rect::new(0.0, 0.0, 960.0, 1080.0)));
    }
}
