//! Primary display geometry: full bounds and the work area left over once the
//! menu bar and a visible dock are taken out.

use objc2_core_foundation::{CGPoint, CGRect, CGSize};
use objc2_core_graphics::{CGDisplayBounds, CGMainDisplayID};

use super::geometry::Rect;
use super::skylight::{
    CoreDockGetAutoHideEnabled, CoreDockGetOrientationAndPinning, G_CONNECTION,
    SLSGetDisplayMenubarHeight, SLSGetDockRectWithReason, SLSGetMenuBarAutohideEnabled,
};

const DOCK_ORIENTATION_LEFT: i32 = 1;
const DOCK_ORIENTATION_BOTTOM: i32 = 2;
const DOCK_ORIENTATION_RIGHT: i32 = 3;

pub fn main_display_bounds() -> Rect { CGDisplayBounds(CGMainDisplayID()).into() }

pub fn main_work_area() -> Rect {
    let did = CGMainDisplayID();
    constrain_display_bounds(did, CGDisplayBounds(did)).into()
}

fn menu_bar_hidden() -> bool {
    let mut status = 0;
    unsafe { SLSGetMenuBarAutohideEnabled(*G_CONNECTION, &mut status) };
    status != 0
}

fn menu_bar_height(did: u32) -> f64 {
    let mut height: u32 = 0;
    unsafe { SLSGetDisplayMenubarHeight(did, &mut height) };
    height as f64
}

fn dock_orientation() -> i32 {
    let mut orientation = 0;
    let mut pinning = 0;
    unsafe { CoreDockGetOrientationAndPinning(&mut orientation, &mut pinning) };
    orientation
}

fn dock_rect_with_reason() -> (CGRect, i32) {
    let mut rect = CGRect::new(CGPoint::new(0.0, 0.0), CGSize::new(0.0, 0.0));
    let mut reason = 0;
    unsafe { SLSGetDockRectWithReason(*G_CONNECTION, &mut rect, &mut reason) };
    (rect, reason)
}

fn constrain_display_bounds(did: u32, raw: CGRect) -> CGRect {
    let mut frame = raw;

    if !menu_bar_hidden() {
        // the reported height excludes the topmost pixel row
        let h = menu_bar_height(did) + 1.0;
        if h > 1.0 {
            frame.origin.y += h;
            frame.size.height = (frame.size.height - h).max(0.0);
        }
    }

    let auto_hide = unsafe { CoreDockGetAutoHideEnabled() };
    let (dock, dock_reason) = dock_rect_with_reason();
    let dock_visible = (!auto_hide || dock_reason == 0)
        && !Rect::from(frame).intersection(&Rect::from(dock)).is_degenerate();

    if dock_visible {
        match dock_orientation() {
            DOCK_ORIENTATION_LEFT => {
                frame.origin.x += dock.size.width;
                frame.size.width = (frame.size.width - dock.size.width).max(0.0);
            }
            DOCK_ORIENTATION_RIGHT => {
                frame.size.width = (frame.size.width - dock.size.width).max(0.0);
            }
            DOCK_ORIENTATION_BOTTOM => {
                frame.size.height = (frame.size.height - dock.size.height).max(0.0);
            }
            _ => {}
        }
    }

    frame
}
