//! [`WindowServer`] backed by the macOS window server and accessibility API.
//!
//! Enumeration comes from `CGWindowListCopyWindowInfo`, which is cheap and never
//! blocks on an unresponsive application. Titles the window list withholds are
//! read over AX at most once per process per enumeration, and every AX call is
//! capped by the messaging timeout set in [`NativeWindowServer::new`]. Mutation
//! goes through AX, resolving the handle's window number against the owning
//! application's window list on every call so a closed window surfaces as
//! [`Error::StaleHandle`].

use objc2_app_kit::{NSApplicationActivationOptions, NSRunningApplication, NSWorkspace};
use objc2_application_services::AXIsProcessTrusted;
use objc2_core_foundation::{
    CFArray, CFDictionary, CFNumber, CFRetained, CFString, CFType, CGPoint, CGRect, CGSize,
};
use objc2_core_graphics::{
    CGWindowListCopyWindowInfo, CGWindowListOption, kCGNullWindowID, kCGWindowBounds,
    kCGWindowLayer, kCGWindowName, kCGWindowNumber, kCGWindowOwnerName, kCGWindowOwnerPID,
};
use tracing::{debug, trace, warn};

use crate::common::collections::HashMap;

use super::axuielement::{AXUIElement, Error as AxError};
use super::geometry::Rect;
use super::screen;
use super::skylight::CGRectMakeWithDictionaryRepresentation;
use super::window_server::{Error, RawWindow, Result, WindowHandle, WindowServer, WindowState};

/// Windows on any other layer are menus, panels, the dock and similar chrome.
const NORMAL_WINDOW_LAYER: i64 = 0;

/// Upper bound on any single AX round trip to another application.
const AX_MESSAGING_TIMEOUT_SECS: f32 = 1.0;

#[derive(Debug, Clone, Copy)]
pub struct NativeWindowServer;

impl NativeWindowServer {
    pub fn new() -> Self {
        if let Err(e) = AXUIElement::system_wide().set_messaging_timeout(AX_MESSAGING_TIMEOUT_SECS)
        {
            warn!("could not set the AX messaging timeout: {e}");
        }
        NativeWindowServer
    }

    /// Whether this process may drive other applications' windows.
    pub fn accessibility_trusted() -> bool { unsafe { AXIsProcessTrusted() } }

    fn element(&self, handle: WindowHandle) -> Result<AXUIElement> {
        let app = AXUIElement::application(handle.pid() as i32);
        let windows = app.windows().map_err(|e| ax_error(handle, e))?;
        windows
            .into_iter()
            .find(|w| w.window_id().ok() == Some(handle.window_number()))
            .ok_or(Error::StaleHandle(handle))
    }
}

fn ax_error(handle: WindowHandle, e: AxError) -> Error {
    if e.is_gone() {
        Error::StaleHandle(handle)
    } else {
        Error::Os { handle, message: e.to_string() }
    }
}

fn get_num(dict: &CFDictionary<CFString, CFType>, key: &'static CFString) -> Option<i64> {
    dict.get(key)?.downcast::<CFNumber>().ok()?.as_i64()
}

fn get_string(dict: &CFDictionary<CFString, CFType>, key: &'static CFString) -> Option<String> {
    Some(dict.get(key)?.downcast::<CFString>().ok()?.to_string())
}

fn get_bounds(dict: &CFDictionary<CFString, CFType>) -> Option<Rect> {
    let bounds = dict.get(unsafe { kCGWindowBounds })?.downcast::<CFDictionary>().ok()?;
    let mut frame = CGRect::default();
    let ok = unsafe {
        CGRectMakeWithDictionaryRepresentation(
            CFRetained::<CFDictionary>::as_ptr(&bounds).as_ptr(),
            &mut frame,
        )
    };
    ok.then(|| frame.into())
}

/// Window titles per process, fetched lazily and at most once per process.
struct FallbackTitles<F> {
    fetch: F,
    by_pid: HashMap<u32, HashMap<u32, String>>,
}

impl<F: FnMut(u32) -> HashMap<u32, String>> FallbackTitles<F> {
    fn new(fetch: F) -> Self { FallbackTitles { fetch, by_pid: HashMap::default() } }

    fn title(&mut self, pid: u32, number: u32) -> Option<String> {
        let fetch = &mut self.fetch;
        self.by_pid.entry(pid).or_insert_with(|| fetch(pid)).get(&number).cloned()
    }
}

fn ax_titles(pid: u32) -> HashMap<u32, String> {
    let windows = match AXUIElement::application(pid as i32).windows() {
        Ok(windows) => windows,
        Err(e) => {
            trace!(pid, "no AX windows: {e}");
            return HashMap::default();
        }
    };
    windows.iter().filter_map(|w| Some((w.window_id().ok()?, w.title().ok()?))).collect()
}

fn make_raw<F: FnMut(u32) -> HashMap<u32, String>>(
    dict: &CFDictionary<CFString, CFType>,
    titles: &mut FallbackTitles<F>,
) -> Option<RawWindow> {
    if get_num(dict, unsafe { kCGWindowLayer })? != NORMAL_WINDOW_LAYER {
        return None;
    }
    let number: u32 = get_num(dict, unsafe { kCGWindowNumber })?.try_into().ok()?;
    let pid: u32 = get_num(dict, unsafe { kCGWindowOwnerPID })?.try_into().ok()?;
    let handle = WindowHandle::from_parts(pid, number);
    let class = get_string(dict, unsafe { kCGWindowOwnerName }).unwrap_or_default();

    // kCGWindowName needs screen recording permission; fall back to AX
    let title = get_string(dict, unsafe { kCGWindowName })
        .filter(|t| !t.is_empty())
        .or_else(|| titles.title(pid, number))
        .unwrap_or_default();

    Some(RawWindow {
        handle,
        owner_pid: pid,
        class,
        title,
        // the list is requested with OptionOnScreenOnly
        is_visible: true,
        bounds: get_bounds(dict),
    })
}

impl WindowServer for NativeWindowServer {
    fn windows(&self) -> Vec<RawWindow> {
        let list = unsafe {
            CGWindowListCopyWindowInfo(
                CGWindowListOption::OptionOnScreenOnly | CGWindowListOption::ExcludeDesktopElements,
                kCGNullWindowID,
            )
        };
        let Some(list) = list else {
            debug!("CGWindowListCopyWindowInfo returned nothing");
            return Vec::new();
        };
        let list: CFRetained<CFArray<CFDictionary<CFString, CFType>>> =
            unsafe { CFRetained::cast_unchecked(list) };
        let mut titles = FallbackTitles::new(ax_titles);
        list.iter().filter_map(|dict| make_raw(&dict, &mut titles)).collect()
    }

    fn frontmost_window(&self) -> Option<WindowHandle> {
        let app = NSWorkspace::sharedWorkspace().frontmostApplication()?;
        let pid = app.processIdentifier();
        let window = AXUIElement::application(pid).focused_window().ok()??;
        let number = window.window_id().ok()?;
        Some(WindowHandle::from_parts(pid as u32, number))
    }

    fn window_state(&self, handle: WindowHandle) -> Result<WindowState> {
        let window = self.element(handle)?;
        if window.minimized().map_err(|e| ax_error(handle, e))? {
            return Ok(WindowState::Minimized);
        }
        // not every window exposes AXFullScreen
        if window.fullscreen().unwrap_or(false) {
            return Ok(WindowState::Maximized);
        }
        Ok(WindowState::Normal)
    }

    fn restore(&self, handle: WindowHandle) -> Result<()> {
        let window = self.element(handle)?;
        if window.minimized().unwrap_or(false) {
            window.set_bool_attribute("AXMinimized", false).map_err(|e| ax_error(handle, e))?;
        }
        if window.fullscreen().unwrap_or(false) {
            window.set_bool_attribute("AXFullScreen", false).map_err(|e| ax_error(handle, e))?;
        }
        Ok(())
    }

    fn set_frame(&self, handle: WindowHandle, frame: Rect) -> Result<()> {
        let window = self.element(handle)?;
        let position = CGPoint::new(frame.left, frame.top);
        trace!(%handle, %frame, "set_frame");
        // position first so the size isn't clipped against the old origin, then
        // again in case the size change pushed the window
        window.set_position(position).map_err(|e| ax_error(handle, e))?;
        window
            .set_size(CGSize::new(frame.width, frame.height))
            .map_err(|e| ax_error(handle, e))?;
        window.set_position(position).map_err(|e| ax_error(handle, e))?;
        Ok(())
    }

    fn raise(&self, handle: WindowHandle) -> Result<()> {
        let window = self.element(handle)?;
        window.raise().map_err(|e| ax_error(handle, e))?;
        if let Some(app) =
            NSRunningApplication::runningApplicationWithProcessIdentifier(handle.pid() as i32)
        {
            #[allow(deprecated)]
            app.activateWithOptions(NSApplicationActivationOptions::ActivateIgnoringOtherApps);
        }
        Ok(())
    }

    fn screen_bounds(&self) -> Rect { screen::main_display_bounds() }

    fn work_area(&self) -> Rect { screen::main_work_area() }
}
