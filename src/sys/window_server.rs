//! The seam between the engine and the operating system's window server.
//!
//! Everything that reads or mutates live windows goes through [`WindowServer`].
//! Handles are lookup keys into the OS's own tables; nothing here owns a window,
//! and every call that takes a handle can fail with [`Error::StaleHandle`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geometry::Rect;

/// Opaque window identifier.
///
/// On macOS the high 32 bits hold the owning process id and the low 32 bits the
/// window server's window number, so a handle can be resolved without a lookup
/// table of our own.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowHandle(u64);

impl WindowHandle {
    #[inline]
    pub const fn new(raw: u64) -> Self { Self(raw) }

    #[inline]
    pub const fn from_parts(pid: u32, window_number: u32) -> Self {
        Self(((pid as u64) << 32) | window_number as u64)
    }

    #[inline]
    pub const fn raw(self) -> u64 { self.0 }

    #[inline]
    pub const fn pid(self) -> u32 { (self.0 >> 32) as u32 }

    #[inline]
    pub const fn window_number(self) -> u32 { self.0 as u32 }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#x}", self.0) }
}

impl FromStr for WindowHandle {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let raw = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16)?,
            None => s.parse()?,
        };
        Ok(Self(raw))
    }
}

/// A top-level window as enumerated, before any filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWindow {
    pub handle: WindowHandle,
    pub owner_pid: u32,
    /// Window class or owning application name, used for shell exclusion.
    pub class: String,
    pub title: String,
    pub is_visible: bool,
    /// `None` when the geometry query failed.
    pub bounds: Option<Rect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Normal,
    Maximized,
    Minimized,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("window {0} no longer exists")]
    StaleHandle(WindowHandle),
    #[error("window {handle}: {message}")]
    Os { handle: WindowHandle, message: String },
}

impl Error {
    pub fn is_stale(&self) -> bool { matches!(self, Error::StaleHandle(_)) }
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait WindowServer {
    /// Top-level windows in enumeration order. Never mutates anything.
    fn windows(&self) -> Vec<RawWindow>;

    fn frontmost_window(&self) -> Option<WindowHandle>;

    fn window_state(&self, handle: WindowHandle) -> Result<WindowState>;

    /// Brings a maximized or minimized window back to its normal state.
    fn restore(&self, handle: WindowHandle) -> Result<()>;

    fn set_frame(&self, handle: WindowHandle, frame: Rect) -> Result<()>;

    fn raise(&self, handle: WindowHandle) -> Result<()>;

    /// Full bounds of the primary display.
    fn screen_bounds(&self) -> Rect;

    /// The primary display minus menu bar, dock, taskbar and similar chrome.
    fn work_area(&self) -> Rect;
}

impl<T: WindowServer + ?Sized> WindowServer for &T {
    fn windows(&self) -> Vec<RawWindow> { (**self).windows() }

    fn frontmost_window(&self) -> Option<WindowHandle> { (**self).frontmost_window() }

    fn window_state(&self, handle: WindowHandle) -> Result<WindowState> {
        (**self).window_state(handle)
    }

    fn restore(&self, handle: WindowHandle) -> Result<()> { (**self).restore(handle) }

    fn set_frame(&self, handle: WindowHandle, frame: Rect) -> Result<()> {
        (**self).set_frame(handle, frame)
    }

    fn raise(&self, handle: WindowHandle) -> Result<()> { (**self).raise(handle) }

    fn screen_bounds(&self) -> Rect { (**self).screen_bounds() }

    fn work_area(&self) -> Rect { (**self).work_area() }
}
