//! Utilities for interfacing with OS-specific APIs.

pub mod geometry;
pub mod hotkey;
pub mod window_directory;
pub mod window_mover;
pub mod window_server;

#[cfg(target_os = "macos")]
pub mod axuielement;
#[cfg(target_os = "macos")]
pub mod carbon;
#[cfg(target_os = "macos")]
pub mod native;
#[cfg(target_os = "macos")]
pub mod screen;
#[cfg(target_os = "macos")]
pub mod skylight;

#[cfg(test)]
pub(crate) mod testing;
