// credits
// https://github.com/koekeishiya/yabai/blob/d55a647913ab72d8d8b348bee2d3e59e52ce4a5d/src/misc/extern.h.

use objc2_application_services::{AXError, AXUIElement};
use objc2_core_foundation::{CFDictionary, CGRect};
use objc2_core_graphics::CGWindowID;
use once_cell::sync::Lazy;

pub static G_CONNECTION: Lazy<cid_t> = Lazy::new(|| unsafe { SLSMainConnectionID() });

#[allow(non_camel_case_types)]
pub type cid_t = i32;

unsafe extern "C" {
    pub fn CGRectMakeWithDictionaryRepresentation(
        dict: *mut CFDictionary,
        rect: *mut CGRect,
    ) -> bool;

    pub fn _AXUIElementGetWindow(elem: *mut AXUIElement, wid: *mut CGWindowID) -> AXError;

    pub fn SLSMainConnectionID() -> cid_t;
    pub fn SLSGetMenuBarAutohideEnabled(cid: cid_t, enabled: *mut i32) -> i32;
    pub fn SLSGetDisplayMenubarHeight(did: u32, height: *mut u32) -> i32;
    pub fn SLSGetDockRectWithReason(cid: cid_t, rect: *mut CGRect, reason: *mut i32) -> bool;
    pub fn CoreDockGetAutoHideEnabled() -> bool;
    pub fn CoreDockGetOrientationAndPinning(orientation: *mut i32, pinning: *mut i32) -> bool;
}
