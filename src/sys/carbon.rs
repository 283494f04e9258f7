//! Carbon event plumbing for system-wide hotkeys.
//!
//! `RegisterEventHotKey` is the one global-hotkey API that needs neither an event
//! tap nor input monitoring permission. Registration and delivery both happen on
//! the main thread's run loop.

#![allow(clippy::missing_safety_doc)]

use std::ffi::c_void;
use std::ptr;

use crate::sys::hotkey::Hotkey;

pub type OSStatus = i32;
pub type EventHandlerCallRef = *mut c_void;
pub type EventHandlerRef = *mut c_void;
pub type EventHotKeyRef = *mut c_void;
pub type EventRef = *mut c_void;
pub type EventTargetRef = *mut c_void;

const NO_ERR: OSStatus = 0;

const fn four_cc(code: &[u8; 4]) -> u32 { u32::from_be_bytes(*code) }

pub const K_EVENT_CLASS_KEYBOARD: u32 = four_cc(b"keyb");
pub const K_EVENT_HOT_KEY_PRESSED: u32 = 5;
const K_EVENT_PARAM_DIRECT_OBJECT: u32 = four_cc(b"----");
const TYPE_EVENT_HOT_KEY_ID: u32 = four_cc(b"hkid");
const HOTKEY_SIGNATURE: u32 = four_cc(b"znsp");

#[allow(non_snake_case)]
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct EventType {
    pub eventClass: u32,
    pub eventKind: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct EventHotKeyID {
    pub signature: u32,
    pub id: u32,
}

#[link(name = "Carbon", kind = "framework")]
unsafe extern "C" {
    fn GetApplicationEventTarget() -> EventTargetRef;

    fn InstallEventHandler(
        target: EventTargetRef,
        handler: Option<
            unsafe extern "C" fn(EventHandlerCallRef, EventRef, *mut c_void) -> OSStatus,
        >,
        num_types: u32,
        type_list: *const EventType,
        user_data: *mut c_void,
        out_ref: *mut EventHandlerRef,
    ) -> OSStatus;

    fn RemoveEventHandler(handler: EventHandlerRef) -> OSStatus;

    fn GetEventParameter(
        event: EventRef,
        name: u32,
        desired_type: u32,
        actual_type: *mut u32,
        buffer_size: u32,
        actual_size: *mut u32,
        data: *mut c_void,
    ) -> OSStatus;

    fn RegisterEventHotKey(
        key_code: u32,
        modifiers: u32,
        id: EventHotKeyID,
        target: EventTargetRef,
        options: u32,
        out_ref: *mut EventHotKeyRef,
    ) -> OSStatus;

    fn UnregisterEventHotKey(hotkey: EventHotKeyRef) -> OSStatus;
}

fn application_target() -> Result<EventTargetRef, String> {
    let t = unsafe { GetApplicationEventTarget() };
    if t.is_null() {
        Err("GetApplicationEventTarget returned null".to_string())
    } else {
        Ok(t)
    }
}

struct CallbackCtx {
    f: Box<dyn FnMut(u32) + Send>,
}

unsafe extern "C" fn trampoline(
    _call_ref: EventHandlerCallRef,
    event: EventRef,
    user_data: *mut c_void,
) -> OSStatus {
    let ctx = unsafe { &mut *(user_data as *mut CallbackCtx) };
    let mut hk = EventHotKeyID::default();
    let status = unsafe {
        GetEventParameter(
            event,
            K_EVENT_PARAM_DIRECT_OBJECT,
            TYPE_EVENT_HOT_KEY_ID,
            ptr::null_mut(),
            std::mem::size_of::<EventHotKeyID>() as u32,
            ptr::null_mut(),
            &mut hk as *mut EventHotKeyID as *mut c_void,
        )
    };
    if status == NO_ERR && hk.signature == HOTKEY_SIGNATURE {
        (ctx.f)(hk.id);
    }
    NO_ERR
}

/// Receives hotkey-pressed events for the application target and reports the
/// id each hotkey was registered with.
pub struct HotkeyListener {
    handler_ref: EventHandlerRef,
    ctx: *mut c_void,
}

// SAFETY: the handler and context pointers are created at install time and only
// touched again by `Drop`; Carbon invokes the callback on the main run loop.
unsafe impl Send for HotkeyListener {}

impl std::fmt::Debug for HotkeyListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotkeyListener").field("handler_ref", &self.handler_ref).finish()
    }
}

impl HotkeyListener {
    pub fn install(callback: impl FnMut(u32) + Send + 'static) -> Result<Self, String> {
        let target = application_target()?;
        let types = [EventType {
            eventClass: K_EVENT_CLASS_KEYBOARD,
            eventKind: K_EVENT_HOT_KEY_PRESSED,
        }];
        let ctx = Box::into_raw(Box::new(CallbackCtx { f: Box::new(callback) })) as *mut c_void;

        let mut handler_ref: EventHandlerRef = ptr::null_mut();
        let status = unsafe {
            InstallEventHandler(
                target,
                Some(trampoline),
                types.len() as u32,
                types.as_ptr(),
                ctx,
                &mut handler_ref,
            )
        };

        if status != NO_ERR || handler_ref.is_null() {
            unsafe { drop(Box::from_raw(ctx as *mut CallbackCtx)) };
            return Err(format!("InstallEventHandler failed: status={status}"));
        }

        Ok(Self { handler_ref, ctx })
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        if !self.handler_ref.is_null() {
            unsafe { RemoveEventHandler(self.handler_ref) };
        }
        if !self.ctx.is_null() {
            unsafe { drop(Box::from_raw(self.ctx as *mut CallbackCtx)) };
        }
    }
}

/// A registered global hotkey. Unregistered on drop.
#[derive(Debug)]
pub struct HotkeyRegistration {
    hotkey_ref: EventHotKeyRef,
}

impl HotkeyRegistration {
    pub fn register(hotkey: &Hotkey, id: u32) -> Result<Self, String> {
        let target = application_target()?;
        let mut hotkey_ref: EventHotKeyRef = ptr::null_mut();
        let status = unsafe {
            RegisterEventHotKey(
                hotkey.key_code.virtual_keycode() as u32,
                hotkey.modifiers.carbon_mask(),
                EventHotKeyID { signature: HOTKEY_SIGNATURE, id },
                target,
                0,
                &mut hotkey_ref,
            )
        };
        if status != NO_ERR || hotkey_ref.is_null() {
            return Err(format!("RegisterEventHotKey({hotkey}) failed: status={status}"));
        }
        Ok(Self { hotkey_ref })
    }
}

impl Drop for HotkeyRegistration {
    fn drop(&mut self) {
        unsafe { UnregisterEventHotKey(self.hotkey_ref) };
    }
}
