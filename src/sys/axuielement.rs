use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};

use objc2_application_services::{AXError, AXUIElement as RawAXUIElement, AXValue, AXValueType};
use objc2_core_foundation::{
    CFArray, CFBoolean, CFRetained, CFString, CFType, CGPoint, CGSize, ConcreteType,
};
use objc2_core_graphics::CGWindowID;

use super::skylight::_AXUIElementGetWindow;

#[derive(Clone)]
pub struct AXUIElement {
    inner: CFRetained<RawAXUIElement>,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("AX error {0:?}")]
    Ax(AXError),
    #[error("value not found")]
    NotFound,
}

impl Error {
    /// The element no longer exists, or its application went away.
    pub fn is_gone(&self) -> bool {
        matches!(
            self,
            Error::Ax(AXError::InvalidUIElement) | Error::Ax(AXError::CannotComplete)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<AXError> for Error {
    fn from(value: AXError) -> Self { Self::Ax(value) }
}

fn check(status: AXError) -> Result<()> {
    if status == AXError::Success {
        Ok(())
    } else {
        Err(Error::Ax(status))
    }
}

impl AXUIElement {
    fn new(inner: CFRetained<RawAXUIElement>) -> Self { Self { inner } }

    #[inline]
    pub fn application(pid: i32) -> Self {
        // SAFETY: follows the Create rule, we own the +1.
        Self::new(unsafe { RawAXUIElement::new_application(pid) })
    }

    pub fn system_wide() -> Self {
        // SAFETY: follows the Create rule, we own the +1.
        Self::new(unsafe { RawAXUIElement::new_system_wide() })
    }

    /// Caps how long any AX call from this process waits on an unresponsive
    /// application when set on the system-wide element.
    pub fn set_messaging_timeout(&self, seconds: f32) -> Result<()> {
        check(unsafe { self.inner.set_messaging_timeout(seconds) })
    }

    fn copy_attribute(&self, name: &'static str) -> Result<Option<CFRetained<CFType>>> {
        let attr = CFString::from_static_str(name);
        let mut value: *const CFType = ptr::null();
        let status =
            unsafe { self.inner.copy_attribute_value(attr.as_ref(), NonNull::from(&mut value)) };
        match status {
            AXError::Success => Ok(NonNull::new(value.cast_mut())
                // SAFETY: Copy rule, the caller owns the returned value.
                .map(|v| unsafe { CFRetained::from_raw(v) })),
            AXError::NoValue => Ok(None),
            err => Err(Error::Ax(err)),
        }
    }

    fn copy_required_attribute(&self, name: &'static str) -> Result<CFRetained<CFType>> {
        self.copy_attribute(name)?.ok_or(Error::NotFound)
    }

    fn downcast<T: ConcreteType>(value: CFRetained<CFType>) -> Result<CFRetained<T>> {
        value.downcast::<T>().map_err(|_| Error::Ax(AXError::Failure))
    }

    pub fn bool_attribute(&self, name: &'static str) -> Result<bool> {
        let value = self.copy_required_attribute(name)?;
        Ok(Self::downcast::<CFBoolean>(value)?.value())
    }

    pub fn set_bool_attribute(&self, name: &'static str, value: bool) -> Result<()> {
        let attr = CFString::from_static_str(name);
        let cf_bool = CFBoolean::new(value);
        check(unsafe { self.inner.set_attribute_value(attr.as_ref(), cf_bool.as_ref()) })
    }

    pub fn title(&self) -> Result<String> {
        let value = self.copy_required_attribute("AXTitle")?;
        Ok(Self::downcast::<CFString>(value)?.to_string())
    }

    pub fn minimized(&self) -> Result<bool> { self.bool_attribute("AXMinimized") }

    pub fn fullscreen(&self) -> Result<bool> { self.bool_attribute("AXFullScreen") }

    pub fn focused_window(&self) -> Result<Option<AXUIElement>> {
        let Some(value) = self.copy_attribute("AXFocusedWindow")? else {
            return Ok(None);
        };
        Ok(Some(AXUIElement::new(Self::downcast::<RawAXUIElement>(value)?)))
    }

    pub fn windows(&self) -> Result<Vec<AXUIElement>> {
        let Some(value) = self.copy_attribute("AXWindows")? else {
            return Ok(Vec::new());
        };
        let array = Self::downcast::<CFArray>(value)?;
        let array = unsafe { CFRetained::cast_unchecked::<CFArray<CFType>>(array) };
        array
            .iter()
            .map(|entry| Self::downcast::<RawAXUIElement>(entry).map(AXUIElement::new))
            .collect()
    }

    /// The window server's number for this window element.
    pub fn window_id(&self) -> Result<CGWindowID> {
        let mut id = 0;
        let ptr = CFRetained::as_ptr(&self.inner).as_ptr();
        check(unsafe { _AXUIElementGetWindow(ptr, &mut id) })?;
        Ok(id)
    }

    pub fn set_position(&self, mut point: CGPoint) -> Result<()> {
        let value = make_axvalue(AXValueType::CGPoint, &mut point)?;
        self.set_value("AXPosition", value.as_ref())
    }

    pub fn set_size(&self, mut size: CGSize) -> Result<()> {
        let value = make_axvalue(AXValueType::CGSize, &mut size)?;
        self.set_value("AXSize", value.as_ref())
    }

    pub fn raise(&self) -> Result<()> {
        let action = CFString::from_static_str("AXRaise");
        check(unsafe { self.inner.perform_action(action.as_ref()) })
    }

    fn set_value(&self, name: &'static str, value: &CFType) -> Result<()> {
        let attr = CFString::from_static_str(name);
        check(unsafe { self.inner.set_attribute_value(attr.as_ref(), value) })
    }
}

impl fmt::Debug for AXUIElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.inner.fmt(f) }
}

fn make_axvalue<T>(ty: AXValueType, value: &mut T) -> Result<CFRetained<AXValue>> {
    let ptr = NonNull::from(value).cast::<c_void>();
    unsafe { AXValue::new(ty, ptr) }.ok_or(Error::Ax(AXError::Failure))
}
