use std::ffi::c_void;
use std::ptr::NonNull;

use libgssapi_sys::{
    gss_buffer_desc_struct, gss_display_name, gss_import_name, gss_name_struct, gss_release_buffer,
    gss_release_name, GSS_C_NT_HOSTBASED_SERVICE,
};

use super::Error;

pub struct NameHandle(NonNull<gss_name_struct>);

// Sole owner of the underlying name, and nothing here mutates through &self.
unsafe impl Send for NameHandle {}
unsafe impl Sync for NameHandle {}

impl NameHandle {
    /// Imports a `service@host` target as a hostbased-service name.
    pub fn import_hostbased(principal: &str) -> Result<Self, Error> {
        let mut minor = 0;
        let mut buffer = gss_buffer_desc_struct {
            length: principal.len() as _,
            value: principal.as_ptr() as *mut c_void,
        };
        let mut name = std::ptr::null_mut::<gss_name_struct>();
        let major =
            unsafe { gss_import_name(&mut minor, &mut buffer, GSS_C_NT_HOSTBASED_SERVICE, &mut name) };
        match NonNull::new(name) {
            Some(name) if major == 0 => Ok(NameHandle(name)),
            _ => Err(Error::Principal { major, minor }),
        }
    }

    pub(crate) fn wrap(name: NonNull<gss_name_struct>) -> Self {
        NameHandle(name)
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut gss_name_struct {
        self.0.as_ptr()
    }

    /// The textual form of the name, when the library can unparse it.
    pub fn display(&self) -> Option<String> {
        let mut minor = 0;
        let mut buffer = gss_buffer_desc_struct {
            length: 0,
            value: std::ptr::null_mut(),
        };
        let major =
            unsafe { gss_display_name(&mut minor, self.0.as_ptr(), &mut buffer, std::ptr::null_mut()) };
        if major != 0 || buffer.value.is_null() {
            return None;
        }
        let bytes = unsafe { std::slice::from_raw_parts(buffer.value as *const u8, buffer.length as usize) };
        let text = String::from_utf8_lossy(bytes).into_owned();
        let mut _s = 0;
        unsafe { gss_release_buffer(&mut _s, &mut buffer) };
        Some(text)
    }
}

impl Drop for NameHandle {
    fn drop(&mut self) {
        let mut _s = 0;
        unsafe { gss_release_name(&mut _s, &mut NonNull::as_ptr(self.0)) };
    }
}
