use std::fmt::{self, Display};

use libgssapi_sys::{
    gss_buffer_desc_struct, gss_display_status, gss_release_buffer, GSS_C_GSS_CODE, GSS_C_MECH_CODE,
};

use crate::mechanism::Mechanism;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The mechanism has no GSSAPI counterpart (NTLM).
    Unsupported(Mechanism),
    /// `gss_indicate_mechs` itself failed.
    Mechs { major: u32, minor: u32 },
    /// The library advertises neither SPNEGO nor Kerberos 5.
    NoMechanism,
    /// The target principal could not be imported.
    Principal { major: u32, minor: u32 },
    /// The context-establishment call failed.
    Negotiate { major: u32, minor: u32 },
}

impl std::error::Error for Error {}
impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Unsupported(mechanism) => write!(f, "mechanism {mechanism} is not provided by GSSAPI"),
            Error::Mechs { major, minor } => {
                write!(f, "could not list mechanisms: {major:#x}.{minor:#x} ({})", status_message(major, minor))
            }
            Error::NoMechanism => f.write_str("GSSAPI advertises neither SPNEGO nor kerberos 5"),
            Error::Principal { major, minor } => {
                write!(f, "could not locate principal: {major:#x}.{minor:#x} ({})", status_message(major, minor))
            }
            Error::Negotiate { major, minor } => {
                write!(f, "negotiate failure: {major:#x}.{minor:#x} ({})", status_message(major, minor))
            }
        }
    }
}

/// The human-readable text for a status pair. The minor (mechanism) code
/// carries the useful detail whenever it is set; the major code otherwise.
fn status_message(major: u32, minor: u32) -> String {
    let (code, code_type) = if minor != 0 {
        (minor, GSS_C_MECH_CODE as i32)
    } else {
        (major, GSS_C_GSS_CODE as i32)
    };
    display_status(code, code_type).unwrap_or_else(|| String::from("unknown error"))
}

fn display_status(code: u32, code_type: i32) -> Option<String> {
    let mut minor = 0;
    let mut context = 0;
    let mut buffer = gss_buffer_desc_struct {
        length: 0,
        value: std::ptr::null_mut(),
    };
    let major = unsafe {
        gss_display_status(
            &mut minor,
            code,
            code_type,
            std::ptr::null_mut(),
            &mut context,
            &mut buffer,
        )
    };
    if major != 0 || buffer.value.is_null() {
        return None;
    }
    let bytes = unsafe { std::slice::from_raw_parts(buffer.value as *const u8, buffer.length as usize) };
    let message = String::from_utf8_lossy(bytes).into_owned();
    let mut _s = 0;
    unsafe { gss_release_buffer(&mut _s, &mut buffer) };
    Some(message)
}
