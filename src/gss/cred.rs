use std::ptr::NonNull;

use libgssapi_sys::{
    gss_acquire_cred, gss_cred_id_struct, gss_inquire_cred, gss_name_struct, gss_release_cred,
    GSS_C_INITIATE, _GSS_C_INDEFINITE,
};
use log::{debug, error, info, warn};

use super::name::NameHandle;
use super::Error;

/// The principal the ticket cache would authenticate as, or `None` when no
/// usable credentials exist. Failures are graded: a missing ticket cache is
/// ordinary, an unparseable credential name is not.
pub(crate) fn default_principal() -> Option<String> {
    let credentials = match CredentialsHandle::acquire_default() {
        Ok(credentials) => credentials,
        Err(e) => {
            info!("no kerberos 5 credentials available: {e}");
            return None;
        }
    };
    let name = match credentials.principal_name() {
        Ok(name) => name,
        Err(e) => {
            warn!("could not get principal for kerberos 5 credentials: {e}");
            return None;
        }
    };
    match name.display() {
        Some(principal) => {
            debug!("determined kerberos 5 default principal to be {principal}");
            Some(principal)
        }
        None => {
            error!("could not unparse kerberos 5 credential name");
            None
        }
    }
}

struct CredentialsHandle(NonNull<gss_cred_id_struct>);

impl CredentialsHandle {
    /// Acquires initiate-usage credentials for the logged-in identity, under
    /// whatever mechanisms the library defaults to.
    fn acquire_default() -> Result<Self, Error> {
        let mut minor = 0;
        let mut handle = std::ptr::null_mut::<gss_cred_id_struct>();
        let mut validity = 0;
        let major = unsafe {
            gss_acquire_cred(
                &mut minor,
                std::ptr::null_mut(),
                _GSS_C_INDEFINITE,
                std::ptr::null_mut(),
                GSS_C_INITIATE as i32,
                &mut handle,
                std::ptr::null_mut(),
                &mut validity,
            )
        };
        match NonNull::new(handle) {
            Some(handle) if major == 0 => Ok(CredentialsHandle(handle)),
            _ => Err(Error::Principal { major, minor }),
        }
    }

    fn principal_name(&self) -> Result<NameHandle, Error> {
        let mut minor = 0;
        let mut name = std::ptr::null_mut::<gss_name_struct>();
        let major = unsafe {
            gss_inquire_cred(
                &mut minor,
                self.0.as_ptr(),
                &mut name,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        match NonNull::new(name) {
            Some(name) if major == 0 => Ok(NameHandle::wrap(name)),
            _ => Err(Error::Principal { major, minor }),
        }
    }
}

impl Drop for CredentialsHandle {
    fn drop(&mut self) {
        let mut _s = 0;
        unsafe { gss_release_cred(&mut _s, &mut NonNull::as_ptr(self.0)) };
    }
}
