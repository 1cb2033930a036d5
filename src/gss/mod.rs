//! GSSAPI backend: SPNEGO with a Kerberos 5 fallback, through
//! `libgssapi-sys`.
//!
//! Only default (ticket-cache) credentials exist here; GSSAPI has no notion
//! of handing the library a username/password for this flow, so the
//! specified-credential operations are accepted and ignored.

mod context;
mod cred;
mod error;
mod name;
mod oid;

pub use context::ContextHandle;
pub use error::Error;
pub use oid::MechanismOid;

use std::convert::Infallible;
use std::ffi::c_void;
use std::ptr::NonNull;

use libgssapi_sys::{
    gss_buffer_desc_struct, gss_init_sec_context, gss_release_buffer, GSS_C_DELEG_FLAG, GSS_C_MUTUAL_FLAG,
    GSS_S_COMPLETE, GSS_S_CONTINUE_NEEDED, _GSS_C_INDEFINITE,
};
use log::{error, info};

use crate::backend::{SecurityBackend, Step};
use crate::mechanism::Mechanism;

use self::name::NameHandle;

/// Link-time binding to the system GSSAPI library.
pub struct GssBackend(());

impl GssBackend {
    /// Verifies the library is usable by listing its advertised mechanisms
    /// and requiring SPNEGO or Kerberos 5. Logs and declines otherwise.
    pub fn open() -> Result<Self, Error> {
        match oid::resolve(Mechanism::Negotiate) {
            Ok(mech) => {
                info!("GSSAPI backend ready, negotiating via {mech}");
                Ok(GssBackend(()))
            }
            Err(e) => {
                error!("could not load GSSAPI backend: {e}");
                Err(e)
            }
        }
    }
}

impl SecurityBackend for GssBackend {
    type Mech = MechanismOid;
    // No credential handle ever exists on this backend.
    type Credentials = Infallible;
    type Context = ContextHandle;
    type Error = Error;

    fn resolve_mechanism(&self, mechanism: Mechanism) -> Result<MechanismOid, Error> {
        oid::resolve(mechanism)
    }

    fn mechanism_available(&self, mechanism: Mechanism) -> bool {
        oid::resolve(mechanism).is_ok() && self.supports_default_credentials(mechanism)
    }

    fn supports_default_credentials(&self, mechanism: Mechanism) -> bool {
        self.default_principal(mechanism).is_some()
    }

    fn supports_specified_credentials(&self, _mechanism: Mechanism) -> bool {
        // Only logged-in (Kerberos 5 ticketed) credentials work here.
        false
    }

    fn default_principal(&self, mechanism: Mechanism) -> Option<String> {
        if mechanism != Mechanism::Negotiate {
            return None;
        }
        cred::default_principal()
    }

    fn acquire_default_credentials(&self, _mech: &MechanismOid) -> Result<Option<Infallible>, Error> {
        // The ticket cache is implicit; nothing to acquire or store.
        Ok(None)
    }

    fn acquire_specified_credentials(
        &self,
        _mech: &MechanismOid,
        _username: &str,
        _domain: &str,
        _password: &str,
    ) -> Result<Option<Infallible>, Error> {
        Ok(None)
    }

    fn step(
        &self,
        mech: &MechanismOid,
        _credentials: Option<&Infallible>,
        context: Option<ContextHandle>,
        target: &str,
        input: Option<&[u8]>,
    ) -> Result<Step<ContextHandle>, Error> {
        let mut server = NameHandle::import_hostbased(target)?;

        let fresh = context.is_none();
        let mut context = context;
        let mut ctx_ptr = context
            .as_mut()
            .map(|c| std::ptr::from_mut(c.as_mut()))
            .unwrap_or(std::ptr::null_mut());
        let mut minor = 0;
        let mut mech_oid = mech.desc();
        let mut input_token = input.map(|token| gss_buffer_desc_struct {
            length: token.len() as _,
            value: token.as_ptr() as *mut c_void,
        });
        let mut output_token = gss_buffer_desc_struct {
            length: 0,
            value: std::ptr::null_mut(),
        };

        let major = unsafe {
            gss_init_sec_context(
                &mut minor,
                std::ptr::null_mut(), // default credentials
                &mut ctx_ptr,
                server.as_mut_ptr(),
                &mut mech_oid,
                GSS_C_DELEG_FLAG | GSS_C_MUTUAL_FLAG,
                _GSS_C_INDEFINITE,
                std::ptr::null_mut(), // no channel bindings
                input_token
                    .as_mut()
                    .map_or(std::ptr::null_mut(), std::ptr::from_mut),
                std::ptr::null_mut(),
                &mut output_token,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        let output = OwnedBuffer(output_token);

        match major {
            GSS_S_COMPLETE => Ok(Step::Complete {
                context: adopt(context, ctx_ptr),
                token: output.to_vec(),
            }),
            major if major & GSS_S_CONTINUE_NEEDED != 0 => Ok(Step::Continue {
                context: adopt(context, ctx_ptr),
                token: output.to_vec(),
            }),
            major => {
                // A context allocated by this failed round must not leak.
                if fresh {
                    if let Some(ptr) = NonNull::new(ctx_ptr) {
                        drop(ContextHandle::new(ptr));
                    }
                }
                Err(Error::Negotiate { major, minor })
            }
        }
    }
}

/// GSSAPI writes the (possibly fresh) context back through the same handle
/// slot, so a pre-existing handle already owns `ctx_ptr`.
fn adopt(context: Option<ContextHandle>, ctx_ptr: *mut libgssapi_sys::gss_ctx_id_struct) -> ContextHandle {
    context.unwrap_or_else(|| ContextHandle::new(NonNull::new(ctx_ptr).expect("context present after success")))
}

struct OwnedBuffer(gss_buffer_desc_struct);

impl OwnedBuffer {
    fn to_vec(&self) -> Vec<u8> {
        if self.0.value.is_null() || self.0.length == 0 {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(self.0.value as *const u8, self.0.length as usize) }.to_vec()
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        let mut _minor = 0;
        unsafe { gss_release_buffer(&mut _minor, &mut self.0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specified_credentials_never_supported() {
        let backend = GssBackend(());
        assert!(!backend.supports_specified_credentials(Mechanism::Negotiate));
        assert!(!backend.supports_specified_credentials(Mechanism::Ntlm));
    }

    #[test]
    fn target_kept_verbatim() {
        let backend = GssBackend(());
        assert_eq!(backend.normalize_target("HTTP@server.example.com"), "HTTP@server.example.com");
    }
}
