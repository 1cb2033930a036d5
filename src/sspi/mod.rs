//! SSPI backend: the NTLM and Negotiate security packages, through the
//! `windows` crate.
//!
//! Both default and explicit credentials are supported for both packages.

mod buffer;
mod context;
mod cred;
mod error;

pub use context::ContextHandle;
pub use cred::CredentialsHandle;
pub use error::Error;

use std::ffi::c_void;

use log::{debug, error, info, warn};
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{SEC_E_OK, SEC_I_COMPLETE_AND_CONTINUE, SEC_I_COMPLETE_NEEDED, SEC_I_CONTINUE_NEEDED};
use windows::Win32::Security::Authentication::Identity::{
    CompleteAuthToken, FreeContextBuffer, InitializeSecurityContextW, QuerySecurityPackageInfoW, SecBuffer,
    SecBufferDesc, ISC_REQ_DELEGATE, ISC_REQ_MUTUAL_AUTH, SECBUFFER_TOKEN, SECBUFFER_VERSION,
    SECURITY_NETWORK_DREP,
};
use windows::Win32::Security::Credentials::SecHandle;

use crate::backend::{SecurityBackend, Step};
use crate::mechanism::Mechanism;

use self::buffer::TokenBuffer;
use self::cred::Identity;

const NTLM: PCWSTR = w!("NTLM");
const NEGOTIATE: PCWSTR = w!("Negotiate");

/// The resolved security package for one mechanism.
pub struct PackageInfo {
    package: PCWSTR,
    max_token: u32,
}

/// Process-wide binding to the SSPI package table.
pub struct SspiBackend(());

impl SspiBackend {
    /// Verifies the package table is usable by resolving the Negotiate
    /// package. Logs and declines otherwise.
    pub fn open() -> Result<Self, Error> {
        match resolve(Mechanism::Negotiate) {
            Ok(_) => {
                info!("SSPI backend ready");
                Ok(SspiBackend(()))
            }
            Err(e) => {
                error!("could not load SSPI backend: {e}");
                Err(e)
            }
        }
    }
}

fn package_of(mechanism: Mechanism) -> PCWSTR {
    match mechanism {
        Mechanism::Ntlm => NTLM,
        Mechanism::Negotiate => NEGOTIATE,
    }
}

fn resolve(mechanism: Mechanism) -> Result<PackageInfo, Error> {
    let package = package_of(mechanism);
    let info = unsafe { QuerySecurityPackageInfoW(package) }.map_err(|source| Error::Package { mechanism, source })?;
    let max_token = unsafe { (*info).cbMaxToken };
    let _ = unsafe { FreeContextBuffer(info as *mut c_void) };
    Ok(PackageInfo { package, max_token })
}

fn to_wide(s: &str) -> Box<[u16]> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

impl SecurityBackend for SspiBackend {
    type Mech = PackageInfo;
    type Credentials = CredentialsHandle;
    type Context = ContextHandle;
    type Error = Error;

    fn resolve_mechanism(&self, mechanism: Mechanism) -> Result<PackageInfo, Error> {
        resolve(mechanism)
    }

    fn mechanism_available(&self, mechanism: Mechanism) -> bool {
        resolve(mechanism).is_ok()
    }

    fn supports_default_credentials(&self, mechanism: Mechanism) -> bool {
        resolve(mechanism).is_ok()
    }

    fn supports_specified_credentials(&self, mechanism: Mechanism) -> bool {
        resolve(mechanism).is_ok()
    }

    fn default_principal(&self, mechanism: Mechanism) -> Option<String> {
        let package = match resolve(mechanism) {
            Ok(package) => package,
            Err(e) => {
                info!("no {mechanism} security package: {e}");
                return None;
            }
        };
        let credentials = match CredentialsHandle::acquire(package.package, None) {
            Ok(credentials) => credentials,
            Err(e) => {
                info!("no default credentials available for {mechanism}: {e}");
                return None;
            }
        };
        match credentials.principal_name() {
            Ok(principal) => {
                debug!("determined {mechanism} default principal to be {principal}");
                Some(principal)
            }
            Err(e) => {
                warn!("could not get principal for {mechanism} credentials: {e}");
                None
            }
        }
    }

    /// Rewrites a `service@host` SPN into the `service/host` form the
    /// packages expect, splitting on the last `@` so user principals with an
    /// embedded realm survive.
    fn normalize_target(&self, target: &str) -> String {
        match target.rfind('@') {
            Some(index) => {
                let mut spn = target.to_owned();
                spn.replace_range(index..=index, "/");
                spn
            }
            None => target.to_owned(),
        }
    }

    fn acquire_default_credentials(&self, mech: &PackageInfo) -> Result<Option<CredentialsHandle>, Error> {
        CredentialsHandle::acquire(mech.package, None).map(Some)
    }

    fn acquire_specified_credentials(
        &self,
        mech: &PackageInfo,
        username: &str,
        domain: &str,
        password: &str,
    ) -> Result<Option<CredentialsHandle>, Error> {
        let identity = Identity::new(username, domain, password);
        CredentialsHandle::acquire(mech.package, Some(&identity)).map(Some)
    }

    fn step(
        &self,
        mech: &PackageInfo,
        credentials: Option<&CredentialsHandle>,
        context: Option<ContextHandle>,
        target: &str,
        input: Option<&[u8]>,
    ) -> Result<Step<ContextHandle>, Error> {
        let credentials = credentials.ok_or(Error::NoCredentials)?;
        let target_wide = to_wide(target);

        let mut out_buffer = TokenBuffer::with_capacity(mech.max_token);
        let mut out_token = out_buffer.sec_buffer();
        let mut out_desc = SecBufferDesc {
            ulVersion: SECBUFFER_VERSION,
            cBuffers: 1,
            pBuffers: &mut out_token,
        };
        let mut in_token = input.map(|token| SecBuffer {
            cbBuffer: token.len() as u32,
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: token.as_ptr() as *mut c_void,
        });
        let in_desc = in_token.as_mut().map(|token| SecBufferDesc {
            ulVersion: SECBUFFER_VERSION,
            cBuffers: 1,
            pBuffers: token,
        });

        let mut new_handle = SecHandle::default();
        let mut attributes = 0;
        let mut status = unsafe {
            InitializeSecurityContextW(
                Some(credentials.as_raw()),
                context.as_ref().map(|c| std::ptr::from_ref(c.as_raw())),
                Some(target_wide.as_ptr()),
                ISC_REQ_DELEGATE | ISC_REQ_MUTUAL_AUTH,
                0,
                SECURITY_NETWORK_DREP,
                in_desc.as_ref().map(std::ptr::from_ref),
                0,
                Some(&mut new_handle),
                Some(&mut out_desc),
                &mut attributes,
                None,
            )
        };

        // NTLM asks for a second pass over the token it just built.
        if status == SEC_I_COMPLETE_NEEDED || status == SEC_I_COMPLETE_AND_CONTINUE {
            if let Err(e) = unsafe { CompleteAuthToken(&new_handle, &out_desc) } {
                drop(ContextHandle::adopt(context, new_handle));
                return Err(Error::Complete(e));
            }
            status = if status == SEC_I_COMPLETE_AND_CONTINUE {
                SEC_I_CONTINUE_NEEDED
            } else {
                SEC_E_OK
            };
        }
        out_buffer.set_length(out_token.cbBuffer);

        match status {
            SEC_E_OK => Ok(Step::Complete {
                context: ContextHandle::adopt(context, new_handle),
                token: out_buffer.to_vec(),
            }),
            SEC_I_CONTINUE_NEEDED => Ok(Step::Continue {
                context: ContextHandle::adopt(context, new_handle),
                token: out_buffer.to_vec(),
            }),
            status => {
                drop(context);
                Err(Error::Negotiate { status })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(target: &str) -> String {
        SspiBackend(()).normalize_target(target)
    }

    #[test]
    fn spn_separator_is_rewritten() {
        assert_eq!(normalize("HTTP@server.example.com"), "HTTP/server.example.com");
    }

    #[test]
    fn only_the_last_separator_is_rewritten() {
        assert_eq!(normalize("HTTP@user@host"), "HTTP@user/host");
    }

    #[test]
    fn plain_targets_pass_through() {
        assert_eq!(normalize("HTTP/server.example.com"), "HTTP/server.example.com");
    }
}
