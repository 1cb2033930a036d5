use std::ffi::c_void;

use windows::core::PCWSTR;
use windows::Win32::Security::Authentication::Identity::{
    AcquireCredentialsHandleW, FreeContextBuffer, FreeCredentialsHandle, QueryCredentialsAttributesW,
    SecPkgCredentials_NamesW, SECPKG_ATTR_NAMES, SECPKG_CRED, SECPKG_CRED_BOTH,
    SEC_WINNT_AUTH_IDENTITY_UNICODE, SEC_WINNT_AUTH_IDENTITY_W,
};
use windows::Win32::Security::Credentials::SecHandle;
use zeroize::Zeroize;

use super::{to_wide, Error};

pub struct CredentialsHandle(SecHandle);

impl CredentialsHandle {
    /// Acquires a credential handle from the package, bound to `identity`
    /// when given and to the logged-in user otherwise. The package copies the
    /// identity during the call; it does not need to stay alive afterwards.
    pub(crate) fn acquire(package: PCWSTR, identity: Option<&Identity>) -> Result<Self, Error> {
        let mut handle = SecHandle::default();
        let mut _valid_until = 0;
        let raw_identity = identity.map(Identity::as_raw);
        let auth_data = raw_identity
            .as_ref()
            .map(|raw| std::ptr::from_ref(raw) as *const c_void);
        unsafe {
            AcquireCredentialsHandleW(
                PCWSTR::null(),
                package,
                SECPKG_CRED(SECPKG_CRED_BOTH),
                None,
                auth_data,
                None,
                None,
                &mut handle,
                Some(&mut _valid_until),
            )
        }
        .map_err(Error::Credentials)?;
        Ok(CredentialsHandle(handle))
    }

    pub(crate) fn as_raw(&self) -> &SecHandle {
        &self.0
    }

    /// The account name these credentials authenticate as.
    pub(crate) fn principal_name(&self) -> Result<String, Error> {
        let mut names = SecPkgCredentials_NamesW::default();
        unsafe {
            QueryCredentialsAttributesW(
                &self.0,
                SECPKG_ATTR_NAMES,
                std::ptr::from_mut(&mut names) as *mut c_void,
            )
        }
        .map_err(Error::Query)?;
        let name = unsafe { names.sUserName.to_string() }.unwrap_or_default();
        let _ = unsafe { FreeContextBuffer(names.sUserName.0 as *mut c_void) };
        Ok(name)
    }
}

impl Drop for CredentialsHandle {
    fn drop(&mut self) {
        let _ = unsafe { FreeCredentialsHandle(&self.0) };
    }
}

/// An explicit username/domain/password triple in the wide form the package
/// wants. The password buffer is wiped when the identity is dropped.
pub(crate) struct Identity {
    username: Box<[u16]>,
    domain: Box<[u16]>,
    password: Box<[u16]>,
}

impl Identity {
    pub(crate) fn new(username: &str, domain: &str, password: &str) -> Self {
        Identity {
            username: to_wide(username),
            domain: to_wide(domain),
            password: to_wide(password),
        }
    }

    fn as_raw(&self) -> SEC_WINNT_AUTH_IDENTITY_W {
        SEC_WINNT_AUTH_IDENTITY_W {
            User: self.username.as_ptr() as *mut u16,
            UserLength: (self.username.len() - 1) as u32,
            Domain: self.domain.as_ptr() as *mut u16,
            DomainLength: (self.domain.len() - 1) as u32,
            Password: self.password.as_ptr() as *mut u16,
            PasswordLength: (self.password.len() - 1) as u32,
            Flags: SEC_WINNT_AUTH_IDENTITY_UNICODE,
        }
    }
}

impl Drop for Identity {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}
