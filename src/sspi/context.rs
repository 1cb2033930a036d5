use windows::Win32::Security::Authentication::Identity::DeleteSecurityContext;
use windows::Win32::Security::Credentials::SecHandle;

pub struct ContextHandle(SecHandle);

impl ContextHandle {
    pub(crate) fn as_raw(&self) -> &SecHandle {
        &self.0
    }

    /// Takes ownership of the handle a step wrote back. The package usually
    /// returns the context it was given; only one owner may delete it, so the
    /// superseded wrapper is forgotten when the raw handles are the same
    /// object and deleted when the package really did produce a new one.
    pub(crate) fn adopt(previous: Option<ContextHandle>, raw: SecHandle) -> Self {
        if let Some(previous) = previous {
            if previous.0.dwLower == raw.dwLower && previous.0.dwUpper == raw.dwUpper {
                std::mem::forget(previous);
            }
        }
        ContextHandle(raw)
    }
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        let _ = unsafe { DeleteSecurityContext(&self.0) };
    }
}
