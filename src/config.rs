use crate::backend::SecurityBackend;
#[cfg(any(unix, windows))]
use crate::error::ConfigureError;
use crate::mechanism::Mechanism;

/// Process-lifetime binding to a security backend.
///
/// Constructed once, immutable afterwards; sessions borrow it and may not
/// outlive it. It is safe to share across threads (nothing is mutated after
/// construction), while each session must stay single-owner.
pub struct AuthConfiguration<B> {
    backend: B,
}

#[cfg(any(unix, windows))]
impl AuthConfiguration<crate::PlatformBackend> {
    /// Opens the backend compiled for this target. Fails when the native
    /// library or its security package table cannot be used, in which case
    /// no mechanism in this family is available on the host.
    pub fn configure() -> Result<Self, ConfigureError> {
        let backend = crate::PlatformBackend::open()?;
        Ok(AuthConfiguration { backend })
    }
}

impl<B: SecurityBackend> AuthConfiguration<B> {
    /// Wraps an already-opened backend. This is the substitution seam for
    /// tests, which pass a scripted backend instead of a native one.
    pub fn with_backend(backend: B) -> Self {
        AuthConfiguration { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// True only if the backend supports `mechanism` and usable default
    /// credentials currently exist for it (GSSAPI: a resolvable ticket-cache
    /// principal; SSPI: the packages are always present).
    pub fn mechanism_available(&self, mechanism: Mechanism) -> bool {
        self.backend.mechanism_available(mechanism)
    }

    pub fn supports_default_credentials(&self, mechanism: Mechanism) -> bool {
        self.backend.supports_default_credentials(mechanism)
    }

    pub fn supports_specified_credentials(&self, mechanism: Mechanism) -> bool {
        self.backend.supports_specified_credentials(mechanism)
    }

    /// The identity default credentials would use, resolved without starting
    /// a session. Absent whenever the backend cannot determine it.
    pub fn default_credential_principal(&self, mechanism: Mechanism) -> Option<String> {
        self.backend.default_principal(mechanism)
    }
}
