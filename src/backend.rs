//! The contract between the mechanism-agnostic negotiation engine and a
//! native security API.
//!
//! Exactly one real implementation is compiled per target (GSSAPI on Unix,
//! SSPI on Windows); tests provide scripted ones. Every opaque handle the
//! backend hands out (`Credentials`, `Context`) is an owned resource whose
//! `Drop` releases it through the matching native disposal call.

use crate::mechanism::Mechanism;

/// Outcome of one successful round of the handshake.
///
/// `token` is the client token to transmit; a zero-length final token is
/// legal and distinct from failure.
pub enum Step<C> {
    /// The server must answer before the handshake can finish.
    Continue { context: C, token: Vec<u8> },
    /// The handshake is done; `token` (possibly empty) is the last message.
    Complete { context: C, token: Vec<u8> },
}

/// A polymorphic adapter over one native security API.
///
/// Implementations must be usable concurrently once constructed; all methods
/// take `&self` and the per-session mutable state lives in the session, not
/// the backend.
pub trait SecurityBackend {
    /// Resolved per-mechanism metadata (GSSAPI: the mechanism OID; SSPI: the
    /// package name plus its token limits).
    type Mech;
    /// An acquired credential handle.
    type Credentials;
    /// An in-progress or completed security context.
    type Context;
    type Error: std::error::Error;

    /// Resolves the backend metadata for `mechanism`, failing when the
    /// mechanism is not supported on this backend.
    fn resolve_mechanism(&self, mechanism: Mechanism) -> Result<Self::Mech, Self::Error>;

    /// True when the mechanism is supported and usable credentials currently
    /// exist for it.
    fn mechanism_available(&self, mechanism: Mechanism) -> bool;

    fn supports_default_credentials(&self, mechanism: Mechanism) -> bool;

    fn supports_specified_credentials(&self, mechanism: Mechanism) -> bool;

    /// The identity that default credentials would authenticate as, if it
    /// can be determined without starting a session.
    fn default_principal(&self, mechanism: Mechanism) -> Option<String>;

    /// Rewrites a caller-supplied target into the form the backend expects.
    /// The default keeps it verbatim; SSPI turns `service@host` SPNs into
    /// `service/host`.
    fn normalize_target(&self, target: &str) -> String {
        target.to_owned()
    }

    /// Acquires a credential handle for the ambient logged-in identity.
    /// `Ok(None)` means the backend needs no explicit handle (GSSAPI, where
    /// the ticket cache is implicit).
    fn acquire_default_credentials(&self, mech: &Self::Mech) -> Result<Option<Self::Credentials>, Self::Error>;

    /// Acquires a credential handle bound to an explicit identity.
    /// `Ok(None)` means specified credentials are unsupported and were
    /// ignored (GSSAPI).
    fn acquire_specified_credentials(
        &self,
        mech: &Self::Mech,
        username: &str,
        domain: &str,
        password: &str,
    ) -> Result<Option<Self::Credentials>, Self::Error>;

    /// One round of the handshake: feed the optional server token to the
    /// native "initialize security context" primitive and collect the client
    /// token. Ownership of the previous context transfers in; the returned
    /// context supersedes it and the backend releases the old one when it is
    /// a different underlying object.
    fn step(
        &self,
        mech: &Self::Mech,
        credentials: Option<&Self::Credentials>,
        context: Option<Self::Context>,
        target: &str,
        input: Option<&[u8]>,
    ) -> Result<Step<Self::Context>, Self::Error>;
}
