//! Native-platform credential negotiation behind one mechanism-agnostic
//! interface.
//!
//! On Unix the backend is GSSAPI (SPNEGO with a Kerberos 5 fallback), on
//! Windows it is SSPI (the NTLM and Negotiate security packages). Both are
//! hidden behind the [`SecurityBackend`] trait; the [`NegotiationSession`]
//! state machine and [`AuthConfiguration`] are generic over it, so shared
//! logic never branches on the platform and tests can substitute a scripted
//! backend.
//!
//! A session is one authentication attempt: set a target, pick credentials,
//! then exchange opaque tokens with the server until the session reports
//! complete. The token bytes are SPNEGO/NTLM/Kerberos messages defined by
//! those standards; this crate passes them through unmodified.
//!
//! ```no_run
//! use native_negotiate::{AuthConfiguration, Mechanism, NegotiationSession};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfiguration::configure()?;
//! if !config.mechanism_available(Mechanism::Negotiate) {
//!     return Err("negotiate unavailable on this host".into());
//! }
//!
//! let mut session = NegotiationSession::initialize(&config, Mechanism::Negotiate)?;
//! session.set_target(Some("HTTP@server.example.com"));
//! session.select_default_credentials();
//!
//! let mut reply: Option<Vec<u8>> = None;
//! while !session.is_complete() {
//!     let token = session.exchange_token(reply.as_deref())?;
//!     // send `token` to the server, read its challenge into `reply`
//! #   reply = None;
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod config;
mod error;
mod mechanism;
mod session;

#[cfg(unix)]
pub mod gss;
#[cfg(windows)]
pub mod sspi;

pub use backend::{SecurityBackend, Step};
pub use config::AuthConfiguration;
#[cfg(any(unix, windows))]
pub use error::ConfigureError;
pub use error::{DriveError, SessionError, TokenError};
pub use mechanism::{CredentialSelector, Mechanism};
pub use session::{drive, NegotiationSession};

/// The backend compiled for this target.
#[cfg(unix)]
pub type PlatformBackend = gss::GssBackend;
/// The backend compiled for this target.
#[cfg(windows)]
pub type PlatformBackend = sspi::SspiBackend;
