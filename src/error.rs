use std::fmt;

use crate::mechanism::Mechanism;

/// The platform backend could not be opened: the native library or package
/// table is unavailable on this host, so the whole mechanism family is too.
/// Only exists on targets with a native backend.
#[cfg(any(unix, windows))]
#[derive(Debug)]
pub struct ConfigureError {
    #[cfg(unix)]
    inner: crate::gss::Error,
    #[cfg(windows)]
    inner: crate::sspi::Error,
}

#[cfg(any(unix, windows))]
impl std::error::Error for ConfigureError {}
#[cfg(any(unix, windows))]
impl fmt::Display for ConfigureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[cfg(windows)]
        return self.inner.fmt(f);
        #[cfg(unix)]
        self.inner.fmt(f)
    }
}

#[cfg(unix)]
impl From<crate::gss::Error> for ConfigureError {
    fn from(inner: crate::gss::Error) -> Self {
        ConfigureError { inner }
    }
}

#[cfg(windows)]
impl From<crate::sspi::Error> for ConfigureError {
    fn from(inner: crate::sspi::Error) -> Self {
        ConfigureError { inner }
    }
}

/// A session could not be initialized.
#[derive(Debug)]
pub enum SessionError {
    /// The backend has no metadata for the requested mechanism.
    UnsupportedMechanism { mechanism: Mechanism, detail: String },
}

impl std::error::Error for SessionError {}
impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::UnsupportedMechanism { mechanism, detail } => {
                write!(f, "mechanism {mechanism} is not supported by this backend: {detail}")
            }
        }
    }
}

/// A token exchange failed. Backend handshake failures also latch the
/// formatted message into the session's [`last_error`].
///
/// [`last_error`]: crate::NegotiationSession::last_error
#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    /// No target was set before the exchange.
    NoTarget,
    /// The handshake cannot be restarted once a security context exists.
    Restart,
    /// A previous exchange already failed; the session is only good for
    /// inspection and disposal.
    Failed,
    /// The native handshake call failed; carries the formatted backend
    /// status and detail string.
    Exchange(String),
}

impl std::error::Error for TokenError {}
impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::NoTarget => f.write_str("no target specified"),
            TokenError::Restart => f.write_str("could not restart authentication"),
            TokenError::Failed => f.write_str("authentication already failed"),
            TokenError::Exchange(detail) => f.write_str(detail),
        }
    }
}

/// Failure of the [`drive`] loop, parameterized over the caller's transport
/// error.
///
/// [`drive`]: crate::drive
#[derive(Debug)]
pub enum DriveError<E> {
    Exchange(TokenError),
    Transport(E),
    /// The transport reported no further server token while the session was
    /// still incomplete.
    Incomplete,
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for DriveError<E> {}
impl<E: fmt::Display> fmt::Display for DriveError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveError::Exchange(e) => e.fmt(f),
            DriveError::Transport(e) => write!(f, "transport failure: {e}"),
            DriveError::Incomplete => f.write_str("server ended the exchange before negotiation completed"),
        }
    }
}
