use std::fmt::{self, Display};

use windows::core::HRESULT;

use crate::mechanism::Mechanism;

#[derive(Debug)]
pub enum Error {
    /// The security package backing the mechanism is not installed.
    Package {
        mechanism: Mechanism,
        source: windows::core::Error,
    },
    /// An exchange was attempted without any acquired credential handle.
    NoCredentials,
    Credentials(windows::core::Error),
    Query(windows::core::Error),
    Complete(windows::core::Error),
    /// `InitializeSecurityContextW` failed.
    Negotiate { status: HRESULT },
}

impl std::error::Error for Error {}
impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Package { mechanism, source } => {
                write!(f, "no security package for mechanism {mechanism}: {source}")
            }
            Error::NoCredentials => f.write_str("invalid authentication object"),
            Error::Credentials(e) => write!(f, "could not acquire credentials: {e}"),
            Error::Query(e) => write!(f, "could not query credentials: {e}"),
            Error::Complete(e) => write!(f, "could not complete token: {e}"),
            Error::Negotiate { status } => {
                write!(f, "negotiate failure: {:#x} ({})", status.0, status.message())
            }
        }
    }
}
