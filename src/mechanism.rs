use std::fmt;

use zeroize::Zeroizing;

/// An authentication mechanism the negotiation engine can drive.
///
/// `Negotiate` is SPNEGO, which settles on Kerberos or NTLM inside the
/// handshake itself. `Ntlm` forces raw NTLM and only exists on the SSPI
/// backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mechanism {
    Ntlm,
    Negotiate,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::Ntlm => f.write_str("NTLM"),
            Mechanism::Negotiate => f.write_str("Negotiate"),
        }
    }
}

/// Which identity a session authenticates as.
///
/// `Specified` owns its strings; the password is wiped when the selector is
/// dropped. The GSSAPI backend only ever honors `Default` (the Kerberos
/// ticket cache) and ignores `Specified`, so check
/// [`AuthConfiguration::supports_specified_credentials`] first.
///
/// [`AuthConfiguration::supports_specified_credentials`]: crate::AuthConfiguration::supports_specified_credentials
pub enum CredentialSelector {
    Default,
    Specified {
        username: Option<String>,
        domain: Option<String>,
        password: Option<Zeroizing<String>>,
    },
}

impl CredentialSelector {
    pub fn specified(username: Option<&str>, domain: Option<&str>, password: Option<&str>) -> Self {
        CredentialSelector::Specified {
            username: username.map(str::to_owned),
            domain: domain.map(str::to_owned),
            password: password.map(|p| Zeroizing::new(p.to_owned())),
        }
    }
}

impl fmt::Debug for CredentialSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSelector::Default => f.write_str("Default"),
            CredentialSelector::Specified { username, domain, .. } => f
                .debug_struct("Specified")
                .field("username", username)
                .field("domain", domain)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}
