use log::{debug, warn};

use crate::backend::{SecurityBackend, Step};
use crate::config::AuthConfiguration;
use crate::error::{DriveError, SessionError, TokenError};
use crate::mechanism::{CredentialSelector, Mechanism};

/// One authentication attempt against one target.
///
/// Created per remote-authentication attempt and driven through
/// [`exchange_token`] until [`is_complete`] reports true. A session is NOT
/// thread safe: it must be owned and mutated by one thread at a time, which
/// `&mut self` enforces. It borrows its [`AuthConfiguration`] and cannot
/// outlive it.
///
/// [`exchange_token`]: NegotiationSession::exchange_token
/// [`is_complete`]: NegotiationSession::is_complete
pub struct NegotiationSession<'cfg, B: SecurityBackend> {
    config: &'cfg AuthConfiguration<B>,
    mechanism: Mechanism,
    mech: B::Mech,
    target: Option<String>,
    credentials: Option<B::Credentials>,
    context: Option<B::Context>,
    complete: bool,
    failed: bool,
    last_error: Option<String>,
}

impl<'cfg, B: SecurityBackend> NegotiationSession<'cfg, B> {
    /// Resolves the mechanism's backend metadata and creates a fresh
    /// session. Fails when the backend does not support the mechanism (NTLM
    /// on GSSAPI, or a host advertising neither SPNEGO nor Kerberos 5).
    pub fn initialize(config: &'cfg AuthConfiguration<B>, mechanism: Mechanism) -> Result<Self, SessionError> {
        let mech = config.backend().resolve_mechanism(mechanism).map_err(|e| {
            warn!("no backend metadata for mechanism {mechanism}: {e}");
            SessionError::UnsupportedMechanism {
                mechanism,
                detail: e.to_string(),
            }
        })?;
        Ok(NegotiationSession {
            config,
            mechanism,
            mech,
            target: None,
            credentials: None,
            context: None,
            complete: false,
            failed: false,
            last_error: None,
        })
    }

    pub fn mechanism(&self) -> Mechanism {
        self.mechanism
    }

    /// Sets the remote principal/hostname. The backend normalizes the form
    /// it needs (SSPI rewrites `service@host` SPNs to `service/host`;
    /// GSSAPI stores the target verbatim). Clearing the target disables
    /// subsequent exchanges.
    pub fn set_target(&mut self, target: Option<&str>) {
        self.target = target.map(|t| self.config.backend().normalize_target(t));
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Accepted for interface symmetry but inert: neither GSSAPI nor SSPI
    /// lets the local hostname be overridden for the handshake.
    pub fn set_localhost(&mut self, _localhost: Option<&str>) {}

    pub fn select_credentials(&mut self, selector: &CredentialSelector) {
        match selector {
            CredentialSelector::Default => self.select_default_credentials(),
            CredentialSelector::Specified {
                username,
                domain,
                password,
            } => self.select_specified_credentials(
                username.as_deref(),
                domain.as_deref(),
                password.as_ref().map(|p| p.as_str()),
            ),
        }
    }

    /// Acquires credentials for the ambient logged-in identity. On GSSAPI
    /// this is a no-op (the ticket cache is implicit); on SSPI it acquires a
    /// credential handle with no explicit identity. Acquisition failures are
    /// logged and leave the handle absent; the later exchange reports them.
    pub fn select_default_credentials(&mut self) {
        debug!("configuring with default credentials");
        match self.config.backend().acquire_default_credentials(&self.mech) {
            Ok(handle) => self.credentials = handle,
            Err(e) => {
                warn!("could not acquire default credentials: {e}");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Acquires credentials for an explicit identity; each field defaults to
    /// empty. Ignored on GSSAPI, which never supports specified credentials
    /// (callers are expected to have checked
    /// [`AuthConfiguration::supports_specified_credentials`]).
    pub fn select_specified_credentials(
        &mut self,
        username: Option<&str>,
        domain: Option<&str>,
        password: Option<&str>,
    ) {
        debug!(
            "configuring with credentials {}\\{}",
            domain.unwrap_or_default(),
            username.unwrap_or_default()
        );
        match self.config.backend().acquire_specified_credentials(
            &self.mech,
            username.unwrap_or_default(),
            domain.unwrap_or_default(),
            password.unwrap_or_default(),
        ) {
            Ok(handle) => self.credentials = handle,
            Err(e) => {
                warn!("could not acquire specified credentials: {e}");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// One round of the handshake: feeds the server-supplied token (absent
    /// on the first round; a zero-length token counts as absent) to the
    /// backend and returns the client token to transmit. An empty output
    /// token is legal on the final round.
    ///
    /// Once a security context exists, calling this again without an input
    /// token, or at all after completion, fails with [`TokenError::Restart`]
    /// rather than silently starting a second handshake; the native
    /// libraries cannot renegotiate through the same context.
    pub fn exchange_token(&mut self, input: Option<&[u8]>) -> Result<Vec<u8>, TokenError> {
        if self.failed {
            return Err(TokenError::Failed);
        }
        if self.target.as_deref().map_or(true, str::is_empty) {
            self.last_error = Some(TokenError::NoTarget.to_string());
            return Err(TokenError::NoTarget);
        }
        let input = input.filter(|t| !t.is_empty());
        if self.context.is_some() && (self.complete || input.is_none()) {
            self.failed = true;
            self.last_error = Some(TokenError::Restart.to_string());
            return Err(TokenError::Restart);
        }

        let context = self.context.take();
        let target = self.target.as_deref().unwrap_or_default();
        debug!("beginning authentication for {target}");
        match self
            .config
            .backend()
            .step(&self.mech, self.credentials.as_ref(), context, target, input)
        {
            Ok(Step::Continue { context, token }) => {
                self.context = Some(context);
                Ok(token)
            }
            Ok(Step::Complete { context, token }) => {
                debug!("negotiation is complete");
                self.context = Some(context);
                self.complete = true;
                Ok(token)
            }
            Err(e) => {
                let message = e.to_string();
                self.failed = true;
                self.last_error = Some(message.clone());
                Err(TokenError::Exchange(message))
            }
        }
    }

    /// True once the backend has reported the handshake finished; stays true
    /// until the session is dropped.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Loop-friendly form of [`is_complete`]: a session that never came to
    /// exist reports complete, so caller loops terminate instead of spinning
    /// on a dead handle.
    ///
    /// [`is_complete`]: NegotiationSession::is_complete
    pub fn completed(session: Option<&Self>) -> bool {
        session.map_or(true, Self::is_complete)
    }

    /// Human-readable description of the most recent failure, including the
    /// backend's native status codes.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Loop-friendly form of [`last_error`] tolerating an absent session.
    ///
    /// [`last_error`]: NegotiationSession::last_error
    pub fn error_of<'a>(session: Option<&'a Self>) -> Option<&'a str> {
        session.and_then(Self::last_error)
    }
}

impl<B: SecurityBackend> Drop for NegotiationSession<'_, B> {
    fn drop(&mut self) {
        // The context was built from the credentials; release it first.
        self.context = None;
        self.credentials = None;
    }
}

/// Drives a session to completion over a caller-supplied transport.
///
/// `transport` sends each client token to the server and returns the
/// server's answering token, or `None` when the server sent nothing back.
/// The final client token (if non-empty) is still delivered through
/// `transport` after the session completes.
pub fn drive<B, T, E>(session: &mut NegotiationSession<'_, B>, mut transport: T) -> Result<(), DriveError<E>>
where
    B: SecurityBackend,
    T: FnMut(&[u8]) -> Result<Option<Vec<u8>>, E>,
{
    let mut input: Option<Vec<u8>> = None;
    loop {
        let output = session.exchange_token(input.as_deref()).map_err(DriveError::Exchange)?;
        if session.is_complete() {
            if !output.is_empty() {
                transport(&output).map_err(DriveError::Transport)?;
            }
            return Ok(());
        }
        match transport(&output).map_err(DriveError::Transport)? {
            Some(reply) => input = Some(reply),
            None => return Err(DriveError::Incomplete),
        }
    }
}
