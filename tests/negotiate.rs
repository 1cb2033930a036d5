//! Exercises the session state machine and driver against a scripted
//! backend: two rounds, `b"client-hello"` out, `b"server-challenge"` in,
//! `b"client-final"` out and done.

use std::fmt;
use std::sync::{Arc, Mutex};

use native_negotiate::{
    drive, AuthConfiguration, CredentialSelector, DriveError, Mechanism, NegotiationSession, SecurityBackend,
    SessionError, Step, TokenError,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records the order native handles would be released in.
#[derive(Default)]
struct ReleaseLog(Mutex<Vec<String>>);

impl ReleaseLog {
    fn record(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct MockCredentials {
    id: u32,
    log: Arc<ReleaseLog>,
}

impl Drop for MockCredentials {
    fn drop(&mut self) {
        self.log.record(format!("cred{}", self.id));
    }
}

struct MockContext {
    id: u32,
    log: Arc<ReleaseLog>,
}

impl Drop for MockContext {
    fn drop(&mut self) {
        self.log.record(format!("ctx{}", self.id));
    }
}

#[derive(Debug)]
struct MockError(&'static str);

impl std::error::Error for MockError {}
impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

struct MockBackend {
    log: Arc<ReleaseLog>,
    principal: Option<String>,
    fail_exchange: bool,
    next_context: Mutex<u32>,
    next_credentials: Mutex<u32>,
}

impl MockBackend {
    fn new(log: Arc<ReleaseLog>, principal: Option<&str>) -> Self {
        MockBackend {
            log,
            principal: principal.map(str::to_owned),
            fail_exchange: false,
            next_context: Mutex::new(0),
            next_credentials: Mutex::new(0),
        }
    }

    fn new_context(&self) -> MockContext {
        let mut next = self.next_context.lock().unwrap();
        *next += 1;
        MockContext {
            id: *next,
            log: Arc::clone(&self.log),
        }
    }

    fn new_credentials(&self) -> MockCredentials {
        let mut next = self.next_credentials.lock().unwrap();
        *next += 1;
        MockCredentials {
            id: *next,
            log: Arc::clone(&self.log),
        }
    }
}

impl SecurityBackend for MockBackend {
    type Mech = ();
    type Credentials = MockCredentials;
    type Context = MockContext;
    type Error = MockError;

    fn resolve_mechanism(&self, mechanism: Mechanism) -> Result<(), MockError> {
        match mechanism {
            Mechanism::Negotiate => Ok(()),
            Mechanism::Ntlm => Err(MockError("NTLM is not provided")),
        }
    }

    fn mechanism_available(&self, mechanism: Mechanism) -> bool {
        self.resolve_mechanism(mechanism).is_ok() && self.principal.is_some()
    }

    fn supports_default_credentials(&self, _mechanism: Mechanism) -> bool {
        self.principal.is_some()
    }

    fn supports_specified_credentials(&self, _mechanism: Mechanism) -> bool {
        true
    }

    fn default_principal(&self, mechanism: Mechanism) -> Option<String> {
        match mechanism {
            Mechanism::Negotiate => self.principal.clone(),
            Mechanism::Ntlm => None,
        }
    }

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

    fn acquire_default_credentials(&self, _mech: &()) -> Result<Option<MockCredentials>, MockError> {
        Ok(Some(self.new_credentials()))
    }

    fn acquire_specified_credentials(
        &self,
        _mech: &(),
        _username: &str,
        _domain: &str,
        _password: &str,
    ) -> Result<Option<MockCredentials>, MockError> {
        Ok(Some(self.new_credentials()))
    }

    fn step(
        &self,
        _mech: &(),
        credentials: Option<&MockCredentials>,
        context: Option<MockContext>,
        target: &str,
        input: Option<&[u8]>,
    ) -> Result<Step<MockContext>, MockError> {
        assert!(!target.is_empty(), "the session must withhold empty targets");
        if credentials.is_none() {
            return Err(MockError("no credentials configured"));
        }
        if self.fail_exchange {
            return Err(MockError("scripted failure"));
        }
        match (context, input) {
            (None, None) => Ok(Step::Continue {
                context: self.new_context(),
                token: b"client-hello".to_vec(),
            }),
            (Some(previous), Some(b"server-challenge")) => {
                // The scripted package replaces the context each round.
                drop(previous);
                Ok(Step::Complete {
                    context: self.new_context(),
                    token: b"client-final".to_vec(),
                })
            }
            _ => Err(MockError("unexpected round")),
        }
    }
}

fn config_with(log: &Arc<ReleaseLog>, principal: Option<&str>) -> AuthConfiguration<MockBackend> {
    AuthConfiguration::with_backend(MockBackend::new(Arc::clone(log), principal))
}

fn config() -> AuthConfiguration<MockBackend> {
    config_with(&Arc::new(ReleaseLog::default()), Some("user@EXAMPLE.COM"))
}

fn ready_session(config: &AuthConfiguration<MockBackend>) -> NegotiationSession<'_, MockBackend> {
    let mut session = NegotiationSession::initialize(config, Mechanism::Negotiate).unwrap();
    session.set_target(Some("HTTP/server.example.com"));
    session.select_default_credentials();
    session
}

#[test]
fn two_round_handshake_completes() {
    init_logs();
    let config = config();
    let mut session = ready_session(&config);

    let hello = session.exchange_token(None).unwrap();
    assert_eq!(hello, b"client-hello");
    assert!(!session.is_complete());

    let fin = session.exchange_token(Some(b"server-challenge")).unwrap();
    assert_eq!(fin, b"client-final");
    assert!(session.is_complete());
    assert_eq!(session.last_error(), None);
}

#[test]
fn drive_runs_the_whole_handshake() {
    init_logs();
    let config = config();
    let mut session = ready_session(&config);

    let mut sent: Vec<Vec<u8>> = Vec::new();
    drive(&mut session, |token| {
        sent.push(token.to_vec());
        Ok::<_, MockError>(if token == b"client-hello" {
            Some(b"server-challenge".to_vec())
        } else {
            None
        })
    })
    .unwrap();

    assert!(session.is_complete());
    assert_eq!(sent, vec![b"client-hello".to_vec(), b"client-final".to_vec()]);
}

#[test]
fn drive_reports_a_server_that_stops_early() {
    let config = config();
    let mut session = ready_session(&config);

    let result = drive(&mut session, |_token| Ok::<_, MockError>(None));
    assert!(matches!(result, Err(DriveError::Incomplete)));
}

#[test]
fn completed_session_cannot_restart() {
    let config = config();
    let mut session = ready_session(&config);
    session.exchange_token(None).unwrap();
    session.exchange_token(Some(b"server-challenge")).unwrap();

    let restart = session.exchange_token(Some(b"server-challenge"));
    assert_eq!(restart, Err(TokenError::Restart));
    assert_eq!(session.last_error(), Some("could not restart authentication"));
    // Completion is not undone by the refused restart.
    assert!(session.is_complete());

    // The refusal latches; later calls report the earlier failure.
    assert_eq!(session.exchange_token(Some(b"server-challenge")), Err(TokenError::Failed));
}

#[test]
fn midway_exchange_without_input_cannot_restart() {
    let config = config();
    let mut session = ready_session(&config);
    session.exchange_token(None).unwrap();

    assert_eq!(session.exchange_token(None), Err(TokenError::Restart));
}

#[test]
fn empty_input_token_counts_as_absent() {
    let config = config();
    let mut session = ready_session(&config);

    let hello = session.exchange_token(Some(&[])).unwrap();
    assert_eq!(hello, b"client-hello");
}

#[test]
fn missing_target_is_reported_and_recoverable() {
    let config = config();
    let mut session = NegotiationSession::initialize(&config, Mechanism::Negotiate).unwrap();
    session.select_default_credentials();

    assert_eq!(session.exchange_token(None), Err(TokenError::NoTarget));
    assert_eq!(session.last_error(), Some("no target specified"));

    session.set_target(Some(""));
    assert_eq!(session.exchange_token(None), Err(TokenError::NoTarget));

    // Setting a real target afterwards lets the handshake proceed.
    session.set_target(Some("HTTP/server.example.com"));
    assert_eq!(session.exchange_token(None).unwrap(), b"client-hello");
}

#[test]
fn backend_failure_latches_the_session() {
    let log = Arc::new(ReleaseLog::default());
    let mut backend = MockBackend::new(Arc::clone(&log), Some("user@EXAMPLE.COM"));
    backend.fail_exchange = true;
    let config = AuthConfiguration::with_backend(backend);
    let mut session = ready_session(&config);

    match session.exchange_token(None) {
        Err(TokenError::Exchange(detail)) => assert_eq!(detail, "scripted failure"),
        other => panic!("expected an exchange failure, got {other:?}"),
    }
    assert_eq!(session.last_error(), Some("scripted failure"));
    assert!(!session.is_complete());
    assert_eq!(session.exchange_token(None), Err(TokenError::Failed));
}

#[test]
fn handles_are_released_context_first() {
    let log = Arc::new(ReleaseLog::default());
    {
        let config = config_with(&log, Some("user@EXAMPLE.COM"));
        let mut session = ready_session(&config);
        session.exchange_token(None).unwrap();
        session.exchange_token(Some(b"server-challenge")).unwrap();
    }
    // ctx1 superseded during round two, ctx2 and cred1 on session drop.
    assert_eq!(log.events(), vec!["ctx1", "ctx2", "cred1"]);
}

#[test]
fn capabilities_follow_the_backend() {
    let log = Arc::new(ReleaseLog::default());

    let without = config_with(&log, None);
    assert!(!without.mechanism_available(Mechanism::Negotiate));
    assert!(!without.supports_default_credentials(Mechanism::Negotiate));
    assert!(without.supports_specified_credentials(Mechanism::Negotiate));
    assert_eq!(without.default_credential_principal(Mechanism::Negotiate), None);

    let with = config_with(&log, Some("user@EXAMPLE.COM"));
    assert!(with.mechanism_available(Mechanism::Negotiate));
    assert_eq!(
        with.default_credential_principal(Mechanism::Negotiate).as_deref(),
        Some("user@EXAMPLE.COM")
    );
    assert!(!with.mechanism_available(Mechanism::Ntlm));
}

#[test]
fn absent_sessions_read_as_complete_and_error_free() {
    assert!(NegotiationSession::<'static, MockBackend>::completed(None));
    assert_eq!(NegotiationSession::<'static, MockBackend>::error_of(None), None);
}

#[test]
fn ntlm_is_refused_at_initialization() {
    let config = config();
    match NegotiationSession::initialize(&config, Mechanism::Ntlm) {
        Err(SessionError::UnsupportedMechanism { mechanism, .. }) => assert_eq!(mechanism, Mechanism::Ntlm),
        Ok(_) => panic!("NTLM must be refused by this backend"),
    };
}

#[test]
fn targets_are_normalized_by_the_backend() {
    let config = config();
    let mut session = NegotiationSession::initialize(&config, Mechanism::Negotiate).unwrap();

    session.set_target(Some("HTTP@server.example.com"));
    assert_eq!(session.target(), Some("HTTP/server.example.com"));

    session.set_target(None);
    assert_eq!(session.target(), None);
}

#[test]
fn selector_routes_to_specified_credentials() {
    let config = config();
    let mut session = NegotiationSession::initialize(&config, Mechanism::Negotiate).unwrap();
    session.set_target(Some("HTTP/server.example.com"));
    session.select_credentials(&CredentialSelector::specified(
        Some("user"),
        Some("EXAMPLE"),
        Some("hunter2"),
    ));

    assert_eq!(session.exchange_token(None).unwrap(), b"client-hello");
}
