//! Login state machine
//!
//! [`LoginOrchestrator`] sequences one login:
//!
//! ```text
//! Discovering -> ResumeCheck -> { Authenticated | QrChallenge | PasswordChallenge }
//!                                   QrChallenge | PasswordChallenge -> Authenticated
//! any failure -> Aborted
//! ```
//!
//! A cached session cookie is only trusted after a live probe. Captcha
//! mismatches loop with a fresh captcha for as long as the user keeps typing;
//! a wrong username/password clears both fields and prompts again; every other
//! portal rejection aborts with the portal's own code and message.

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::channel::{ChallengeChannel, QrPayload};
use crate::app::client::{AuthTarget, Completion, Portal};
use crate::auth::{CredentialStore, Credentials, Entries, PersistChoice, is_valid_username};
use crate::auth::persist_credentials;
use crate::constants::portal;
use crate::errors::{AuthError, AuthResult};

pub mod outcome;

pub use outcome::{FatalFailure, LoginOutcome, PortalReply, RetryableFailure};

/// Which challenge to run when the cached session is missing or stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoginStrategy {
    /// Scan a QR code with the mobile app
    #[default]
    #[serde(alias = "qr")]
    #[value(alias = "qr")]
    Qrcode,
    /// Username, password and captcha
    #[serde(alias = "pwd")]
    #[value(alias = "pwd")]
    Password,
}

/// States of one login run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Discovering,
    ResumeCheck,
    QrChallenge,
    PasswordChallenge,
    Authenticated,
    Aborted,
}

/// User interaction needed during a login
///
/// The terminal implementation lives in the CLI; tests script it.
pub trait Prompter: Send {
    /// Return credentials with every missing field filled in
    fn fill_credentials(&mut self, known: Credentials) -> AuthResult<Credentials>;

    /// Ask what to keep on disk
    fn persist_choice(&mut self) -> AuthResult<PersistChoice>;

    /// Show the captcha image and read the text typed for it
    fn solve_captcha(&mut self, image: &[u8]) -> AuthResult<String>;

    /// Display a (refreshed) QR code
    fn show_qr(&mut self, payload: &QrPayload) -> AuthResult<()>;

    /// Tell the user something without expecting an answer
    fn notice(&mut self, message: &str);
}

/// Files the login reads and writes
#[derive(Debug, Clone)]
pub struct LoginStores {
    /// Holds the session cookie
    pub token: CredentialStore,
    /// Holds username and (optionally) password
    pub userinfo: CredentialStore,
}

/// Per-run login settings
#[derive(Debug, Clone)]
pub struct LoginSettings {
    /// URL of the downstream service that redirects into the portal
    pub entry_url: Url,
    /// Challenge to use when resume fails
    pub strategy: LoginStrategy,
    /// Give up waiting for a QR scan after this long
    pub qr_timeout: Option<Duration>,
}

/// Drives one login from discovery to an authenticated session
pub struct LoginOrchestrator<P, C, U> {
    portal: P,
    channel: C,
    prompter: U,
    stores: LoginStores,
    settings: LoginSettings,
    cancel: CancellationToken,
    history: Vec<LoginState>,
}

impl<P, C, U> LoginOrchestrator<P, C, U>
where
    P: Portal,
    C: ChallengeChannel,
    U: Prompter,
{
    pub fn new(
        portal: P,
        channel: C,
        prompter: U,
        stores: LoginStores,
        settings: LoginSettings,
    ) -> Self {
        Self {
            portal,
            channel,
            prompter,
            stores,
            settings,
            cancel: CancellationToken::new(),
            history: Vec::new(),
        }
    }

    /// Use an external cancellation token (e.g. wired to Ctrl-C)
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// States visited so far, in order
    pub fn history(&self) -> &[LoginState] {
        &self.history
    }

    /// Current state, if the run has started
    pub fn state(&self) -> Option<LoginState> {
        self.history.last().copied()
    }

    /// Portal client driving the HTTP side
    pub fn portal(&self) -> &P {
        &self.portal
    }

    /// Prompter used for user interaction
    pub fn prompter(&self) -> &U {
        &self.prompter
    }

    /// Run the login to completion
    ///
    /// # Errors
    ///
    /// Any `AuthError` aborts the run; transport errors are never retried here
    pub async fn login(&mut self) -> AuthResult<P::Session> {
        match self.run().await {
            Ok(session) => Ok(session),
            Err(e) => {
                self.transition(LoginState::Aborted);
                warn!("Login aborted: {}", e);
                Err(e)
            }
        }
    }

    async fn run(&mut self) -> AuthResult<P::Session> {
        self.transition(LoginState::Discovering);
        let target = self.portal.discover(&self.settings.entry_url).await?;

        self.transition(LoginState::ResumeCheck);
        if self.try_resume(&target).await? {
            return self.authenticate(&target, Completion::Resumed).await;
        }

        let completion = match self.settings.strategy {
            LoginStrategy::Qrcode => {
                self.transition(LoginState::QrChallenge);
                self.qr_challenge(&target).await?
            }
            LoginStrategy::Password => {
                self.transition(LoginState::PasswordChallenge);
                self.password_challenge(&target).await?
            }
        };

        self.authenticate(&target, completion).await
    }

    fn transition(&mut self, next: LoginState) {
        match self.state() {
            Some(previous) => debug!("Login state {:?} -> {:?}", previous, next),
            None => debug!("Login state {:?}", next),
        }
        self.history.push(next);
    }

    /// Probe the cached cookie; a stale one is dropped from the jar but left on disk
    async fn try_resume(&mut self, target: &AuthTarget) -> AuthResult<bool> {
        let Some(token) = self.stores.token.get(portal::SESSION_COOKIE)? else {
            info!("No cached session");
            return Ok(false);
        };

        info!("Trying to resume the cached session");
        if self.portal.probe_resume(target, &token).await? {
            info!("Resumed cached session");
            return Ok(true);
        }

        warn!("Cached session expired");
        self.prompter
            .notice("Cached session expired. Please log in again.");
        self.portal.clear_session_token();
        Ok(false)
    }

    async fn qr_challenge(&mut self, target: &AuthTarget) -> AuthResult<Completion> {
        let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel();
        let cancel = self.cancel.child_token();
        let qr_timeout = self.settings.qr_timeout;

        let channel = &self.channel;
        let prompter = &mut self.prompter;

        let wait = channel.await_confirmation(target, refresh_tx, cancel.clone());
        tokio::pin!(wait);

        let deadline = async move {
            match qr_timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                result = &mut wait => {
                    result?;
                    break;
                }
                Some(payload) = refresh_rx.recv() => {
                    prompter.show_qr(&payload)?;
                }
                _ = &mut deadline, if !cancel.is_cancelled() => {
                    warn!("No QR confirmation within {:?}", qr_timeout);
                    cancel.cancel();
                }
            }
        }

        Ok(Completion::Confirmed)
    }

    async fn password_challenge(&mut self, target: &AuthTarget) -> AuthResult<Completion> {
        let mut credentials = Credentials::load(&self.stores.userinfo)?.with_env_fallback();

        loop {
            credentials = self.prompter.fill_credentials(credentials)?;
            let (username, password) = match credentials.pair() {
                Some((username, password)) if is_valid_username(username) => {
                    (username.to_string(), password.to_string())
                }
                Some((username, _)) => {
                    self.prompter
                        .notice(&format!("Invalid username {:?}", username));
                    credentials.clear();
                    continue;
                }
                None => {
                    return Err(AuthError::InvalidUsername {
                        reason: "username and password are required".to_string(),
                    });
                }
            };

            let choice = self.prompter.persist_choice()?;
            persist_credentials(&self.stores.userinfo, &credentials, choice)?;

            loop {
                let image = self.portal.fetch_captcha(target).await?;
                let captcha = self.prompter.solve_captcha(&image)?;

                match self
                    .portal
                    .submit(target, &username, &password, captcha.trim())
                    .await?
                {
                    LoginOutcome::Success { redirect } => {
                        info!("Password login accepted");
                        return Ok(Completion::Redirect { path: redirect });
                    }
                    LoginOutcome::Retryable(failure) => {
                        warn!("Retrying with a new captcha: {}", failure.message());
                        self.prompter.notice(failure.message());
                    }
                    LoginOutcome::Fatal(failure) if failure.is_credentials_related() => {
                        warn!("Portal rejected the credentials for user: {}", username);
                        self.prompter.notice(failure.message());
                        credentials.clear();
                        break;
                    }
                    LoginOutcome::Fatal(failure) => return Err(failure.into()),
                }
            }
        }
    }

    async fn authenticate(
        &mut self,
        target: &AuthTarget,
        completion: Completion,
    ) -> AuthResult<P::Session> {
        self.transition(LoginState::Authenticated);
        let session = self.portal.finalize(target, &completion).await?;

        if completion != Completion::Resumed {
            match self.portal.session_token() {
                Some(token) => {
                    let mut entries = Entries::new();
                    entries.insert(portal::SESSION_COOKIE.to_string(), Some(token));
                    self.stores.token.save(entries)?;
                    info!("Cached session saved to {}", self.stores.token.path().display());
                }
                None => warn!("Portal did not set a session cookie; nothing cached"),
            }
        }

        info!("Login successful");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ChannelError, ChannelResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const FRESH_TOKEN: &str = "fresh-token";

    fn target() -> AuthTarget {
        let url = Url::parse("https://jaccount.sjtu.edu.cn/jaccount/jalogin?sid=1").unwrap();
        AuthTarget::from_landing(&url, r#"<a id="firefox_link" href="x://y?uuid=u-1">x</a>"#)
            .unwrap()
    }

    #[derive(Default)]
    struct FakePortal {
        redirect_elsewhere: bool,
        accepts_cached: bool,
        outcomes: Mutex<VecDeque<LoginOutcome>>,
        calls: Mutex<Vec<&'static str>>,
        token: Mutex<Option<String>>,
        submissions: Mutex<Vec<(String, String, String)>>,
        finalized_with: Mutex<Vec<(Completion, Option<String>)>>,
    }

    impl FakePortal {
        fn with_outcomes(outcomes: Vec<LoginOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                ..Default::default()
            }
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls().iter().filter(|c| **c == call).count()
        }
    }

    #[async_trait]
    impl Portal for FakePortal {
        type Session = String;

        async fn discover(&self, entry: &Url) -> AuthResult<AuthTarget> {
            self.record("discover");
            if self.redirect_elsewhere {
                return Err(AuthError::UnexpectedRedirect {
                    url: entry.to_string(),
                });
            }
            Ok(target())
        }

        async fn probe_resume(&self, _target: &AuthTarget, token: &str) -> AuthResult<bool> {
            self.record("probe_resume");
            *self.token.lock().unwrap() = Some(token.to_string());
            Ok(self.accepts_cached)
        }

        fn clear_session_token(&self) {
            self.record("clear_session_token");
            *self.token.lock().unwrap() = None;
        }

        async fn fetch_captcha(&self, _target: &AuthTarget) -> AuthResult<Vec<u8>> {
            self.record("fetch_captcha");
            Ok(vec![0x89, 0x50, 0x4e, 0x47])
        }

        async fn submit(
            &self,
            _target: &AuthTarget,
            username: &str,
            password: &str,
            captcha: &str,
        ) -> AuthResult<LoginOutcome> {
            self.record("submit");
            self.submissions.lock().unwrap().push((
                username.to_string(),
                password.to_string(),
                captcha.to_string(),
            ));
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected submission");
            if matches!(outcome, LoginOutcome::Success { .. }) {
                *self.token.lock().unwrap() = Some(FRESH_TOKEN.to_string());
            }
            Ok(outcome)
        }

        async fn finalize(
            &self,
            _target: &AuthTarget,
            completion: &Completion,
        ) -> AuthResult<String> {
            self.record("finalize");
            let seen = self.token.lock().unwrap().clone();
            self.finalized_with
                .lock()
                .unwrap()
                .push((completion.clone(), seen));
            if *completion == Completion::Confirmed {
                *self.token.lock().unwrap() = Some(FRESH_TOKEN.to_string());
            }
            Ok("session".to_string())
        }

        fn session_token(&self) -> Option<String> {
            self.record("session_token");
            self.token.lock().unwrap().clone()
        }
    }

    enum ChannelScript {
        Confirm { refreshes: usize },
        Disconnect,
        Hang,
    }

    struct FakeChannel {
        script: ChannelScript,
    }

    #[async_trait]
    impl ChallengeChannel for FakeChannel {
        async fn await_confirmation(
            &self,
            target: &AuthTarget,
            refresh: mpsc::UnboundedSender<QrPayload>,
            cancel: CancellationToken,
        ) -> ChannelResult<()> {
            match self.script {
                ChannelScript::Confirm { refreshes } => {
                    for i in 0..refreshes {
                        let _ = refresh.send(QrPayload {
                            uuid: target.uuid().to_string(),
                            sig: format!("sig-{}", i),
                            ts: i.to_string(),
                        });
                        tokio::task::yield_now().await;
                    }
                    Ok(())
                }
                ChannelScript::Disconnect => Err(ChannelError::Closed),
                ChannelScript::Hang => {
                    cancel.cancelled().await;
                    Err(ChannelError::Cancelled)
                }
            }
        }
    }

    #[derive(Default)]
    struct ScriptedPrompter {
        answers: VecDeque<Credentials>,
        seen: Vec<Credentials>,
        captchas_solved: usize,
        qr_shown: Vec<QrPayload>,
        notices: Vec<String>,
    }

    impl Prompter for ScriptedPrompter {
        fn fill_credentials(&mut self, known: Credentials) -> AuthResult<Credentials> {
            self.seen.push(known.clone());
            if known.is_complete() {
                return Ok(known);
            }
            Ok(self.answers.pop_front().expect("unexpected credential prompt"))
        }

        fn persist_choice(&mut self) -> AuthResult<PersistChoice> {
            Ok(PersistChoice::UsernameOnly)
        }

        fn solve_captcha(&mut self, _image: &[u8]) -> AuthResult<String> {
            self.captchas_solved += 1;
            Ok(format!(" cap{} ", self.captchas_solved))
        }

        fn show_qr(&mut self, payload: &QrPayload) -> AuthResult<()> {
            self.qr_shown.push(payload.clone());
            Ok(())
        }

        fn notice(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    struct Fixture {
        _dir: TempDir,
        stores: LoginStores,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let stores = LoginStores {
                token: CredentialStore::new(dir.path().join("cookies.json")),
                userinfo: CredentialStore::new(dir.path().join("config.json")),
            };
            Self { _dir: dir, stores }
        }

        fn with_cached_token(self, token: &str) -> Self {
            let mut entries = Entries::new();
            entries.insert(portal::SESSION_COOKIE.to_string(), Some(token.to_string()));
            self.stores.token.save(entries).unwrap();
            self
        }

        fn with_saved_credentials(self, username: &str, password: &str) -> Self {
            persist_credentials(
                &self.stores.userinfo,
                &Credentials::new(username, password),
                PersistChoice::Both,
            )
            .unwrap();
            self
        }

        fn cached_token(&self) -> Option<String> {
            self.stores.token.get(portal::SESSION_COOKIE).unwrap()
        }

        fn orchestrator(
            &self,
            portal: FakePortal,
            script: ChannelScript,
            prompter: ScriptedPrompter,
            strategy: LoginStrategy,
        ) -> LoginOrchestrator<FakePortal, FakeChannel, ScriptedPrompter> {
            let settings = LoginSettings {
                entry_url: Url::parse("https://i.sjtu.edu.cn/jaccountlogin").unwrap(),
                strategy,
                qr_timeout: Some(Duration::from_millis(50)),
            };
            LoginOrchestrator::new(
                portal,
                FakeChannel { script },
                prompter,
                self.stores.clone(),
                settings,
            )
        }
    }

    fn wrong_captcha() -> LoginOutcome {
        LoginOutcome::Retryable(RetryableFailure::WrongCaptcha {
            message: "wrong captcha".to_string(),
        })
    }

    fn success() -> LoginOutcome {
        LoginOutcome::Success {
            redirect: "/jaccount/jaoauth2?next=1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unexpected_redirect_stops_after_discovery() {
        let fixture = Fixture::new().with_cached_token("cached");
        let portal = FakePortal {
            redirect_elsewhere: true,
            ..Default::default()
        };
        let mut login = fixture.orchestrator(
            portal,
            ChannelScript::Confirm { refreshes: 0 },
            ScriptedPrompter::default(),
            LoginStrategy::Qrcode,
        );

        let result = login.login().await;
        assert!(matches!(result, Err(AuthError::UnexpectedRedirect { .. })));
        assert_eq!(login.portal().calls(), vec!["discover"]);
        assert_eq!(
            login.history(),
            &[LoginState::Discovering, LoginState::Aborted]
        );
    }

    #[tokio::test]
    async fn test_valid_cached_token_resumes_without_challenge() {
        let fixture = Fixture::new().with_cached_token("cached");
        let portal = FakePortal {
            accepts_cached: true,
            ..Default::default()
        };
        let mut login = fixture.orchestrator(
            portal,
            ChannelScript::Disconnect,
            ScriptedPrompter::default(),
            LoginStrategy::Password,
        );

        let session = login.login().await.unwrap();
        assert_eq!(session, "session");
        assert_eq!(
            login.portal().calls(),
            vec!["discover", "probe_resume", "finalize"]
        );
        assert_eq!(
            login.history(),
            &[
                LoginState::Discovering,
                LoginState::ResumeCheck,
                LoginState::Authenticated
            ]
        );
        assert_eq!(fixture.cached_token().as_deref(), Some("cached"));
    }

    #[tokio::test]
    async fn test_stale_token_forces_fresh_challenge() {
        let fixture = Fixture::new().with_cached_token("stale");
        let mut login = fixture.orchestrator(
            FakePortal::default(),
            ChannelScript::Confirm { refreshes: 2 },
            ScriptedPrompter::default(),
            LoginStrategy::Qrcode,
        );

        login.login().await.unwrap();

        assert_eq!(
            login.history(),
            &[
                LoginState::Discovering,
                LoginState::ResumeCheck,
                LoginState::QrChallenge,
                LoginState::Authenticated
            ]
        );

        let calls = login.portal().calls();
        let cleared = calls.iter().position(|c| *c == "clear_session_token").unwrap();
        let finalized = calls.iter().position(|c| *c == "finalize").unwrap();
        assert!(cleared < finalized);

        let finalized_with = login.portal().finalized_with.lock().unwrap().clone();
        assert_eq!(finalized_with, vec![(Completion::Confirmed, None)]);

        assert_eq!(login.prompter().qr_shown.len(), 2);
        assert_eq!(fixture.cached_token().as_deref(), Some(FRESH_TOKEN));
    }

    #[tokio::test]
    async fn test_captcha_retries_fetch_fresh_captcha_each_time() {
        let fixture = Fixture::new().with_saved_credentials("alice", "secret");
        let portal = FakePortal::with_outcomes(vec![
            wrong_captcha(),
            wrong_captcha(),
            wrong_captcha(),
            success(),
        ]);
        let mut login = fixture.orchestrator(
            portal,
            ChannelScript::Disconnect,
            ScriptedPrompter::default(),
            LoginStrategy::Password,
        );

        login.login().await.unwrap();

        let portal = login.portal();
        assert_eq!(portal.count("fetch_captcha"), 4);
        assert_eq!(portal.count("submit"), 4);
        assert_eq!(portal.count("finalize"), 1);

        // Every submission is immediately preceded by its own captcha fetch.
        let calls = portal.calls();
        for (i, call) in calls.iter().enumerate() {
            if *call == "submit" {
                assert_eq!(calls[i - 1], "fetch_captcha");
            }
        }

        let submissions = portal.submissions.lock().unwrap().clone();
        let captchas: Vec<&str> = submissions.iter().map(|s| s.2.as_str()).collect();
        assert_eq!(captchas, vec!["cap1", "cap2", "cap3", "cap4"]);
        assert!(submissions.iter().all(|s| s.0 == "alice" && s.1 == "secret"));

        assert_eq!(login.prompter().notices.len(), 3);
        assert_eq!(fixture.cached_token().as_deref(), Some(FRESH_TOKEN));
    }

    #[tokio::test]
    async fn test_wrong_credentials_clear_both_fields() {
        let fixture = Fixture::new().with_saved_credentials("alice", "wrong");
        let portal = FakePortal::with_outcomes(vec![
            LoginOutcome::Fatal(FatalFailure::WrongCredentials {
                message: "wrong password".to_string(),
            }),
            success(),
        ]);
        let prompter = ScriptedPrompter {
            answers: vec![Credentials::new("alice", "right")].into(),
            ..Default::default()
        };
        let mut login = fixture.orchestrator(
            portal,
            ChannelScript::Disconnect,
            prompter,
            LoginStrategy::Password,
        );

        login.login().await.unwrap();

        let seen = &login.prompter().seen;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Credentials::new("alice", "wrong"));
        assert_eq!(seen[1], Credentials::default());

        let submissions = login.portal().submissions.lock().unwrap().clone();
        assert_eq!(submissions[0].1, "wrong");
        assert_eq!(submissions[1].1, "right");

        // Persisted with "username only" consent.
        let stored = Credentials::load(&fixture.stores.userinfo).unwrap();
        assert_eq!(stored.username.as_deref(), Some("alice"));
        assert_eq!(stored.password, None);
    }

    #[tokio::test]
    async fn test_unknown_portal_error_aborts() {
        let fixture = Fixture::new().with_saved_credentials("alice", "secret");
        let portal = FakePortal::with_outcomes(vec![LoginOutcome::Fatal(
            FatalFailure::UnknownPortalError {
                code: "ACCOUNT_LOCKED".to_string(),
                message: "locked".to_string(),
            },
        )]);
        let mut login = fixture.orchestrator(
            portal,
            ChannelScript::Disconnect,
            ScriptedPrompter::default(),
            LoginStrategy::Password,
        );

        let result = login.login().await;
        match result {
            Err(AuthError::Rejected { code, message }) => {
                assert_eq!(code, "ACCOUNT_LOCKED");
                assert_eq!(message, "locked");
            }
            other => panic!("Expected rejection, got {:?}", other.map(|_| ())),
        }
        assert_eq!(login.portal().count("finalize"), 0);
        assert_eq!(login.state(), Some(LoginState::Aborted));
        assert_eq!(fixture.cached_token(), None);
    }

    #[tokio::test]
    async fn test_channel_disconnect_is_fatal() {
        let fixture = Fixture::new();
        let mut login = fixture.orchestrator(
            FakePortal::default(),
            ChannelScript::Disconnect,
            ScriptedPrompter::default(),
            LoginStrategy::Qrcode,
        );

        let result = login.login().await;
        assert!(matches!(
            result,
            Err(AuthError::Channel(ChannelError::Closed))
        ));
        assert_eq!(login.portal().count("finalize"), 0);
    }

    #[tokio::test]
    async fn test_qr_timeout_cancels_wait() {
        let fixture = Fixture::new();
        let mut login = fixture.orchestrator(
            FakePortal::default(),
            ChannelScript::Hang,
            ScriptedPrompter::default(),
            LoginStrategy::Qrcode,
        );

        let result = login.login().await;
        assert!(matches!(
            result,
            Err(AuthError::Channel(ChannelError::Cancelled))
        ));
        assert_eq!(login.state(), Some(LoginState::Aborted));
    }

    #[tokio::test]
    async fn test_external_cancellation_unblocks_wait() {
        let fixture = Fixture::new();
        let cancel = CancellationToken::new();
        let mut login = fixture
            .orchestrator(
                FakePortal::default(),
                ChannelScript::Hang,
                ScriptedPrompter::default(),
                LoginStrategy::Qrcode,
            )
            .with_cancellation(cancel.clone());
        login.settings.qr_timeout = None;

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        let result = login.login().await;
        trigger.await.unwrap();
        assert!(matches!(
            result,
            Err(AuthError::Channel(ChannelError::Cancelled))
        ));
    }

    #[test]
    fn test_strategy_aliases() {
        let parsed: LoginStrategy = serde_json::from_str("\"qr\"").unwrap();
        assert_eq!(parsed, LoginStrategy::Qrcode);
        let parsed: LoginStrategy = serde_json::from_str("\"pwd\"").unwrap();
        assert_eq!(parsed, LoginStrategy::Password);
        assert_eq!(
            LoginStrategy::from_str("qr", true).unwrap(),
            LoginStrategy::Qrcode
        );
    }
}
