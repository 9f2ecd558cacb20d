//! Two-factor authentication state and one-time password acquisition
//!
//! An [`OtpState`] lives for one publish session. It is shared by reference
//! between every retry of a package, and between packages that publish under
//! the same session, so that one operator answer serves all of them.

use crate::core::error::PublishError;
use crate::core::gate::ConcurrencyGate;
use crate::core::output::parse_json_output;
use crate::core::registry::{REGISTRY_ENV_VAR, resolve_registry};
use crate::core::traits::{CommandRunner, Invocation, OtpPrompter};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, Stdin};

/// Flag the OTP is passed with
pub const OTP_FLAG: &str = "--otp";

/// Text npm puts in the detail of an E401 caused by a wrong or expired OTP
pub const OTP_DETAIL_MARKER: &str = "--otp=<code>";

const OTP_QUESTION: &str = "Enter one-time password:";

type RequiredFuture = Shared<BoxFuture<'static, bool>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-session two-factor state
///
/// States derived with [`OtpState::with_requirement`] share one token store,
/// so an answer typed for one of them serves all of them.
pub struct OtpState {
    token: Arc<Mutex<Option<SecretString>>>,
    is_required: Mutex<RequiredFuture>,
}

impl OtpState {
    /// State whose requirement is decided by `is_required`.
    ///
    /// The future runs at most once, the first time anyone asks.
    pub fn new<F>(is_required: F) -> Self
    where
        F: Future<Output = bool> + Send + 'static,
    {
        Self {
            token: Arc::new(Mutex::new(None)),
            is_required: Mutex::new(is_required.boxed().shared()),
        }
    }

    /// State sharing this one's token, with its own known requirement
    pub fn with_requirement(&self, required: bool) -> Self {
        Self {
            token: Arc::clone(&self.token),
            is_required: Mutex::new(futures::future::ready(required).boxed().shared()),
        }
    }

    /// State with an already known requirement
    pub fn known(required: bool) -> Self {
        Self::new(futures::future::ready(required))
    }

    /// State seeded with an operator-supplied token
    pub fn with_token(token: impl Into<String>) -> Self {
        let state = Self::known(true);
        state.set_token(token);
        state
    }

    pub async fn is_required(&self) -> bool {
        let required = lock(&self.is_required).clone();
        required.await
    }

    /// Record that the registry demanded an OTP. Never reverts.
    pub fn mark_required(&self) {
        *lock(&self.is_required) = futures::future::ready(true).boxed().shared();
    }

    pub fn token(&self) -> Option<String> {
        lock(&self.token)
            .as_ref()
            .map(|t| t.expose_secret().to_string())
    }

    pub fn has_token(&self) -> bool {
        lock(&self.token).is_some()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let token: String = token.into();
        *lock(&self.token) = Some(SecretString::new(token.into()));
    }

    /// Forget a token the registry rejected, forcing a new prompt
    pub fn clear_token(&self) {
        *lock(&self.token) = None;
    }
}

impl std::fmt::Debug for OtpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpState")
            .field("has_token", &self.has_token())
            .finish_non_exhaustive()
    }
}

/// Current OTP, prompting the operator when none is known.
///
/// Prompts run under `gate` (a single slot), and the token is checked again
/// once admitted, so concurrent callers that all miss a token share one
/// prompt and its answer.
pub async fn get_otp_code(
    state: &OtpState,
    gate: &ConcurrencyGate,
    prompter: &dyn OtpPrompter,
) -> Result<String, PublishError> {
    if let Some(token) = state.token() {
        return Ok(token);
    }

    gate.run(|| async {
        if let Some(token) = state.token() {
            return Ok(token);
        }

        log::info!("This operation requires a one-time password from your authenticator.");
        let answer = prompter.ask(OTP_QUESTION).await?;
        let answer = answer.trim().to_string();
        state.set_token(answer.clone());
        Ok::<_, PublishError>(answer)
    })
    .await
}

/// Ask npm whether the logged-in account has 2FA enabled for writes.
///
/// Any failure resolves to `false`; the publish itself will report EOTP if
/// the guess was wrong, and the retry protocol takes over from there.
pub async fn get_token_is_required(
    runner: Arc<dyn CommandRunner>,
    registry_override: Option<String>,
) -> bool {
    let invocation = Invocation::new("npm", ["profile", "get", "--json"]).env(
        REGISTRY_ENV_VAR,
        resolve_registry(None, registry_override.as_deref()),
    );

    let output = match runner.run(&invocation).await {
        Ok(output) => output,
        Err(e) => {
            log::error!("error while checking if token is required: {}", e);
            return false;
        }
    };

    if output.code != Some(0) {
        let message = if output.stderr.trim().is_empty() {
            output.stdout.trim()
        } else {
            output.stderr.trim()
        };
        log::error!("error while checking if token is required: {}", message);
        return false;
    }

    let profile = match parse_json_output(&output.stdout, "npm profile get") {
        Ok(profile) => profile,
        Err(e) => {
            log::error!("{}", e);
            return false;
        }
    };

    if profile.get("error").is_some_and(|e| !e.is_null()) {
        return false;
    }

    profile
        .get("tfa")
        .and_then(|tfa| tfa.get("mode"))
        .and_then(|mode| mode.as_str())
        .is_some_and(|mode| mode == "auth-and-writes")
}

/// Mask a secret for safe logging
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }

    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Render arguments with the value after `--otp` masked
pub fn redact_args(args: &[String]) -> String {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;

    for arg in args {
        if mask_next {
            redacted.push(mask_token(arg));
            mask_next = false;
        } else if let Some(value) = arg.strip_prefix("--otp=") {
            redacted.push(format!("--otp={}", mask_token(value)));
        } else {
            mask_next = arg == OTP_FLAG;
            redacted.push(arg.clone());
        }
    }

    redacted.join(" ")
}

/// Prompts on the controlling terminal
///
/// One reader is kept for the whole session; lines buffered past an answer
/// stay available to the next prompt when stdin is a pipe.
#[derive(Debug)]
pub struct TerminalPrompter<R = Stdin> {
    reader: tokio::sync::Mutex<BufReader<R>>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::from_reader(io::stdin())
    }
}

impl<R: AsyncRead> TerminalPrompter<R> {
    /// Prompter answering from `reader` instead of stdin
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: tokio::sync::Mutex::new(BufReader::new(reader)),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R> OtpPrompter for TerminalPrompter<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn ask(&self, question: &str) -> Result<String, PublishError> {
        let mut reader = self.reader.lock().await;

        let mut stdout = io::stdout();
        stdout
            .write_all(format!("{} ", question).as_bytes())
            .await
            .map_err(|e| PublishError::Prompt(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| PublishError::Prompt(e.to_string()))?;

        let mut answer = String::new();
        let read = reader
            .read_line(&mut answer)
            .await
            .map_err(|e| PublishError::Prompt(e.to_string()))?;

        if read == 0 {
            return Err(PublishError::Prompt("stdin closed".to_string()));
        }

        Ok(answer.trim().to_string())
    }
}
