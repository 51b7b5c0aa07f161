//! Operator session state.
//!
//! The session is one of three states. Scanning carries a [`ScanHandle`] whose
//! stop flag is the only channel into a running scan loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::OperatorConfig;
use crate::error::{Error, Result};

/// Where the operator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Login screen.
    LoggedOut,
    /// Logged in, camera idle.
    Idle,
    /// A scan loop is running.
    Scanning,
}

impl SessionState {
    /// Human-readable state name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged out",
            Self::Idle => "idle",
            Self::Scanning => "scanning",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cloneable stop flag shared with a running scan loop.
#[derive(Debug, Clone, Default)]
pub struct ScanHandle {
    stop_signal: Arc<AtomicBool>,
}

impl ScanHandle {
    /// Create a handle with the stop flag cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the scan loop to stop.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Clear the stop signal.
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }
}

/// Operator session.
#[derive(Debug)]
pub struct Session {
    username: blake3::Hash,
    password: blake3::Hash,
    state: SessionState,
    handle: ScanHandle,
    last_scanned: Option<String>,
}

impl Session {
    /// Create a logged-out session accepting the given operator account.
    #[must_use]
    pub fn new(operator: &OperatorConfig) -> Self {
        Self {
            username: blake3::hash(operator.username.as_bytes()),
            password: blake3::hash(operator.password.as_bytes()),
            state: SessionState::LoggedOut,
            handle: ScanHandle::new(),
            last_scanned: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identifier from the most recent completed scan.
    #[must_use]
    pub fn last_scanned(&self) -> Option<&str> {
        self.last_scanned.as_deref()
    }

    fn require(&self, expected: SessionState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                action,
                state: self.state.as_str(),
            })
        }
    }

    /// Log in with an exact username/password match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] on a mismatch, or
    /// [`Error::InvalidTransition`] if already logged in.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.require(SessionState::LoggedOut, "log in")?;

        // blake3::Hash equality is constant-time
        let user_ok = blake3::hash(username.as_bytes()) == self.username;
        let pass_ok = blake3::hash(password.as_bytes()) == self.password;
        if !(user_ok & pass_ok) {
            warn!("Rejected login attempt");
            return Err(Error::InvalidCredentials);
        }

        info!("Operator logged in");
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Enter scanning and hand out the stop handle for the new loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the session is idle.
    pub fn start_scan(&mut self) -> Result<ScanHandle> {
        self.require(SessionState::Idle, "start scanning")?;
        self.handle.reset();
        self.state = SessionState::Scanning;
        debug!("Scan started");
        Ok(self.handle.clone())
    }

    /// Ask the running loop to stop and return to idle right away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless a scan is running.
    pub fn request_stop(&mut self) -> Result<()> {
        self.require(SessionState::Scanning, "stop scanning")?;
        self.handle.stop();
        self.state = SessionState::Idle;
        debug!("Scan stop requested");
        Ok(())
    }

    /// Record the loop's result.
    ///
    /// Legal after the loop returned on its own (still scanning) or after a
    /// stop request already moved the session to idle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] when logged out.
    pub fn finish_scan(&mut self, scanned: Option<String>) -> Result<()> {
        if self.state == SessionState::LoggedOut {
            return Err(Error::InvalidTransition {
                action: "finish scanning",
                state: self.state.as_str(),
            });
        }
        if scanned.is_some() {
            self.last_scanned = scanned;
        }
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Log out, stopping any running scan.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if already logged out.
    pub fn logout(&mut self) -> Result<()> {
        if self.state == SessionState::LoggedOut {
            return Err(Error::InvalidTransition {
                action: "log out",
                state: self.state.as_str(),
            });
        }
        self.handle.stop();
        self.last_scanned = None;
        self.state = SessionState::LoggedOut;
        info!("Operator logged out");
        Ok(())
    }
}
