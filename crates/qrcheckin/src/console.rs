//! Interactive operator console.
//!
//! Two screens: the login form and the scan screen with its result panel.
//! Input is read line by line. While a scan runs, any line stops it; end of
//! input waits for the scan to finish.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::task::JoinError;
use tracing::{debug, error};

use crate::attendee::{Attendee, CheckInOutcome};
use crate::checkin::CheckIn;
use crate::error::{Error, Result};
use crate::scanner::{DecodedCode, Scanner};
use crate::session::{Session, SessionState};

/// Builds a fresh scanner for each scan. Runs on a blocking thread, so it may
/// open devices.
pub type ScannerFactory = Arc<dyn Fn() -> Result<Scanner> + Send + Sync>;

/// Reads a password without echoing it. Called on a blocking thread with the
/// prompt label.
pub type PasswordReader = Arc<dyn Fn(&str) -> std::io::Result<String> + Send + Sync>;

/// Masked password entry on the controlling terminal.
#[must_use]
pub fn terminal_password_reader() -> PasswordReader {
    Arc::new(|prompt: &str| {
        dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(std::io::Error::other)
    })
}

enum ScanEvent {
    Finished(std::result::Result<Result<Option<DecodedCode>>, JoinError>),
    Input(std::io::Result<Option<String>>),
}

/// The operator console.
pub struct Console<R, W> {
    session: Session,
    checkin: CheckIn,
    scanners: ScannerFactory,
    passwords: Option<PasswordReader>,
    input: Lines<R>,
    output: W,
}

impl<R, W> std::fmt::Debug for Console<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("session", &self.session)
            .field("checkin", &self.checkin)
            .field("masked_password", &self.passwords.is_some())
            .finish_non_exhaustive()
    }
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a console reading operator input from `input`.
    pub fn new(
        session: Session,
        checkin: CheckIn,
        scanners: ScannerFactory,
        input: R,
        output: W,
    ) -> Self {
        Self {
            session,
            checkin,
            scanners,
            passwords: None,
            input: input.lines(),
            output,
        }
    }

    /// Read the password through `reader` instead of the input lines.
    #[must_use]
    pub fn with_password_reader(mut self, reader: PasswordReader) -> Self {
        self.passwords = Some(reader);
        self
    }

    /// The session as it currently stands.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Give back the output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        self.output.write_all(label.as_bytes()).await?;
        self.output.flush().await?;
        Ok(self.input.next_line().await?)
    }

    /// Run until the operator quits or input ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let keep_going = match self.session.state() {
                SessionState::LoggedOut => self.login_screen().await?,
                SessionState::Idle | SessionState::Scanning => self.scan_screen().await?,
            };
            if !keep_going {
                debug!("Console closed");
                return Ok(());
            }
        }
    }

    async fn login_screen(&mut self) -> Result<bool> {
        self.say("\n=== QR Check-in: Login ===").await?;
        let Some(username) = self.prompt("Username: ").await? else {
            return Ok(false);
        };
        let Some(password) = self.read_password().await? else {
            return Ok(false);
        };

        match self.session.login(&username, &password) {
            Ok(()) => self.say("Logged in.").await?,
            Err(Error::InvalidCredentials) => self.say("Invalid credentials").await?,
            Err(e) => return Err(e),
        }
        Ok(true)
    }

    async fn read_password(&mut self) -> Result<Option<String>> {
        let Some(reader) = self.passwords.clone() else {
            return self.prompt("Password: ").await;
        };
        let password = tokio::task::spawn_blocking(move || reader("Password"))
            .await
            .map_err(|e| Error::internal(format!("password prompt failed: {e}")))??;
        Ok(Some(password))
    }

    async fn scan_screen(&mut self) -> Result<bool> {
        let start = if self.session.last_scanned().is_some() {
            "Scan Again"
        } else {
            "Start Scanning"
        };
        self.say(&format!(
            "\n=== QR Check-in ===\n[Enter/s] {start}   [l] Logout   [q] Quit"
        ))
        .await?;

        let Some(choice) = self.prompt("> ").await? else {
            return Ok(false);
        };
        match choice.trim().to_ascii_lowercase().as_str() {
            "" | "s" => self.scan().await?,
            "l" => {
                self.session.logout()?;
                self.say("Logged out.").await?;
            }
            "q" => return Ok(false),
            other => self.say(&format!("Unknown option {other:?}")).await?,
        }
        Ok(true)
    }

    async fn scan(&mut self) -> Result<()> {
        let handle = self.session.start_scan()?;
        self.say("Scanning... press Enter to stop.").await?;

        let scanners = Arc::clone(&self.scanners);
        let loop_handle = handle.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            let mut scanner = scanners()?;
            scanner.run(&loop_handle)
        });

        let mut listening = true;
        let joined = loop {
            let event = tokio::select! {
                joined = &mut task => ScanEvent::Finished(joined),
                line = self.input.next_line(), if listening => ScanEvent::Input(line),
            };
            match event {
                ScanEvent::Finished(joined) => break joined,
                ScanEvent::Input(Ok(Some(_))) => {
                    self.session.request_stop()?;
                    listening = false;
                    self.say("Stopping scan...").await?;
                }
                ScanEvent::Input(Ok(None)) => listening = false,
                ScanEvent::Input(Err(e)) => {
                    handle.stop();
                    return Err(e.into());
                }
            }
        };
        let result = joined.map_err(|e| Error::internal(format!("scan task failed: {e}")))?;

        match result {
            Ok(Some(code)) => {
                self.session.finish_scan(Some(code.payload.clone()))?;
                self.say(&format!("QR Code Detected: {}", code.payload))
                    .await?;
                self.check_in(&code.payload).await
            }
            Ok(None) => {
                self.session.finish_scan(None)?;
                self.say("Scan stopped.").await
            }
            Err(e) => {
                self.session.finish_scan(None)?;
                error!(error = %e, "Scan failed");
                let message = match e {
                    Error::CameraUnavailable(_) => "Could not open camera".to_string(),
                    Error::FrameRead(_) => "Failed to capture video".to_string(),
                    other => format!("Scan failed: {other}"),
                };
                self.say(&message).await
            }
        }
    }

    async fn check_in(&mut self, id: &str) -> Result<()> {
        match self.checkin.check_in(id).await {
            Ok(CheckInOutcome::Entered { attendee, .. }) => {
                self.show_attendee(&attendee).await?;
                self.say("Entry Marked!").await
            }
            Ok(CheckInOutcome::AlreadyEntered { attendee, at }) => {
                self.show_attendee(&attendee).await?;
                self.say(&format!("Already scanned at {at}")).await
            }
            Ok(CheckInOutcome::NotFound { .. }) => self.say("No Entry Found! 404").await,
            Err(e) => {
                error!(error = %e, id, "Check-in failed");
                self.say(&format!("Check-in failed: {e}")).await
            }
        }
    }

    async fn show_attendee(&mut self, attendee: &Attendee) -> Result<()> {
        self.say(&format!(
            "Name: {}\nRegistration: {}",
            attendee.name, attendee.registration
        ))
        .await
    }
}
