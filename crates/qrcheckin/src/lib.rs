//! `qrcheckin` - Event check-in by QR code
//!
//! This library provides the pieces behind the `qrcheckin` binary: the
//! operator session, the blocking scanner loop, attendee lookup and the entry
//! marker over a [`sheet::Worksheet`] (Google Sheets or a local database).

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod attendee;
pub mod checkin;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod scanner;
pub mod session;
pub mod sheet;
pub mod storage;

pub use attendee::{Attendee, CheckInOutcome, EntryMark};
pub use checkin::CheckIn;
pub use config::Config;
pub use console::Console;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use scanner::{DecodedCode, Scanner};
pub use session::{ScanHandle, Session, SessionState};
pub use sheet::{GoogleSheet, SheetLayout, Worksheet};
pub use storage::LocalSheet;
