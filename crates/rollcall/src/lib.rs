//! `rollcall` - Event attendance registry backed by a flat CSV table
//!
//! This library provides the attendee table (lookup, registration with
//! duplicate-name prevention, payment confirmation) and the proof-of-payment
//! upload handler that feeds it.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod desk;
pub mod error;
pub mod logging;
pub mod record;
pub mod storage;
pub mod upload;

pub use config::Config;
pub use desk::RegistrationDesk;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{AttendeeRecord, AttendeeType, PaymentStatus};
pub use storage::{RecordStore, TableStats};
pub use upload::{ProofKind, UploadHandler};
