//! Duplicate Download Detection
//!
//! Decides whether a reported download is a file that was already seen and
//! registers it when it is not:
//! - ordered metadata cascade (etag + length, origin URL, file name)
//! - SHA-256 content hash identity, computed from the local file when needed
//! - advisory per-user daily quota
//!
//! Flow for a log request:
//! 1. Quota is evaluated (a breach is only logged)
//! 2. The metadata cascade runs; a hit returns the existing record
//! 3. The content hash is taken from the request or the local file
//! 4. A hash hit returns the existing record
//! 5. Otherwise a new record is inserted; a concurrent insert of the same
//!    hash is resolved by re-reading the winner

pub mod fingerprint;
pub mod quota;
pub mod registration;
pub mod resolver;
pub mod service;
pub mod store;
pub mod types;

pub use fingerprint::{Fingerprint, Fingerprinter};
pub use quota::{QuotaAccountant, QuotaStatus};
pub use registration::RegistrationWorkflow;
pub use resolver::{strip_copy_suffix, DuplicateResolver};
pub use service::DeduplicationService;
pub use store::{RecordStore, SqliteRecordStore};
pub use types::*;
