//! Contact storage for Herald.
//!
//! SQLite-backed store for recipients, the customized message, and run
//! settings, plus JSON import with per-contact validation. The store is the
//! sole source of truth for which recipients a run schedules.

mod db;
mod error;
mod import;
mod store;

pub use error::StoreError;
pub use import::{ContactsFile, InvalidContact, load_contacts_file, validate_contacts};
pub use store::{ContactStore, ContactUpdate, CustomMessage};
