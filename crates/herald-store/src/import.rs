//! JSON contact import and validation.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use herald_scheduler::Contact;

use crate::StoreError;

/// International phone number: country code + number, 10-15 digits, no
/// leading zero.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]\d{9,14}$").expect("phone regex is valid"));

/// On-disk contact file: `{ "contacts": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactsFile {
    pub contacts: Vec<Contact>,
}

/// A contact rejected by validation, with the reason.
#[derive(Debug, Clone)]
pub struct InvalidContact {
    pub contact: Contact,
    pub reason: String,
}

/// Load and parse a contacts JSON file.
pub fn load_contacts_file(path: impl AsRef<Path>) -> Result<ContactsFile, StoreError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let file: ContactsFile = serde_json::from_str(&content)?;
    Ok(file)
}

/// Split contacts into schedulable ones and rejects with reasons.
///
/// A contact needs a well-formed phone number and a timezone that resolves
/// against the IANA database; anything else is skipped, never fatal.
pub fn validate_contacts(contacts: &[Contact]) -> (Vec<Contact>, Vec<InvalidContact>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for contact in contacts {
        match validate_contact(contact) {
            Ok(()) => valid.push(contact.clone()),
            Err(reason) => {
                warn!(
                    phone = %contact.phone_number,
                    reason = %reason,
                    "skipping invalid contact"
                );
                invalid.push(InvalidContact {
                    contact: contact.clone(),
                    reason,
                });
            }
        }
    }

    (valid, invalid)
}

fn validate_contact(contact: &Contact) -> Result<(), String> {
    if contact.phone_number.is_empty() {
        return Err("phone number is required".to_string());
    }
    if !PHONE_RE.is_match(&contact.phone_number) {
        return Err(
            "invalid phone number format (must be country code + number, 10-15 digits)"
                .to_string(),
        );
    }
    if contact.timezone.is_empty() {
        return Err("timezone is required".to_string());
    }
    if contact.timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(format!("invalid timezone: {}", contact.timezone));
    }
    Ok(())
}
