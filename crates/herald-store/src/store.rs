//! Contact store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use herald_scheduler::Contact;

use crate::db::init_db;
use crate::{ContactsFile, StoreError};

/// The latest operator-customized message and its target date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomMessage {
    pub message: String,
    pub target_date: String,
}

/// Partial update for an existing contact. `None` fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub phone_number: Option<String>,
    pub timezone: Option<String>,
    pub name: Option<Option<String>>,
}

/// SQLite-backed store for contacts, custom messages, and settings.
pub struct ContactStore {
    conn: Connection,
}

impl ContactStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// All contacts, ordered by display name.
    pub fn all_contacts(&self) -> Result<Vec<Contact>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT phone_number, timezone, name FROM contacts ORDER BY name")?;
        let contacts = stmt
            .query_map([], |row| {
                Ok(Contact {
                    phone_number: row.get(0)?,
                    timezone: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contacts)
    }

    /// Insert a contact. Returns false if the phone number already exists.
    pub fn add_contact(&self, contact: &Contact) -> Result<bool, StoreError> {
        let result = self.conn.execute(
            "INSERT INTO contacts (phone_number, timezone, name) VALUES (?1, ?2, ?3)",
            params![contact.phone_number, contact.timezone, contact.name],
        );

        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a partial update to a contact. Returns false if the phone
    /// number is unknown or the update is empty.
    pub fn update_contact(
        &self,
        phone_number: &str,
        update: &ContactUpdate,
    ) -> Result<bool, StoreError> {
        let mut fields = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(phone) = &update.phone_number {
            fields.push("phone_number = ?");
            values.push(Box::new(phone.clone()));
        }
        if let Some(timezone) = &update.timezone {
            fields.push("timezone = ?");
            values.push(Box::new(timezone.clone()));
        }
        if let Some(name) = &update.name {
            fields.push("name = ?");
            values.push(Box::new(name.clone()));
        }

        if fields.is_empty() {
            return Ok(false);
        }

        values.push(Box::new(phone_number.to_string()));
        let sql = format!(
            "UPDATE contacts SET {} WHERE phone_number = ?",
            fields.join(", ")
        );
        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(changed > 0)
    }

    /// Delete a contact. Returns whether one existed.
    pub fn delete_contact(&self, phone_number: &str) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "DELETE FROM contacts WHERE phone_number = ?1",
            params![phone_number],
        )?;
        Ok(changed > 0)
    }

    /// Whether a contact with this phone number exists.
    pub fn contact_exists(&self, phone_number: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM contacts WHERE phone_number = ?1",
                params![phone_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Look up a single contact by phone number.
    pub fn contact_by_phone(&self, phone_number: &str) -> Result<Option<Contact>, StoreError> {
        let contact = self
            .conn
            .query_row(
                "SELECT phone_number, timezone, name FROM contacts WHERE phone_number = ?1",
                params![phone_number],
                |row| {
                    Ok(Contact {
                        phone_number: row.get(0)?,
                        timezone: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(contact)
    }

    /// Number of stored contacts.
    pub fn contact_count(&self) -> Result<u64, StoreError> {
        let count: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Whether any contacts are stored.
    pub fn has_contacts(&self) -> Result<bool, StoreError> {
        Ok(self.contact_count()? > 0)
    }

    /// The most recently saved custom message, if any.
    pub fn latest_custom_message(&self) -> Result<Option<CustomMessage>, StoreError> {
        let message = self
            .conn
            .query_row(
                "SELECT message, target_date FROM custom_messages
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                [],
                |row| {
                    Ok(CustomMessage {
                        message: row.get(0)?,
                        target_date: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(message)
    }

    /// Save a new custom message; becomes the latest.
    pub fn save_custom_message(&self, message: &str, target_date: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO custom_messages (message, target_date) VALUES (?1, ?2)",
            params![message, target_date],
        )?;
        Ok(())
    }

    /// Read a setting value.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a setting value, replacing any previous one.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Import contacts from a parsed contacts file, skipping duplicates.
    /// Returns how many were inserted.
    pub fn import_contacts(&self, file: &ContactsFile) -> Result<usize, StoreError> {
        let mut imported = 0;
        for contact in &file.contacts {
            if self.add_contact(contact)? {
                imported += 1;
            }
        }
        info!(imported, total = file.contacts.len(), "imported contacts");
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> ContactStore {
        ContactStore::open_in_memory().unwrap()
    }

    fn ada() -> Contact {
        Contact {
            phone_number: "15551234567".to_string(),
            timezone: "America/New_York".to_string(),
            name: Some("Ada".to_string()),
        }
    }

    #[test]
    fn add_and_fetch_contact() {
        let store = store();
        assert!(store.add_contact(&ada()).unwrap());

        let fetched = store.contact_by_phone("15551234567").unwrap().unwrap();
        assert_eq!(fetched, ada());
        assert!(store.contact_exists("15551234567").unwrap());
        assert!(!store.contact_exists("19990000000").unwrap());
    }

    #[test]
    fn duplicate_phone_number_is_rejected() {
        let store = store();
        assert!(store.add_contact(&ada()).unwrap());
        assert!(!store.add_contact(&ada()).unwrap());
        assert_eq!(store.contact_count().unwrap(), 1);
    }

    #[test]
    fn contacts_are_ordered_by_name() {
        let store = store();
        store
            .add_contact(&Contact {
                phone_number: "2".to_string(),
                timezone: "UTC".to_string(),
                name: Some("Zeno".to_string()),
            })
            .unwrap();
        store.add_contact(&ada()).unwrap();

        let names: Vec<_> = store
            .all_contacts()
            .unwrap()
            .into_iter()
            .map(|c| c.name.unwrap())
            .collect();
        assert_eq!(names, vec!["Ada".to_string(), "Zeno".to_string()]);
    }

    #[test]
    fn update_changes_only_given_fields() {
        let store = store();
        store.add_contact(&ada()).unwrap();

        let updated = store
            .update_contact(
                "15551234567",
                &ContactUpdate {
                    timezone: Some("Asia/Kolkata".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated);

        let contact = store.contact_by_phone("15551234567").unwrap().unwrap();
        assert_eq!(contact.timezone, "Asia/Kolkata");
        assert_eq!(contact.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn update_can_clear_name() {
        let store = store();
        store.add_contact(&ada()).unwrap();

        store
            .update_contact(
                "15551234567",
                &ContactUpdate {
                    name: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();

        let contact = store.contact_by_phone("15551234567").unwrap().unwrap();
        assert_eq!(contact.name, None);
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let store = store();
        store.add_contact(&ada()).unwrap();
        assert!(
            !store
                .update_contact("15551234567", &ContactUpdate::default())
                .unwrap()
        );
    }

    #[test]
    fn delete_contact_reports_existence() {
        let store = store();
        store.add_contact(&ada()).unwrap();

        assert!(store.delete_contact("15551234567").unwrap());
        assert!(!store.delete_contact("15551234567").unwrap());
        assert!(!store.has_contacts().unwrap());
    }

    #[test]
    fn latest_custom_message_wins() {
        let store = store();
        assert_eq!(store.latest_custom_message().unwrap(), None);

        store.save_custom_message("Happy New Year!", "2026-01-01").unwrap();
        store.save_custom_message("Happy 2027!", "2027-01-01").unwrap();

        let latest = store.latest_custom_message().unwrap().unwrap();
        assert_eq!(latest.message, "Happy 2027!");
        assert_eq!(latest.target_date, "2027-01-01");
    }

    #[test]
    fn settings_round_trip() {
        let store = store();
        assert_eq!(store.get_setting("gateway_url").unwrap(), None);

        store.set_setting("gateway_url", "http://localhost:3000").unwrap();
        store.set_setting("gateway_url", "http://gateway:3000").unwrap();
        assert_eq!(
            store.get_setting("gateway_url").unwrap().as_deref(),
            Some("http://gateway:3000")
        );
    }

    #[test]
    fn import_skips_duplicates() {
        let store = store();
        store.add_contact(&ada()).unwrap();

        let file = ContactsFile {
            contacts: vec![
                ada(),
                Contact::new("19998887777", "Europe/London"),
            ],
        };
        assert_eq!(store.import_contacts(&file).unwrap(), 1);
        assert_eq!(store.contact_count().unwrap(), 2);
    }

    #[test]
    fn store_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.db");

        {
            let store = ContactStore::open(&path).unwrap();
            store.add_contact(&ada()).unwrap();
        }

        let store = ContactStore::open(&path).unwrap();
        assert_eq!(store.contact_count().unwrap(), 1);
    }
}
