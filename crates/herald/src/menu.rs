//! Interactive menu for contact and message management.
//!
//! Mirrors the store's CRUD surface: view/add/edit/delete contacts,
//! customize the message, import JSON, and pick recipients for a send.
//! Selection is handed back to the run pipeline as an explicit value.

use miette::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use herald_scheduler::Contact;
use herald_store::{ContactStore, ContactUpdate, load_contacts_file};

/// Common timezones offered before falling back to a search.
const COMMON_TIMEZONES: &[&str] = &[
    "Asia/Kolkata",
    "America/New_York",
    "America/Los_Angeles",
    "Europe/London",
    "Europe/Paris",
    "Australia/Sydney",
];

/// Show the main menu until the operator picks recipients or exits.
///
/// Returns the selected contacts for a send, or `None` when the operator
/// exits without sending.
pub fn show_main_menu(store: &ContactStore) -> Result<Option<Vec<Contact>>> {
    let mut rl = DefaultEditor::new().map_err(|e| miette::miette!("{}", e))?;

    loop {
        print_header(store);
        println!("  1. Send messages");
        println!("  2. View saved contacts");
        println!("  3. Add new contact");
        println!("  4. Edit contact");
        println!("  5. Delete contact");
        println!("  6. Customize message");
        println!("  7. Import from JSON");
        println!("  8. Exit");
        println!();

        match prompt(&mut rl, "Choose an action [1-8]: ")?.as_deref() {
            Some("1") => {
                if let Some(selection) = send_menu(&mut rl, store)? {
                    return Ok(Some(selection));
                }
            }
            Some("2") => view_contacts(store)?,
            Some("3") => add_contact(&mut rl, store)?,
            Some("4") => edit_contact(&mut rl, store)?,
            Some("5") => delete_contact(&mut rl, store)?,
            Some("6") => customize_message(&mut rl, store)?,
            Some("7") => import_json(&mut rl, store)?,
            Some("8") | None => return Ok(None),
            Some(other) => println!("Unknown choice: {other}"),
        }
    }
}

fn print_header(store: &ContactStore) {
    let count = store.contact_count().unwrap_or(0);
    let message = store
        .latest_custom_message()
        .ok()
        .flatten()
        .map(|m| m.message)
        .unwrap_or_else(|| "(default)".to_string());

    println!();
    println!("{}", "=".repeat(60));
    println!("  Herald message scheduler");
    println!("  Saved contacts: {count}");
    println!("  Current message: {}", truncate(&message, 40));
    println!("{}", "=".repeat(60));
}

/// Pick recipients for a send: everyone, or a subset by number.
/// Returns `None` when the operator backs out.
fn send_menu(rl: &mut DefaultEditor, store: &ContactStore) -> Result<Option<Vec<Contact>>> {
    let contacts = store.all_contacts().map_err(|e| miette::miette!("{}", e))?;
    if contacts.is_empty() {
        println!("No contacts saved. Add contacts first.");
        return Ok(None);
    }

    println!("\nSend to:");
    println!("  1. All contacts");
    println!("  2. Select specific contacts");

    let selected = match prompt(rl, "Choose [1-2]: ")?.as_deref() {
        Some("1") => contacts,
        Some("2") => {
            print_contact_list(&contacts);
            let input = match prompt(rl, "Contact numbers (comma-separated): ")? {
                Some(input) => input,
                None => return Ok(None),
            };
            let picked = parse_selection(&input, contacts.len());
            if picked.is_empty() {
                println!("No contacts selected.");
                return Ok(None);
            }
            picked.into_iter().map(|i| contacts[i].clone()).collect()
        }
        _ => return Ok(None),
    };

    println!("\nSend summary: {} contact(s)", selected.len());
    for contact in &selected {
        println!(
            "  - {}: {} ({})",
            contact.display_name(),
            contact.phone_number,
            contact.timezone
        );
    }

    if confirm(rl, "Ready to send?")? {
        Ok(Some(selected))
    } else {
        Ok(None)
    }
}

fn view_contacts(store: &ContactStore) -> Result<()> {
    let contacts = store.all_contacts().map_err(|e| miette::miette!("{}", e))?;
    println!("\nSAVED CONTACTS");
    if contacts.is_empty() {
        println!("  (none yet)");
    } else {
        print_contact_list(&contacts);
    }
    Ok(())
}

fn add_contact(rl: &mut DefaultEditor, store: &ContactStore) -> Result<()> {
    println!("\nADD NEW CONTACT");

    let phone = loop {
        let input = match prompt(rl, "Phone number (country code + number): ")? {
            Some(input) => input,
            None => return Ok(()),
        };
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        if (10..=15).contains(&digits.len()) {
            break digits;
        }
        println!("Please enter a valid phone number (10-15 digits).");
    };

    let name = prompt(rl, "Name (optional): ")?.filter(|n| !n.is_empty());
    let timezone = match pick_timezone(rl)? {
        Some(tz) => tz,
        None => return Ok(()),
    };

    if store
        .contact_exists(&phone)
        .map_err(|e| miette::miette!("{}", e))?
    {
        println!("Contact with phone {phone} already exists.");
        return Ok(());
    }

    let contact = Contact {
        phone_number: phone,
        timezone,
        name,
    };
    if store
        .add_contact(&contact)
        .map_err(|e| miette::miette!("{}", e))?
    {
        println!("Contact added.");
    } else {
        println!("Failed to add contact.");
    }
    Ok(())
}

fn edit_contact(rl: &mut DefaultEditor, store: &ContactStore) -> Result<()> {
    let Some(contact) = pick_contact(rl, store, "edit")? else {
        return Ok(());
    };

    let new_name = prompt(
        rl,
        &format!("Name (current: {}): ", contact.name.as_deref().unwrap_or("-")),
    )?;
    let keep_tz = format!("Timezone (current: {}, blank to keep): ", contact.timezone);
    let new_timezone = match prompt(rl, &keep_tz)? {
        Some(input) if !input.is_empty() => match input.parse::<chrono_tz::Tz>() {
            Ok(tz) => Some(tz.name().to_string()),
            Err(_) => {
                println!("Invalid timezone: {input}");
                return Ok(());
            }
        },
        _ => None,
    };

    let update = ContactUpdate {
        phone_number: None,
        timezone: new_timezone,
        name: new_name.map(|n| if n.is_empty() { None } else { Some(n) }),
    };

    if store
        .update_contact(&contact.phone_number, &update)
        .map_err(|e| miette::miette!("{}", e))?
    {
        println!("Contact updated.");
    } else {
        println!("Nothing to update.");
    }
    Ok(())
}

fn delete_contact(rl: &mut DefaultEditor, store: &ContactStore) -> Result<()> {
    let Some(contact) = pick_contact(rl, store, "delete")? else {
        return Ok(());
    };

    let question = format!(
        "Delete {} ({})? This cannot be undone.",
        contact.display_name(),
        contact.phone_number
    );
    if !confirm(rl, &question)? {
        println!("Delete cancelled.");
        return Ok(());
    }

    if store
        .delete_contact(&contact.phone_number)
        .map_err(|e| miette::miette!("{}", e))?
    {
        println!("Contact deleted.");
    } else {
        println!("Contact was already gone.");
    }
    Ok(())
}

fn customize_message(rl: &mut DefaultEditor, store: &ContactStore) -> Result<()> {
    println!("\nCUSTOMIZE MESSAGE");
    if let Ok(Some(current)) = store.latest_custom_message() {
        println!("Current: \"{}\" ({})", current.message, current.target_date);
    }

    let Some(message) = prompt(rl, "Message: ")?.filter(|m| !m.is_empty()) else {
        return Ok(());
    };
    let target_date = loop {
        let input = match prompt(rl, "Target date (YYYY-MM-DD): ")? {
            Some(input) => input,
            None => return Ok(()),
        };
        if chrono::NaiveDate::parse_from_str(&input, "%Y-%m-%d").is_ok() {
            break input;
        }
        println!("Please enter a date as YYYY-MM-DD.");
    };

    store
        .save_custom_message(&message, &target_date)
        .map_err(|e| miette::miette!("{}", e))?;
    println!("Message saved.");
    Ok(())
}

fn import_json(rl: &mut DefaultEditor, store: &ContactStore) -> Result<()> {
    let Some(path) = prompt(rl, "Path to JSON file [data/contacts.json]: ")? else {
        return Ok(());
    };
    let path = if path.is_empty() {
        "data/contacts.json".to_string()
    } else {
        path
    };

    match load_contacts_file(&path).and_then(|file| store.import_contacts(&file)) {
        Ok(imported) => println!("Imported {imported} contact(s)."),
        Err(e) => println!("Import failed: {e}"),
    }
    Ok(())
}

/// Offer the common timezones, or search the full IANA list.
fn pick_timezone(rl: &mut DefaultEditor) -> Result<Option<String>> {
    println!("Select timezone:");
    for (index, tz) in COMMON_TIMEZONES.iter().enumerate() {
        println!("  {}. {}", index + 1, tz);
    }
    println!("  {}. Search...", COMMON_TIMEZONES.len() + 1);

    let Some(input) = prompt(rl, "Choose: ")? else {
        return Ok(None);
    };
    if let Ok(index) = input.parse::<usize>()
        && (1..=COMMON_TIMEZONES.len()).contains(&index)
    {
        return Ok(Some(COMMON_TIMEZONES[index - 1].to_string()));
    }

    let Some(query) = prompt(rl, "Search timezone (e.g. Tokyo, Berlin): ")? else {
        return Ok(None);
    };
    let query = query.to_lowercase();
    let matches: Vec<&str> = chrono_tz::TZ_VARIANTS
        .iter()
        .map(|tz| tz.name())
        .filter(|name| name.to_lowercase().contains(&query))
        .take(10)
        .collect();

    if matches.is_empty() {
        println!("No timezones found, using UTC.");
        return Ok(Some("UTC".to_string()));
    }

    for (index, name) in matches.iter().enumerate() {
        println!("  {}. {}", index + 1, name);
    }
    let Some(choice) = prompt(rl, "Choose: ")? else {
        return Ok(None);
    };
    match choice.parse::<usize>() {
        Ok(index) if (1..=matches.len()).contains(&index) => {
            Ok(Some(matches[index - 1].to_string()))
        }
        _ => {
            println!("Invalid choice, using UTC.");
            Ok(Some("UTC".to_string()))
        }
    }
}

/// Let the operator pick one contact by number.
fn pick_contact(
    rl: &mut DefaultEditor,
    store: &ContactStore,
    verb: &str,
) -> Result<Option<Contact>> {
    let contacts = store.all_contacts().map_err(|e| miette::miette!("{}", e))?;
    if contacts.is_empty() {
        println!("No contacts to {verb}.");
        return Ok(None);
    }

    print_contact_list(&contacts);
    let Some(input) = prompt(rl, &format!("Contact number to {verb}: "))? else {
        return Ok(None);
    };
    match input.parse::<usize>() {
        Ok(index) if (1..=contacts.len()).contains(&index) => {
            Ok(Some(contacts[index - 1].clone()))
        }
        _ => {
            println!("Invalid choice.");
            Ok(None)
        }
    }
}

fn print_contact_list(contacts: &[Contact]) {
    for (index, contact) in contacts.iter().enumerate() {
        println!(
            "  {}. {}: {} ({})",
            index + 1,
            contact.display_name(),
            contact.phone_number,
            contact.timezone
        );
    }
}

/// Read one trimmed line. `None` means the operator hit ctrl-c/ctrl-d.
fn prompt(rl: &mut DefaultEditor, message: &str) -> Result<Option<String>> {
    match rl.readline(message) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn confirm(rl: &mut DefaultEditor, question: &str) -> Result<bool> {
    let answer = prompt(rl, &format!("{question} [y/N]: "))?;
    Ok(matches!(answer.as_deref(), Some("y") | Some("Y") | Some("yes")))
}

/// Parse a comma-separated list of 1-based indices, deduplicated, in order.
fn parse_selection(input: &str, len: usize) -> Vec<usize> {
    let mut seen = std::collections::HashSet::new();
    input
        .split(',')
        .filter_map(|part| part.trim().parse::<usize>().ok())
        .filter(|&n| n >= 1 && n <= len)
        .map(|n| n - 1)
        .filter(|&i| seen.insert(i))
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_parses_and_deduplicates() {
        assert_eq!(parse_selection("1, 3, 3, 2", 3), vec![0, 2, 1]);
        assert_eq!(parse_selection("0, 4, nope", 3), Vec::<usize>::new());
        assert_eq!(parse_selection("", 3), Vec::<usize>::new());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 40), "short");
        assert_eq!(truncate("ab🎉cd", 3), "ab🎉...");
    }
}
