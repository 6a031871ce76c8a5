//! Run command: schedule the message for every contact and deliver on time.
//!
//! Pipeline: open the store, migrate legacy JSON contacts if the store is
//! empty, validate contacts, wait for the gateway, schedule one job per
//! recipient, then park until ctrl-c and cancel whatever is still pending.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use miette::Result;
use tracing::{info, warn};

use herald_delivery::{HttpGatewayTransport, MessageSender, Transport};
use herald_scheduler::{Contact, JobCallback, Scheduler, SendTarget, TimeResolver};
use herald_store::{ContactStore, load_contacts_file, validate_contacts};

/// Default message body when neither the CLI nor the store provides one.
const DEFAULT_MESSAGE: &str = "Happy New Year 2026! 🎉";

/// How long to wait for the gateway to become ready.
const GATEWAY_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a delivery run.
pub struct RunConfig {
    pub message: Option<String>,
    pub target_date: String,
    pub target_time: String,
    pub gateway_url: String,
    pub db_path: PathBuf,
    pub contacts_json: PathBuf,
    pub test_mode: bool,
    pub test_delay_seconds: u64,
    pub interactive: bool,
}

pub async fn run(config: RunConfig) -> Result<()> {
    info!("herald starting");
    if config.test_mode {
        info!(
            delay_secs = config.test_delay_seconds,
            "test mode enabled, messages fire shortly after startup"
        );
    }

    let store = crate::open_store(&config.db_path)?;
    migrate_legacy_contacts(&store, &config.contacts_json);

    // Interactive runs pick their recipients in the menu; batch runs take
    // every stored contact.
    let selected = if config.interactive {
        match crate::menu::show_main_menu(&store)? {
            Some(selection) => Some(selection),
            None => {
                info!("no recipients selected, exiting");
                return Ok(());
            }
        }
    } else {
        None
    };

    let contacts = match selected {
        Some(selection) => selection,
        None => store.all_contacts().map_err(|e| miette::miette!("{}", e))?,
    };

    let (valid, invalid) = validate_contacts(&contacts);
    if !invalid.is_empty() {
        warn!(count = invalid.len(), "skipping invalid contacts");
    }
    if valid.is_empty() {
        return Err(miette::miette!(
            "no valid contacts found; add contacts with `herald menu` first"
        ));
    }
    info!(count = valid.len(), "loaded contacts");

    let message = resolve_message(&store, config.message.clone());
    let target = SendTarget::parse(&config.target_date, &config.target_time)
        .map_err(|e| miette::miette!("{}", e))?;
    let resolver = if config.test_mode {
        TimeResolver::with_test_mode(target, config.test_delay_seconds)
    } else {
        TimeResolver::new(target)
    };

    // The gateway owns the messaging session; nothing may be delivered
    // before it reports ready.
    let transport = Arc::new(HttpGatewayTransport::new(&config.gateway_url));
    info!(url = %config.gateway_url, "waiting for gateway");
    transport
        .wait_ready(GATEWAY_READY_TIMEOUT)
        .await
        .map_err(|e| miette::miette!("gateway never became ready: {}", e))?;
    info!("gateway ready");

    let sender = Arc::new(MessageSender::new(
        Arc::clone(&transport) as Arc<dyn Transport>
    ));

    let scheduler = Scheduler::new(resolver);
    let message = Arc::new(message);
    let mut scheduled = 0usize;
    for contact in valid {
        match scheduler
            .schedule_message(contact, delivery_callback(&sender, &message))
            .await
        {
            Ok(_) => scheduled += 1,
            // One bad recipient never blocks the rest of the batch.
            Err(e) => warn!(error = %e, "failed to schedule contact"),
        }
    }
    info!(scheduled, "scheduled messages");

    print_schedule_summary(&scheduler).await;

    info!("herald running, press ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    info!("shutting down, cancelling pending jobs");
    scheduler.cancel_all_schedules().await;
    info!("shutdown complete");
    Ok(())
}

/// Build the delivery callback for one recipient.
fn delivery_callback(sender: &Arc<MessageSender>, message: &Arc<String>) -> JobCallback {
    let sender = Arc::clone(sender);
    let message = Arc::clone(message);
    Arc::new(move |contact: Contact| {
        let sender = Arc::clone(&sender);
        let message = Arc::clone(&message);
        Box::pin(async move { sender.send_message(&contact, &message).await })
    })
}

/// Message precedence: CLI/env override, then the stored custom message,
/// then the built-in default.
fn resolve_message(store: &ContactStore, override_message: Option<String>) -> String {
    if let Some(message) = override_message {
        return message;
    }
    match store.latest_custom_message() {
        Ok(Some(custom)) => custom.message,
        Ok(None) => DEFAULT_MESSAGE.to_string(),
        Err(e) => {
            warn!(error = %e, "failed to read custom message, using default");
            DEFAULT_MESSAGE.to_string()
        }
    }
}

/// One legacy `contacts.json` import, only when the store is empty.
fn migrate_legacy_contacts(store: &ContactStore, contacts_json: &std::path::Path) {
    match store.has_contacts() {
        Ok(true) => return,
        Ok(false) => {}
        Err(e) => {
            warn!(error = %e, "failed to check store, skipping migration");
            return;
        }
    }
    if !contacts_json.exists() {
        return;
    }

    match load_contacts_file(contacts_json).and_then(|file| store.import_contacts(&file)) {
        Ok(imported) => info!(
            imported,
            path = %contacts_json.display(),
            "migrated legacy contacts into store"
        ),
        Err(e) => warn!(error = %e, "failed to migrate legacy contacts"),
    }
}

/// Print a human-readable summary of every pending job, localized to each
/// recipient's timezone.
async fn print_schedule_summary(scheduler: &Scheduler) {
    let mut schedules = scheduler.active_schedules().await;
    schedules.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));

    println!();
    println!("{}", "=".repeat(72));
    println!("SCHEDULED MESSAGES");
    println!("{}", "=".repeat(72));

    for (index, job) in schedules.iter().enumerate() {
        let local = match job.contact.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => job
                .fire_at
                .with_timezone(&tz)
                .format("%Y-%m-%d %H:%M:%S %Z")
                .to_string(),
            Err(_) => job.fire_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        };

        println!("{}. {}", index + 1, job.contact.display_name());
        println!("   Phone:     {}", job.contact.phone_number);
        println!("   Timezone:  {}", job.contact.timezone);
        println!("   Scheduled: {local}");
    }

    println!("{}", "=".repeat(72));
    println!();
}
