use anyhow::Result;
use chrono::Duration;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use pillbox::core::Config;
use pillbox::database::Database;
use pillbox::features::adherence::AdherenceTracker;
use pillbox::features::conversation::{
    ConversationEngine, ConversationInput, ConversationReply, PRESET_TIMES,
};
use pillbox::features::notifications::LogDispatcher;
use pillbox::features::reminders::{timing, ReminderScheduler, SchedulerConfig};
use pillbox::features::timezone::detect_timezone_by_ip;
use pillbox::BotError;

/// Owner identity used for the console session. A chat transport would pass
/// its own user and channel ids instead.
const CONSOLE_USER: &str = "console";
const CONSOLE_CHAT: &str = "console";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting pillbox reminder engine...");

    let database = Database::new(&config.database_path).await?;

    let scheduler = Arc::new(ReminderScheduler::new(
        database.clone(),
        Arc::new(LogDispatcher),
        SchedulerConfig::from(&config),
    ));

    // Timers never survive a restart by themselves; rebuild them from the
    // database before accepting any input.
    scheduler.reconcile().await?;

    // Seed the console user's timezone on first contact, best effort.
    if database.get_user_timezone(CONSOLE_USER).await?.is_none() {
        if let Some(zone) = detect_timezone_by_ip().await {
            info!("Detected timezone {zone}");
            database.set_user_timezone(CONSOLE_USER, &zone).await?;
        }
    }

    let tracker = AdherenceTracker::new(database.clone(), scheduler.clone());
    let engine = ConversationEngine::new(database.clone(), scheduler.clone(), &config)?;

    println!("pillbox ready. Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();

        match command {
            "quit" | "exit" => break,
            "help" => print_help(),
            "status" => {
                println!(
                    "armed timers: {}, pending one-shots: {}",
                    scheduler.armed_timers(),
                    scheduler.pending_oneshots()
                );
            }
            "list" => {
                let reminders = database.list_reminders_for_user(CONSOLE_USER).await?;
                if reminders.is_empty() {
                    println!("📭 No reminders yet. Type `add` to create one.");
                }
                for r in reminders {
                    println!(
                        "#{} {} — {} ({}) streak {}",
                        r.id, r.label, r.time, r.timezone, r.streak
                    );
                }
            }
            "report" => {
                let zone_name = database
                    .get_user_timezone(CONSOLE_USER)
                    .await?
                    .unwrap_or_else(|| config.default_timezone.clone());
                let zone = timing::resolve_timezone(&zone_name)?;
                let today = timing::now_in(zone).date_naive();
                let occurrences = tracker.daily_report(CONSOLE_USER, today).await?;
                if occurrences.is_empty() {
                    println!("📋 Nothing scheduled today.");
                }
                for o in occurrences {
                    println!("{} — {} ({})", o.time, o.label, o.status);
                }
            }
            "tz" => match parts.next() {
                Some(zone) if timing::resolve_timezone(zone).is_ok() => {
                    database.set_user_timezone(CONSOLE_USER, zone).await?;
                    println!("✅ Timezone set to {zone}. New reminders will use it.");
                }
                Some(zone) => println!("❌ Unknown timezone: {zone}"),
                None => println!("Usage: tz <Area/City>"),
            },
            "took" => match parse_id(parts.next()) {
                Some(id) => match tracker.mark_taken(id).await {
                    Ok(streak) => println!("✅ Marked as taken. Streak: {streak} day(s)."),
                    Err(e) => report(e),
                },
                None => println!("Usage: took <id>"),
            },
            "snooze" => match parse_id(parts.next()) {
                Some(id) => {
                    let minutes = parse_id(parts.next()).unwrap_or(config.snooze_minutes);
                    match tracker.snooze(id, Duration::minutes(minutes)).await {
                        Ok(fire_at) => println!("⏰ Snoozed {minutes}m (until {fire_at})."),
                        Err(e) => report(e),
                    }
                }
                None => println!("Usage: snooze <id> [minutes]"),
            },
            "del" => match parse_id(parts.next()) {
                Some(id) => match tracker.delete(id).await {
                    Ok(()) => println!("🗑 Reminder deleted."),
                    Err(e) => report(e),
                },
                None => println!("Usage: del <id>"),
            },
            _ => {
                let input = decode_dialog_input(command, line);
                match engine.handle(CONSOLE_USER, CONSOLE_CHAT, input).await {
                    Ok(reply) => render(reply),
                    Err(e) => error!("Dialog turn failed: {e:#}"),
                }
            }
        }
    }

    info!("Shutting down");
    Ok(())
}

fn decode_dialog_input(command: &str, line: &str) -> ConversationInput {
    match command {
        "add" => ConversationInput::StartCreate,
        "cancel" => ConversationInput::Cancel,
        "custom" => ConversationInput::CustomTimeRequested,
        "daily" => ConversationInput::RecurrenceChoice(pillbox::Recurrence::Daily),
        "once" => ConversationInput::RecurrenceChoice(pillbox::Recurrence::Once),
        "pick" => {
            let time = line.split_whitespace().nth(1).unwrap_or_default();
            ConversationInput::PresetTime(time.to_string())
        }
        "edit-label" => match parse_id(line.split_whitespace().nth(1)) {
            Some(id) => ConversationInput::StartEditLabel(id),
            None => ConversationInput::Text(line.to_string()),
        },
        "edit-time" => match parse_id(line.split_whitespace().nth(1)) {
            Some(id) => ConversationInput::StartEditTime(id),
            None => ConversationInput::Text(line.to_string()),
        },
        _ => ConversationInput::Text(line.to_string()),
    }
}

fn render(reply: ConversationReply) {
    match reply {
        ConversationReply::PromptLabel => {
            println!("💊 What is the medication called? (e.g. Paracetamol)");
        }
        ConversationReply::PromptTime => {
            println!("⏰ Pick a time: `pick <HH:MM>` from {PRESET_TIMES:?}, or `custom`.");
        }
        ConversationReply::PromptCustomTime => {
            println!("🔢 Enter the time as HH:MM (e.g. 20:30).");
        }
        ConversationReply::PromptRecurrence => {
            println!("🔁 Repeat `daily` or fire `once`?");
        }
        ConversationReply::InvalidTime { expected } => {
            println!("❌ That doesn't look like a time. Expected {expected}.");
        }
        ConversationReply::InvalidLabel => {
            println!("❌ The name can't be empty. Try again.");
        }
        ConversationReply::Created {
            id,
            label,
            time,
            timezone,
        } => {
            println!("✅ Saved: {label} — {time} ({timezone}). Reminder #{id}.");
        }
        ConversationReply::Updated { id } => println!("✅ Reminder #{id} updated."),
        ConversationReply::Cancelled => println!("🔙 Cancelled."),
        ConversationReply::NotFound => println!("❌ Reminder not found."),
        ConversationReply::Ignored => println!("ℹ️ Type `help` for commands."),
    }
}

fn report(e: anyhow::Error) {
    if BotError::is_not_found(&e) {
        println!("❌ Reminder not found.");
    } else {
        error!("Command failed: {e:#}");
    }
}

fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|raw| raw.parse().ok())
}

fn print_help() {
    println!(
        "\
Commands:
  add                start creating a reminder
  pick <HH:MM>       choose a time (dialog)
  custom             enter a custom time (dialog)
  daily | once       recurrence choice (dialog)
  cancel             abandon the current dialog
  list               show your reminders
  took <id>          mark today's dose as taken
  snooze <id> [min]  postpone the notification
  del <id>           delete a reminder
  edit-label <id>    rename a reminder
  edit-time <id>     reschedule a reminder
  report             today's occurrences
  tz <Area/City>     set your timezone
  status             scheduler internals
  quit               exit"
    );
}
