//! # Unibell: timetable client with lesson notifications
//!
//! Usage:
//!   unibell serve                                    # Run the notifier until Ctrl-C
//!   unibell schedule --group 77 --from 2026-03-02    # Print a group's schedule
//!   unibell calls                                    # Print the bell schedule
//!   unibell subscribe --chat 42 --group 77           # Subscribe a chat

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use unibell_api::HttpScheduleApi;
use unibell_channels::TelegramMessenger;
use unibell_core::UnibellConfig;
use unibell_core::types::{NotifyOffset, Subscription};
use unibell_scheduler::Notifier;
use unibell_storage::{ChatStore, Database};
use unibell_timetable::CachedScheduleService;

#[derive(Parser)]
#[command(name = "unibell", version, about = "🔔 Unibell: timetable cache and lesson reminders")]
struct Cli {
    /// Config file (default: ~/.unibell/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the bell schedule and run the notifier until Ctrl-C
    Serve,
    /// Print a group's schedule, served through the local cache
    Schedule {
        #[arg(short, long)]
        group: i64,
        /// First day (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day (default: same as --from)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Print the bell schedule
    Calls,
    /// Subscribe a chat to lesson reminders
    Subscribe {
        #[arg(long)]
        chat: i64,
        #[arg(short, long)]
        group: i64,
        #[arg(short, long, default_value = "15m")]
        offset: NotifyOffset,
        #[arg(short, long, default_value = "en")]
        lang: String,
        /// Turn reminders off for this chat
        #[arg(long)]
        disable: bool,
    },
}

fn load_config(path: Option<&str>) -> Result<UnibellConfig> {
    let config = match path {
        Some(p) => {
            let expanded = PathBuf::from(shellexpand::tilde(p).to_string());
            UnibellConfig::load_from(&expanded)
                .with_context(|| format!("loading {}", expanded.display()))?
        }
        None => UnibellConfig::load()?,
    };
    Ok(config)
}

fn open_service(config: &UnibellConfig, db: Arc<Database>) -> Result<CachedScheduleService> {
    let api = HttpScheduleApi::from_config(&config.api)?;
    Ok(CachedScheduleService::new(
        Arc::new(api),
        db,
        std::time::Duration::from_secs(config.cache.ttl_secs),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "unibell=debug" } else { "unibell=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref())?;
    let db_path = config.cache.resolved_db_path();
    let db = Arc::new(Database::open(&db_path).with_context(|| format!("opening {}", db_path.display()))?);

    match cli.command {
        Command::Serve => serve(&config, db).await,
        Command::Schedule { group, from, to } => {
            let service = open_service(&config, db)?;
            let start = from.unwrap_or_else(|| Local::now().date_naive());
            let end = to.unwrap_or(start);
            for day in service.get_schedule(group, start, end).await? {
                println!("📅 {}", day.date.format("%a %Y-%m-%d"));
                if day.lessons.is_empty() {
                    println!("   (no lessons)");
                }
                for lesson in &day.lessons {
                    for period in &lesson.periods {
                        println!(
                            "   {}. {}–{} {} {}",
                            lesson.number,
                            period.time_start,
                            period.time_end,
                            period.display_name(),
                            period.classroom.as_deref().unwrap_or("")
                        );
                    }
                }
            }
            Ok(())
        }
        Command::Calls => {
            let service = open_service(&config, db)?;
            for slot in service.get_call_schedule().await? {
                println!(
                    "{:>2}. {}–{}",
                    slot.number,
                    slot.time_start.format("%H:%M"),
                    slot.time_end.format("%H:%M")
                );
            }
            Ok(())
        }
        Command::Subscribe { chat, group, offset, lang, disable } => {
            let chats = ChatStore::new(db);
            chats.upsert_chat(
                &Subscription {
                    chat_id: chat,
                    group_id: group,
                    language_code: lang,
                    offset,
                },
                !disable,
            )?;
            println!("✅ Chat {chat} → group {group} ({offset}{})", if disable { ", disabled" } else { "" });
            Ok(())
        }
    }
}

async fn serve(config: &UnibellConfig, db: Arc<Database>) -> Result<()> {
    if !config.notify.enabled {
        tracing::warn!("Notifications disabled in config, nothing to serve");
        return Ok(());
    }

    let service = Arc::new(open_service(config, db.clone())?);
    let messenger = Arc::new(TelegramMessenger::new(config.telegram.clone())?);
    match messenger.get_me().await {
        Ok(me) => tracing::info!("🤖 Telegram bot: @{}", me.username.as_deref().unwrap_or("unknown")),
        Err(e) => tracing::warn!("Telegram getMe failed, continuing: {e}"),
    }

    let bell_schedule = service
        .get_call_schedule()
        .await
        .context("fetching bell schedule")?;
    let notifier = Notifier::start(
        bell_schedule,
        Arc::new(ChatStore::new(db)),
        messenger,
        service,
        &config.notify,
    )?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    notifier.stop().await;
    Ok(())
}
