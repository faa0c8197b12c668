use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shared::domain::{Event, EventId, Mentor, Partner, Quote, SessionUser, TeamMember, UserId};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use view_core::{
    config::load_settings_from, AnonymousSession, FetchStatus, ListResource, ManualViewport,
    RegistrationOutcome, Section, SessionProvider, StaticSession, ViewCore, ViewError, ViewEvent,
};

#[derive(Parser, Debug)]
#[command(about = "Drive the site view engine against a live API")]
struct Args {
    /// Settings file; falls back to `SITE_CONFIG`, then `site.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Bearer token of the signed-in user.
    #[arg(long, global = true)]
    token: Option<String>,
    /// Act as this user. Without it every action is anonymous.
    #[arg(long, global = true)]
    user_id: Option<String>,
    #[arg(long, global = true)]
    dark: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one collection and print its terminal state.
    List { resource: ListKind },
    /// Submit the contact form.
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long)]
        message: String,
    },
    /// Register the user for an event.
    Register { event_id: String },
    /// Print the resolved styles of a section's first items.
    Styles {
        section: Section,
        #[arg(long, default_value_t = 3)]
        count: usize,
        #[arg(long)]
        revealed: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ListKind {
    Mentors,
    Quotes,
    Events,
    Partners,
    Team,
}

#[derive(Serialize)]
struct StyleLine {
    index: usize,
    transform: String,
    opacity: f32,
    transition_delay_seconds: f64,
    background: &'static str,
    text: &'static str,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match &args.config {
        Some(path) => load_settings_from(path, |key| std::env::var(key).ok())?,
        None => view_core::load_settings()?,
    };
    let core = ViewCore::new(
        settings,
        session_from(&args),
        Arc::new(ManualViewport::new()),
    )
        .context("failed to initialise the view engine")?;
    if args.dark {
        core.theme().toggle();
    }
    let mut events = core.subscribe_events();

    let succeeded = match args.command {
        Command::List { resource } => match resource {
            ListKind::Mentors => print_collection::<Mentor>(&core).await?,
            ListKind::Quotes => print_collection::<Quote>(&core).await?,
            ListKind::Events => print_collection::<Event>(&core).await?,
            ListKind::Partners => print_collection::<Partner>(&core).await?,
            ListKind::Team => print_collection::<TeamMember>(&core).await?,
        },
        Command::Contact {
            name,
            email,
            subject,
            message,
        } => {
            let form = core.contact_form()?;
            form.update_field("name", name);
            form.update_field("email", email);
            form.update_field("subject", subject);
            form.update_field("message", message);
            match form.submit().await {
                Ok(receipt) => {
                    info!(status = receipt.status, "contact form accepted");
                    true
                }
                Err(failure) => {
                    warn!(cause = %failure.cause, "contact form refused");
                    false
                }
            }
        }
        Command::Register { event_id } => {
            let registrations = core.registrations();
            if let Err(err) = registrations.load().await {
                warn!(error = %err, "could not load existing registrations");
            }
            let outcome = registrations.register(&EventId::new(event_id)).await;
            let (report, registered) =
                registration_report(&outcome, registrations.fallback_message());
            println!("{report}");
            registered
        }
        Command::Styles {
            section,
            count,
            revealed,
        } => {
            let lines: Vec<StyleLine> = (0..count)
                .map(|index| {
                    let style = core.section_style(section, revealed, index);
                    StyleLine {
                        index,
                        transform: style.css_transform(),
                        opacity: style.opacity,
                        transition_delay_seconds: style.transition_delay_seconds,
                        background: style.palette.background,
                        text: style.palette.text,
                    }
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&lines)?);
            true
        }
    };

    print_notices(&mut events);
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// JSON line for a registration attempt and whether it counts as success.
fn registration_report(
    outcome: &Result<RegistrationOutcome, ViewError>,
    fallback: &str,
) -> (serde_json::Value, bool) {
    match outcome {
        Ok(RegistrationOutcome::Registered) => (json!({ "outcome": "registered" }), true),
        Ok(RegistrationOutcome::AlreadyRegistered) => {
            (json!({ "outcome": "already_registered" }), true)
        }
        Err(err) => (
            json!({
                "outcome": "failed",
                "message": err.user_message(fallback),
            }),
            false,
        ),
    }
}

fn session_from(args: &Args) -> Arc<dyn SessionProvider> {
    match &args.user_id {
        Some(id) => Arc::new(StaticSession::signed_in(SessionUser {
            id: UserId::new(id.clone()),
            is_admin: false,
            display_name: None,
            bearer_token: args.token.clone(),
        })),
        None => Arc::new(AnonymousSession),
    }
}

/// Prints the terminal state; `false` when the fetch ended in an error.
async fn print_collection<T: ListResource + Serialize>(core: &ViewCore) -> Result<bool> {
    let state = core.fetch_collection::<T>().await;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(state.status() != FetchStatus::Error)
}

fn print_notices(events: &mut broadcast::Receiver<ViewEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            ViewEvent::Notice(notice) => {
                eprintln!("[{:?}] {}", notice.level, notice.message);
            }
            ViewEvent::LoginRequired { action } => {
                eprintln!("login required to {action}");
            }
            ViewEvent::ThemeChanged(_) => {}
        }
    }
}
