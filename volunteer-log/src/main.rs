use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use volunteer_log::{
    cli::{Cli, Commands, SubmitArgs},
    config::{self, Settings},
    domain::{
        models::{Outcome, TimeEntry},
        ports::inbound::SubmissionService,
        Screen, SubmitError, Transition, ValidationError,
    },
    factory,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::ConfigPath = cli.command {
        let path = config::config_path()?;
        if config::write_template(&path)? {
            println!("Created {}", path.display());
        }
        println!("{}", path.display());
        return Ok(());
    }

    let settings = config::read_config()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    match cli.command {
        Commands::Login { volunteer_id } => login(&settings, &volunteer_id).await,
        Commands::Logout => logout(&settings).await,
        Commands::Submit(args) => submit(&settings, args).await,
        Commands::Pending => pending(&settings).await,
        Commands::Sync => sync(&settings).await,
        Commands::ConfigPath => Ok(()),
    }
}

/// Screen the app lands on after startup, given what is remembered locally.
fn startup_screen(settings: &Settings) -> Result<(Screen, Option<String>)> {
    let volunteer_id = factory::session_store(settings)?.load_volunteer_id()?;
    Ok((Screen::after_startup(volunteer_id.is_some()), volunteer_id))
}

async fn login(settings: &Settings, volunteer_id: &str) -> Result<()> {
    let volunteer_id = volunteer_id.trim();
    if volunteer_id.is_empty() {
        anyhow::bail!("Volunteer id must not be empty");
    }

    let (screen, _) = startup_screen(settings)?;
    let store = factory::session_store(settings)?;
    store.save_volunteer_id(volunteer_id)?;

    let provider = factory::credential_provider(settings)?;
    if let Err(e) = provider.sign_in().await {
        // Entries can still be logged and will be synced once signed in.
        eprintln!("Warning: Google sign-in failed: {}", e);
    }

    let screen = match screen {
        Screen::LoginForm => screen.apply(Transition::SignedIn)?,
        other => other,
    };
    println!("Welcome, {}! {}", volunteer_id, screen.prompt());
    Ok(())
}

async fn logout(settings: &Settings) -> Result<()> {
    let (screen, _) = startup_screen(settings)?;
    factory::credential_provider(settings)?.sign_out().await?;
    factory::session_store(settings)?.clear()?;

    let screen = if screen.accepts_entries() {
        println!("Logged out.");
        screen.apply(Transition::SignedOut)?
    } else {
        println!("Not logged in.");
        screen
    };
    println!("{}", screen.prompt());
    Ok(())
}

async fn submit(settings: &Settings, args: SubmitArgs) -> Result<()> {
    let (screen, volunteer_id) = startup_screen(settings)?;
    let Some(volunteer_id) = volunteer_id.filter(|_| screen.accepts_entries()) else {
        anyhow::bail!("Not logged in. {}", screen.prompt());
    };

    let date = match args.date {
        Some(date) => date,
        None => local_today(),
    };
    let entry = TimeEntry::new(
        volunteer_id,
        date,
        args.start,
        args.end,
        args.organization,
        args.description,
    );

    let router = factory::submission_router(settings).await?;
    match router.submit(&entry).await {
        Ok(Outcome::Delivered) => {
            println!("Recorded {:.2} hours.", entry.duration_hours());
            Ok(())
        }
        Ok(Outcome::QueuedLocally { reason }) => {
            println!("Saved locally, will sync later ({}).", reason);
            Ok(())
        }
        Err(SubmitError::Validation(ValidationError::MissingFields)) => {
            anyhow::bail!("Missing information: please fill in organization and description")
        }
        Err(SubmitError::Validation(ValidationError::InvalidTimeRange)) => {
            anyhow::bail!("Invalid time: end time must be after start time")
        }
        Err(e @ SubmitError::Persistence { .. }) => {
            if let SubmitError::Persistence { row, .. } = &e {
                eprintln!("Unsaved entry: {}", row.fields().join(" | "));
            }
            Err(e).context("Your entry was NOT saved")
        }
    }
}

async fn pending(settings: &Settings) -> Result<()> {
    let router = factory::submission_router(settings).await?;
    let rows = router.pending().await?;

    if rows.is_empty() {
        println!("No entries waiting to be synced.");
        return Ok(());
    }
    for (i, row) in rows.iter().enumerate() {
        println!("{:>3}: {}", i + 1, row.fields().join(" | "));
    }
    println!("{} entries waiting to be synced.", rows.len());
    Ok(())
}

async fn sync(settings: &Settings) -> Result<()> {
    let router = factory::submission_router(settings).await?;
    let report = router.sync().await?;

    println!(
        "Synced {} entries, {} still pending.",
        report.delivered, report.remaining
    );
    if let Some(e) = report.last_error {
        println!("Stopped early: {}", e);
    }
    Ok(())
}

fn local_today() -> time::Date {
    let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    time::OffsetDateTime::now_utc().to_offset(offset).date()
}
