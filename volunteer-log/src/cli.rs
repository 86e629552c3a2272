use clap::{Args, Parser, Subcommand};
use time::{macros::format_description, Date, Time};

#[derive(Debug, Parser)]
#[command(name = "volunteer-log")]
#[command(about = "Log volunteer hours to a shared spreadsheet, offline-first")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Remember who you are and sign in through the browser
    Login {
        /// Identifier written in the first column of every row
        volunteer_id: String,
    },
    /// Forget the volunteer id and stored tokens
    Logout,
    /// Log hours worked
    Submit(SubmitArgs),
    /// List entries waiting to be synced
    Pending,
    /// Send entries saved offline to the spreadsheet
    Sync,
    /// Print config path and create a starter file if missing
    ConfigPath,
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Day of the activity, YYYY-MM-DD (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<Date>,
    /// Start time, HH:MM (24-hour)
    #[arg(long, value_parser = parse_time)]
    pub start: Time,
    /// End time, HH:MM (24-hour)
    #[arg(long, value_parser = parse_time)]
    pub end: Time,
    /// Organization you volunteered for
    #[arg(long)]
    pub organization: String,
    /// What you did
    #[arg(long)]
    pub description: String,
}

fn parse_date(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn parse_time(s: &str) -> Result<Time, String> {
    Time::parse(s, format_description!("[hour]:[minute]"))
        .map_err(|e| format!("expected HH:MM: {}", e))
}
