mod commands;
mod render;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;

use bday_core::{reader, Config, Event, EventSettings, SortKey};
use bday_provider_google::CalendarApi;

/// Exit codes, one per failure stage.
const EXIT_CONFIG: u8 = 1;
const EXIT_INPUT: u8 = 2;
const EXIT_FETCH: u8 = 3;
const EXIT_UPLOAD: u8 = 4;

#[derive(Parser)]
#[command(name = "bday")]
#[command(about = "Keep a Google calendar in sync with a plain-text birthday list")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file
    #[arg(short = 'c', long, global = true)]
    config_file: Option<PathBuf>,

    /// Display more information (repeatable)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the birthday file and check it for errors
    Validate,
    /// Show birthdays from the file
    Show {
        #[arg(value_enum)]
        sort: SortArg,
    },
    /// Show birthdays from the Google calendar
    RemoteShow {
        #[arg(value_enum)]
        sort: SortArg,
    },
    /// Show the differences between the file and the Google calendar
    Diff,
    /// Upload birthdays from the file to the Google calendar
    Upload {
        /// Delete every remote event and recreate the calendar from the file
        #[arg(short, long)]
        force: bool,

        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    /// By year of birth
    Year,
    /// By month and day of birth
    MonthDay,
    /// By days to the next birthday
    Next,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> SortKey {
        match arg {
            SortArg::Year => SortKey::Year,
            SortArg::MonthDay => SortKey::MonthDay,
            SortArg::Next => SortKey::NextBirthday,
        }
    }
}

/// Per-field overrides mirroring the config file. Every config setting has
/// exactly one flag here; values win over the file.
#[derive(Args, Debug)]
struct ConfigOverrides {
    /// Path to the file with birthdays
    #[arg(short = 'i', long, global = true)]
    input_file: Option<PathBuf>,

    /// Name of the managed Google calendar
    #[arg(long, global = true)]
    calendar_name: Option<String>,

    /// Port for the local OAuth callback listener
    #[arg(long, global = true)]
    oauth_port: Option<u16>,

    /// Append the zodiac symbol to event titles
    #[arg(long, global = true)]
    use_zodiac_signs: Option<bool>,

    /// Append the zodiac name to event titles
    #[arg(long, global = true)]
    use_zodiac_names: Option<bool>,

    #[arg(long, global = true)]
    title_prefix: Option<String>,

    #[arg(long, global = true)]
    title_postfix: Option<String>,

    /// Upload timed events instead of all-day ones
    #[arg(long, global = true)]
    use_time: Option<bool>,

    /// Event start time, HH:MM
    #[arg(long, global = true)]
    event_time: Option<String>,

    /// Event duration, HH:MM
    #[arg(long, global = true)]
    event_duration: Option<String>,

    /// IANA time zone for timed events
    #[arg(long, global = true)]
    time_zone: Option<String>,

    /// Move Feb 29 events to Mar 1 so reminders fire every year
    #[arg(long, global = true)]
    remind_feb29_on_mar1: Option<bool>,

    /// Popup reminder minutes, comma separated
    #[arg(long, global = true, value_delimiter = ',')]
    popup_reminders_minutes: Option<Vec<u32>>,

    /// Email reminder minutes, comma separated
    #[arg(long, global = true, value_delimiter = ',')]
    email_reminders_minutes: Option<Vec<u32>>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut Config) {
        if let Some(value) = &self.input_file {
            config.input_file = value.clone();
        }
        if let Some(value) = &self.calendar_name {
            config.calendar_name = value.clone();
        }
        if let Some(value) = self.oauth_port {
            config.oauth_port = value;
        }
        if let Some(value) = self.use_zodiac_signs {
            config.events.use_zodiac_signs = value;
        }
        if let Some(value) = self.use_zodiac_names {
            config.events.use_zodiac_names = value;
        }
        if let Some(value) = &self.title_prefix {
            config.events.title_prefix = value.clone();
        }
        if let Some(value) = &self.title_postfix {
            config.events.title_postfix = value.clone();
        }
        if let Some(value) = self.use_time {
            config.events.use_time = value;
        }
        if let Some(value) = &self.event_time {
            config.events.event_time = value.clone();
        }
        if let Some(value) = &self.event_duration {
            config.events.event_duration = value.clone();
        }
        if let Some(value) = &self.time_zone {
            config.events.time_zone = value.clone();
        }
        if let Some(value) = self.remind_feb29_on_mar1 {
            config.events.remind_feb29_on_mar1 = value;
        }
        if let Some(value) = &self.popup_reminders_minutes {
            config.events.popup_reminders_minutes = value.clone();
        }
        if let Some(value) = &self.email_reminders_minutes {
            config.events.email_reminders_minutes = value.clone();
        }
    }
}

/// An error tagged with the exit code of the stage it happened in.
struct Failure {
    code: u8,
    error: anyhow::Error,
}

trait Stage<T> {
    fn stage(self, code: u8) -> Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> Stage<T> for Result<T, E> {
    fn stage(self, code: u8) -> Result<T, Failure> {
        self.map_err(|e| Failure {
            code,
            error: e.into(),
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            if verbose >= 3 {
                eprintln!("{:?}", failure.error);
            } else {
                eprintln!("{}", failure.error.to_string().red());
            }
            ExitCode::from(failure.code)
        }
    }
}

async fn run(cli: Cli) -> Result<(), Failure> {
    let mut config = Config::load(cli.config_file.as_deref()).stage(EXIT_CONFIG)?;
    cli.overrides.apply(&mut config);
    if cli.verbose > 0 {
        config.verbose = cli.verbose;
    }
    config.validate().stage(EXIT_CONFIG)?;

    if config.verbose >= 2 {
        eprintln!("{}", "Configuration:".cyan());
        eprintln!("{:#?}\n", config);
    }

    let settings = Arc::new(config.events.clone());
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Validate => {
            let events = load_file(&config, &settings).stage(EXIT_INPUT)?;
            commands::validate::run(&config, &events, today);
            Ok(())
        }
        Commands::Show { sort } => {
            let events = load_file(&config, &settings).stage(EXIT_INPUT)?;
            commands::show::run(events, sort.into(), today);
            Ok(())
        }
        Commands::RemoteShow { sort } => {
            let (_, events) = fetch_remote(&config).await.stage(EXIT_FETCH)?;
            commands::remote_show::run(events, sort.into(), today);
            Ok(())
        }
        Commands::Diff => {
            let file_events = load_file(&config, &settings).stage(EXIT_INPUT)?;
            let (_, remote_events) = fetch_remote(&config).await.stage(EXIT_FETCH)?;
            commands::diff::run(&file_events, &remote_events, &config, today)
                .stage(EXIT_INPUT)
        }
        Commands::Upload { force, yes } => {
            let file_events = load_file(&config, &settings).stage(EXIT_INPUT)?;
            let (api, remote_events) = fetch_remote(&config).await.stage(EXIT_FETCH)?;
            commands::upload::run(
                &api,
                &file_events,
                &remote_events,
                &config,
                force,
                yes,
                today,
            )
            .await
            .stage(EXIT_UPLOAD)
        }
    }
}

fn load_file(config: &Config, settings: &Arc<EventSettings>) -> Result<Vec<Event>> {
    let events = reader::read_events(&config.input_file, settings)?;
    Ok(events)
}

async fn fetch_remote(config: &Config) -> Result<(CalendarApi, Vec<Event>)> {
    let api = CalendarApi::connect(config).await?;

    let spinner = utils::tui::create_spinner(format!(
        "Fetching events from '{}'",
        config.calendar_name
    ));
    let result = api.list_events().await;
    spinner.finish_and_clear();

    let events = result?
        .into_iter()
        .map(|payload| Event::from_remote(payload, &config.events))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((api, events))
}
