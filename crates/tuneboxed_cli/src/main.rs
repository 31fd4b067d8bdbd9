//! Operator probe for the Tuneboxed data layer.
//!
//! # Responsibility
//! - Drive the record store from a shell against a real data directory.
//! - Print results as JSON so they can be piped into other tools.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::process::ExitCode;
use tuneboxed_core::analytics::dashboard::DEFAULT_RECENT_LIMIT;
use tuneboxed_core::{
    dashboard_summary, default_log_level, init_logging, RecordStore, SignupError, StoreConfig,
};

#[derive(Debug, Parser)]
#[command(name = "tuneboxed", version, about = "Inspect and feed the Tuneboxed record store")]
struct Cli {
    /// Absolute directory holding the structured and simple stores.
    #[arg(long, env = "TUNEBOXED_DATA_DIR")]
    data_dir: String,
    /// Absolute directory for rolling logs; logging stays off when omitted.
    #[arg(long, env = "TUNEBOXED_LOG_DIR")]
    log_dir: Option<String>,
    #[arg(long, default_value_t = default_log_level().to_string())]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record a signup and make it the current session.
    Signup { email: String, name: String },
    /// Record a page view.
    View {
        path: String,
        #[arg(long, default_value = "")]
        referrer: String,
        #[arg(long, default_value = "")]
        user_agent: String,
    },
    /// List merged signups.
    Users,
    /// List page views.
    PageViews,
    /// Show the current session pointer.
    Whoami,
    /// Clear the current session pointer.
    SignOut,
    /// Operator counters.
    Summary {
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        recent: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, String> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(&cli.log_level, log_dir)?;
    }

    let config = StoreConfig::new(&cli.data_dir).map_err(|err| err.to_string())?;
    let store = RecordStore::open_default(&config).map_err(|err| err.to_string())?;

    let value = match cli.command {
        Command::Signup { email, name } => match store.record_signup(&email, &name) {
            Ok(record) => json!(record),
            Err(SignupError::DuplicateEmail(email)) => {
                return Err(format!("`{email}` is already signed up"))
            }
            Err(err) => return Err(err.to_string()),
        },
        Command::View {
            path,
            referrer,
            user_agent,
        } => {
            store.record_page_view(&path, &referrer, &user_agent);
            json!({ "recorded": path })
        }
        Command::Users => json!(store.list_users()),
        Command::PageViews => json!(store.list_page_views()),
        Command::Whoami => json!(store.session_pointer()),
        Command::SignOut => {
            store.sign_out();
            json!({ "signed_out": true })
        }
        Command::Summary { recent } => json!(dashboard_summary(
            &store.list_users(),
            &store.list_page_views(),
            recent
        )),
    };

    serde_json::to_string_pretty(&value).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
