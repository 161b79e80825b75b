use almanac_core::db;
use almanac_core::error::CoreError;
use almanac_core::repository::{RuleRepository, SqliteRepository};
use clap::Parser;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = config::Config::new().unwrap_or_else(|e| {
        eprintln!("{} ignoring invalid configuration: {}", "Warning:".yellow().bold(), e);
        config::Config::default()
    });
    init_tracing(&config.log_level);

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let repository = SqliteRepository::new(db_pool);
    let today = chrono::Local::now().date_naive();

    let result = match cli.command {
        cli::Commands::Add(command) => {
            commands::add::add_rule(&repository, command, &config.defaults, today).await
        }
        cli::Commands::Rules => commands::rules::list_rules(&repository).await,
        cli::Commands::Delete(command) => {
            let rule = match repository.find_rule(command.id).await {
                Ok(Some(rule)) => rule,
                Ok(None) => {
                    let error_style = Style::new().red().bold();
                    eprintln!(
                        "{} Rule with ID '{}' not found.",
                        "Error:".style(error_style),
                        command.id
                    );
                    std::process::exit(1);
                }
                Err(e) => {
                    handle_error(e.into());
                    std::process::exit(1);
                }
            };

            if !command.force {
                let confirmation = Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to delete '{}' and all of its overrides?",
                        rule.title
                    ))
                    .default(false)
                    .interact()
                    .unwrap_or(false);

                if !confirmation {
                    println!("Deletion cancelled.");
                    return;
                }
            }
            commands::delete::delete_rule(&repository, rule.item_id, today).await
        }
        cli::Commands::Override(command) => {
            commands::overrides::override_command(&repository, command, today).await
        }
        cli::Commands::Refresh => commands::refresh::refresh(&repository, today).await,
        cli::Commands::Calendar(command) => {
            commands::calendar::show_calendar(&repository, command, today).await
        }
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` takes precedence over the configured level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidRule(s) => {
                eprintln!("{} Invalid rule: {}", "Error:".style(error_style), s.yellow());
            }
            CoreError::InvalidOverride(s) => {
                eprintln!("{} Invalid override: {}", "Error:".style(error_style), s.yellow());
            }
            CoreError::DuplicateOverride { item_id, original } => {
                eprintln!(
                    "{} Rule {} already overrides the occurrence at {}",
                    "Error:".style(error_style),
                    item_id,
                    original.to_string().yellow()
                );
                eprintln!(
                    "Remove it first with `almanac override rm {} --original \"{}\"`",
                    item_id, original
                );
            }
            CoreError::InvalidTimestamp(s) => {
                eprintln!(
                    "{} Invalid date '{}', expected YYYY-MM-DD or \"YYYY-MM-DD HH:MM\"",
                    "Error:".style(error_style),
                    s.yellow()
                );
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
