//! Hearth CLI - household chores from the command line
//!
//! Every command works offline against the local store; when a sync endpoint
//! is configured, mutations are reconciled with it before the process exits.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands, ConfigCommand, MemberCommand, TaskCommand};
use crate::commands::common::resolve_store_path;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hearth=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store_path = resolve_store_path(cli.store_path);
    let json = cli.json;

    match cli.command {
        Commands::Member(command) => match command {
            MemberCommand::Add { name, color } => {
                commands::member::run_member_add(&name, color, &store_path).await?;
            }
            MemberCommand::List => commands::member::run_member_list(json, &store_path)?,
            MemberCommand::Rename { id, name } => {
                commands::member::run_member_rename(&id, &name, &store_path).await?;
            }
            MemberCommand::Delete { id } => {
                commands::member::run_member_delete(&id, &store_path).await?;
            }
        },
        Commands::Task(command) => match command {
            TaskCommand::Add {
                name,
                member,
                date,
                time,
                recurrence,
            } => {
                let draft = commands::task::TaskDraft {
                    name,
                    member_id: member,
                    date,
                    time,
                    recurrence: recurrence.into(),
                };
                commands::task::run_task_add(draft, &store_path).await?;
            }
            TaskCommand::List { member } => {
                commands::task::run_task_list(member.as_deref(), json, &store_path)?;
            }
            TaskCommand::Delete { id } => commands::task::run_task_delete(&id, &store_path).await?,
            TaskCommand::QuickAdd {
                id,
                members,
                from,
                to,
            } => {
                commands::task::run_task_quick_add(&id, &members, &from, &to, &store_path)
                    .await?;
            }
        },
        Commands::Sync { test } => commands::sync::run_sync(test, &store_path).await?,
        Commands::Status => commands::status::run_status(json, &store_path)?,
        Commands::Config(command) => match command {
            ConfigCommand::SetUrl { url } => commands::config::run_set_url(&url, &store_path)?,
            ConfigCommand::ClearUrl => commands::config::run_clear_url(&store_path)?,
            ConfigCommand::Show => commands::config::run_show(json, &store_path)?,
        },
        Commands::Export { output } => {
            commands::export::run_export(output.as_deref(), &store_path)?;
        }
        Commands::Import { path } => commands::export::run_import(&path, &store_path).await?,
    }

    Ok(())
}
