use clap::Parser;
use pulse_sync::args::{
    Args, CategorySubcommand, CloudSubcommand, Command, GoalSubcommand, OpSubcommand,
};
use pulse_sync::{commands, App, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().pulse_home().path();

    // This allows for exercising the program without a reachable vault.
    // When PULSE_SYNC_IN_TEST_MODE is set and non-zero in length, the mode
    // will be Mode::Memory, otherwise it will be Mode::Http.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.vault_url()).await?.print(),

        Command::Op(op_args) => {
            let app = open_app(home, mode).await?;
            match &op_args.command {
                OpSubcommand::Add(fields) => commands::op_add(&app, fields).await?.print(),
                OpSubcommand::Update(update) => {
                    commands::op_update(&app, update.id, &update.fields)
                        .await?
                        .print()
                }
                OpSubcommand::Delete(id_arg) => {
                    commands::op_delete(&app, id_arg.id).await?.print()
                }
                OpSubcommand::List(list_args) => {
                    commands::op_list(&app, list_args).await?.print()
                }
            }
        }

        Command::Goal(goal_args) => {
            let app = open_app(home, mode).await?;
            match &goal_args.command {
                GoalSubcommand::Add(fields) => commands::goal_add(&app, fields).await?.print(),
                GoalSubcommand::Update(update) => {
                    commands::goal_update(&app, update.id, &update.fields)
                        .await?
                        .print()
                }
                GoalSubcommand::Delete(id_arg) => {
                    commands::goal_delete(&app, id_arg.id).await?.print()
                }
                GoalSubcommand::List => commands::goal_list(&app).await?.print(),
            }
        }

        Command::Category(category_args) => {
            let app = open_app(home, mode).await?;
            match &category_args.command {
                CategorySubcommand::Add(fields) => {
                    commands::category_add(&app, fields.kind, fields.subtype, &fields.name)
                        .await?
                        .print()
                }
                CategorySubcommand::Remove(fields) => {
                    commands::category_remove(&app, fields.kind, fields.subtype, &fields.name)
                        .await?
                        .print()
                }
                CategorySubcommand::List => commands::category_list(&app).await?.print(),
            }
        }

        Command::Report(report_args) => {
            let app = open_app(home, mode).await?;
            commands::report(&app, report_args).await?.print()
        }

        Command::Export(export_args) => {
            let app = open_app(home, mode).await?;
            commands::export(&app, export_args.out.as_deref())
                .await?
                .print()
        }

        Command::Cloud(cloud_args) => {
            let app = open_app(home, mode).await?;
            match &cloud_args.command {
                CloudSubcommand::Link(link) => {
                    commands::cloud_link(&app, &link.id).await?.print()
                }
                CloudSubcommand::Push => commands::cloud_push(&app).await?.print(),
                CloudSubcommand::Pull => commands::cloud_pull(&app).await?.print(),
                CloudSubcommand::Load(load) => {
                    commands::cloud_load(&app, load.policy).await?.print()
                }
                CloudSubcommand::Status => commands::cloud_status(&app).await?.print(),
            }
        }

        Command::Watch(watch_args) => {
            let mut config = Config::load(home).await?;
            if let Some(interval) = watch_args.interval {
                config = config.with_sync_interval_secs(interval);
            }
            let app = App::open(config, mode).await?;
            commands::watch(&app).await?.print()
        }
    };
    Ok(())
}

async fn open_app(home: &std::path::Path, mode: Mode) -> Result<App> {
    let config = Config::load(home).await?;
    App::open(config, mode).await
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
