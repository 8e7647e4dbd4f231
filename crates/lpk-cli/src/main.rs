//! lpk - learning package CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lpk_cli::cmd::{self, Globals};
use lpk_cli::ops::launch::LaunchOptions;
use lpk_cli::{Cli, Commands, UnitCommands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let globals = Globals {
        home: cli.home,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Import { archives } => cmd::import::import(&globals, &archives).await,
        Commands::List { json } => cmd::list::list(&globals, json).await,
        Commands::Units { package, json } => cmd::units::units(&globals, &package, json).await,
        Commands::Unit { command } => match command {
            UnitCommands::Add {
                package,
                unit,
                icon,
                assets,
            } => cmd::unit::add(&globals, &package, &unit, &icon, &assets).await,
        },
        Commands::Edit {
            package,
            name,
            activity,
        } => cmd::edit::edit(&globals, &package, name, activity).await,
        Commands::Remove { packages } => cmd::remove::remove_apps(&globals, &packages).await,
        Commands::Launch {
            package,
            unit,
            remaining_ms,
            inactivity_ms,
            run_id,
            learner_id,
            school_id,
            stage,
            out,
        } => {
            let options = LaunchOptions {
                run_id,
                learner_id,
                school_id,
                stage,
                remaining_foreground_time_ms: remaining_ms,
                inactivity_timeout_ms: inactivity_ms,
            };
            cmd::launch::launch_unit(&globals, &package, &unit, &options, out.as_deref()).await
        }
        Commands::Result { file } => cmd::result::result(&file),
        Commands::Respond {
            request,
            result_type,
            score,
            duration_ms,
            details,
            additional_data,
            items,
            out,
        } => {
            let args = cmd::respond::ResponseArgs {
                result_type,
                score,
                duration_ms,
                details,
                additional_data,
                items,
            };
            cmd::respond::respond_to(&request, args, out.as_deref())
        }
        Commands::Asset { uri, out } => cmd::asset::asset(&globals, &uri, out.as_deref()).await,
        Commands::History { package } => cmd::history::history(&globals, &package).await,
    }
}
