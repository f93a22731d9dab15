use clap::Parser;
use error_stack::{Result, ResultExt};
use thiserror::Error;

use crate::{config, database, seed, App};

/// Command line options for inkcap.
#[derive(Debug, Parser)]
#[command(about = "Utility suite for the inkcap content backend", version, author)]
pub struct Cli {
    #[clap(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(Debug, Parser)]
pub enum Subcommand {
    /// Apply any pending database migrations.
    Migrate,
    /// Insert bootstrap data (roles, admin account, starter content).
    Seed,
}

#[derive(Debug, Error)]
#[error("Failed to run command")]
pub struct CommandError;

impl Cli {
    pub fn run(self) -> Result<(), CommandError> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();

        let config = config::App::load().change_context(CommandError)?;

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .change_context(CommandError)
            .attach_printable("could not build tokio runtime")?
            .block_on(async move {
                match self.subcommand {
                    Subcommand::Migrate => {
                        let pool =
                            database::Pool::new(&config.db, &config.db.primary)
                                .await
                                .change_context(CommandError)?;

                        database::migrations::run_pending(&pool)
                            .await
                            .change_context(CommandError)
                    }
                    Subcommand::Seed => {
                        let app = App::new(config).await.change_context(CommandError)?;
                        app.primary_db
                            .wait_until_healthy()
                            .await
                            .change_context(CommandError)?;

                        // seeding presumes the schema exists
                        database::migrations::run_pending(&app.primary_db)
                            .await
                            .change_context(CommandError)?;

                        seed::run(&app).await.change_context(CommandError)
                    }
                }
            })
    }
}
