//! ShopDrop CLI - Database migrations and account tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! shopdrop-cli migrate
//!
//! # Print an account and its registrant profile
//! shopdrop-cli accounts show 3f2a9c...
//!
//! # Redeem an email-verification token
//! shopdrop-cli accounts confirm-email 6c1e0d4b-...
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopdrop-cli")]
#[command(author, version, about = "ShopDrop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Inspect and repair accounts
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Print an account and its profile record as JSON
    Show {
        /// Account id
        id: String,
    },
    /// Mark an account's email verified using an issued token
    ConfirmEmail {
        /// Token from the verification email
        token: uuid::Uuid,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await,
        Commands::Accounts { action } => match action {
            AccountAction::Show { id } => commands::accounts::show(&id).await,
            AccountAction::ConfirmEmail { token } => {
                commands::accounts::confirm_email(token).await
            }
        },
    }
}
