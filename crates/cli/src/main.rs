//! Greenleaf CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront, admin, or all migrations
//! gl-cli migrate storefront
//! gl-cli migrate admin
//! gl-cli migrate all
//!
//! # Create the first back-office account
//! gl-cli admin create -e owner@greenleaf.shop -n "Owner" -r super_admin -p '...'
//!
//! # Load discount rules and email templates
//! gl-cli seed pricing seeds/pricing.yaml
//! gl-cli seed templates seeds/templates.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "gl-cli")]
#[command(author, version, about = "Greenleaf CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load data from YAML files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront migrations (`storefront` schema)
    Storefront,
    /// Run admin migrations (`admin` schema)
    Admin,
    /// Run all migrations
    All,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`super_admin`, `admin`, `viewer`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Initial password (min 8 characters)
        #[arg(short, long, env = "GL_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Volume tiers and bundles
    Pricing {
        /// Path to the YAML file
        file: String,
    },
    /// Email templates, upserted by key
    Templates {
        /// Path to the YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Admin => commands::migrate::admin().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                role,
                password,
            } => {
                let password = SecretString::from(password);
                commands::admin::create_user(&email, &name, &role, &password).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Pricing { file } => commands::seed::pricing(&file).await?,
            SeedTarget::Templates { file } => commands::seed::templates(&file).await?,
        },
    }
    Ok(())
}
