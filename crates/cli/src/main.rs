//! Gavel CLI - Browse the marketplace, manage a session and check out a cart.
//!
//! # Usage
//!
//! ```bash
//! # Log in (session is kept under GAVEL_STATE_DIR)
//! gavel login -e ana@example.com -p hunter22
//!
//! # Browse
//! gavel products list --category antiques --limit 10
//! gavel products show 65f1c2...
//!
//! # Shop
//! gavel cart add 65f1c2...
//! gavel cart set 65f1c2... 3
//! gavel cart checkout --method paypal
//! ```
//!
//! # Commands
//!
//! - `register`, `login`, `logout`, `whoami` - Session management
//! - `products` - Catalogue, auctions and bidding
//! - `cart` - Local cart and checkout
//! - `admin` - User management (admin accounts only)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use gavel_client::ClientConfig;
use gavel_core::PaymentMethod;
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "gavel")]
#[command(author, version, about = "Gavel marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "GAVEL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and store the session locally
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "GAVEL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and forget the local session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Browse products and auctions
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage users (admin only)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List(commands::products::ListArgs),
    /// Show one product
    Show { id: String },
    /// List product categories
    Categories,
    /// List running auctions
    Active,
    /// List products reserved for an auction winner (defaults to you)
    Reserved {
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Show the bid history of a product
    Bids { id: String },
    /// Place a bid
    Bid { id: String, amount: Decimal },
    /// Show the server's auction status report
    Status,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents
    Show,
    /// Add one unit of a product
    Add { id: String },
    /// Remove a product
    Remove { id: String },
    /// Set the quantity of a product (0 removes it)
    Set {
        id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
    /// Pay for the cart
    Checkout {
        /// `card`, `paypal`, `bank_transfer` or `cash_on_delivery`
        #[arg(short, long, default_value = "card")]
        method: PaymentMethod,

        /// Submit the purchase to the server instead of simulating payment
        #[arg(long)]
        remote: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List all users
    Users,
    /// Delete a user
    Delete { id: String },
    /// Promote a user to admin
    Promote { id: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = ClientConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gavel_cli=info,gavel_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().without_time().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let remote_checkout = matches!(
        cli.command,
        Commands::Cart {
            action: CartAction::Checkout { remote: true, .. }
        }
    );
    let market = commands::open(config, remote_checkout)?;

    match cli.command {
        Commands::Register {
            username,
            email,
            password,
        } => commands::auth::register(&market, username, &email, password).await?,
        Commands::Login { email, password } => {
            commands::auth::login(&market, &email, password).await?;
        }
        Commands::Logout => commands::auth::logout(&market).await,
        Commands::Whoami => commands::auth::whoami(&market).await?,
        Commands::Products { action } => match action {
            ProductsAction::List(args) => {
                commands::products::list(&market, &args.into_query()).await?;
            }
            ProductsAction::Show { id } => commands::products::show(&market, &id.into()).await?,
            ProductsAction::Categories => commands::products::categories(&market).await?,
            ProductsAction::Active => commands::products::active(&market).await?,
            ProductsAction::Reserved { email } => {
                commands::products::reserved(&market, email.as_deref()).await?;
            }
            ProductsAction::Bids { id } => commands::products::bids(&market, &id.into()).await?,
            ProductsAction::Bid { id, amount } => {
                commands::products::bid(&market, &id.into(), amount).await?;
            }
            ProductsAction::Status => commands::products::status(&market).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&market),
            CartAction::Add { id } => commands::cart::add(&market, &id.into()).await?,
            CartAction::Remove { id } => commands::cart::remove(&market, &id.into()),
            CartAction::Set { id, quantity } => {
                commands::cart::set(&market, &id.into(), quantity)?;
            }
            CartAction::Clear => commands::cart::clear(&market),
            CartAction::Checkout { method, .. } => commands::cart::checkout(&market, method).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Users => commands::admin::users(&market).await?,
            AdminAction::Delete { id } => commands::admin::delete(&market, &id.into()).await?,
            AdminAction::Promote { id } => commands::admin::promote(&market, &id.into()).await?,
        },
    }
    Ok(())
}
