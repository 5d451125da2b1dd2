//! Subcommand implementations.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod products;

use std::sync::Arc;

use gavel_client::api::{ApiClient, ApiError};
use gavel_client::payments::RemotePurchaseGateway;
use gavel_client::persistence::{FileStore, KeyValueStore, PersistedStore};
use gavel_client::stores::{CartError, SessionError};
use gavel_client::{ClientConfig, Marketplace};
use gavel_core::EmailError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the subcommands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{}", .0.user_message())]
    Session(#[from] SessionError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Not logged in, run `gavel login` first")]
    NotLoggedIn,

    #[error("This command needs an admin account")]
    NotAdmin,
}

/// Build the marketplace context over the state directory.
///
/// With `remote_checkout`, cart checkout goes to the batch purchase endpoint
/// instead of the simulated gateway.
pub fn open(config: ClientConfig, remote_checkout: bool) -> Result<Marketplace, ApiError> {
    let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.state_dir.clone()));
    if !remote_checkout {
        return Marketplace::new(config, backend);
    }

    let api = ApiClient::new(&config, PersistedStore::new(Arc::clone(&backend)))?;
    let payments = Arc::new(RemotePurchaseGateway::new(Arc::new(api)));
    Marketplace::with_payments(config, backend, payments)
}

fn require_login(market: &Marketplace) -> Result<(), CommandError> {
    if market.session().is_authenticated() {
        Ok(())
    } else {
        Err(CommandError::NotLoggedIn)
    }
}

fn require_admin(market: &Marketplace) -> Result<(), CommandError> {
    require_login(market)?;
    if market.session().is_admin() {
        Ok(())
    } else {
        Err(CommandError::NotAdmin)
    }
}

/// Format an amount with two decimal places.
fn money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}
