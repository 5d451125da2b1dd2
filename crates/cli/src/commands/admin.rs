//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! gavel admin users
//! gavel admin promote 65f1c2...
//! gavel admin delete 65f1c2...
//! ```
//!
//! The server enforces the admin role; the local check only saves a round
//! trip when the stored session is not an admin one.

use gavel_client::Marketplace;
use gavel_client::api::UserApi;
use gavel_core::UserId;
use tracing::info;

use super::{CommandError, require_admin};

pub async fn users(market: &Marketplace) -> Result<(), CommandError> {
    require_admin(market)?;

    let users = market.api().list_users().await?;
    for user in &users {
        let role = user.role.map_or_else(|| "-".to_owned(), |r| r.to_string());
        info!(
            "{}  {}  {}  {role}",
            user.id,
            user.display_name(),
            user.email.as_deref().unwrap_or("-")
        );
    }
    info!("{} user(s)", users.len());
    Ok(())
}

pub async fn delete(market: &Marketplace, id: &UserId) -> Result<(), CommandError> {
    require_admin(market)?;

    let ack = market.api().delete_user(id).await?;
    info!("{}", ack.message.unwrap_or_else(|| format!("Deleted user {id}")));
    Ok(())
}

pub async fn promote(market: &Marketplace, id: &UserId) -> Result<(), CommandError> {
    require_admin(market)?;

    let ack = market.api().promote_user(id).await?;
    info!(
        "{}",
        ack.message
            .unwrap_or_else(|| format!("Promoted user {id} to admin"))
    );
    Ok(())
}
