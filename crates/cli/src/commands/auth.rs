//! Session commands: register, login, logout, whoami.

use gavel_client::Marketplace;
use gavel_client::models::{Credentials, Registration};
use gavel_core::Email;
use tracing::{info, warn};

use super::{CommandError, require_login};

/// Create an account. Does not log in.
pub async fn register(
    market: &Marketplace,
    username: String,
    email: &str,
    password: String,
) -> Result<(), CommandError> {
    let registration = Registration::new(username, Email::parse(email)?, password);
    let ack = market.session().register(&registration).await?;

    info!(
        "{}",
        ack.message
            .as_deref()
            .unwrap_or("Account created, you can now log in")
    );
    Ok(())
}

pub async fn login(market: &Marketplace, email: &str, password: String) -> Result<(), CommandError> {
    let credentials = Credentials::new(Email::parse(email)?, password);
    let response = market.session().login(&credentials).await?;

    let name = market
        .session()
        .current_user()
        .map_or_else(|| response.user_id.to_string(), |u| u.display_name().to_owned());
    info!("Logged in as {name} ({})", response.role);
    Ok(())
}

pub async fn logout(market: &Marketplace) {
    market.session().logout().await;
    info!("Logged out");
}

/// Print the current user, refreshing the profile when the server is reachable.
pub async fn whoami(market: &Marketplace) -> Result<(), CommandError> {
    require_login(market)?;

    let user = match market.session().fetch_user_profile().await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "Could not refresh profile, showing stored copy");
            market
                .session()
                .current_user()
                .ok_or(CommandError::NotLoggedIn)?
        }
    };

    let role = market
        .session()
        .role()
        .map_or_else(|| "unknown".to_owned(), |r| r.to_string());
    info!(
        "{} <{}> id={} role={role}",
        user.display_name(),
        user.email.as_deref().unwrap_or("-"),
        user.id
    );
    Ok(())
}
