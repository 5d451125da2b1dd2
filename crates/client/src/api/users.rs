//! `/users` endpoints.

use async_trait::async_trait;
use gavel_core::UserId;
#[cfg(test)]
use mockall::automock;
use tracing::instrument;

use super::{ApiClient, ApiError, Single, segment};
use crate::models::{ApiMessage, Credentials, Listing, LoginResponse, Registration, UserProfile};

/// Authentication and user-management endpoints.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserApi: Send + Sync {
    /// `POST /users/register`
    async fn register(&self, registration: &Registration) -> Result<ApiMessage, ApiError>;

    /// `POST /users/login`
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;

    /// `POST /users/logout`
    async fn logout(&self) -> Result<ApiMessage, ApiError>;

    /// `GET /users/users` (admin)
    async fn list_users(&self) -> Result<Vec<UserProfile>, ApiError>;

    /// `GET /users/user/:id`
    async fn get_user(&self, id: &UserId) -> Result<UserProfile, ApiError>;

    /// `DELETE /users/user/:id` (admin)
    async fn delete_user(&self, id: &UserId) -> Result<ApiMessage, ApiError>;

    /// `PATCH /users/promote/:id` (admin)
    async fn promote_user(&self, id: &UserId) -> Result<ApiMessage, ApiError>;
}

#[async_trait]
impl UserApi for ApiClient {
    #[instrument(skip_all, fields(username = %registration.username))]
    async fn register(&self, registration: &Registration) -> Result<ApiMessage, ApiError> {
        self.post("/users/register", registration).await
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.post("/users/login", credentials).await
    }

    #[instrument(skip_all)]
    async fn logout(&self) -> Result<ApiMessage, ApiError> {
        self.post("/users/logout", &serde_json::json!({})).await
    }

    #[instrument(skip_all)]
    async fn list_users(&self) -> Result<Vec<UserProfile>, ApiError> {
        let listing: Listing<UserProfile> = self.get("/users/users").await?;
        Ok(listing.into_vec())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: &UserId) -> Result<UserProfile, ApiError> {
        let user: Single<UserProfile> = self
            .get(&format!("/users/user/{}", segment(id.as_str())))
            .await?;
        Ok(user.into_inner())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: &UserId) -> Result<ApiMessage, ApiError> {
        self.delete(&format!("/users/user/{}", segment(id.as_str())))
            .await
    }

    #[instrument(skip(self))]
    async fn promote_user(&self, id: &UserId) -> Result<ApiMessage, ApiError> {
        let path = format!("/users/promote/{}", segment(id.as_str()));
        self.send(self.request(reqwest::Method::PATCH, &path, &[])?)
            .await
    }
}
