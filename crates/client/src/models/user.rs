//! Authentication and user profile types.

use std::fmt;

use gavel_core::{Email, Role, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::{MissingId, document_id, keys};
use crate::persistence::Record;

/// Bearer token issued by the login endpoint.
///
/// `Debug` is redacted so tokens never land in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

impl Record for AuthToken {
    const KEY: &'static str = keys::TOKEN;
    const VERSION: u32 = 1;
}

impl Record for Role {
    const KEY: &'static str = keys::ROLE;
    const VERSION: u32 = 1;
}

/// Login form submitted to `POST /users/login`.
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(email: Email, password: impl Into<String>) -> Self {
        Self {
            email,
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Serialize for Credentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Credentials", 2)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("password", self.password.expose_secret())?;
        state.end()
    }
}

/// Sign-up form submitted to `POST /users/register`.
pub struct Registration {
    pub username: String,
    pub email: Email,
    pub password: SecretString,
}

impl Registration {
    #[must_use]
    pub fn new(username: impl Into<String>, email: Email, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email,
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Serialize for Registration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Registration", 3)?;
        state.serialize_field("username", &self.username)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("password", self.password.expose_secret())?;
        state.end()
    }
}

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: AuthToken,
    pub user_id: UserId,
    pub role: Role,
    #[serde(default)]
    pub message: Option<String>,
}

/// A marketplace user's profile.
///
/// Only the fields the client reasons about are typed. Everything else the
/// backend returns is kept in `extra` so a persisted profile round-trips
/// without losing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UserProfileWire")]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Wire shape of [`UserProfile`]. Backend documents carry `_id`, persisted
/// profiles carry `id`, and some responses carry both.
#[derive(Deserialize)]
struct UserProfileWire {
    #[serde(default, rename = "_id")]
    document_id: Option<UserId>,
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<UserProfileWire> for UserProfile {
    type Error = MissingId;

    fn try_from(wire: UserProfileWire) -> Result<Self, Self::Error> {
        Ok(Self {
            id: document_id(wire.document_id, wire.id)?,
            username: wire.username,
            email: wire.email,
            role: wire.role,
            extra: wire.extra,
        })
    }
}

impl UserProfile {
    /// Profile known only by its id, used until the full profile arrives.
    #[must_use]
    pub fn minimal(id: UserId) -> Self {
        Self {
            id,
            username: None,
            email: None,
            role: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Overlay freshly fetched fields onto this profile.
    ///
    /// Fetched values win; fields the fetch did not return are kept. The id
    /// never changes.
    pub fn merge(&mut self, fetched: Self) {
        if fetched.username.is_some() {
            self.username = fetched.username;
        }
        if fetched.email.is_some() {
            self.email = fetched.email;
        }
        if fetched.role.is_some() {
            self.role = fetched.role;
        }
        self.extra.extend(fetched.extra);
    }

    /// Name to show for this user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }
}

impl Record for UserProfile {
    const KEY: &'static str = keys::USER;
    const VERSION: u32 = 1;
}
