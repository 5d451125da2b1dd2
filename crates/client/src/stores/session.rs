//! Authentication session state.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use gavel_core::Role;
use tracing::{debug, info, instrument, warn};

use super::SessionError;
use crate::api::UserApi;
use crate::models::{ApiMessage, AuthToken, Credentials, LoginResponse, Registration, UserProfile};
use crate::persistence::PersistedStore;

/// Current authentication state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated {
        token: AuthToken,
        user: UserProfile,
        role: Role,
    },
}

impl Session {
    /// Rebuild a session from persisted records.
    ///
    /// Returns `None` when only some of the three records are present.
    fn from_parts(
        token: Option<AuthToken>,
        user: Option<UserProfile>,
        role: Option<Role>,
    ) -> Option<Self> {
        match (token, user, role) {
            (Some(token), Some(user), Some(role)) => Some(Self::Authenticated { token, user, role }),
            (None, None, None) => Some(Self::Anonymous),
            _ => None,
        }
    }
}

/// Holds the logged-in user and keeps the `token`, `user` and `role` records
/// in sync with it.
pub struct SessionStore {
    store: PersistedStore,
    api: Arc<dyn UserApi>,
    state: RwLock<Session>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.read())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Restore the session from `store`.
    ///
    /// A partial session (say a token with no user) is treated as corrupt:
    /// all three records are removed and the store starts anonymous.
    #[must_use]
    pub fn new(store: PersistedStore, api: Arc<dyn UserApi>) -> Self {
        let token = store.load::<AuthToken>();
        let user = store.load::<UserProfile>();
        let role = store.load::<Role>();
        let (has_token, has_user, has_role) = (token.is_some(), user.is_some(), role.is_some());

        let state = Session::from_parts(token, user, role).unwrap_or_else(|| {
            warn!(
                has_token,
                has_user, has_role, "Partial session in storage, resetting to anonymous"
            );
            clear_records(&store);
            Session::Anonymous
        });

        Self {
            store,
            api,
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, session: Session) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Snapshot of the whole session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.read().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(*self.read(), Session::Authenticated { .. })
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        match &*self.read() {
            Session::Authenticated { user, .. } => Some(user.clone()),
            Session::Anonymous => None,
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<AuthToken> {
        match &*self.read() {
            Session::Authenticated { token, .. } => Some(token.clone()),
            Session::Anonymous => None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        match &*self.read() {
            Session::Authenticated { role, .. } => Some(*role),
            Session::Anonymous => None,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Log in and load the user's profile.
    ///
    /// The session is established from the login response alone; the profile
    /// fetch that follows only enriches it. If that fetch fails the user stays
    /// logged in with an id-only profile.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Api`] if the login request fails. The session
    /// is left untouched in that case.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, SessionError> {
        let response = self.api.login(credentials).await?;

        let user = UserProfile::minimal(response.user_id.clone());
        self.store.save(&response.token);
        self.store.save(&user);
        self.store.save(&response.role);
        self.replace(Session::Authenticated {
            token: response.token.clone(),
            user,
            role: response.role,
        });
        info!(user_id = %response.user_id, role = %response.role, "Logged in");

        match self.api.get_user(&response.user_id).await {
            Ok(profile) => {
                self.merge_profile(profile);
            }
            Err(e) => {
                warn!(
                    user_id = %response.user_id,
                    error = %e,
                    "Failed to fetch profile after login, keeping minimal profile"
                );
            }
        }

        Ok(response)
    }

    /// Log out locally and remotely.
    ///
    /// Local state is always cleared, even when the server call fails.
    #[instrument(skip_all)]
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Remote logout failed, clearing local session anyway");
        }
        self.clear_auth_state();
        info!("Logged out");
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Api`] if the server rejects the registration.
    #[instrument(skip_all, fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<ApiMessage, SessionError> {
        let ack = self.api.register(registration).await?;
        info!("Registered new account");
        Ok(ack)
    }

    /// Refresh the logged-in user's profile from the server.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] when there is no user, or
    /// [`SessionError::Api`] if the fetch fails.
    #[instrument(skip_all)]
    pub async fn fetch_user_profile(&self) -> Result<UserProfile, SessionError> {
        let id = self
            .current_user()
            .map(|user| user.id)
            .ok_or(SessionError::NotLoggedIn)?;

        let profile = self.api.get_user(&id).await?;
        self.merge_profile(profile)
            .ok_or(SessionError::NotLoggedIn)
    }

    /// Drop the session in memory and in storage.
    pub fn clear_auth_state(&self) {
        self.replace(Session::Anonymous);
        clear_records(&self.store);
        debug!("Cleared auth state");
    }

    /// Merge a fetched profile into the current user and persist it.
    ///
    /// Returns `None` if the session ended (or changed user) while the
    /// profile was in flight.
    fn merge_profile(&self, profile: UserProfile) -> Option<UserProfile> {
        let merged = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            match &mut *state {
                Session::Authenticated { user, .. } if user.id == profile.id => {
                    user.merge(profile);
                    user.clone()
                }
                _ => return None,
            }
        };
        self.store.save(&merged);
        Some(merged)
    }
}

fn clear_records(store: &PersistedStore) {
    store.remove::<AuthToken>();
    store.remove::<UserProfile>();
    store.remove::<Role>();
}
