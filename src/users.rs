//! Users
//!
//! Identity is consumed, never implemented: the storefront only needs the
//! current user's id to scope orders and wishlists, plus a small profile
//! record for prefilling the checkout form. Profile writes from checkout are
//! best-effort and never block an order.

use std::fmt;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{orders::ShippingAddress, persistence::PersistenceError};

/// Identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a user id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(id.to_owned())
    }
}

/// The authenticated user as reported by the identity provider.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Stable user id
    pub uid: UserId,

    /// Email address
    pub email: String,

    /// Display name
    pub display_name: String,
}

/// Port over the external identity provider.
///
/// Only session state is consumed here; sign-in and sign-up stay entirely
/// outside this crate.
pub trait IdentityProvider {
    /// The currently signed-in user, if any.
    fn current_user(&self) -> Option<CurrentUser>;
}

/// A stored user profile.
#[derive(Debug, Clone)]
pub struct UserProfile {
    /// Stable user id
    pub uid: UserId,

    /// Email address
    pub email: String,

    /// Display name
    pub display_name: String,

    /// Optional avatar reference
    pub photo_url: Option<String>,

    /// Phone number
    pub phone: Option<String>,

    /// Last shipping address used at checkout
    pub shipping_address: Option<ShippingAddress>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Errors from profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No profile exists for the user.
    #[error("no profile stored for user {0}")]
    NotFound(UserId),

    /// Wrapped backing-store error.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Port over the document store's user-profile records.
pub trait ProfileStore {
    /// Fetch a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the read fails.
    fn get(&self, user: &UserId) -> Result<Option<UserProfile>, PersistenceError>;

    /// Insert or replace a profile.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the write fails.
    fn upsert(&mut self, profile: &UserProfile) -> Result<(), PersistenceError>;
}

/// Profile service over a [`ProfileStore`] port.
#[derive(Debug)]
pub struct Profiles<S> {
    store: S,
}

impl<S: ProfileStore> Profiles<S> {
    /// Create a profile service over the given store.
    pub fn new(store: S) -> Self {
        Profiles { store }
    }

    /// Fetch a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if the read fails.
    pub fn get(&self, user: &UserId) -> Result<Option<UserProfile>, ProfileError> {
        Ok(self.store.get(user)?)
    }

    /// Create a fresh profile for a newly registered user.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if the write fails.
    pub fn create(
        &mut self,
        user: &CurrentUser,
    ) -> Result<UserProfile, ProfileError> {
        let now = Utc::now();

        let profile = UserProfile {
            uid: user.uid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            photo_url: None,
            phone: None,
            shipping_address: None,
            created_at: now,
            updated_at: now,
        };

        self.store.upsert(&profile)?;

        Ok(profile)
    }

    /// Replace a stored profile, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] if no profile exists for the user,
    /// or a wrapped [`PersistenceError`] if the write fails.
    pub fn update(&mut self, mut profile: UserProfile) -> Result<UserProfile, ProfileError> {
        if self.store.get(&profile.uid)?.is_none() {
            return Err(ProfileError::NotFound(profile.uid));
        }

        profile.updated_at = Utc::now();
        self.store.upsert(&profile)?;

        Ok(profile)
    }

    /// Remember the shipping address a user checked out with.
    ///
    /// Creates a minimal profile if none exists yet; checkout treats failures
    /// here as non-fatal.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if the read or write fails.
    pub fn remember_address(
        &mut self,
        user: &UserId,
        address: &ShippingAddress,
    ) -> Result<(), ProfileError> {
        let now = Utc::now();

        let mut profile = match self.store.get(user)? {
            Some(profile) => profile,
            None => UserProfile {
                uid: user.clone(),
                email: address.email.clone(),
                display_name: address.full_name.clone(),
                photo_url: None,
                phone: None,
                shipping_address: None,
                created_at: now,
                updated_at: now,
            },
        };

        profile.shipping_address = Some(address.clone());
        profile.phone = Some(address.phone.clone());
        profile.updated_at = now;

        Ok(self.store.upsert(&profile)?)
    }
}

/// In-memory profile store for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: FxHashMap<UserId, UserProfile>,
}

impl ProfileStore for InMemoryProfileStore {
    fn get(&self, user: &UserId) -> Result<Option<UserProfile>, PersistenceError> {
        Ok(self.profiles.get(user).cloned())
    }

    fn upsert(&mut self, profile: &UserProfile) -> Result<(), PersistenceError> {
        self.profiles.insert(profile.uid.clone(), profile.clone());

        Ok(())
    }
}
