//! User profile.
//!
//! A minimal client-side identity record. There is no server-verified
//! identity: creating a profile validates the fields, persists the record
//! and opens the wallet with the signup bonus. Signing out clears only the
//! session reference; the backing record stays.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ids,
    store::{KeyValueStore, StoreError, keys},
    wallet::{Wallet, WalletError},
};

/// Errors related to profile creation and update.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Profile creation requires a non-empty name.
    #[error("name must not be empty")]
    EmptyName,

    /// The email must at least contain an `@`.
    #[error("email looks invalid: {0}")]
    InvalidEmail(String),

    /// The profile could not be persisted; the operation is not committed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The signup wallet could not be opened.
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Minimal identity record. The id never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    id: String,
    name: String,
    email: String,
    phone: String,
    address: String,
    created_at: Timestamp,
}

impl UserProfile {
    /// Create and persist a profile, record the session reference, and open
    /// the wallet with the signup bonus.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] when validation fails or the record cannot
    /// be persisted.
    pub fn create<S: KeyValueStore>(
        store: &mut S,
        name: &str,
        email: &str,
        phone: &str,
        address: &str,
    ) -> Result<Self, ProfileError> {
        validate(name, email)?;

        let profile = Self {
            id: ids::timestamped("user"),
            name: name.trim().to_owned(),
            email: email.trim().to_owned(),
            phone: phone.trim().to_owned(),
            address: address.trim().to_owned(),
            created_at: Timestamp::now(),
        };

        store.set_json(keys::PROFILE, &profile)?;
        store.set(keys::SESSION, &profile.id)?;

        Wallet::open(store, &profile.id)?;

        tracing::info!(profile_id = %profile.id, "profile created");

        Ok(profile)
    }

    /// Load the stored profile, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be read.
    pub fn load<S: KeyValueStore>(store: &S) -> Result<Option<Self>, StoreError> {
        store.get_json(keys::PROFILE)
    }

    /// Update the editable fields. The id and creation time never change.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] when validation fails or the record cannot
    /// be persisted; the previous fields are kept in that case.
    pub fn update<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        name: &str,
        email: &str,
        phone: &str,
        address: &str,
    ) -> Result<(), ProfileError> {
        validate(name, email)?;

        let previous = self.clone();

        self.name = name.trim().to_owned();
        self.email = email.trim().to_owned();
        self.phone = phone.trim().to_owned();
        self.address = address.trim().to_owned();

        if let Err(err) = store.set_json(keys::PROFILE, self) {
            *self = previous;
            return Err(err.into());
        }

        Ok(())
    }

    /// The profile id of the active session, if signed in.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be read.
    pub fn current_session<S: KeyValueStore>(store: &S) -> Result<Option<String>, StoreError> {
        store.get(keys::SESSION)
    }

    /// Clear the session reference. The profile record, wallet and order
    /// history stay untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be written.
    pub fn sign_out<S: KeyValueStore>(store: &mut S) -> Result<(), StoreError> {
        store.remove(keys::SESSION)
    }

    /// Assigned once at creation; never changes.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contact email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Contact phone.
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Default delivery address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// When the profile was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// References to photos this profile has saved. Image bytes live with
    /// the upload service; only references are stored here.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be read.
    pub fn saved_photos<S: KeyValueStore>(&self, store: &S) -> Result<Vec<String>, StoreError> {
        Ok(store
            .get_json(&keys::saved_photos(&self.id))?
            .unwrap_or_default())
    }

    /// Save a photo reference. Saving an already-saved reference is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the list cannot be persisted.
    pub fn save_photo<S: KeyValueStore>(
        &self,
        store: &mut S,
        image_ref: &str,
    ) -> Result<(), StoreError> {
        let mut photos = self.saved_photos(store)?;

        if photos.iter().any(|existing| existing == image_ref) {
            return Ok(());
        }

        photos.push(image_ref.to_owned());

        store.set_json(&keys::saved_photos(&self.id), &photos)
    }

    /// Remove a saved photo reference. Removing an absent reference is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the list cannot be persisted.
    pub fn remove_photo<S: KeyValueStore>(
        &self,
        store: &mut S,
        image_ref: &str,
    ) -> Result<(), StoreError> {
        let mut photos = self.saved_photos(store)?;
        let before = photos.len();

        photos.retain(|existing| existing != image_ref);

        if photos.len() == before {
            return Ok(());
        }

        store.set_json(&keys::saved_photos(&self.id), &photos)
    }
}

fn validate(name: &str, email: &str) -> Result<(), ProfileError> {
    if name.trim().is_empty() {
        return Err(ProfileError::EmptyName);
    }

    if !email.contains('@') {
        return Err(ProfileError::InvalidEmail(email.to_owned()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{store::MemoryStore, wallet::SIGNUP_BONUS};

    use super::*;

    #[test]
    fn create_persists_profile_session_and_wallet() -> TestResult {
        let mut store = MemoryStore::new();

        let profile = UserProfile::create(&mut store, "Meera", "meera@example.com", "98400", "12 Lake Rd")?;

        assert_eq!(UserProfile::load(&store)?.as_ref(), Some(&profile));
        assert_eq!(
            UserProfile::current_session(&store)?.as_deref(),
            Some(profile.id())
        );

        let wallet = Wallet::open(&mut store, profile.id())?;
        assert_eq!(wallet.balance(), SIGNUP_BONUS);

        Ok(())
    }

    #[test]
    fn empty_name_and_bad_email_are_rejected() {
        let mut store = MemoryStore::new();

        assert!(matches!(
            UserProfile::create(&mut store, "  ", "meera@example.com", "", ""),
            Err(ProfileError::EmptyName)
        ));
        assert!(matches!(
            UserProfile::create(&mut store, "Meera", "not-an-email", "", ""),
            Err(ProfileError::InvalidEmail(_))
        ));
    }

    #[test]
    fn sign_out_clears_only_the_session() -> TestResult {
        let mut store = MemoryStore::new();

        let profile = UserProfile::create(&mut store, "Meera", "meera@example.com", "", "")?;
        UserProfile::sign_out(&mut store)?;

        assert_eq!(UserProfile::current_session(&store)?, None);
        assert_eq!(
            UserProfile::load(&store)?.as_ref(),
            Some(&profile),
            "the backing record must survive sign-out"
        );

        Ok(())
    }

    #[test]
    fn saved_photos_deduplicate_and_survive_removal_noops() -> TestResult {
        let mut store = MemoryStore::new();
        let profile = UserProfile::create(&mut store, "Meera", "meera@example.com", "", "")?;

        profile.save_photo(&mut store, "img/beach.jpg")?;
        profile.save_photo(&mut store, "img/beach.jpg")?;
        profile.save_photo(&mut store, "img/hills.jpg")?;

        assert_eq!(
            profile.saved_photos(&store)?,
            vec!["img/beach.jpg".to_owned(), "img/hills.jpg".to_owned()]
        );

        profile.remove_photo(&mut store, "img/beach.jpg")?;
        profile.remove_photo(&mut store, "img/not-saved.jpg")?;

        assert_eq!(profile.saved_photos(&store)?, vec!["img/hills.jpg".to_owned()]);

        Ok(())
    }

    #[test]
    fn update_keeps_the_id_and_rejects_bad_fields() -> TestResult {
        let mut store = MemoryStore::new();
        let mut profile = UserProfile::create(&mut store, "Meera", "meera@example.com", "", "")?;
        let id = profile.id().to_owned();

        profile.update(&mut store, "Meera R", "meera.r@example.com", "98400", "12 Lake Rd")?;
        assert_eq!(profile.id(), id);
        assert_eq!(profile.name(), "Meera R");

        assert!(
            profile
                .update(&mut store, "", "meera@example.com", "", "")
                .is_err(),
            "empty name must be rejected"
        );
        assert_eq!(profile.name(), "Meera R", "failed update keeps old fields");

        Ok(())
    }
}
