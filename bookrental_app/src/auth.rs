use std::sync::Arc;

use serde_json::Value;

use bookrental_store::document_store::{DocumentStore, DocumentStoreError};

use crate::api::{BookId, Role, User, UserId, UserPatch, USERS};
use crate::session::{SessionError, SessionStore};
use crate::validate::{validate_email, validate_name, validate_password, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email {0} is already registered")]
    EmailTaken(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Old password is not correct")]
    WrongOldPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

fn decode_user(value: Value) -> Result<User, AuthError> {
    Ok(serde_json::from_value(value).map_err(DocumentStoreError::from)?)
}

/// Account and session operations. Authentication is a plaintext-password
/// lookup against the users collection; the "session" is the raw user
/// record persisted on disk.
pub struct AuthService {
    store: Arc<dyn DocumentStore>,
    session: SessionStore,
}

impl AuthService {
    pub fn new(store: Arc<dyn DocumentStore>, session: SessionStore) -> Self {
        Self { store, session }
    }

    pub fn current_user(&self) -> Result<User, AuthError> {
        self.session.current()?.ok_or(AuthError::NotLoggedIn)
    }

    /// Looks the user up by email and password; the first hit becomes the
    /// session user.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let matches = self
            .store
            .list(
                USERS,
                &[
                    ("email".to_string(), email.to_string()),
                    ("password".to_string(), password.to_string()),
                ],
            )
            .await?;
        let user = matches
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidCredentials)
            .and_then(decode_user)?;
        self.session.save(&user)?;
        Ok(user)
    }

    /// Validates the form, runs the best-effort duplicate-email check
    /// (read then write, not atomic) and creates the account with the
    /// `user` role. The new user is logged in immediately.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        validate_name(name)?;
        validate_email(email)?;
        validate_password(password)?;

        let email = email.trim().to_string();
        let existing = self
            .store
            .list(USERS, &[("email".to_string(), email.clone())])
            .await?;
        if !existing.is_empty() {
            return Err(AuthError::EmailTaken(email));
        }

        let new_user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email,
            password: password.to_string(),
            role: Role::User,
            favorites: vec![],
        };
        let stored = self
            .store
            .create(USERS, serde_json::to_value(&new_user).map_err(DocumentStoreError::from)?)
            .await?;
        let user = decode_user(stored)?;
        self.session.save(&user)?;
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        Ok(self.session.clear()?)
    }

    /// Adds or removes the book id from the session user's favorites and
    /// sends the full updated list as one patch.
    pub async fn toggle_favorite(&self, book_id: &BookId) -> Result<User, AuthError> {
        let user = self.current_user()?;
        let mut favorites = user.favorites.clone();
        if let Some(position) = favorites.iter().position(|id| id == book_id) {
            favorites.remove(position);
        } else {
            favorites.push(book_id.clone());
        }

        let patch = UserPatch {
            favorites: Some(favorites),
            ..UserPatch::default()
        };
        let updated = self
            .apply_user_patch(&user.id, &patch)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(user.id.clone()))?;
        self.session.save(&updated)?;
        Ok(updated)
    }

    /// Updates name and email of the session user after a duplicate-email
    /// check that ignores the user itself.
    pub async fn update_profile(&self, name: &str, email: &str) -> Result<User, AuthError> {
        let user = self.current_user()?;
        validate_name(name)?;
        validate_email(email)?;

        let email = email.trim().to_string();
        self.ensure_email_free(&email, Some(&user.id)).await?;

        let patch = UserPatch {
            name: Some(name.trim().to_string()),
            email: Some(email),
            ..UserPatch::default()
        };
        let updated = self
            .apply_user_patch(&user.id, &patch)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(user.id.clone()))?;
        self.session.save(&updated)?;
        Ok(updated)
    }

    /// Changes the password and logs out, forcing a fresh login.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.current_user()?;
        if old_password != user.password {
            return Err(AuthError::WrongOldPassword);
        }
        validate_password(new_password)?;
        if new_password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let patch = UserPatch {
            password: Some(new_password.to_string()),
            ..UserPatch::default()
        };
        self.apply_user_patch(&user.id, &patch)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(user.id.clone()))?;
        self.session.clear()?;
        Ok(())
    }

    /// Errors when another user already holds the email.
    pub async fn ensure_email_free(
        &self,
        email: &str,
        except: Option<&UserId>,
    ) -> Result<(), AuthError> {
        let matches = self
            .store
            .list(USERS, &[("email".to_string(), email.to_string())])
            .await?;
        for value in matches {
            let user = decode_user(value)?;
            if except != Some(&user.id) {
                return Err(AuthError::EmailTaken(email.to_string()));
            }
        }
        Ok(())
    }

    async fn apply_user_patch(
        &self,
        user_id: &UserId,
        patch: &UserPatch,
    ) -> Result<Option<User>, AuthError> {
        let patch = serde_json::to_value(patch).map_err(DocumentStoreError::from)?;
        match self.store.patch(USERS, user_id, patch).await? {
            Some(value) => Ok(Some(decode_user(value)?)),
            None => Ok(None),
        }
    }
}
