use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use futures::future::try_join_all;

use bookrental_store::document_store::{DocumentStore, DocumentStoreError};

use crate::api::{
    decode, decode_list, Book, BookId, BookPatch, Order, OrderPatch, Role, User, UserId,
    UserPatch, BOOKS, ORDERS, USERS,
};
use crate::validate::{
    validate_book_form, validate_email, validate_name, validate_password, ValidationError,
};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Email {0} is already in use")]
    EmailTaken(String),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Book {0} not found")]
    BookNotFound(BookId),

    #[error("You cannot delete your own account")]
    CannotDeleteSelf,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

/// Create/update form for a user; `id` present means update. On update the
/// password is only changed when one is provided.
#[derive(Debug, Clone, Default)]
pub struct UserForm {
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Role,
}

/// Create/update form for a book; empty image/description are stored as
/// null.
#[derive(Debug, Clone, Default)]
pub struct BookForm {
    pub id: Option<BookId>,
    pub title: String,
    pub author: String,
    pub year: String,
    pub image: String,
    pub description: String,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Management surface over the same store the regular pages use. The
/// cascading deletes are client-orchestrated: sequentially awaited batches
/// of parallel requests with no atomicity; a crash mid-sequence leaves
/// whatever the completed requests wrote.
pub struct AdminService {
    store: Arc<dyn DocumentStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AdminError> {
        Ok(decode_list(self.store.list(USERS, &[]).await?)?)
    }

    /// Creates or updates a user. The duplicate-email check ignores the
    /// edited user; an admin editing themselves cannot change their own
    /// role (the field is ignored, as in the original form).
    pub async fn save_user(&self, actor: &User, form: UserForm) -> Result<User, AdminError> {
        validate_name(&form.name)?;
        validate_email(&form.email)?;
        match (&form.id, &form.password) {
            (None, None) => return Err(ValidationError::PasswordTooShort.into()),
            (None, Some(password)) => validate_password(password)?,
            (Some(_), Some(password)) => validate_password(password)?,
            (Some(_), None) => {}
        }

        let email = form.email.trim().to_string();
        self.ensure_email_free(&email, form.id.as_ref()).await?;

        match form.id {
            Some(user_id) => {
                let patch = UserPatch {
                    name: Some(form.name.trim().to_string()),
                    email: Some(email),
                    password: form.password,
                    role: (user_id != actor.id).then_some(form.role),
                    favorites: None,
                };
                let patch = serde_json::to_value(&patch).map_err(DocumentStoreError::from)?;
                let updated = self
                    .store
                    .patch(USERS, &user_id, patch)
                    .await?
                    .ok_or(AdminError::UserNotFound(user_id))?;
                Ok(decode(updated)?)
            }
            None => {
                let new_user = User {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: form.name.trim().to_string(),
                    email,
                    // guarded by the match above
                    password: form.password.unwrap_or_default(),
                    role: form.role,
                    favorites: vec![],
                };
                let stored = self
                    .store
                    .create(
                        USERS,
                        serde_json::to_value(&new_user).map_err(DocumentStoreError::from)?,
                    )
                    .await?;
                Ok(decode(stored)?)
            }
        }
    }

    /// Deletes a user with the full cascade: close their open orders, free
    /// their rented books, delete their orders, then the user record.
    pub async fn delete_user(&self, actor: &User, user_id: &UserId) -> Result<(), AdminError> {
        if &actor.id == user_id {
            return Err(AdminError::CannotDeleteSelf);
        }

        let orders: Vec<Order> = decode_list(
            self.store
                .list(ORDERS, &[("userId".to_string(), user_id.clone())])
                .await?,
        )?;

        let returned_at = now_iso();
        let close_patch = serde_json::to_value(OrderPatch {
            returned_at: Some(Some(returned_at)),
        })
        .map_err(DocumentStoreError::from)?;
        try_join_all(
            orders
                .iter()
                .filter(|order| !order.is_returned())
                .map(|order| self.store.patch(ORDERS, &order.id, close_patch.clone())),
        )
        .await?;

        let rented: Vec<Book> = decode_list(
            self.store
                .list(BOOKS, &[("rentedBy".to_string(), user_id.clone())])
                .await?,
        )?;
        let unlock = serde_json::to_value(BookPatch::rented_by(None))
            .map_err(DocumentStoreError::from)?;
        try_join_all(
            rented
                .iter()
                .map(|book| self.store.patch(BOOKS, &book.id, unlock.clone())),
        )
        .await?;

        try_join_all(orders.iter().map(|order| self.store.delete(ORDERS, &order.id))).await?;

        if !self.store.delete(USERS, user_id).await? {
            return Err(AdminError::UserNotFound(user_id.clone()));
        }
        Ok(())
    }

    /// Creates or updates a book. New books get id = max numeric id + 1,
    /// as the original admin page computed it.
    pub async fn save_book(&self, form: BookForm) -> Result<Book, AdminError> {
        validate_book_form(&form.title, &form.author, &form.year)?;

        match form.id {
            Some(book_id) => {
                let patch = BookPatch {
                    title: Some(form.title.trim().to_string()),
                    author: Some(form.author.trim().to_string()),
                    year: Some(form.year.trim().to_string()),
                    image: Some(blank_to_none(&form.image)),
                    description: Some(blank_to_none(&form.description)),
                    rented_by: None,
                };
                let patch = serde_json::to_value(&patch).map_err(DocumentStoreError::from)?;
                let updated = self
                    .store
                    .patch(BOOKS, &book_id, patch)
                    .await?
                    .ok_or(AdminError::BookNotFound(book_id))?;
                Ok(decode(updated)?)
            }
            None => {
                let books: Vec<Book> = decode_list(self.store.list(BOOKS, &[]).await?)?;
                let max_id = books
                    .iter()
                    .filter_map(|book| book.id.parse::<u64>().ok())
                    .max()
                    .unwrap_or(0);
                let new_book = Book {
                    id: (max_id + 1).to_string(),
                    title: form.title.trim().to_string(),
                    author: form.author.trim().to_string(),
                    year: form.year.trim().to_string(),
                    image: blank_to_none(&form.image),
                    description: blank_to_none(&form.description),
                    rented_by: None,
                };
                let stored = self
                    .store
                    .create(
                        BOOKS,
                        serde_json::to_value(&new_book).map_err(DocumentStoreError::from)?,
                    )
                    .await?;
                Ok(decode(stored)?)
            }
        }
    }

    /// Deletes a book with the cascade: drop its orders, scrub it from
    /// every user's favorites, then delete the record.
    pub async fn delete_book(&self, book_id: &BookId) -> Result<(), AdminError> {
        let orders: Vec<Order> = decode_list(
            self.store
                .list(ORDERS, &[("bookId".to_string(), book_id.clone())])
                .await?,
        )?;
        try_join_all(orders.iter().map(|order| self.store.delete(ORDERS, &order.id))).await?;

        let users: Vec<User> = decode_list(self.store.list(USERS, &[]).await?)?;
        let mut scrubs = Vec::new();
        for user in users.iter().filter(|user| user.favorites.contains(book_id)) {
            let favorites = user
                .favorites
                .iter()
                .filter(|id| *id != book_id)
                .cloned()
                .collect();
            let patch = UserPatch {
                favorites: Some(favorites),
                ..UserPatch::default()
            };
            let patch = serde_json::to_value(&patch).map_err(DocumentStoreError::from)?;
            scrubs.push((user.id.clone(), patch));
        }
        try_join_all(
            scrubs
                .iter()
                .map(|(user_id, patch)| self.store.patch(USERS, user_id, patch.clone())),
        )
        .await?;

        if !self.store.delete(BOOKS, book_id).await? {
            return Err(AdminError::BookNotFound(book_id.clone()));
        }
        Ok(())
    }

    async fn ensure_email_free(
        &self,
        email: &str,
        except: Option<&UserId>,
    ) -> Result<(), AdminError> {
        let matches: Vec<User> = decode_list(
            self.store
                .list(USERS, &[("email".to_string(), email.to_string())])
                .await?,
        )?;
        for user in matches {
            if except != Some(&user.id) {
                return Err(AdminError::EmailTaken(email.to_string()));
            }
        }
        Ok(())
    }
}
