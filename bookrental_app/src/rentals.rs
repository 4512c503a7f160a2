use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use bookrental_store::document_store::{DocumentStore, DocumentStoreError};

use crate::api::{
    decode, decode_list, Book, BookId, BookPatch, NewOrder, Order, OrderId, OrderPatch, User,
    UserId, BOOKS, ORDERS,
};

#[derive(Debug, thiserror::Error)]
pub enum RentalsError {
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    #[error("Book {0} is already rented")]
    BookUnavailable(BookId),

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Order {0} belongs to a different user")]
    NotYourOrder(OrderId),

    #[error("Order {0} is already returned")]
    AlreadyReturned(OrderId),

    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

/// An order joined client-side with its book; the book may have been
/// deleted since the order was written.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OrderView {
    pub order: Order,
    pub book: Option<Book>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OrdersOverview {
    pub current: Vec<OrderView>,
    pub history: Vec<OrderView>,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Rental operations. A rental is two independent writes (book lock, then
/// order record) with no rollback; a return mirrors it the other way
/// around. This is the stored behaviour of the system, not an oversight.
pub struct RentalsService {
    store: Arc<dyn DocumentStore>,
}

impl RentalsService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Rents a book for the user: re-reads the book, requires it to be
    /// available, locks it via `rentedBy` and then records the order.
    /// If recording the order fails the lock stays in place.
    pub async fn rent(&self, user: &User, book_id: &BookId) -> Result<Order, RentalsError> {
        let book: Book = self
            .store
            .get(BOOKS, book_id)
            .await?
            .map(decode)
            .transpose()?
            .ok_or_else(|| RentalsError::BookNotFound(book_id.clone()))?;
        if !book.is_available() {
            return Err(RentalsError::BookUnavailable(book_id.clone()));
        }

        let lock = serde_json::to_value(BookPatch::rented_by(Some(user.id.clone())))
            .map_err(DocumentStoreError::from)?;
        self.store
            .patch(BOOKS, book_id, lock)
            .await?
            .ok_or_else(|| RentalsError::BookNotFound(book_id.clone()))?;

        let new_order = NewOrder {
            user_id: user.id.clone(),
            book_id: book_id.clone(),
            rented_at: now_iso(),
            returned_at: None,
        };
        let stored = self
            .store
            .create(
                ORDERS,
                serde_json::to_value(&new_order).map_err(DocumentStoreError::from)?,
            )
            .await?;
        Ok(decode(stored)?)
    }

    /// All orders of a user, joined with their books and split into
    /// currently rented and returned history.
    pub async fn orders_overview(&self, user_id: &UserId) -> Result<OrdersOverview, RentalsError> {
        let orders: Vec<Order> = decode_list(
            self.store
                .list(ORDERS, &[("userId".to_string(), user_id.clone())])
                .await?,
        )?;
        let books: Vec<Book> = decode_list(self.store.list(BOOKS, &[]).await?)?;

        let mut overview = OrdersOverview::default();
        for order in orders {
            let book = books.iter().find(|book| book.id == order.book_id).cloned();
            let view = OrderView { order, book };
            if view.order.is_returned() {
                overview.history.push(view);
            } else {
                overview.current.push(view);
            }
        }
        Ok(overview)
    }

    /// Marks the order as returned, then frees the book. Admins may return
    /// on behalf of any user.
    pub async fn return_order(&self, user: &User, order_id: &OrderId) -> Result<Order, RentalsError> {
        let order: Order = self
            .store
            .get(ORDERS, order_id)
            .await?
            .map(decode)
            .transpose()?
            .ok_or_else(|| RentalsError::OrderNotFound(order_id.clone()))?;
        if order.user_id != user.id && !user.is_admin() {
            return Err(RentalsError::NotYourOrder(order_id.clone()));
        }
        if order.is_returned() {
            return Err(RentalsError::AlreadyReturned(order_id.clone()));
        }

        let patch = serde_json::to_value(OrderPatch {
            returned_at: Some(Some(now_iso())),
        })
        .map_err(DocumentStoreError::from)?;
        let updated = self
            .store
            .patch(ORDERS, order_id, patch)
            .await?
            .ok_or_else(|| RentalsError::OrderNotFound(order_id.clone()))?;

        let unlock = serde_json::to_value(BookPatch::rented_by(None))
            .map_err(DocumentStoreError::from)?;
        if self.store.patch(BOOKS, &order.book_id, unlock).await?.is_none() {
            tracing::warn!("Book {} of order {} no longer exists", order.book_id, order_id);
        }

        Ok(decode(updated)?)
    }
}

#[cfg(test)]
mod rentals_tests {
    use std::sync::Arc;

    use serde_json::json;

    use bookrental_store::document_store::{DocumentStore, InMemoryDocumentStore};

    use crate::api::{Role, User};

    use super::{RentalsError, RentalsService};

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            name: "Ana".to_string(),
            email: format!("{id}@example.com"),
            password: "secret1".to_string(),
            role,
            favorites: vec![],
        }
    }

    async fn seed_book(store: &Arc<dyn DocumentStore>, id: &str) {
        store
            .create(
                "books",
                json!({"id": id, "title": "Dune", "author": "Herbert", "year": "1965", "rentedBy": null}),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rent_locks_book_and_records_order() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let rentals = RentalsService::new(store.clone());
        seed_book(&store, "b1").await;
        let ana = user("u1", Role::User);

        let order = rentals.rent(&ana, &"b1".to_string()).await.expect("Failed to rent");
        assert_eq!(order.user_id, "u1");
        assert_eq!(order.book_id, "b1");
        assert!(!order.is_returned());
        assert!(!order.id.is_empty());

        let book = store.get("books", "b1").await.unwrap().unwrap();
        assert_eq!(book["rentedBy"], "u1");

        // a second rental of the same book is rejected on fresh data
        let bob = user("u2", Role::User);
        let second = rentals.rent(&bob, &"b1".to_string()).await;
        assert!(matches!(second, Err(RentalsError::BookUnavailable(_))));

        let missing = rentals.rent(&ana, &"nope".to_string()).await;
        assert!(matches!(missing, Err(RentalsError::BookNotFound(_))));
    }

    #[tokio::test]
    async fn test_orders_overview_splits_current_and_history() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let rentals = RentalsService::new(store.clone());
        seed_book(&store, "b1").await;
        seed_book(&store, "b2").await;
        let ana = user("u1", Role::User);

        let open = rentals.rent(&ana, &"b1".to_string()).await.unwrap();
        let closed = rentals.rent(&ana, &"b2".to_string()).await.unwrap();
        rentals.return_order(&ana, &closed.id).await.unwrap();

        let overview = rentals.orders_overview(&ana.id).await.expect("Failed to list");
        assert_eq!(overview.current.len(), 1);
        assert_eq!(overview.current[0].order.id, open.id);
        assert_eq!(
            overview.current[0].book.as_ref().map(|b| b.id.as_str()),
            Some("b1")
        );
        assert_eq!(overview.history.len(), 1);
        assert_eq!(overview.history[0].order.id, closed.id);

        // another user's orders are not included
        let other = rentals.orders_overview(&"u2".to_string()).await.unwrap();
        assert!(other.current.is_empty() && other.history.is_empty());
    }

    #[tokio::test]
    async fn test_return_frees_book_and_guards_ownership() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let rentals = RentalsService::new(store.clone());
        seed_book(&store, "b1").await;
        let ana = user("u1", Role::User);
        let bob = user("u2", Role::User);
        let admin = user("a1", Role::Admin);

        let order = rentals.rent(&ana, &"b1".to_string()).await.unwrap();

        let foreign = rentals.return_order(&bob, &order.id).await;
        assert!(matches!(foreign, Err(RentalsError::NotYourOrder(_))));

        let returned = rentals
            .return_order(&admin, &order.id)
            .await
            .expect("Admin return failed");
        assert!(returned.is_returned());

        let book = store.get("books", "b1").await.unwrap().unwrap();
        assert_eq!(book.get("rentedBy"), None);

        let twice = rentals.return_order(&ana, &order.id).await;
        assert!(matches!(twice, Err(RentalsError::AlreadyReturned(_))));
    }
}
