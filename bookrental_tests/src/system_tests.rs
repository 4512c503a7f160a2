use std::env;
use std::sync::Arc;

use serde_json::{json, Value};

use bookrental_app::admin::{AdminService, BookForm, UserForm};
use bookrental_app::api::Role;
use bookrental_app::auth::AuthService;
use bookrental_app::catalog::CatalogService;
use bookrental_app::rentals::RentalsService;
use bookrental_app::session::SessionStore;
use bookrental_store::client::DocumentStoreClient;
use bookrental_store::document_store::DocumentStore;

fn store_url() -> String {
    env::var("STORE_URL").unwrap_or("http://127.0.0.1:3000".to_string())
}

fn store() -> Arc<dyn DocumentStore> {
    Arc::new(DocumentStoreClient::new(&store_url()).expect("Failed to create store client"))
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, rand::random::<u64>())
}

#[tokio::test]
/// Full member journey over HTTP:
/// Registers a user
/// Logs out and in again
/// Finds a freshly created book in the catalog
/// Favorites it, rents it, checks the order, returns it
async fn member_journey_e2e_test() {
    let store = store();
    let session_dir = tempfile::tempdir().expect("Failed to create tempdir");
    let auth = AuthService::new(
        store.clone(),
        SessionStore::new(session_dir.path().join("session.json")),
    );
    let catalog = CatalogService::new(store.clone());
    let rentals = RentalsService::new(store.clone());

    let email = format!("{}@example.com", unique("reader"));
    let user = auth
        .register("Reader", &email, "secret1")
        .await
        .expect("Failed to register");

    auth.logout().expect("Failed to logout");
    let user_again = auth
        .login(&email, "secret1")
        .await
        .expect("Failed to login");
    assert_eq!(user_again, user);

    let book_id = unique("book");
    store
        .create(
            "books",
            json!({
                "id": book_id,
                "title": unique("Title"),
                "author": "Author",
                "year": "1999",
                "rentedBy": null,
            }),
        )
        .await
        .expect("Failed to create book");

    let books = catalog.all_books().await.expect("Failed to list books");
    let book = books
        .iter()
        .find(|book| book.id == book_id)
        .expect("Created book not in catalog");
    assert!(book.is_available());

    // FAVORITE
    let favorited = auth
        .toggle_favorite(&book_id)
        .await
        .expect("Failed to favorite");
    assert!(favorited.favorites.contains(&book_id));

    // RENT
    let order = rentals
        .rent(&favorited, &book_id)
        .await
        .expect("Failed to rent");
    let rented = catalog
        .book(&book_id)
        .await
        .expect("Failed to get book")
        .expect("Book not found");
    assert_eq!(rented.rented_by.as_ref(), Some(&favorited.id));

    let overview = rentals
        .orders_overview(&favorited.id)
        .await
        .expect("Failed to list orders");
    assert!(overview.current.iter().any(|view| view.order.id == order.id));

    // RETURN
    rentals
        .return_order(&favorited, &order.id)
        .await
        .expect("Failed to return");
    let returned = catalog
        .book(&book_id)
        .await
        .expect("Failed to get book")
        .expect("Book not found");
    assert!(returned.is_available());

    let overview = rentals
        .orders_overview(&favorited.id)
        .await
        .expect("Failed to list orders");
    assert!(overview.history.iter().any(|view| view.order.id == order.id));
}

#[tokio::test]
/// Admin journey over HTTP:
/// Creates an admin and a member
/// Creates and updates a book
/// Has the member rent and favorite it
/// Deletes the member (cascade) and then the book (cascade)
async fn admin_journey_e2e_test() {
    let store = store();
    let session_dir = tempfile::tempdir().expect("Failed to create tempdir");
    let auth = AuthService::new(
        store.clone(),
        SessionStore::new(session_dir.path().join("session.json")),
    );
    let admin_service = AdminService::new(store.clone());
    let rentals = RentalsService::new(store.clone());

    let admin_email = format!("{}@example.com", unique("admin"));
    let admin = store
        .create(
            "users",
            json!({
                "id": unique("admin"),
                "name": "Admin",
                "email": admin_email,
                "password": "secret1",
                "role": "admin",
                "favorites": [],
            }),
        )
        .await
        .expect("Failed to create admin");
    let admin: bookrental_app::api::User =
        serde_json::from_value(admin).expect("Failed to decode admin");
    assert!(admin.is_admin());

    let member_email = format!("{}@example.com", unique("member"));
    let member = admin_service
        .save_user(
            &admin,
            UserForm {
                id: None,
                name: "Member".to_string(),
                email: member_email.clone(),
                password: Some("secret1".to_string()),
                role: Role::User,
            },
        )
        .await
        .expect("Failed to create member");

    let book = admin_service
        .save_book(BookForm {
            id: None,
            title: unique("Title"),
            author: "Author".to_string(),
            year: "2001".to_string(),
            image: "".to_string(),
            description: "First edition".to_string(),
        })
        .await
        .expect("Failed to create book");

    let updated = admin_service
        .save_book(BookForm {
            id: Some(book.id.clone()),
            title: book.title.clone(),
            author: "Renamed Author".to_string(),
            year: book.year.clone(),
            image: "".to_string(),
            description: "".to_string(),
        })
        .await
        .expect("Failed to update book");
    assert_eq!(updated.author, "Renamed Author");
    assert_eq!(updated.description, None);

    // the member rents and favorites the book
    let member = {
        let member_auth = AuthService::new(
            store.clone(),
            SessionStore::new(session_dir.path().join("member-session.json")),
        );
        member_auth
            .login(&member_email, "secret1")
            .await
            .expect("Failed to login member");
        member_auth
            .toggle_favorite(&book.id)
            .await
            .expect("Failed to favorite")
    };
    rentals
        .rent(&member, &book.id)
        .await
        .expect("Failed to rent");

    // DELETE MEMBER: open order closed and removed, book freed
    admin_service
        .delete_user(&admin, &member.id)
        .await
        .expect("Failed to delete member");
    let member_orders = store
        .list("orders", &[("userId".to_string(), member.id.clone())])
        .await
        .expect("Failed to list orders");
    assert!(member_orders.is_empty());
    let freed = store
        .get("books", &book.id)
        .await
        .expect("Failed to get book")
        .expect("Book not found");
    // a json-server keeps an explicit null, our store drops the key
    assert!(freed.get("rentedBy").map_or(true, Value::is_null));

    // DELETE BOOK
    admin_service
        .delete_book(&book.id)
        .await
        .expect("Failed to delete book");
    assert!(store
        .get("books", &book.id)
        .await
        .expect("Failed to get book")
        .is_none());

    // cleanup the admin account
    store
        .delete("users", &admin.id)
        .await
        .expect("Failed to delete admin");
}
