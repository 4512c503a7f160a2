mod cli;

use std::process;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bookrental_store::client::DocumentStoreClient;
use bookrental_store::document_store::DocumentStore;

use bookrental_app::admin::{AdminService, BookForm, UserForm};
use bookrental_app::api::{Book, Role, User};
use bookrental_app::auth::AuthService;
use bookrental_app::catalog::CatalogService;
use bookrental_app::covers::CoverLookupClient;
use bookrental_app::rentals::{OrderView, RentalsService};
use bookrental_app::session::SessionStore;

use cli::{
    AdminAction, AdminBooksAction, AdminUsersAction, BrowseArgs, Cli, Command, ProfileAction,
};

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

struct App {
    auth: AuthService,
    catalog: CatalogService,
    rentals: RentalsService,
    admin: AdminService,
    covers: CoverLookupClient,
}

impl App {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = Arc::new(DocumentStoreClient::new(&cli.store_url)?);
        let session = SessionStore::new(
            cli.session_file
                .clone()
                .unwrap_or_else(SessionStore::default_path),
        );
        Ok(Self {
            auth: AuthService::new(store.clone(), session),
            catalog: CatalogService::new(store.clone()),
            rentals: RentalsService::new(store.clone()),
            admin: AdminService::new(store),
            covers: CoverLookupClient::new(&cli.covers_url, &cli.cover_images_url)?,
        })
    }

    /// Rent and favorite actions are offered to regular accounts only,
    /// as in the original UI.
    fn require_member(&self) -> Result<User> {
        let user = self.auth.current_user()?;
        if user.role != Role::User {
            bail!("This action is only available to regular user accounts");
        }
        Ok(user)
    }

    fn require_admin(&self) -> Result<User> {
        let user = self.auth.current_user()?;
        if !user.is_admin() {
            bail!("This action requires an admin account");
        }
        Ok(user)
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let app = App::from_cli(&cli)?;

    match cli.command {
        Command::Browse(args) => browse(&app, args).await,
        Command::Book { id } => show_book(&app, &id).await,
        Command::Register(args) => {
            let user = app
                .auth
                .register(&args.name, &args.email, &args.password)
                .await?;
            println!("Welcome, {}! You are now logged in.", user.name);
            Ok(())
        }
        Command::Login(args) => {
            let user = app.auth.login(&args.email, &args.password).await?;
            println!("Welcome, {}!", user.name);
            Ok(())
        }
        Command::Logout => {
            app.auth.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Profile { action } => profile(&app, action).await,
        Command::Favorite { book_id } => {
            let user = app.require_member()?;
            let was_favorite = user.favorites.contains(&book_id);
            let user = app.auth.toggle_favorite(&book_id).await?;
            if was_favorite {
                println!("Removed book {} from favorites.", book_id);
            } else {
                println!("Added book {} to favorites.", book_id);
            }
            println!("{} favorites total.", user.favorites.len());
            Ok(())
        }
        Command::Favorites => favorites(&app).await,
        Command::Rent { book_id } => {
            let user = app.require_member()?;
            let order = app.rentals.rent(&user, &book_id).await?;
            println!("Book {} rented, order {}.", order.book_id, order.id);
            Ok(())
        }
        Command::Orders => {
            let user = app.auth.current_user()?;
            orders(&app, &user.id).await
        }
        Command::Return { order_id } => {
            let user = app.auth.current_user()?;
            let order = app.rentals.return_order(&user, &order_id).await?;
            println!("Order {} returned, book {} is available again.", order.id, order.book_id);
            Ok(())
        }
        Command::Admin { action } => admin(&app, action).await,
    }
}

async fn browse(app: &App, args: BrowseArgs) -> Result<()> {
    let page = app.catalog.browse(&args.query, args.page).await?;
    if page.items.is_empty() {
        println!("No available books match.");
    }
    for book in &page.items {
        print_book_line(book);
    }
    println!(
        "Page {} / {} ({} available)",
        page.page, page.total_pages, page.total_items
    );
    Ok(())
}

async fn show_book(app: &App, id: &str) -> Result<()> {
    let Some(book) = app.catalog.book(&id.to_string()).await? else {
        bail!("Book {} not found", id);
    };
    println!("{} by {} ({})", book.title, book.author, book.year);
    if let Some(description) = &book.description {
        println!("{}", description);
    }
    println!(
        "Status: {}",
        if book.is_available() { "available" } else { "rented" }
    );
    match &book.image {
        Some(image) => println!("Image: {}", image),
        None => match app.covers.cover_url(&book.title).await {
            Ok(Some(url)) => println!("Cover: {}", url),
            Ok(None) => {}
            // a failed lookup only costs the cover, as in the original
            Err(err) => tracing::error!("Cover lookup failed: {:#}", err),
        },
    }
    if let Ok(user) = app.auth.current_user() {
        if user.favorites.contains(&book.id) {
            println!("This book is in your favorites.");
        }
    }
    Ok(())
}

async fn profile(app: &App, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show => {
            let user = app.auth.current_user()?;
            println!("{} <{}>", user.name, user.email);
            println!("Role: {:?}", user.role);
            println!("Favorites: {}", user.favorites.len());
        }
        ProfileAction::Update { name, email } => {
            let user = app.auth.update_profile(&name, &email).await?;
            println!("Profile updated: {} <{}>", user.name, user.email);
        }
        ProfileAction::Password { old, new, confirm } => {
            app.auth.change_password(&old, &new, &confirm).await?;
            println!("Password changed, please log in again.");
        }
    }
    Ok(())
}

async fn favorites(app: &App) -> Result<()> {
    let user = app.auth.current_user()?;
    let books = app.catalog.all_books().await?;
    let favorites: Vec<&Book> = books
        .iter()
        .filter(|book| user.favorites.contains(&book.id))
        .collect();
    if favorites.is_empty() {
        println!("You have no favorite books.");
    }
    for book in favorites {
        print_book_line(book);
    }
    Ok(())
}

async fn orders(app: &App, user_id: &str) -> Result<()> {
    let overview = app.rentals.orders_overview(&user_id.to_string()).await?;
    println!("Currently rented:");
    if overview.current.is_empty() {
        println!("  (none)");
    }
    for view in &overview.current {
        print_order_line(view);
    }
    println!("History:");
    if overview.history.is_empty() {
        println!("  (none)");
    }
    for view in &overview.history {
        print_order_line(view);
    }
    Ok(())
}

async fn admin(app: &App, action: AdminAction) -> Result<()> {
    let actor = app.require_admin()?;
    match action {
        AdminAction::Users { action } => match action {
            AdminUsersAction::List => {
                for user in app.admin.list_users().await? {
                    println!(
                        "{:<38} {:<25} {:<30} {:?}",
                        user.id, user.name, user.email, user.role
                    );
                }
            }
            AdminUsersAction::Save(args) => {
                let user = app
                    .admin
                    .save_user(
                        &actor,
                        UserForm {
                            id: args.id,
                            name: args.name,
                            email: args.email,
                            password: args.password,
                            role: args.role.into(),
                        },
                    )
                    .await?;
                println!("Saved user {} ({}).", user.name, user.id);
            }
            AdminUsersAction::Delete { user_id } => {
                app.admin.delete_user(&actor, &user_id).await?;
                println!("User {} deleted, their orders returned and removed.", user_id);
            }
        },
        AdminAction::Books { action } => match action {
            AdminBooksAction::List => {
                for book in app.catalog.all_books().await? {
                    print_book_line(&book);
                }
            }
            AdminBooksAction::Save(args) => {
                let book = app
                    .admin
                    .save_book(BookForm {
                        id: args.id,
                        title: args.title,
                        author: args.author,
                        year: args.year,
                        image: args.image,
                        description: args.description,
                    })
                    .await?;
                println!("Saved book {} ({}).", book.title, book.id);
            }
            AdminBooksAction::Delete { book_id } => {
                app.admin.delete_book(&book_id).await?;
                println!("Book {} deleted, orders and favorites cleaned up.", book_id);
            }
        },
        AdminAction::Orders { user_id } => orders(app, &user_id).await?,
    }
    Ok(())
}

fn print_book_line(book: &Book) {
    let status = match &book.rented_by {
        Some(user_id) => format!("rented by {}", user_id),
        None => "available".to_string(),
    };
    println!(
        "{:<6} {:<35} {:<25} {:<6} {}",
        book.id, book.title, book.author, book.year, status
    );
}

fn print_order_line(view: &OrderView) {
    let title = view
        .book
        .as_ref()
        .map(|book| book.title.as_str())
        .unwrap_or("(unknown book)");
    let returned = view
        .order
        .returned_at
        .as_deref()
        .map(|at| format!(", returned {}", at))
        .unwrap_or_default();
    println!(
        "  {:<38} {:<35} rented {}{}",
        view.order.id, title, view.order.rented_at, returned
    );
}
