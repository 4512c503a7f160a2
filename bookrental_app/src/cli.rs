//! Clap argument types. Subcommands stand in for the routes of the
//! original web client: home, book detail, login, registration, profile,
//! orders and the admin sub-pages.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use bookrental_app::api::Role;
use bookrental_app::covers;

/// Library rental client over a REST document store.
#[derive(Parser, Debug)]
#[command(name = "bookrental", version)]
pub struct Cli {
    /// Base URL of the document store.
    #[arg(
        long,
        global = true,
        env = "BOOKRENTAL_STORE_URL",
        default_value = "http://localhost:3000"
    )]
    pub store_url: String,

    /// Session file location (defaults to the platform config directory).
    #[arg(long, global = true, env = "BOOKRENTAL_SESSION")]
    pub session_file: Option<PathBuf>,

    /// Base URL of the cover-metadata search service.
    #[arg(
        long,
        global = true,
        env = "BOOKRENTAL_COVERS_URL",
        default_value = covers::DEFAULT_SEARCH_URL
    )]
    pub covers_url: String,

    /// Base URL of the cover image host.
    #[arg(
        long,
        global = true,
        env = "BOOKRENTAL_COVER_IMAGES_URL",
        default_value = covers::DEFAULT_IMAGES_URL
    )]
    pub cover_images_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Browse available books (searched and paginated).
    Browse(BrowseArgs),

    /// Show one book, including a cover lookup.
    Book {
        /// Book id.
        id: String,
    },

    /// Create an account and log in.
    Register(RegisterArgs),

    /// Log in with email and password.
    Login(LoginArgs),

    /// Clear the session.
    Logout,

    /// Show or edit the logged-in user's profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Toggle a book in the favorites list.
    Favorite {
        /// Book id.
        book_id: String,
    },

    /// List favorite books.
    Favorites,

    /// Rent a book.
    Rent {
        /// Book id.
        book_id: String,
    },

    /// List the logged-in user's orders.
    Orders,

    /// Return a rented book by order id.
    Return {
        /// Order id.
        order_id: String,
    },

    /// Administration of users, books and orders.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Parser, Debug)]
pub struct BrowseArgs {
    /// Search over title, author and year.
    #[arg(long, default_value = "")]
    pub query: String,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    pub page: usize,
}

#[derive(Parser, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Parser, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(clap::Subcommand, Debug)]
pub enum ProfileAction {
    /// Show the logged-in user.
    Show,
    /// Update name and email.
    Update {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Change the password (logs you out).
    Password {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum AdminAction {
    /// Manage users.
    Users {
        #[command(subcommand)]
        action: AdminUsersAction,
    },
    /// Manage books.
    Books {
        #[command(subcommand)]
        action: AdminBooksAction,
    },
    /// Inspect the orders of any user.
    Orders {
        /// User id.
        user_id: String,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum AdminUsersAction {
    /// List all users.
    List,
    /// Create a user, or update one when --id is given.
    Save(UserSaveArgs),
    /// Delete a user and cascade over their orders and books.
    Delete {
        /// User id.
        user_id: String,
    },
}

#[derive(Parser, Debug)]
pub struct UserSaveArgs {
    /// Update this user instead of creating a new one.
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    /// Required when creating; on update, only set when provided.
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long, value_enum, default_value = "user")]
    pub role: RoleArg,
}

#[derive(clap::Subcommand, Debug)]
pub enum AdminBooksAction {
    /// List all books, including rented ones.
    List,
    /// Create a book, or update one when --id is given.
    Save(BookSaveArgs),
    /// Delete a book and cascade over orders and favorites.
    Delete {
        /// Book id.
        book_id: String,
    },
}

#[derive(Parser, Debug)]
pub struct BookSaveArgs {
    /// Update this book instead of creating a new one.
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub author: String,
    #[arg(long)]
    pub year: String,
    /// Cover image URL; empty clears it.
    #[arg(long, default_value = "")]
    pub image: String,
    /// Description; empty clears it.
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum RoleArg {
    User,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => Role::User,
            RoleArg::Admin => Role::Admin,
        }
    }
}
