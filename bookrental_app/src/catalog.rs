use std::sync::Arc;

use bookrental_store::document_store::{DocumentStore, DocumentStoreError};

use crate::api::{Book, BookId, BOOKS};

/// Books shown per page, as on the original home page.
pub const PAGE_SIZE: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BookPage {
    pub items: Vec<Book>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Read side of the catalog. Every call re-reads the store; filtering,
/// searching and paging happen client-side on the fetched list.
pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn all_books(&self) -> Result<Vec<Book>, CatalogError> {
        let values = self.store.list(BOOKS, &[]).await?;
        let mut books = Vec::with_capacity(values.len());
        for value in values {
            books.push(serde_json::from_value(value).map_err(DocumentStoreError::from)?);
        }
        Ok(books)
    }

    pub async fn book(&self, book_id: &BookId) -> Result<Option<Book>, CatalogError> {
        match self.store.get(BOOKS, book_id).await? {
            Some(value) => Ok(Some(
                serde_json::from_value(value).map_err(DocumentStoreError::from)?,
            )),
            None => Ok(None),
        }
    }

    /// The home page view: available books only, searched and paginated.
    pub async fn browse(&self, query: &str, page: usize) -> Result<BookPage, CatalogError> {
        let books = self.all_books().await?;
        let mut available = available_books(books);
        available.retain(|book| matches_query(book, query));
        Ok(paginate(available, page))
    }
}

pub fn available_books(books: Vec<Book>) -> Vec<Book> {
    books.into_iter().filter(Book::is_available).collect()
}

/// Case-insensitive substring match over title, author and year.
pub fn matches_query(book: &Book, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    book.title.to_lowercase().contains(&query)
        || book.author.to_lowercase().contains(&query)
        || book.year.contains(&query)
}

/// Client-side pagination, 1-based. There is always at least one page;
/// out-of-range pages clamp to the last one.
pub fn paginate(books: Vec<Book>, page: usize) -> BookPage {
    let total_items = books.len();
    let total_pages = (total_items.div_ceil(PAGE_SIZE)).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * PAGE_SIZE;
    let items = books
        .into_iter()
        .skip(start)
        .take(PAGE_SIZE)
        .collect();
    BookPage {
        items,
        page,
        total_pages,
        total_items,
    }
}
