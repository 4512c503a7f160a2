use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"));

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}$").expect("Invalid year regex"));

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("Name must have at least 2 characters")]
    NameTooShort,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must have at least 6 characters")]
    PasswordTooShort,

    #[error("Title is required")]
    TitleRequired,

    #[error("Author is required")]
    AuthorRequired,

    #[error("Year must be a number of up to 4 digits")]
    InvalidYear,
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().chars().count() < 2 {
        return Err(ValidationError::NameTooShort);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 6 {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_book_form(title: &str, author: &str, year: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if author.trim().is_empty() {
        return Err(ValidationError::AuthorRequired);
    }
    if !YEAR_RE.is_match(year.trim()) {
        return Err(ValidationError::InvalidYear);
    }
    Ok(())
}
