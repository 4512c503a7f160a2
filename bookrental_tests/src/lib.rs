//! End-to-end flows against a running document store.
//!
//! Start a store first (`cargo run -p bookrental_store --features server`,
//! or json-server) and run with
//! `cargo test -p bookrental_tests --features system_tests`.

#[cfg(all(test, feature = "system_tests"))]
mod system_tests;
