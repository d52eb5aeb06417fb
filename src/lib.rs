//! Sentence Engine — grammar-driven random sentences for typing practice.
//!
//! Expands a context-free grammar whose terminal categories are backed by
//! word sets in a key-value store, producing capitalized, punctuated
//! sentences on demand.

pub mod config;
pub mod core;
pub mod schema;
pub mod store;
