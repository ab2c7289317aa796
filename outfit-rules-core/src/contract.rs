#![allow(unused)]

//! # contract: interface to the destination document store
//!
//! This module defines a single trait ([`DocumentStore`]) and the plain data
//! types that cross it. The upload routine only ever talks to this trait, so
//! the production Firestore client, `mockall` mocks and in-memory fakes are
//! interchangeable.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; `MockDocumentStore` is exported
//!   when the `test-export-mocks` feature is on (the default).
//!
//! ## Adding New Destinations
//! - Implement the trait for your destination.
//! - Map transport and API failures onto [`StoreError`] variants.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use mockall::{automock, predicate::*};

use crate::collection::CollectionId;

/// Represents a document after the store accepted it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StoredDocument {
    /// Full resource name as reported by the store.
    pub name: String,
    /// Store-assigned document id (last segment of `name`).
    pub id: String,
    pub create_time: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The document could not be expressed in the store's value model.
    #[error("failed to encode document: {0}")]
    Encode(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode store response: {0}")]
    Decode(String),
}

/// Trait for writing documents into a named collection.
/// The implementor owns the connection and any authentication state.
///
/// The trait is `Send` + `Sync` and intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a new document with a store-generated id.
    ///
    /// Every call creates a fresh document; nothing is deduplicated.
    async fn add_document(
        &self,
        collection: &CollectionId,
        document: &Map<String, Value>,
    ) -> Result<StoredDocument, StoreError>;
}
