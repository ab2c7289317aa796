#![doc = "outfit-rules-core: core logic library for outfit-rules."]

//! This crate contains the rule data model, the document store contract and
//! the upload routine. It performs no network I/O of its own: callers hand in
//! a [`contract::DocumentStore`] implementation.
//!
//! # Usage
//! Load a rule file with [`rule::load_rules`], then pass the rules and a
//! store to [`upload::upload_rules`].

pub mod collection;
pub mod contract;
pub mod output;
pub mod rule;
pub mod upload;
