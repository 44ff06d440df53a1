//! Ladle: recipes, meal plans and shopping lists that sync.
//!
//! Offline-first: everything is written to the local SQLite store first and
//! replicated to the remote document store in the background by per-entity
//! sync workers (see [`sync`]). The CLI in `main.rs` is one front end over
//! this crate.

pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod remote;
pub mod session;
pub mod sync;
