//! Flowtoo Core - Shared types library.
//!
//! This crate provides the domain types shared between the API server and
//! any future tooling (seeders, admin CLI). It contains only types and pure
//! helpers - no I/O, no database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money helpers, emails,
//!   and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
