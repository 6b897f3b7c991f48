//! Shop Catalog Core - Shared types library.
//!
//! This crate provides the pieces of Shop Catalog that need no I/O:
//! - shop domain parsing and the install form's normalization rule
//! - price and status types
//! - the catalog view: product cards, search, and the page state machine
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no HTTP, no
//! storage. The server crate renders these and feeds them fetch results.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for shop domains, prices, and statuses
//! - [`catalog`] - Product display helpers and the products page state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod types;

pub use types::*;
