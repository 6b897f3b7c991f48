//! Shop Catalog server library.
//!
//! A Shopify app backend: merchants install it through OAuth, and it serves
//! their product catalog from the Admin REST API.
//!
//! # Security
//!
//! This crate holds the Shopify API secret and every shop's offline access
//! token. Tokens only leave the process in the `X-Shopify-Access-Token`
//! header sent to the shop itself.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod sessions;
pub mod shopify;
pub mod state;

pub use app::{backend_app, frontend_app};
