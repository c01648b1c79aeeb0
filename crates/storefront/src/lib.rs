//! Shopfront storefront library.
//!
//! The client-side core of the shop: catalog listing, cart, the checkout
//! wizard, the persisted auth session and the typed client for the shop's
//! REST API. Front ends (the `shopfront` CLI, tests) drive it through
//! [`state::Storefront`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod inventory;
pub mod orders;
pub mod scope;
pub mod session;
pub mod state;
