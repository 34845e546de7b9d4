//! `GenziKart`
//!
//! Shopping cart engine for the `GenziKart` storefront: quantity-bounded cart
//! lines, a spend-threshold free gift, local persistence and best-effort sync
//! with the remote cart.

pub mod api;
pub mod background;
pub mod cart;
pub mod config;
pub mod cooldown;
pub mod fixtures;
pub mod http;
pub mod items;
pub mod notify;
pub mod observability;
pub mod pricing;
pub mod products;
pub mod promotions;
pub mod session;
pub mod storage;
