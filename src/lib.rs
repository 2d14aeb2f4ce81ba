//! Carousel
//!
//! Carousel is the storefront core for a toy-retail shop: cart, pricing,
//! orders, catalog browsing and wishlists, built over swappable persistence
//! and payment ports.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod persistence;
pub mod prelude;
pub mod prices;
pub mod pricing;
pub mod products;
pub mod users;
pub mod wishlist;
