//! # Inventory Dashboard Library
//!
//! The inventory domain on top of `fetcher-framework`: items, the simulated inventory
//! service, the clients a page uses, and the page's view models. It exposes the core modules
//! of the application for integration testing.

pub mod clients;
pub mod config;
pub mod inventory_actor;
pub mod lifecycle;
pub mod model;
pub mod view;
