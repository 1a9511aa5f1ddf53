//! Domain types and booking rules for the barbershop service.
//!
//! Nothing in this crate touches the database or the network; the `db`,
//! `calendar` and `api` crates build on these types.

pub mod errors;
pub mod models;
pub mod scheduling;
