pub mod appointment;
pub mod service;
pub mod token;
pub mod user;
