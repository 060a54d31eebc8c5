//! Command handlers

pub mod config;
pub mod equipment;
pub mod loan;
pub mod people;
pub mod status;
