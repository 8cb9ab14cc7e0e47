//! Remote ledger explorer access.

mod client;
mod error;
mod models;

pub use client::*;
pub use error::*;
pub use models::*;
