pub mod application;
pub mod cli;
pub mod domain;
pub mod explorer;
pub mod io;
pub mod storage;
pub mod telemetry;

pub use domain::*;
pub use storage::{AddressRepository, Repository};
