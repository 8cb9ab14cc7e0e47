mod address;
mod amount;
mod ledger;

pub use address::*;
pub use amount::*;
pub use ledger::*;
