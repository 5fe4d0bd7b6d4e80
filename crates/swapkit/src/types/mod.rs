pub mod allowance;
pub mod chain;
pub mod quote;
pub mod snapshot;
pub mod token;
