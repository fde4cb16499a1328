pub mod aggregate;
pub mod migrate;
pub mod token;
