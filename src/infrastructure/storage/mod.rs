//! Storage infrastructure - database pools and store selection

mod factory;
mod postgres;

pub use factory::{StoreConfig, StoreFactory, StoreType};
pub use postgres::{connect, PostgresConfig};
