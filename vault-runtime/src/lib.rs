pub mod error;
pub mod types;
pub mod tokens;
pub mod vault_client;
pub mod strategy;
pub mod interpreter;
pub mod adapters;
pub mod contracts;
pub mod chain;
pub mod balances;
pub mod factory;
pub mod reconcile;
pub mod executor;
pub mod store;
pub mod service;

pub use error::{PortfolioError, ValidationError};
pub use types::*;
pub use service::{PortfolioService, ServiceParts};
