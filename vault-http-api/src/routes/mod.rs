pub mod apply;
pub mod confirm;
pub mod health;
pub mod reserves;
pub mod strategy;
pub mod vault;
