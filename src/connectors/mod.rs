// src/connectors/mod.rs
pub mod luno;
pub mod messages;
pub mod traits;

pub use luno::LunoClient;
pub use traits::BrokerClient;
