//! services/mod.rs
//! Módulo que agrupa la lógica del relay, el almacenamiento y la conexión con Discord.

pub mod capabilities;
pub mod channel_matcher;
pub mod config_service;
pub mod discord_service;
pub mod forwarder_service;
pub mod log_service;
pub mod outcome_service;
pub mod relay_engine;
pub mod relay_service;
