//! handlers/mod.rs
//! Módulo que agrupa los handlers HTTP del dashboard.

pub mod config_handler;
pub mod log_handler;
