//! config/mod.rs
//! Configuración del proceso (variables de entorno) y credenciales de Discord.

pub mod credentials;
pub mod relay_config;
