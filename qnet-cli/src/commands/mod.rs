//! Command handlers -- one module per subcommand group

pub mod config;
pub mod container;
pub mod file;
pub mod info;
pub mod logs;
pub mod network;
