//! Command implementations

pub mod config;
pub mod create;
pub mod destroy;
pub mod exec;
pub mod info;
pub mod list;
pub mod token;
pub mod transfer;
