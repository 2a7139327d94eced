//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, catalog
//! and config files, the Infrastructure Manager clients, the token endpoint,
//! and scoped secret files.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod im_backend;
pub mod im_cli;
pub mod im_rest;
pub mod registry;
pub mod secret_file;
pub mod token_endpoint;
