//! Integration tests for the apricot CLI
//!
//! Most tests spawn the actual binary with config and catalog pointed at
//! temp paths. The HTTP adapters talk to a loopback server; nothing reaches
//! a real Infrastructure Manager.

mod catalog_commands;
