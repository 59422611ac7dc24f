//! Internal modules for the line-up console.
//!
//! This library provides the HTTP gateway client, configuration, command
//! parsing and text views used by the tl_console binary.

pub mod api_client;
pub mod commands;
pub mod config;
pub mod session;
pub mod views;
