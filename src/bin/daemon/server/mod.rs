//! Server Module
//!
//! This module contains the request side of the monitoggle daemon: a command
//! registry mapping text commands onto the output switcher, and the ZeroMQ
//! reply socket serving them one at a time.

/// Command registry module - manages command registration and execution
pub mod command_registry;

/// Commands module - registers all available commands with the registry
pub mod commands;

/// Response handler module - turns command results into reply strings
pub mod response_handler;

/// Server module - implements the ZeroMQ communication layer and message handling
pub mod server;

/// Server tests module - contains tests for the server components
#[cfg(test)]
mod server_tests;
