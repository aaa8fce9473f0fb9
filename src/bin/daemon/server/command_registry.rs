//! Command Registry Module
//!
//! This module provides the command registration and execution system for the
//! monitoggle daemon. Commands are looked up by name, their argument count is
//! checked, and they run against the daemon's output switcher.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::screen::OutputSwitcher;
use crate::utils::error::MonitoggleError;

/// Name of the built-in command listing every registered command
pub const LIST_COMMANDS: &str = "listCommands";

/// Result type for command execution
///
/// Represents the result of executing a command, containing either a reply
/// string or a command error.
pub type CommandResult = Result<String, CommandError>;

/// Error type for command handling
#[derive(Debug)]
pub enum CommandError {
    InvalidArguments(String),
    UnknownCommand(String),
    ExecutionError(MonitoggleError),
    EmptyCommand,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::InvalidArguments(msg) => write!(f, "Invalid arguments: {}", msg),
            CommandError::UnknownCommand(cmd) => write!(f, "Unknown command: {}", cmd),
            CommandError::ExecutionError(err) => write!(f, "{}", err),
            CommandError::EmptyCommand => write!(f, "Empty command"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<MonitoggleError> for CommandError {
    fn from(error: MonitoggleError) -> Self {
        CommandError::ExecutionError(error)
    }
}

/// Trait for command handlers
///
/// Defines the interface that all command handlers must implement to be
/// registered in the command registry.
pub trait CommandHandler: Send + Sync {
    /// Execute the command with given arguments
    fn execute(&self, switcher: &mut OutputSwitcher, args: &[&str]) -> CommandResult;

    /// Get command description
    fn description(&self) -> &str;

    /// Get expected argument count (None = any number)
    fn expected_args(&self) -> Option<usize> {
        None
    }
}

/// Command registry for dynamic command management
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn CommandHandler>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Create a new command registry
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command handler
    pub fn register<S: Into<String>>(&mut self, name: S, handler: Box<dyn CommandHandler>) {
        let name = name.into();
        debug!("Registering command: {}", name);
        self.commands.insert(name, handler);
    }

    /// Handle a command string
    ///
    /// Parses and executes a command from a string, validating argument counts
    /// and returning appropriate results or errors.
    pub fn handle(&self, switcher: &mut OutputSwitcher, cmdline: &str) -> CommandResult {
        debug!("Handling command: '{}'", cmdline);

        let parts: Vec<&str> = cmdline.split_whitespace().collect();
        let Some((cmd, args)) = parts.split_first() else {
            warn!("Received empty command");
            return Err(CommandError::EmptyCommand);
        };

        if *cmd == LIST_COMMANDS {
            return Ok(self.list_commands());
        }

        match self.commands.get(*cmd) {
            Some(handler) => {
                // Validate argument count if specified
                if let Some(expected) = handler.expected_args() {
                    if args.len() != expected {
                        return Err(CommandError::InvalidArguments(format!(
                            "{} expects {} arguments, got {}",
                            cmd,
                            expected,
                            args.len()
                        )));
                    }
                }

                info!("Executing command: {} with {} args", cmd, args.len());
                handler.execute(switcher, args)
            }
            None => {
                warn!("Unknown command: {}", cmd);
                Err(CommandError::UnknownCommand(cmd.to_string()))
            }
        }
    }

    /// List all registered commands with descriptions
    pub fn list_commands(&self) -> String {
        let mut commands: Vec<_> = self
            .commands
            .iter()
            .map(|(name, handler)| (name.as_str(), handler.description()))
            .collect();
        commands.push((LIST_COMMANDS, "Lists every command with a short description"));
        commands.sort_by_key(|(name, _)| *name);

        commands
            .iter()
            .map(|(name, description)| format!("{}: {}", name, description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Macro to create simple command handlers
///
/// Creates a command handler that takes no arguments and returns a string result.
#[macro_export]
macro_rules! simple_command {
    ($desc:expr, $func:expr) => {
        $crate::server::command_registry::SimpleCommand::boxed($desc, $func)
    };
}

type SimpleExecutor = Box<dyn Fn(&mut OutputSwitcher) -> crate::utils::error::Result<String> + Send + Sync>;
type OutputExecutor = Box<dyn Fn(&mut OutputSwitcher, &str) -> crate::utils::error::Result<String> + Send + Sync>;

/// Simple command handler (no arguments)
pub struct SimpleCommand {
    pub description: String,
    pub executor: SimpleExecutor,
}

impl SimpleCommand {
    pub fn boxed<F>(description: &str, executor: F) -> Box<dyn CommandHandler>
    where
        F: Fn(&mut OutputSwitcher) -> crate::utils::error::Result<String> + Send + Sync + 'static,
    {
        Box::new(SimpleCommand {
            description: description.to_string(),
            executor: Box::new(executor),
        })
    }
}

impl CommandHandler for SimpleCommand {
    fn execute(&self, switcher: &mut OutputSwitcher, _args: &[&str]) -> CommandResult {
        Ok((self.executor)(switcher)?)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn expected_args(&self) -> Option<usize> {
        Some(0)
    }
}

/// Output command handler
///
/// Handles commands that take exactly one output name.
pub struct OutputCommand {
    description: String,
    executor: OutputExecutor,
}

impl CommandHandler for OutputCommand {
    fn execute(&self, switcher: &mut OutputSwitcher, args: &[&str]) -> CommandResult {
        let name = args
            .first()
            .ok_or_else(|| CommandError::InvalidArguments("Missing output name".to_string()))?;
        Ok((self.executor)(switcher, name)?)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn expected_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// Helper to create output command handlers
pub fn output_command<F>(description: &str, executor: F) -> Box<dyn CommandHandler>
where
    F: Fn(&mut OutputSwitcher, &str) -> crate::utils::error::Result<String> + Send + Sync + 'static,
{
    Box::new(OutputCommand {
        description: description.to_string(),
        executor: Box::new(executor),
    })
}
