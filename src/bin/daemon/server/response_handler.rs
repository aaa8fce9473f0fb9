use super::command_registry::CommandResult;

/// Prefix of every error reply
pub const ERROR_PREFIX: &str = "Error: ";

/// Format a command result into a string response
pub fn format_response(result: CommandResult) -> String {
    match result {
        Ok(msg) => msg,
        Err(err) => format!("{}{}", ERROR_PREFIX, err),
    }
}
