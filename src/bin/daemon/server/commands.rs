//! Commands Module
//!
//! This module registers all available commands with the command registry,
//! mapping command names to operations of the output switcher.

use super::command_registry::{CommandRegistry, output_command};
use crate::simple_command;

fn state_reply(name: &str, enabled: bool) -> String {
    format!("{} {}", name, if enabled { "enabled" } else { "disabled" })
}

/// Initialize all available commands in the registry
///
/// Query commands take no arguments; switching commands take exactly one
/// output name. `listCommands` is built into the registry itself.
pub fn init_commands() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    // Query commands (no arguments)
    registry.register(
        "listOutputs",
        simple_command!("Lists connected and disconnected outputs as JSON", |switcher| {
            let outputs = switcher.list_outputs()?;
            Ok(serde_json::to_string(&outputs)?)
        }),
    );

    registry.register(
        "currentBackend",
        simple_command!("Displays the display backend in use", |switcher| {
            Ok(switcher.backend_name().to_string())
        }),
    );

    registry.register(
        "restoreOutputs",
        simple_command!("Enables every disabled output at its remembered position", |switcher| {
            let restored = switcher.restore_all()?;
            if restored.is_empty() {
                Ok("Nothing to restore".to_string())
            } else {
                Ok(format!("Restored {}", restored.join(", ")))
            }
        }),
    );

    registry.register(
        "resetLayout",
        simple_command!("Takes the current layout as the one to restore", |switcher| {
            let remembered = switcher.reset_layout()?;
            Ok(format!("Layout remembered for {}", remembered.join(", ")))
        }),
    );

    // Switching commands (one output name)
    registry.register(
        "enableOutput",
        output_command("Enables an output (e.g., enableOutput HDMI-1)", |switcher, name| {
            Ok(state_reply(name, switcher.enable(name)?))
        }),
    );

    registry.register(
        "disableOutput",
        output_command("Disables an output and closes the gap it leaves", |switcher, name| {
            Ok(state_reply(name, switcher.disable(name)?))
        }),
    );

    registry.register(
        "toggleOutput",
        output_command("Disables an enabled output, enables a disabled one", |switcher, name| {
            Ok(state_reply(name, switcher.toggle(name)?))
        }),
    );

    registry
}
