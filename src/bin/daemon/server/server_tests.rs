// Test suite for the server module: command registry, registered commands
// and reply formatting, driven against an in-memory display server.

use crate::screen::OutputSwitcher;
use crate::screen::mock::{MockBackend, SharedMock};
use crate::server::command_registry::{CommandError, CommandRegistry, output_command};
use crate::server::commands::init_commands;
use crate::server::response_handler::format_response;
use crate::server::server::{extract_command, process_command};
use crate::utils::error::MonitoggleError;

fn switcher() -> (OutputSwitcher, SharedMock) {
    let mock = SharedMock::new(
        MockBackend::new()
            .with_monitor(1, "eDP-1", 0, 0, 1920, 1080, 1)
            .with_monitor(2, "HDMI-1", 1920, 0, 2560, 1440, 2),
    );
    (OutputSwitcher::new(Box::new(mock.clone()), false), mock)
}

#[cfg(test)]
mod registry_tests {
    use super::*;
    use crate::simple_command;

    #[test]
    fn test_registry_creation() {
        let registry = CommandRegistry::new();
        assert_eq!(
            registry.list_commands(),
            "listCommands: Lists every command with a short description"
        );
    }

    #[test]
    fn test_registry_handle_empty_command() {
        let registry = CommandRegistry::new();
        let (mut switcher, _mock) = switcher();
        assert!(matches!(registry.handle(&mut switcher, "   "), Err(CommandError::EmptyCommand)));
    }

    #[test]
    fn test_registry_handle_unknown_command() {
        let registry = CommandRegistry::new();
        let (mut switcher, _mock) = switcher();
        match registry.handle(&mut switcher, "setMode 1920x1080") {
            Err(CommandError::UnknownCommand(cmd)) => assert_eq!(cmd, "setMode"),
            other => panic!("Expected UnknownCommand error, got {:?}", other),
        }
    }

    #[test]
    fn test_argument_count_is_checked() {
        let mut registry = CommandRegistry::new();
        registry.register("echo", output_command("echo", |_switcher, name| Ok(name.to_string())));
        registry.register("ping", simple_command!("ping", |_switcher| Ok("pong".to_string())));
        let (mut switcher, _mock) = switcher();

        assert_eq!(registry.handle(&mut switcher, "echo HDMI-1").unwrap(), "HDMI-1");
        assert_eq!(registry.handle(&mut switcher, "ping").unwrap(), "pong");
        assert!(matches!(registry.handle(&mut switcher, "echo"), Err(CommandError::InvalidArguments(_))));
        assert!(matches!(
            registry.handle(&mut switcher, "echo A B"),
            Err(CommandError::InvalidArguments(_))
        ));
        assert!(matches!(registry.handle(&mut switcher, "ping now"), Err(CommandError::InvalidArguments(_))));
    }

    #[test]
    fn test_execution_error_is_wrapped() {
        let mut registry = CommandRegistry::new();
        registry.register(
            "fail",
            simple_command!("always fails", |_switcher| Err(MonitoggleError::NotFound("nothing".to_string()))),
        );
        let (mut switcher, _mock) = switcher();

        match registry.handle(&mut switcher, "fail") {
            Err(CommandError::ExecutionError(MonitoggleError::NotFound(what))) => assert_eq!(what, "nothing"),
            other => panic!("Expected ExecutionError, got {:?}", other),
        }
    }

    #[test]
    fn test_list_commands_is_sorted() {
        let mut registry = CommandRegistry::new();
        registry.register("zeta", simple_command!("Last", |_switcher| Ok(String::new())));
        registry.register("alpha", simple_command!("First", |_switcher| Ok(String::new())));

        let listing = registry.list_commands();
        let names: Vec<&str> = listing.lines().map(|line| line.split(':').next().unwrap()).collect();
        assert_eq!(names, vec!["alpha", "listCommands", "zeta"]);
    }
}

#[cfg(test)]
mod commands_tests {
    use super::*;

    /// Test that every daemon command is registered
    #[test]
    fn test_commands_registered() {
        let listing = init_commands().list_commands();
        for command in [
            "listOutputs",
            "enableOutput",
            "disableOutput",
            "toggleOutput",
            "restoreOutputs",
            "resetLayout",
            "currentBackend",
            "listCommands",
        ] {
            assert!(listing.contains(command), "{} missing", command);
        }
    }

    #[test]
    fn test_list_outputs_is_json() {
        let registry = init_commands();
        let (mut switcher, _mock) = switcher();

        let reply = registry.handle(&mut switcher, "listOutputs").unwrap();
        let outputs: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(outputs.as_array().unwrap().len(), 2);
        assert_eq!(outputs[0]["name"], "eDP-1");
        assert_eq!(outputs[1]["display"], "HDMI-1 (2560x1440+1920+0)");
    }

    #[test]
    fn test_disable_and_enable() {
        let registry = init_commands();
        let (mut switcher, mock) = switcher();

        assert_eq!(registry.handle(&mut switcher, "disableOutput eDP-1").unwrap(), "eDP-1 disabled");
        assert_eq!(mock.lock().origin("HDMI-1").map(|p| p.x), Some(0));

        assert_eq!(registry.handle(&mut switcher, "toggleOutput eDP-1").unwrap(), "eDP-1 enabled");
        assert_eq!(mock.lock().origin("HDMI-1").map(|p| p.x), Some(1920));

        assert_eq!(registry.handle(&mut switcher, "enableOutput eDP-1").unwrap(), "eDP-1 enabled");
    }

    #[test]
    fn test_restore_and_reset() {
        let registry = init_commands();
        let (mut switcher, _mock) = switcher();

        assert_eq!(registry.handle(&mut switcher, "restoreOutputs").unwrap(), "Nothing to restore");
        registry.handle(&mut switcher, "disableOutput HDMI-1").unwrap();
        assert!(registry.handle(&mut switcher, "resetLayout").is_err());
        assert_eq!(registry.handle(&mut switcher, "restoreOutputs").unwrap(), "Restored HDMI-1");
        assert_eq!(
            registry.handle(&mut switcher, "resetLayout").unwrap(),
            "Layout remembered for eDP-1, HDMI-1"
        );
    }

    #[test]
    fn test_current_backend() {
        let registry = init_commands();
        let (mut switcher, _mock) = switcher();
        assert_eq!(registry.handle(&mut switcher, "currentBackend").unwrap(), "Mock");
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn test_format_response() {
        assert_eq!(format_response(Ok("eDP-1 enabled".to_string())), "eDP-1 enabled");
        assert_eq!(format_response(Err(CommandError::EmptyCommand)), "Error: Empty command");
        assert_eq!(
            format_response(Err(CommandError::ExecutionError(MonitoggleError::InvalidState(
                "eDP-1 is the last enabled output".to_string()
            )))),
            "Error: Invalid state: eDP-1 is the last enabled output"
        );
    }

    #[test]
    fn test_extract_command() {
        assert_eq!(extract_command(b"listOutputs").unwrap(), "listOutputs");
        assert!(extract_command(&[0xff, 0xfe]).unwrap_err().contains("UTF-8"));
        assert!(extract_command(&vec![b'a'; 1024 * 1024 + 1]).unwrap_err().contains("too large"));
    }

    #[test]
    fn test_process_command_replies() {
        let registry = init_commands();
        let (mut switcher, _mock) = switcher();

        assert_eq!(process_command(&registry, &mut switcher, b"toggleOutput HDMI-1"), "HDMI-1 disabled");
        assert_eq!(
            process_command(&registry, &mut switcher, b"toggleOutput DP-3"),
            "Error: Resource not found: no connected output named 'DP-3'"
        );
        assert!(process_command(&registry, &mut switcher, b"disableOutput eDP-1").starts_with("Error: Invalid state"));
        assert!(process_command(&registry, &mut switcher, b"").starts_with("Error: "));
    }
}
