//! Monitoggle Shell - Interactive command line interface for monitoggled
//!
//! Sends each line typed to the daemon over ZeroMQ and prints the reply,
//! pretty-printing JSON replies such as `listOutputs`.

use std::io::{self, Write};
use std::time::Instant;

use clap::Parser;

/// Default ZeroMQ endpoint for monitoggled
const ENDPOINT_DEFAULT: &str = "ipc:///var/run/monitoggled.sock";
/// Default timeout for requests in milliseconds
const TIMEOUT: i32 = 5000;

/// Monitoggle Shell - CLI for monitoggled
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ZeroMQ endpoint
    #[arg(long, default_value = ENDPOINT_DEFAULT)]
    endpoint: String,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = TIMEOUT)]
    timeout: i32,
}

/// What the shell does with one input line
#[derive(Debug, PartialEq, Eq)]
enum ShellAction {
    Exit,
    Help,
    Clear,
    /// Forward the line to the daemon
    Send,
}

fn classify(cmd: &str) -> ShellAction {
    match cmd.trim().to_lowercase().as_str() {
        "exit" | "quit" | "q" => ShellAction::Exit,
        "help" | "h" | "?" => ShellAction::Help,
        "clear" => ShellAction::Clear,
        _ => ShellAction::Send,
    }
}

/// Reply text ready to print; JSON is pretty-printed
fn render_reply(reply: &[u8]) -> (String, bool) {
    let text = String::from_utf8_lossy(reply);
    if text.starts_with("Error:") {
        return (text.into_owned(), true);
    }
    let rendered = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or_else(|| text.into_owned());
    (rendered, false)
}

struct MonitoggleShell {
    endpoint: String,
    // Context needs to be kept alive for the connection
    _context: zmq::Context,
    socket: zmq::Socket,
}

impl MonitoggleShell {
    /// Initialize the shell with connection parameters
    fn new(endpoint: String, timeout: i32) -> Result<Self, Box<dyn std::error::Error>> {
        let context = zmq::Context::new();
        let socket = context.socket(zmq::REQ)?;

        // Set socket timeouts to prevent hanging
        socket.set_rcvtimeo(timeout)?;
        socket.set_sndtimeo(timeout)?;
        socket.connect(&endpoint)?;

        Ok(MonitoggleShell {
            endpoint,
            _context: context,
            socket,
        })
    }

    /// Checks that the daemon answers, printing the backend it drives
    fn connect(&mut self) -> bool {
        let answer = self
            .socket
            .send("currentBackend", 0)
            .and_then(|_| self.socket.recv_string(0));
        match answer {
            Ok(Ok(backend)) => {
                println!("Connected to monitoggled at {} ({} backend)", self.endpoint, backend);
                true
            }
            Ok(Err(_)) => {
                eprintln!("Connection failed: reply is not valid UTF-8");
                false
            }
            Err(e) => {
                eprintln!("Connection failed: {}", e);
                eprintln!(
                    "Make sure monitoggled is running and accessible at {}",
                    self.endpoint
                );
                false
            }
        }
    }

    /// Show help information
    fn show_help(&self) {
        let help_text = r#"
Monitoggle Shell Help
=====================
Shell Commands:
  help            - Show this help message
  clear           - Clear the screen
  exit/quit/q     - Exit the shell

Daemon Commands:
  listCommands    - Show all available commands from monitoggled
  toggleOutput X  - Disable output X if enabled, enable it otherwise
  [other commands] - All other commands are sent to monitoggled
"#;
        println!("{}", help_text);
    }

    /// Run the main interactive command loop
    fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        println!("Use 'help' for shell commands.");
        println!("{}", "─".repeat(80));

        let prompt = format!("[{}]> ", get_hostname());
        loop {
            print!("{}", prompt);
            io::stdout().flush()?;

            let mut input = String::new();
            match io::stdin().read_line(&mut input) {
                // End of input
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    eprintln!("\nError reading input: {}", e);
                    continue;
                }
            }

            let cmd = input.trim();
            if cmd.is_empty() {
                continue;
            }

            match classify(cmd) {
                ShellAction::Exit => break,
                ShellAction::Help => {
                    self.show_help();
                    continue;
                }
                ShellAction::Clear => {
                    // Clear screen using ANSI escape codes
                    print!("\x1B[2J\x1B[1;1H");
                    continue;
                }
                ShellAction::Send => {}
            }

            let start_time = Instant::now();
            if let Err(e) = self.socket.send(cmd, 0) {
                eprintln!("Error sending command: {}", e);
                continue;
            }

            match self.socket.recv_bytes(0) {
                Ok(reply) => {
                    let (text, is_error) = render_reply(&reply);
                    if is_error {
                        eprintln!("{}", text);
                    } else {
                        println!("{}", text);
                    }
                    println!("Response time: {:.3}s", start_time.elapsed().as_secs_f64());
                }
                Err(e) => {
                    eprintln!("Error receiving response: {}", e);
                    eprintln!("The command may have timed out or the daemon may be unresponsive");
                }
            }

            println!("{}", "-".repeat(80));
        }

        Ok(())
    }
}

/// Get the hostname of the current machine
fn get_hostname() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().to_string(),
        Err(_) => "localhost".to_string(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut shell = MonitoggleShell::new(args.endpoint, args.timeout)?;

    if !shell.connect() {
        eprintln!("Failed to connect to monitoggled. The daemon may not be running.");
        std::process::exit(1);
    }

    shell.run()
}
