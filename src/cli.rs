//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.
//! Every setting is optional here so values from a config file survive
//! unless overridden.

use clap::Parser;
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Serial-to-WebSocket bridge exposing a local TTY to a remote server
#[derive(Parser, Debug, Default)]
#[command(name = "tty-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML config file (flags override its values)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Device ID sent to the server (default: host name)
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,

    /// Server address (default: localhost:80)
    #[arg(long, value_name = "HOST:PORT")]
    pub addr: Option<String>,

    /// Serial port path (default: /dev/ttyUSB0)
    #[arg(long, value_name = "PATH")]
    pub port: Option<String>,

    /// Baud rate (default: 115200)
    #[arg(long, value_name = "RATE", value_parser = clap::value_parser!(u32).range(1..))]
    pub baud: Option<u32>,

    /// Use generated data instead of a serial port
    #[arg(long)]
    pub sim: bool,

    /// Log every WebSocket frame
    #[arg(long)]
    pub debug_ws: bool,

    /// Log every serial read/write
    #[arg(long)]
    pub debug_serial: bool,

    /// Append \r\n to messages received from the server
    #[arg(long)]
    pub append_newline: bool,

    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["tty-bridge"]);
        assert!(cli.config.is_none());
        assert!(cli.id.is_none());
        assert!(cli.addr.is_none());
        assert!(cli.baud.is_none());
        assert!(!cli.sim);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["tty-bridge", "-v"]);
        assert!(cli.verbose);

        let cli = Cli::parse_from(["tty-bridge", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_all() {
        let cli = Cli::parse_from([
            "tty-bridge",
            "--id",
            "bench-01",
            "--addr",
            "example.net:8080",
            "--port",
            "/dev/ttyACM0",
            "--baud",
            "9600",
            "--sim",
            "--debug-ws",
            "--debug-serial",
            "--append-newline",
        ]);
        assert_eq!(cli.id.as_deref(), Some("bench-01"));
        assert_eq!(cli.addr.as_deref(), Some("example.net:8080"));
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(cli.baud, Some(9600));
        assert!(cli.sim);
        assert!(cli.debug_ws);
        assert!(cli.debug_serial);
        assert!(cli.append_newline);
    }

    #[test]
    fn test_cli_rejects_zero_baud() {
        assert!(Cli::try_parse_from(["tty-bridge", "--baud", "0"]).is_err());
    }
}
