mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "scsiprims", version, about = "SCSI command block CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level for scsiprims targets (stderr). SCSIPRIMS_LOG
    /// filter directives take precedence.
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pack_with_repeated_fields() {
        let cli = Cli::try_parse_from([
            "scsiprims",
            "pack",
            "position-to-element",
            "--field",
            "medium_transport_address=0x10",
            "-f",
            "destination_address=32",
        ])
        .expect("pack args should parse");

        let Command::Pack(args) = cli.command else {
            panic!("expected pack subcommand");
        };
        assert_eq!(
            args.fields,
            vec![
                ("medium_transport_address".to_string(), 0x10),
                ("destination_address".to_string(), 32),
            ]
        );
    }

    #[test]
    fn rejects_command_and_layout_together() {
        let err = Cli::try_parse_from([
            "scsiprims",
            "pack",
            "inquiry",
            "--layout",
            "/tmp/layout.json",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_malformed_field() {
        let err = Cli::try_parse_from(["scsiprims", "pack", "inquiry", "--field", "alloc_len"])
            .expect_err("field without value should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_exec_subcommand() {
        let cli = Cli::try_parse_from([
            "scsiprims",
            "exec",
            "/dev/sg0",
            "inquiry",
            "--timeout",
            "3s",
            "--no-replug-detect",
        ])
        .expect("exec args should parse");
        let Command::Exec(args) = cli.command else {
            panic!("expected exec subcommand");
        };
        assert!(args.no_replug_detect);
        assert!(!args.writable);
    }
}
