use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};
use scsiprims::codec::{FieldLayout, MAX_CDB_LEN};
use scsiprims::commands::{lookup, CommandDefinition};

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};
use crate::output::OutputFormat;

pub mod exec;
pub mod list;
pub mod pack;
pub mod unpack;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the built-in command definitions.
    List(ListArgs),
    /// Pack field values into a command descriptor block.
    Pack(PackArgs),
    /// Unpack field values from hex-encoded bytes.
    Unpack(UnpackArgs),
    /// Execute a command against a device.
    Exec(ExecArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::List(args) => list::run(args, format),
        Command::Pack(args) => pack::run(args, format),
        Command::Unpack(args) => unpack::run(args, format),
        Command::Exec(args) => exec::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["command", "layout"])))]
pub struct PackArgs {
    /// Built-in command name (see `list`).
    pub command: Option<String>,
    /// JSON layout file mapping field names to `[mask, offset]`.
    #[arg(long, value_name = "FILE")]
    pub layout: Option<PathBuf>,
    /// Declared CDB length for --layout, at most 255 (defaults to the bytes
    /// the fields touch).
    #[arg(long, requires = "layout", value_parser = parse_cdb_len)]
    pub len: Option<usize>,
    /// Field value as NAME=VALUE (decimal, 0x hex or 0b binary). Repeatable.
    #[arg(long = "field", short = 'f', value_name = "NAME=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, u64)>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["command", "layout", "sense"])))]
pub struct UnpackArgs {
    /// Hex-encoded bytes to decode.
    pub hex: String,
    /// Built-in command name; decodes its response data unless --cdb is set.
    #[arg(long)]
    pub command: Option<String>,
    /// JSON layout file mapping field names to `[mask, offset]`.
    #[arg(long, value_name = "FILE")]
    pub layout: Option<PathBuf>,
    /// Decode the bytes as sense data.
    #[arg(long)]
    pub sense: bool,
    /// Decode the command's CDB instead of its response data.
    #[arg(long, requires = "command")]
    pub cdb: bool,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Device node, e.g. /dev/sg0.
    #[arg(env = "SCSIPRIMS_DEVICE")]
    pub device: PathBuf,
    /// Built-in command name (see `list`).
    pub command: String,
    /// Field value as NAME=VALUE (decimal, 0x hex or 0b binary). Repeatable.
    #[arg(long = "field", short = 'f', value_name = "NAME=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, u64)>,
    /// Hex-encoded payload for commands that send data.
    #[arg(long, value_name = "HEX")]
    pub data: Option<String>,
    /// Open the device read-write.
    #[arg(long)]
    pub writable: bool,
    /// Skip the device identity check before execution.
    #[arg(long)]
    pub no_replug_detect: bool,
    /// Command timeout (e.g. 30s, 500ms).
    #[arg(long, default_value = "30s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn find_command(name: &str) -> CliResult<&'static CommandDefinition> {
    lookup(name).ok_or_else(|| CliError::new(USAGE, format!("unknown command: {name}")))
}

pub(crate) fn load_layout(path: &Path, len: Option<usize>) -> CliResult<FieldLayout> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("read {}", path.display()), err))?;
    let layout: FieldLayout = serde_json::from_str(&text).map_err(|err| {
        CliError::new(DATA_INVALID, format!("invalid layout {}: {err}", path.display()))
    })?;
    Ok(match len {
        Some(len) => layout.with_len(len),
        None => layout,
    })
}

pub(crate) fn parse_field(input: &str) -> Result<(String, u64), String> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{input}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in `{input}`"));
    }
    Ok((name.to_string(), parse_u64(value.trim())?))
}

pub(crate) fn parse_cdb_len(input: &str) -> Result<usize, String> {
    let len: usize = input
        .parse()
        .map_err(|err| format!("invalid length `{input}`: {err}"))?;
    if len == 0 || len > MAX_CDB_LEN {
        return Err(format!("CDB length must be 1..={MAX_CDB_LEN}, got {len}"));
    }
    Ok(len)
}

pub(crate) fn parse_u64(input: &str) -> Result<u64, String> {
    let (digits, radix) = if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(bin) = input
        .strip_prefix("0b")
        .or_else(|| input.strip_prefix("0B"))
    {
        (bin, 2)
    } else {
        (input, 10)
    };
    let digits = digits.replace('_', "");
    u64::from_str_radix(&digits, radix).map_err(|err| format!("invalid value `{input}`: {err}"))
}

/// Decode hex text. Whitespace, `:` separators and a leading `0x` are ignored.
pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("hex input has an odd number of digits: {input}"),
        ));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).unwrap_or("");
            u8::from_str_radix(text, 16)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex byte `{text}`")))
        })
        .collect()
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let trimmed = input.trim();
    if let Some(ms) = trimmed.strip_suffix("ms") {
        let value: u64 = ms
            .parse()
            .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
        return Ok(Duration::from_millis(value));
    }
    if let Some(s) = trimmed.strip_suffix('s') {
        let value: u64 = s
            .parse()
            .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
        return Ok(Duration::from_secs(value));
    }
    let value: u64 = trimmed
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    Ok(Duration::from_secs(value))
}
