use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use scsiprims::codec::FieldValues;
use scsiprims::commands::{CommandDefinition, DataPhase, SenseData};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CommandRow<'a> {
    name: &'a str,
    opcode: u8,
    cdb_len: usize,
    data: &'a str,
    fields: Vec<&'a str>,
}

#[derive(Serialize)]
struct PackedOutput<'a> {
    source: &'a str,
    len: usize,
    hex: String,
}

#[derive(Serialize)]
struct ValuesOutput<'a> {
    source: &'a str,
    fields: &'a FieldValues,
}

#[derive(Serialize)]
struct SenseOutput<'a> {
    sense_key: &'a str,
    asc: u8,
    ascq: u8,
    hex: String,
    fields: &'a FieldValues,
}

/// Result of a successful `exec`.
#[derive(Serialize)]
pub struct ExecReport<'a> {
    pub command: &'a str,
    pub device: String,
    pub cdb: String,
    pub datain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inquiry: Option<InquiryStrings>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageReport>,
}

/// One mode page returned by MODE SENSE.
#[derive(Serialize)]
pub struct PageReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    pub page_code: u8,
    pub sub_page_code: u8,
    pub hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldValues>,
}

#[derive(Serialize)]
pub struct InquiryStrings {
    pub vendor: String,
    pub product: String,
    pub revision: String,
}

pub fn print_commands(commands: &[&CommandDefinition], format: OutputFormat) {
    let rows: Vec<CommandRow<'_>> = commands
        .iter()
        .map(|def| CommandRow {
            name: def.name,
            opcode: def.opcode,
            cdb_len: def.cdb.byte_len(),
            data: phase_name(def.phase),
            fields: def
                .cdb
                .fields()
                .iter()
                .map(|field| field.name.as_ref())
                .collect(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = new_table(vec!["NAME", "OPCODE", "CDB", "DATA", "FIELDS"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    format!("{:#04x}", row.opcode),
                    row.cdb_len.to_string(),
                    row.data.to_string(),
                    row.fields.join(", "),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!(
                    "{} opcode={:#04x} cdb={} data={}",
                    row.name, row.opcode, row.cdb_len, row.data
                );
            }
        }
    }
}

pub fn print_packed(source: &str, bytes: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&PackedOutput {
            source,
            len: bytes.len(),
            hex: to_hex(bytes),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["BYTE", "HEX", "BITS"]);
            for (index, byte) in bytes.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    format!("{byte:02x}"),
                    format!("{byte:08b}"),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{source}: {}", spaced_hex(bytes)),
        OutputFormat::Raw => print_raw(bytes),
    }
}

pub fn print_values(source: &str, values: &FieldValues, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ValuesOutput {
            source,
            fields: values,
        }),
        OutputFormat::Table => println!("{}", values_table(values)),
        OutputFormat::Pretty | OutputFormat::Raw => print_pairs(values),
    }
}

pub fn print_sense(sense: &SenseData, raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SenseOutput {
            sense_key: sense.sense_key.name(),
            asc: sense.asc,
            ascq: sense.ascq,
            hex: to_hex(raw),
            fields: &sense.fields,
        }),
        OutputFormat::Table => {
            println!("{sense}");
            println!("{}", values_table(&sense.fields));
        }
        OutputFormat::Pretty => {
            println!("{sense}");
            print_pairs(&sense.fields);
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

pub fn print_exec(report: &ExecReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{} on {}: GOOD", report.command, report.device);
            println!("cdb: {}", report.cdb);
            if let Some(inquiry) = &report.inquiry {
                println!(
                    "vendor={} product={} revision={}",
                    inquiry.vendor, inquiry.product, inquiry.revision
                );
            }
            match (&report.fields, format) {
                (Some(fields), OutputFormat::Table) => println!("{}", values_table(fields)),
                (Some(fields), _) => print_pairs(fields),
                (None, _) if !report.datain.is_empty() => println!("datain: {}", report.datain),
                (None, _) => {}
            }
            for page in &report.pages {
                println!(
                    "page {:#04x}/{:#04x} {}: {}",
                    page.page_code,
                    page.sub_page_code,
                    page.name.unwrap_or("unknown"),
                    page.hex
                );
                match (&page.fields, format) {
                    (Some(fields), OutputFormat::Table) => println!("{}", values_table(fields)),
                    (Some(fields), _) => print_pairs(fields),
                    (None, _) => {}
                }
            }
        }
        OutputFormat::Raw => {
            println!("{}", report.datain);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn phase_name(phase: DataPhase) -> &'static str {
    match phase {
        DataPhase::None => "none",
        DataPhase::In => "in",
        DataPhase::Out => "out",
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn values_table(values: &FieldValues) -> Table {
    let mut table = new_table(vec!["FIELD", "VALUE", "HEX"]);
    for (name, value) in values.iter() {
        table.add_row(vec![
            name.to_string(),
            value.to_string(),
            format!("{value:#x}"),
        ]);
    }
    table
}

fn print_pairs(values: &FieldValues) {
    for (name, value) in values.iter() {
        println!("{name}={value}");
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
