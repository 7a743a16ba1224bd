use scsiprims::codec::FieldValues;
use scsiprims::codec::CommandBlock;
use scsiprims::commands::spc::{
    inquiry_strings, INQUIRY_OPCODE, MODE_SENSE10_OPCODE, MODE_SENSE6_OPCODE,
};
use scsiprims::commands::{ModeHeader, ModeParameters, SenseData};
use scsiprims::device::{open_with_config, DeviceError, SessionConfig};
use scsiprims::transport::SgioConfig;
use tracing::{info, warn};

use crate::cmd::{find_command, parse_duration, parse_hex, ExecArgs};
use crate::exit::{codec_error, device_error, CliError, CliResult, CHECK_CONDITION, SUCCESS};
use crate::output::{
    print_exec, print_sense, to_hex, ExecReport, InquiryStrings, OutputFormat, PageReport,
};

pub fn run(args: ExecArgs, format: OutputFormat) -> CliResult<i32> {
    let def = find_command(&args.command)?;
    let values: FieldValues = args.fields.into_iter().collect();
    let timeout = parse_duration(&args.timeout)?;

    let mut cmd = match &args.data {
        Some(data) => def.build_with_data(&values, &parse_hex(data)?),
        None => def.build(&values),
    }
    .map_err(|err| codec_error("exec", err))?;

    let session_config = SessionConfig {
        writable: args.writable,
        detect_replugged: !args.no_replug_detect,
    };
    let device = args.device.display().to_string();
    let mut session = open_with_config(&args.device, session_config, SgioConfig { timeout })
        .map_err(|err| device_error(&format!("open {device}"), err))?;

    match session.execute(&mut cmd) {
        Ok(()) => {}
        Err(DeviceError::CheckCondition { sense }) => {
            return match SenseData::parse(&sense) {
                Ok(decoded) => {
                    print_sense(&decoded, &sense, format);
                    Err(CliError::new(
                        CHECK_CONDITION,
                        format!("{}: check condition: {decoded}", def.name),
                    ))
                }
                Err(_) => Err(CliError::new(
                    CHECK_CONDITION,
                    format!("{}: check condition with no sense data", def.name),
                )),
            };
        }
        Err(err) => return Err(device_error(&format!("{} on {device}", def.name), err)),
    }
    info!(command = def.name, device = %device, "command completed");

    let fields = def
        .unmarshall(&cmd)
        .map_err(|err| codec_error("decode response", err))?;
    let inquiry = if def.opcode == INQUIRY_OPCODE {
        inquiry_strings(&cmd.datain).map(|(vendor, product, revision)| InquiryStrings {
            vendor,
            product,
            revision,
        })
    } else {
        None
    };

    let pages = mode_pages(def.opcode, &cmd)?;

    if let Err(err) = session.close() {
        warn!(error = %err, "failed to close device");
    }

    print_exec(
        &ExecReport {
            command: def.name,
            device,
            cdb: to_hex(&cmd.cdb),
            datain: to_hex(&cmd.datain),
            fields,
            inquiry,
            pages,
        },
        format,
    );
    Ok(SUCCESS)
}

/// Split MODE SENSE data into its pages, decoding those with a known layout.
fn mode_pages(opcode: u8, cmd: &CommandBlock) -> CliResult<Vec<PageReport>> {
    let header = match opcode {
        MODE_SENSE6_OPCODE => ModeHeader::Six,
        MODE_SENSE10_OPCODE => ModeHeader::Ten,
        _ => return Ok(Vec::new()),
    };
    let params = ModeParameters::parse(header, &cmd.datain)
        .map_err(|err| codec_error("decode mode pages", err))?;
    params
        .pages
        .iter()
        .map(|page| {
            Ok(PageReport {
                name: page.definition().map(|def| def.name),
                page_code: page.page_code,
                sub_page_code: page.sub_page_code,
                hex: to_hex(&page.data),
                fields: page
                    .decode()
                    .map_err(|err| codec_error("decode mode page", err))?,
            })
        })
        .collect()
}
