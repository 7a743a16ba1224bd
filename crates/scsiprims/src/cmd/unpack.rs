use scsiprims::codec::unmarshall;
use scsiprims::commands::SenseData;

use crate::cmd::{find_command, load_layout, parse_hex, UnpackArgs};
use crate::exit::{codec_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sense, print_values, OutputFormat};

pub fn run(args: UnpackArgs, format: OutputFormat) -> CliResult<i32> {
    let data = parse_hex(&args.hex)?;

    if args.sense {
        let sense = SenseData::parse(&data).map_err(|err| codec_error("unpack", err))?;
        print_sense(&sense, &data, format);
        return Ok(SUCCESS);
    }

    let (source, layout) = match (args.command, args.layout) {
        (Some(name), _) => {
            let def = find_command(&name)?;
            let layout = if args.cdb {
                def.cdb.clone()
            } else {
                def.datain.clone().ok_or_else(|| {
                    CliError::new(
                        USAGE,
                        format!("{} returns no structured data; use --cdb", def.name),
                    )
                })?
            };
            (def.name.to_string(), layout)
        }
        (None, Some(path)) => (path.display().to_string(), load_layout(&path, None)?),
        (None, None) => {
            return Err(CliError::new(
                USAGE,
                "unpack: --command, --layout or --sense is required",
            ))
        }
    };

    let values = unmarshall(&layout, &data).map_err(|err| codec_error("unpack", err))?;
    print_values(&source, &values, format);
    Ok(SUCCESS)
}
