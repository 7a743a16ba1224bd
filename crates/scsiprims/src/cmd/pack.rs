use bytes::Bytes;
use scsiprims::codec::{marshall, FieldValues, MAX_CDB_LEN};
use tracing::debug;

use crate::cmd::{find_command, load_layout, PackArgs};
use crate::exit::{codec_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_packed, OutputFormat};

pub fn run(args: PackArgs, format: OutputFormat) -> CliResult<i32> {
    let values: FieldValues = args.fields.into_iter().collect();

    let (source, cdb): (String, Bytes) = match (args.command, args.layout) {
        (Some(name), _) => {
            let def = find_command(&name)?;
            let cmd = def.build(&values).map_err(|err| codec_error("pack", err))?;
            (def.name.to_string(), cmd.cdb)
        }
        (None, Some(path)) => {
            let layout = load_layout(&path, args.len)?;
            if layout.byte_len() > MAX_CDB_LEN {
                return Err(CliError::new(
                    USAGE,
                    format!(
                        "pack: layout is {} bytes, a CDB holds at most {MAX_CDB_LEN}",
                        layout.byte_len()
                    ),
                ));
            }
            let bytes = marshall(&layout, &values).map_err(|err| codec_error("pack", err))?;
            (path.display().to_string(), bytes.freeze())
        }
        (None, None) => {
            return Err(CliError::new(
                USAGE,
                "pack: a command name or --layout is required",
            ))
        }
    };

    debug!(source = %source, len = cdb.len(), "packed command descriptor block");
    print_packed(&source, &cdb, format);
    Ok(SUCCESS)
}
