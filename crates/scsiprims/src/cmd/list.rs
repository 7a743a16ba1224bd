use scsiprims::commands::COMMANDS;

use crate::cmd::ListArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_commands, OutputFormat};

pub fn run(_args: ListArgs, format: OutputFormat) -> CliResult<i32> {
    print_commands(&COMMANDS, format);
    Ok(SUCCESS)
}
