use probelink::metadata::UUIDS;

use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_models, OutputFormat};

pub fn run(format: OutputFormat) -> CliResult<i32> {
    print_models(UUIDS.iter().map(|(model, uuid)| (*model, *uuid)), format);
    Ok(SUCCESS)
}
