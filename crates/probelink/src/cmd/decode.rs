use probelink::metadata::{FireFlyMetadata, Metadata, MetadataRecord, BLOCK_SIZE};

use crate::cmd::{DecodeArgs, Layout};
use crate::exit::{io_error, metadata_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = std::fs::read(&args.file)
        .map_err(|err| io_error(&format!("read {}", args.file.display()), err))?;
    let block = if args.hex { parse_hex(&raw)? } else { raw };

    if block.len() != BLOCK_SIZE {
        return Err(CliError::new(
            DATA_INVALID,
            format!("expected a {BLOCK_SIZE}-byte block, found {} bytes", block.len()),
        ));
    }

    let source = args.file.display().to_string();
    match args.layout {
        Layout::Sequential => {
            let record = Metadata::from_bytes(&block).map_err(|err| metadata_error("decode", err))?;
            print_record(&source, record.probe_model(), &record.named_values(), format);
        }
        Layout::Firefly => {
            let record =
                FireFlyMetadata::from_bytes(&block).map_err(|err| metadata_error("decode", err))?;
            print_record(&source, record.base.probe_model(), &record.named_values(), format);
        }
    }
    Ok(SUCCESS)
}

/// Decode a hex dump, ignoring whitespace and an optional `0x` per token.
fn parse_hex(text: &[u8]) -> CliResult<Vec<u8>> {
    let text = std::str::from_utf8(text)
        .map_err(|_| CliError::new(DATA_INVALID, "hex dump is not valid UTF-8"))?;
    let digits: String = text
        .split_whitespace()
        .map(|token| token.trim_start_matches("0x"))
        .collect();
    hex::decode(&digits)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex dump: {err}")))
}
