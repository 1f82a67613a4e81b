use std::time::Duration;

use probelink::metadata::MetadataRecord;
use probelink::transport::{
    SerialConnector, StreamTransport, TcpConnector, Transport, TransportConfig,
};
use probelink::{Channel, PowerSupply, PowerSupplyModel};

use crate::cmd::{Layout, MetadataArgs, ModelArg};
use crate::exit::{device_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_record, OutputFormat};

pub fn run(args: MetadataArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let channel = Channel::try_from(args.channel).map_err(|err| device_error("channel", err))?;
    let config = TransportConfig {
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
    };

    let transport: Box<dyn Transport> = match (&args.port, &args.host) {
        (Some(port), _) => Box::new(StreamTransport::with_config(
            SerialConnector::new(port.as_str()),
            config,
        )),
        (None, Some(host)) => Box::new(StreamTransport::with_config(
            TcpConnector::new(host.as_str()),
            config,
        )),
        (None, None) => return Err(CliError::new(USAGE, "either --port or --host is required")),
    };
    let source = args.port.as_deref().or(args.host.as_deref()).unwrap_or_default();

    let mut ps = PowerSupply::new(transport);
    if let Some(model) = args.model {
        ps = ps.with_model(match model {
            ModelArg::Ps02 => PowerSupplyModel::Ps02,
            ModelArg::Ps03 => PowerSupplyModel::Ps03,
        });
    }

    let source = format!("{source} {channel}");
    let result = match args.layout {
        Layout::Sequential => ps.read_metadata(channel).map(|record| {
            print_record(&source, record.probe_model(), &record.named_values(), format);
        }),
        Layout::Firefly => ps.read_firefly_metadata(channel).map(|record| {
            print_record(&source, record.base.probe_model(), &record.named_values(), format);
        }),
    };
    // Release the port even when the read failed.
    let _ = ps.close();

    result.map_err(|err| device_error("read metadata", err))?;
    Ok(SUCCESS)
}

fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input:?}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
