use std::path::PathBuf;

use clap::{ArgGroup, Args, Subcommand, ValueEnum};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod metadata;
pub mod models;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the metadata record of a power supply or probe.
    Metadata(MetadataArgs),
    /// Decode a metadata block dumped to a file.
    Decode(DecodeArgs),
    /// List known probe models and their internal codes.
    Models,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Metadata(args) => metadata::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Models => models::run(format),
        Command::Version(args) => version::run(args),
    }
}

/// Block layout to decode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Layout {
    /// Newline-separated fields, used by power supplies and most probes.
    #[default]
    Sequential,
    /// FireFly fixed-offset layout, selected by its revision tag.
    Firefly,
}

/// Power supply model, used to reject channels it does not have.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    Ps02,
    Ps03,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("link").required(true).args(["port", "host"])))]
pub struct MetadataArgs {
    /// Serial port of the power supply (e.g. /dev/ttyUSB0, COM3).
    #[arg(long, env = "PROBELINK_PORT")]
    pub port: Option<String>,
    /// IP address or host name of the power supply.
    #[arg(long, env = "PROBELINK_HOST")]
    pub host: Option<String>,
    /// Channel to read: 0 is the power supply, 1-4 are probe sockets.
    #[arg(long, short = 'c', default_value = "0")]
    pub channel: u8,
    /// Power supply model.
    #[arg(long)]
    pub model: Option<ModelArg>,
    /// Record layout.
    #[arg(long, value_enum, default_value = "sequential")]
    pub layout: Layout,
    /// Read timeout (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding a 256-byte metadata block.
    pub file: PathBuf,
    /// The file is a hex dump rather than raw bytes.
    #[arg(long)]
    pub hex: bool,
    /// Record layout.
    #[arg(long, value_enum, default_value = "sequential")]
    pub layout: Layout,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details.
    #[arg(long)]
    pub extended: bool,
}
