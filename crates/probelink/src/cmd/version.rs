use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("probelink {}", env!("CARGO_PKG_VERSION"));
    if args.extended {
        println!("target_os: {}", std::env::consts::OS);
        println!("target_arch: {}", std::env::consts::ARCH);
        println!(
            "links: serial {} baud, lan port {}",
            probelink::transport::SERIAL_BAUD_RATE,
            probelink::transport::LAN_CONTROL_PORT
        );
    }
    Ok(SUCCESS)
}
