use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("baglink {}", env!("CARGO_PKG_VERSION"));
    if args.extended {
        println!("endpoint schemes: rfcomm, local");
        println!("rfcomm support: {}", baglink_transport::rfcomm_supported());
        println!("target os: {}", std::env::consts::OS);
    }
    Ok(SUCCESS)
}
