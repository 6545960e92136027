use rpclink_client::config::{
    DEFAULT_MAX_QUEUED, DEFAULT_RECONNECT_INTERVAL, DEFAULT_SEND_RETRY_INTERVAL,
};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("rpclink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: rpclink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("RPCLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("protocol: JSON-RPC {}", rpclink_envelope::JSONRPC_VERSION);
    println!("transport: tcp, newline-delimited");
    println!(
        "reconnect_interval: {}ms",
        DEFAULT_RECONNECT_INTERVAL.as_millis()
    );
    println!(
        "send_retry_interval: {}ms",
        DEFAULT_SEND_RETRY_INTERVAL.as_millis()
    );
    println!("max_queued: {DEFAULT_MAX_QUEUED}");
    println!(
        "features: async={}, cli=true",
        cfg!(feature = "async")
    );

    Ok(SUCCESS)
}
