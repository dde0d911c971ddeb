mod collectors;

use crate::built_info;
use clap::{Arg, ArgAction, Command, value_parser};

pub use collectors::add_collectors_args;

/// The `redis_exporter` command line.
#[must_use]
pub fn new() -> Command {
    let long_version: &'static str = Box::leak(
        format!(
            "{} - {}",
            built_info::PKG_VERSION,
            built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown")
        )
        .into_boxed_str(),
    );

    let cmd = Command::new(built_info::PKG_NAME)
        .about("Prometheus exporter for Redis INFO statistics")
        .version(built_info::PKG_VERSION)
        .long_version(long_version)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .env("REDIS_EXPORTER_PORT")
                .default_value("9379")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("listen")
                .short('l')
                .long("listen")
                .help("IP address to bind to (default: [::]:<port>, falling back to 0.0.0.0:<port>)")
                .env("REDIS_EXPORTER_LISTEN"),
        )
        .arg(
            Arg::new("redis")
                .long("redis")
                .help("Redis address: host:port, password@host:port or redis://:password@host:port")
                .env("REDIS_EXPORTER_REDIS")
                .default_value("127.0.0.1:6379")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .help("Logical name of the target, used as metric subsystem and cluster label")
                .env("REDIS_EXPORTER_NAME")
                .default_value("none"),
        )
        .arg(
            Arg::new("redis.timeout")
                .long("redis.timeout")
                .help("Connect, read and write timeout in seconds")
                .env("REDIS_EXPORTER_TIMEOUT")
                .default_value("5")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity, -vv for info, -vvv for debug, -vvvv for trace")
                .action(ArgAction::Count),
        );

    add_collectors_args(cmd)
}
