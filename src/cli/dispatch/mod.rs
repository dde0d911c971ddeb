use crate::{
    cli::actions::Action,
    collectors::{COLLECTOR_NAMES, enabled_by_default},
};
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::time::Duration;

/// # Errors
///
/// Returns an error if a required argument is missing
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // None means auto-detect
    let listen = matches.get_one::<String>("listen").cloned();

    let redis = SecretString::from(
        matches
            .get_one::<String>("redis")
            .cloned()
            .ok_or_else(|| anyhow!("Redis address is required. Please provide it using the --redis flag."))?,
    );

    let name = matches
        .get_one::<String>("name")
        .cloned()
        .ok_or_else(|| anyhow!("Name is required. Please provide it using the --name flag."))?;

    let timeout = matches
        .get_one::<u64>("redis.timeout")
        .copied()
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("Timeout is required. Please provide it using the --redis.timeout flag."))?;

    Ok(Action::Run {
        port,
        listen,
        redis,
        name,
        timeout,
        collectors: get_enabled_collectors(matches),
    })
}

#[must_use]
pub fn get_enabled_collectors(matches: &ArgMatches) -> Vec<String> {
    COLLECTOR_NAMES
        .iter()
        .filter(|&name| {
            let enable_flag = format!("collector.{name}");
            let disable_flag = format!("no-collector.{name}");

            if matches.get_flag(&disable_flag) {
                return false;
            }

            if matches.get_flag(&enable_flag) {
                return true;
            }

            enabled_by_default(name)
        })
        .map(|&name| name.to_string())
        .collect()
}
