use crate::collectors::{COLLECTOR_NAMES, enabled_by_default};
use clap::{Arg, ArgAction, Command};

/// Add a `--collector.<name>` / `--no-collector.<name>` pair per collector.
#[must_use]
pub fn add_collectors_args(mut cmd: Command) -> Command {
    for &name in COLLECTOR_NAMES {
        let default_enabled = enabled_by_default(name);

        let enable_flag: &'static str = Box::leak(format!("collector.{name}").into_boxed_str());
        let disable_flag: &'static str = Box::leak(format!("no-collector.{name}").into_boxed_str());

        let default_indicator = if default_enabled {
            " [default: enabled]"
        } else {
            " [default: disabled]"
        };
        let enable_help: &'static str =
            Box::leak(format!("Enable the {name} collector{default_indicator}").into_boxed_str());
        let disable_help: &'static str =
            Box::leak(format!("Disable the {name} collector").into_boxed_str());

        cmd = cmd
            .arg(
                Arg::new(enable_flag)
                    .long(enable_flag)
                    .help(enable_help)
                    .action(ArgAction::SetTrue)
                    .default_value(if default_enabled { "true" } else { "false" }),
            )
            .arg(
                Arg::new(disable_flag)
                    .long(disable_flag)
                    .help(disable_help)
                    .action(ArgAction::SetTrue)
                    .overrides_with(enable_flag),
            );
    }
    cmd
}
