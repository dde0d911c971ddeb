pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

use anyhow::Result;

/// Parse the command line, set up logging and run the selected action.
///
/// # Errors
///
/// Returns an error if telemetry cannot be initialized or the action fails.
pub async fn start() -> Result<()> {
    let matches = commands::new().get_matches();

    let provider = telemetry::init(matches.get_count("verbose"))?;

    let result = match dispatch::handler(&matches) {
        Ok(action) => actions::run::handle(action).await,
        Err(e) => Err(e),
    };

    telemetry::shutdown(provider);

    result
}
