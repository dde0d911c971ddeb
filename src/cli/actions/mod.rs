pub mod run;

use secrecy::SecretString;
use std::time::Duration;

#[derive(Debug)]
pub enum Action {
    Run {
        port: u16,
        listen: Option<String>,
        redis: SecretString,
        name: String,
        timeout: Duration,
        collectors: Vec<String>,
    },
}
