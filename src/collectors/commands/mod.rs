use crate::collectors::{Collector, Field, InfoReport, NAMESPACE};
use crate::redis::Target;
use anyhow::Result;
use prometheus::{GaugeVec, Opts, Registry};
use tracing::{debug, instrument};

/// Per-command call counts from the `Commandstats` section.
///
/// The family is emptied at the start of every cycle, so a command only
/// appears while the server still reports it.
#[derive(Clone)]
pub struct CommandsCollector {
    cmdstat: GaugeVec,
}

impl CommandsCollector {
    pub const ENABLED_BY_DEFAULT: bool = true;

    /// # Errors
    ///
    /// Returns an error if the metric cannot be created from the target's name.
    pub fn new(target: &Target) -> Result<Self> {
        let cmdstat = GaugeVec::new(
            Opts::new("cmdstat", "Commands stat")
                .namespace(NAMESPACE)
                .subsystem(target.name())
                .const_label("addr", target.addr()),
            &["cmd"],
        )?;

        Ok(Self { cmdstat })
    }

    /// Set (or create) the series for `command`.
    pub fn apply(&self, command: &str, calls: f64) {
        self.cmdstat.with_label_values(&[command]).set(calls);
    }
}

impl Collector for CommandsCollector {
    fn name(&self) -> &'static str {
        "commands"
    }

    #[instrument(skip(self, registry), level = "info", err, fields(collector = "commands"))]
    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.cmdstat.clone()))?;
        Ok(())
    }

    fn reset(&self) {
        self.cmdstat.reset();
    }

    #[instrument(skip(self, report), level = "debug", err, fields(collector = "commands"))]
    fn collect(&self, report: &InfoReport<'_>) -> Result<()> {
        let mut count = 0usize;

        for field in &report.fields {
            if let Field::Command { command, calls } = field {
                self.apply(command, *calls);
                count += 1;
            }
        }

        debug!(count, "applied command stats");
        Ok(())
    }

    fn enabled_by_default(&self) -> bool {
        Self::ENABLED_BY_DEFAULT
    }
}
