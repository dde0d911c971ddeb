mod scraper;

pub use scraper::{ScrapeTimer, ScraperCollector};

use crate::collectors::{Collector, InfoReport};
use crate::redis::Target;
use anyhow::Result;
use prometheus::Registry;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Exporter self-monitoring.
///
/// Its metrics are fed by the orchestrator through [`ScraperCollector`], not
/// from the `INFO` report.
#[derive(Clone)]
pub struct ExporterCollector {
    scraper: Arc<ScraperCollector>,
}

impl ExporterCollector {
    pub const ENABLED_BY_DEFAULT: bool = false;

    /// # Errors
    ///
    /// Never fails today; the signature matches the other collector factories.
    pub fn new(_target: &Target) -> Result<Self> {
        Ok(Self {
            scraper: Arc::new(ScraperCollector::new()),
        })
    }

    #[must_use]
    pub const fn get_scraper(&self) -> &Arc<ScraperCollector> {
        &self.scraper
    }
}

impl Collector for ExporterCollector {
    fn name(&self) -> &'static str {
        "exporter"
    }

    #[instrument(
        skip(self, registry),
        level = "info",
        err,
        fields(collector = "exporter")
    )]
    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        self.scraper.register(registry)?;
        debug!("registered exporter metrics");
        Ok(())
    }

    fn collect(&self, _report: &InfoReport<'_>) -> Result<()> {
        Ok(())
    }

    fn enabled_by_default(&self) -> bool {
        Self::ENABLED_BY_DEFAULT
    }
}
