use crate::collectors::{
    COLLECTOR_NAMES, Collector, CollectorType, NAMESPACE, all_factories, config::CollectorConfig,
    exporter::{ScrapeTimer, ScraperCollector},
    info::parser,
};
use crate::redis::{Session, Target};
use anyhow::Result;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder, proto::MetricFamily};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, instrument, warn};

/// Outcome of the most recent collection cycle.
#[derive(Clone, Debug, Default)]
pub struct CycleStatus {
    pub last_scrape: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Fields decoded from the last successful report.
    pub fields: usize,
    pub up: bool,
}

/// Owns the metric registry, the enabled collectors and the session to one
/// target, and runs collection cycles one at a time.
pub struct CollectorRegistry {
    collectors: Vec<CollectorType>,
    registry: Registry,
    session: Mutex<Session>,
    up: Gauge,
    scraper: Option<Arc<ScraperCollector>>,
    status: ArcSwap<CycleStatus>,
    addr: String,
    name: String,
}

impl CollectorRegistry {
    /// Build every enabled collector for `target` and register its metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector cannot be built or its metrics fail to register.
    pub fn new(target: Target, timeout: Duration, config: &CollectorConfig) -> Result<Self> {
        let registry = Registry::new();
        let factories = all_factories();

        for name in &config.enabled_collectors {
            if !factories.contains_key(name.as_str()) {
                warn!(collector = %name, "unknown collector, ignoring");
            }
        }

        let mut collectors = Vec::new();
        let mut scraper = None;

        // Registration order follows COLLECTOR_NAMES so cycles are deterministic.
        for name in COLLECTOR_NAMES {
            if !config.is_enabled(name) {
                continue;
            }

            let Some(factory) = factories.get(name) else {
                continue;
            };

            let collector = factory(&target)?;
            collector.register_metrics(&registry)?;

            if let Some(s) = collector.get_scraper() {
                scraper = Some(s);
            }

            info!(collector = name, "registered collector");
            collectors.push(collector);
        }

        let up = Gauge::with_opts(
            Opts::new("up", "Whether the last INFO request succeeded (1) or not (0)")
                .namespace(NAMESPACE)
                .const_label("addr", target.addr()),
        )?;
        registry.register(Box::new(up.clone()))?;

        Ok(Self {
            collectors,
            registry,
            addr: target.addr().to_string(),
            name: target.name().to_string(),
            session: Mutex::new(Session::new(target, timeout)),
            up,
            scraper,
            status: ArcSwap::from_pointee(CycleStatus::default()),
        })
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the collectors built for this target, in cycle order.
    #[must_use]
    pub fn enabled(&self) -> Vec<&'static str> {
        self.collectors.iter().map(Collector::name).collect()
    }

    /// Snapshot of the last cycle, readable without waiting for a running one.
    #[must_use]
    pub fn status(&self) -> Arc<CycleStatus> {
        self.status.load_full()
    }

    /// Run one collection cycle and return the resulting snapshot.
    ///
    /// A cycle that cannot reach the server still returns a snapshot: static
    /// gauges keep their previous values and the dynamic families are empty.
    #[instrument(skip(self), level = "info", fields(addr = %self.addr))]
    pub async fn collect(&self) -> Vec<MetricFamily> {
        let mut session = self.session.lock().await;
        let started = Utc::now();

        for collector in &self.collectors {
            collector.reset();
        }

        let timer = self.start_stage("request");
        let outcome = match session.info().await {
            Ok(raw) => {
                finish(timer, true);
                Ok(self.apply(&raw))
            }
            Err(e) => {
                finish(timer, false);
                warn!(kind = e.kind(), error = %e, "collection cycle aborted");
                Err(e.to_string())
            }
        };

        self.up.set(if outcome.is_ok() { 1.0 } else { 0.0 });
        self.record(started, outcome);

        let families = self.registry.gather();

        if let Some(scraper) = &self.scraper {
            scraper.update_metrics_count(i64::try_from(families.len()).unwrap_or(i64::MAX));
            scraper.increment_scrapes();
        }

        drop(session);
        families
    }

    /// Run one cycle and encode the snapshot in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub async fn render(&self) -> Result<String> {
        let families = self.collect().await;
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Parse `raw` and hand the report to every collector; returns the number of decoded fields.
    fn apply(&self, raw: &str) -> usize {
        let report = parser::parse(raw);
        debug!(fields = report.fields.len(), role = %report.role, "parsed INFO report");

        for collector in &self.collectors {
            // Self-monitoring reads nothing from the report, so it is not a stage.
            if collector.get_scraper().is_some() {
                continue;
            }

            let span = info_span!("collector.collect", collector = collector.name());
            let _enter = span.enter();

            let timer = self.start_stage(collector.name());
            match collector.collect(&report) {
                Ok(()) => finish(timer, true),
                Err(e) => {
                    finish(timer, false);
                    warn!(collector = collector.name(), error = %e, "collector failed");
                }
            }
        }

        report.fields.len()
    }

    fn record(&self, at: DateTime<Utc>, outcome: Result<usize, String>) {
        let previous = self.status.load();

        let next = match outcome {
            Ok(fields) => CycleStatus {
                last_scrape: Some(at),
                last_success: Some(at),
                last_error: None,
                fields,
                up: true,
            },
            Err(error) => CycleStatus {
                last_scrape: Some(at),
                last_success: previous.last_success,
                last_error: Some(error),
                fields: previous.fields,
                up: false,
            },
        };

        self.status.store(Arc::new(next));
    }

    fn start_stage(&self, stage: &str) -> Option<ScrapeTimer> {
        self.scraper.as_ref().map(|s| s.start_scrape(stage))
    }
}

fn finish(timer: Option<ScrapeTimer>, ok: bool) {
    if let Some(timer) = timer {
        if ok {
            timer.success();
        } else {
            timer.error();
        }
    }
}
