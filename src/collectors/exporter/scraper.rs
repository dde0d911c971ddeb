use anyhow::Result;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, IntGauge, Opts, Registry};
use std::sync::{Arc, RwLock};
use std::time::Instant;

const SUBSYSTEM: &str = "exporter";

#[derive(Clone)]
pub struct ScraperCollector {
    scrape_duration_seconds: HistogramVec,
    scrape_errors_total: CounterVec,
    last_scrape_timestamp: GaugeVec,
    last_scrape_success: GaugeVec,

    metrics_total: IntGauge,
    scrapes_total: IntGauge,

    state: Arc<RwLock<ScraperState>>,
}

#[derive(Default)]
struct ScraperState {
    total_scrapes: i64,
    total_metrics: i64,
}

impl Default for ScraperCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help)
        .namespace(crate::collectors::NAMESPACE)
        .subsystem(SUBSYSTEM)
}

impl ScraperCollector {
    /// # Panics
    ///
    /// Panics if metric creation fails, which only happens on invalid static names.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let scrape_duration_seconds = HistogramVec::new(
            HistogramOpts::from(opts(
                "stage_duration_seconds",
                "Time spent in each stage of a collection cycle in seconds",
            ))
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["stage"],
        )
        .expect("redis_exporter_stage_duration_seconds");

        let scrape_errors_total = CounterVec::new(
            opts(
                "stage_errors_total",
                "Total number of failures per collection stage",
            ),
            &["stage"],
        )
        .expect("redis_exporter_stage_errors_total");

        let last_scrape_timestamp = GaugeVec::new(
            opts(
                "stage_last_timestamp_seconds",
                "Unix timestamp of the last run of each collection stage",
            ),
            &["stage"],
        )
        .expect("redis_exporter_stage_last_timestamp_seconds");

        let last_scrape_success = GaugeVec::new(
            opts(
                "stage_last_success",
                "Whether the last run of each stage succeeded (1=success, 0=failure)",
            ),
            &["stage"],
        )
        .expect("redis_exporter_stage_last_success");

        let metrics_total = IntGauge::with_opts(opts(
            "metrics_total",
            "Number of metric families exported by the previous cycle",
        ))
        .expect("redis_exporter_metrics_total");

        let scrapes_total = IntGauge::with_opts(opts(
            "scrapes_total",
            "Total number of collection cycles performed since start",
        ))
        .expect("redis_exporter_scrapes_total");

        Self {
            scrape_duration_seconds,
            scrape_errors_total,
            last_scrape_timestamp,
            last_scrape_success,
            metrics_total,
            scrapes_total,
            state: Arc::new(RwLock::new(ScraperState::default())),
        }
    }

    #[must_use]
    pub fn start_scrape(&self, stage: &str) -> ScrapeTimer {
        ScrapeTimer {
            stage: stage.to_string(),
            start: Instant::now(),
            scraper: self.clone(),
            finished: false,
        }
    }

    pub fn update_metrics_count(&self, count: i64) {
        self.metrics_total.set(count);
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("ScraperState write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        state.total_metrics = count;
    }

    pub fn increment_scrapes(&self) {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("ScraperState write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        state.total_scrapes += 1;
        self.scrapes_total.set(state.total_scrapes);
    }

    /// Cycles and metric count as last recorded.
    #[must_use]
    pub fn totals(&self) -> (i64, i64) {
        match self.state.read() {
            Ok(state) => (state.total_scrapes, state.total_metrics),
            Err(poisoned) => {
                let state = poisoned.into_inner();
                (state.total_scrapes, state.total_metrics)
            }
        }
    }

    fn now() -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    fn record_success(&self, stage: &str, duration: f64) {
        self.scrape_duration_seconds
            .with_label_values(&[stage])
            .observe(duration);

        self.last_scrape_timestamp
            .with_label_values(&[stage])
            .set(Self::now());

        self.last_scrape_success.with_label_values(&[stage]).set(1.0);
    }

    fn record_error(&self, stage: &str) {
        self.scrape_errors_total.with_label_values(&[stage]).inc();

        self.last_scrape_timestamp
            .with_label_values(&[stage])
            .set(Self::now());

        self.last_scrape_success.with_label_values(&[stage]).set(0.0);
    }

    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.scrape_duration_seconds.clone()))?;
        registry.register(Box::new(self.scrape_errors_total.clone()))?;
        registry.register(Box::new(self.last_scrape_timestamp.clone()))?;
        registry.register(Box::new(self.last_scrape_success.clone()))?;
        registry.register(Box::new(self.metrics_total.clone()))?;
        registry.register(Box::new(self.scrapes_total.clone()))?;
        Ok(())
    }
}

/// Times one stage; a timer dropped without an outcome counts as a success.
pub struct ScrapeTimer {
    stage: String,
    start: Instant,
    scraper: ScraperCollector,
    finished: bool,
}

impl ScrapeTimer {
    pub fn success(mut self) {
        self.finished = true;
        let duration = self.start.elapsed().as_secs_f64();
        self.scraper.record_success(&self.stage, duration);
    }

    pub fn error(mut self) {
        self.finished = true;
        self.scraper.record_error(&self.stage);
    }
}

impl Drop for ScrapeTimer {
    fn drop(&mut self) {
        if !self.finished {
            let duration = self.start.elapsed().as_secs_f64();
            self.scraper.record_success(&self.stage, duration);
        }
    }
}
