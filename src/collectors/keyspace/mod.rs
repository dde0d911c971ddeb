use crate::collectors::{Collector, Field, InfoReport, NAMESPACE, Role};
use crate::redis::Target;
use anyhow::Result;
use prometheus::{GaugeVec, Opts, Registry};
use tracing::{debug, instrument};

/// Per-database key and expire counts from the `Keyspace` section.
#[derive(Clone)]
pub struct KeyspaceCollector {
    dbkeys: GaugeVec,
    dbexpires: GaugeVec,
}

impl KeyspaceCollector {
    pub const ENABLED_BY_DEFAULT: bool = true;

    /// # Errors
    ///
    /// Returns an error if a metric cannot be created from the target's name.
    pub fn new(target: &Target) -> Result<Self> {
        let opts = |name: &str, help: &str| {
            Opts::new(name, help)
                .namespace(NAMESPACE)
                .subsystem(target.name())
                .const_label("addr", target.addr())
        };

        Ok(Self {
            dbkeys: GaugeVec::new(opts("dbkeys", "Database key count"), &["db", "role"])?,
            dbexpires: GaugeVec::new(
                opts("dbexpires", "Database expire key count"),
                &["db", "role"],
            )?,
        })
    }

    /// Set the members present for database `db`; a missing member leaves its family untouched.
    pub fn apply(&self, db: &str, role: Role, keys: Option<f64>, expires: Option<f64>) {
        let labels = [db, role.as_str()];

        if let Some(keys) = keys {
            self.dbkeys.with_label_values(&labels).set(keys);
        }
        if let Some(expires) = expires {
            self.dbexpires.with_label_values(&labels).set(expires);
        }
    }
}

impl Collector for KeyspaceCollector {
    fn name(&self) -> &'static str {
        "keyspace"
    }

    #[instrument(skip(self, registry), level = "info", err, fields(collector = "keyspace"))]
    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.dbkeys.clone()))?;
        registry.register(Box::new(self.dbexpires.clone()))?;
        Ok(())
    }

    fn reset(&self) {
        self.dbkeys.reset();
        self.dbexpires.reset();
    }

    #[instrument(skip(self, report), level = "debug", err, fields(collector = "keyspace", role = %report.role))]
    fn collect(&self, report: &InfoReport<'_>) -> Result<()> {
        let mut databases = 0usize;

        for field in &report.fields {
            if let Field::Database { db, keys, expires } = field {
                self.apply(db, report.role, *keys, *expires);
                databases += 1;
            }
        }

        debug!(databases, "applied keyspace stats");
        Ok(())
    }

    fn enabled_by_default(&self) -> bool {
        Self::ENABLED_BY_DEFAULT
    }
}
