use crate::collectors::{Collector, Field, InfoReport, NAMESPACE, Role};
use crate::redis::Target;
use anyhow::Result;
use prometheus::{Gauge, Opts, Registry};
use std::collections::HashMap;
use tracing::{debug, instrument};

pub mod parser;

/// Unscoped gauges, labeled with `cluster` and `addr`.
const GLOBAL_GAUGES: &[(&str, &str)] = &[
    ("used_memory", "Current alloc memory"),
    ("used_cpu", "Used cpu"),
    ("total_commands_processed", "Total commands processed"),
    ("total_net_input_bytes", "Total net input bytes"),
    ("total_net_output_bytes", "Total net output bytes"),
];

/// Gauges scoped under the target name, labeled with `addr`.
const CLUSTER_GAUGES: &[(&str, &str)] = &[
    // Memory
    ("used_memory", "Current alloc memory"),
    ("master_used_memory", "Current alloc memory"),
    ("used_memory_rss", "Used memory rss"),
    ("used_memory_peak", "Used memory peak"),
    ("used_memory_lua", "Used memory lua"),
    ("maxmemory", "Max memory"),
    ("master_maxmemory", "Max memory"),
    // CPU
    ("used_cpu_sys", "Used cpu sys"),
    ("used_cpu_user", "Used cpu user"),
    ("used_cpu", "Used cpu"),
    // Clients
    ("total_connections_received", "Total connections received"),
    ("connected_clients", "Current client connections"),
    ("blocked_clients", "Blocked clients"),
    ("rejected_connections", "Rejected connections"),
    // Traffic
    ("total_commands_processed", "Total commands processed"),
    ("total_net_input_bytes", "Total net input bytes"),
    ("total_net_output_bytes", "Total net output bytes"),
    // Replication
    ("sync_full", "Sync full"),
    ("sync_partial_ok", "sync_partial_ok"),
    ("sync_partial_err", "sync_partial_err"),
    // Keyspace
    ("expired_keys", "expired_keys"),
    ("evicted_keys", "evicted_keys"),
    ("keyspace_hits", "keyspace_hits"),
    ("keyspace_misses", "keyspace_misses"),
    // Pub/Sub
    ("pubsub_channels", "pubsub_channels"),
    ("pubsub_patterns", "pubsub_patterns"),
];

const MASTER_USED_MEMORY: &str = "master_used_memory";
const MASTER_MAXMEMORY: &str = "master_maxmemory";
const USED_CPU: &str = "used_cpu";

/// Static scalar gauges fed from `INFO` plus the values derived from them.
///
/// These gauges are never reset: a field missing from a report keeps the
/// value of the last report that had it.
#[derive(Clone)]
pub struct InfoCollector {
    global: HashMap<&'static str, Gauge>,
    cluster: HashMap<&'static str, Gauge>,
}

/// Raw inputs of the derived gauges, gathered while scanning a report.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Totals {
    used_memory: f64,
    maxmemory: f64,
    cpu: f64,
}

impl InfoCollector {
    pub const ENABLED_BY_DEFAULT: bool = true;

    /// Build the global and cluster gauge tables for `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be created from the target's name.
    pub fn new(target: &Target) -> Result<Self> {
        let mut global = HashMap::with_capacity(GLOBAL_GAUGES.len());
        for &(name, help) in GLOBAL_GAUGES {
            let opts = Opts::new(name, help)
                .namespace(NAMESPACE)
                .const_label("cluster", target.name())
                .const_label("addr", target.addr());
            global.insert(name, Gauge::with_opts(opts)?);
        }

        let mut cluster = HashMap::with_capacity(CLUSTER_GAUGES.len());
        for &(name, help) in CLUSTER_GAUGES {
            let opts = Opts::new(name, help)
                .namespace(NAMESPACE)
                .subsystem(target.name())
                .const_label("addr", target.addr());
            cluster.insert(name, Gauge::with_opts(opts)?);
        }

        Ok(Self { global, cluster })
    }

    /// Unscoped gauge for `name`, if defined.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<&Gauge> {
        self.global.get(name)
    }

    /// Target-scoped gauge for `name`, if defined.
    #[must_use]
    pub fn cluster(&self, name: &str) -> Option<&Gauge> {
        self.cluster.get(name)
    }

    /// Set every gauge named `key`; a key may exist in both tables.
    ///
    /// Returns whether any gauge matched.
    pub fn apply_scalar(&self, key: &str, value: f64) -> bool {
        let mut matched = false;

        if let Some(gauge) = self.global.get(key) {
            gauge.set(value);
            matched = true;
        }
        if let Some(gauge) = self.cluster.get(key) {
            gauge.set(value);
            matched = true;
        }

        matched
    }

    fn derive(&self, role: Role, totals: Totals) {
        // Replicas never report master memory pressure.
        let (used_memory, maxmemory) = if role == Role::Master {
            (totals.used_memory, totals.maxmemory)
        } else {
            (0.0, 0.0)
        };

        if let Some(gauge) = self.cluster.get(MASTER_USED_MEMORY) {
            gauge.set(used_memory);
        }
        if let Some(gauge) = self.cluster.get(MASTER_MAXMEMORY) {
            gauge.set(maxmemory);
        }
        if let Some(gauge) = self.global.get(USED_CPU) {
            gauge.set(totals.cpu);
        }
        if let Some(gauge) = self.cluster.get(USED_CPU) {
            gauge.set(totals.cpu);
        }

        debug!(
            %role,
            used_memory,
            maxmemory,
            cpu = totals.cpu,
            "derived composite gauges"
        );
    }

    fn all_gauges(&self) -> impl Iterator<Item = &Gauge> {
        self.global.values().chain(self.cluster.values())
    }
}

impl Collector for InfoCollector {
    fn name(&self) -> &'static str {
        "info"
    }

    #[instrument(skip(self, registry), level = "info", err, fields(collector = "info"))]
    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        for gauge in self.all_gauges() {
            registry.register(Box::new(gauge.clone()))?;
        }
        Ok(())
    }

    #[instrument(skip(self, report), level = "debug", err, fields(collector = "info"))]
    fn collect(&self, report: &InfoReport<'_>) -> Result<()> {
        let mut totals = Totals::default();
        let mut applied = 0usize;

        for field in &report.fields {
            let Field::Scalar { key, value } = field else {
                continue;
            };

            if !self.apply_scalar(key, *value) {
                continue;
            }
            applied += 1;

            match *key {
                "used_memory" => totals.used_memory = *value,
                "maxmemory" => totals.maxmemory = *value,
                "used_cpu_sys" | "used_cpu_user" => totals.cpu += *value,
                _ => {}
            }
        }

        self.derive(report.role, totals);
        debug!(applied, "applied scalar fields");

        Ok(())
    }

    fn enabled_by_default(&self) -> bool {
        Self::ENABLED_BY_DEFAULT
    }
}
