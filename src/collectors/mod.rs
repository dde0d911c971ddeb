use crate::redis::Target;
use anyhow::Result;
use prometheus::Registry;
use std::collections::HashMap;

pub use info::parser::{Field, InfoReport, Role};

#[macro_use]
mod register_macro;

/// Prefix shared by every exported metric.
pub const NAMESPACE: &str = "redis";

pub trait Collector {
    fn name(&self) -> &'static str;

    /// Register metrics with the prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if any metric fails to register.
    fn register_metrics(&self, registry: &Registry) -> Result<()>;

    /// Drop every series that must not outlive a cycle.
    fn reset(&self) {}

    /// Absorb one parsed `INFO` report.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be applied.
    fn collect(&self, report: &InfoReport<'_>) -> Result<()>;

    fn enabled_by_default(&self) -> bool {
        false
    }
}

register_collectors! {
    info => InfoCollector,
    commands => CommandsCollector,
    keyspace => KeyspaceCollector,
    exporter => ExporterCollector,
}

pub mod config;
pub mod registry;
