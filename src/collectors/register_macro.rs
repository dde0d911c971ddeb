macro_rules! register_collectors {
    (
        $(
            $module:ident => $collector_type:ident
        ),* $(,)?
    ) => {
        // Import all collector modules
        $(
            pub mod $module;
            pub use $module::$collector_type;
        )*

        // Generate the enum with all collector types
        #[derive(Clone)]
        pub enum CollectorType {
            $(
                $collector_type($collector_type),
            )*
        }

        // Implement Collector trait for CollectorType enum
        impl Collector for CollectorType {
            fn name(&self) -> &'static str {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.name(),
                    )*
                }
            }

            fn register_metrics(&self, registry: &Registry) -> Result<()> {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.register_metrics(registry),
                    )*
                }
            }

            fn reset(&self) {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.reset(),
                    )*
                }
            }

            fn collect(&self, report: &InfoReport<'_>) -> Result<()> {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.collect(report),
                    )*
                }
            }

            fn enabled_by_default(&self) -> bool {
                match self {
                    $(
                        CollectorType::$collector_type(c) => c.enabled_by_default(),
                    )*
                }
            }
        }

        impl CollectorType {
            /// Scrape bookkeeping is only carried by `ExporterCollector`.
            pub fn get_scraper(&self) -> Option<std::sync::Arc<crate::collectors::exporter::ScraperCollector>> {
                match self {
                    CollectorType::ExporterCollector(c) => Some(c.get_scraper().clone()),
                    _ => None,
                }
            }
        }

        // Collector metrics carry the target's address and name, so factories need it.
        pub fn all_factories() -> HashMap<&'static str, fn(&Target) -> Result<CollectorType>> {
            let mut map: HashMap<&'static str, fn(&Target) -> Result<CollectorType>> = HashMap::new();
            $(
                map.insert(
                    stringify!($module),
                    |target| Ok(CollectorType::$collector_type($collector_type::new(target)?)),
                );
            )*
            map
        }

        /// Whether a collector is on without an explicit flag, known without building it.
        #[must_use]
        pub fn enabled_by_default(name: &str) -> bool {
            match name {
                $(
                    stringify!($module) => $collector_type::ENABLED_BY_DEFAULT,
                )*
                _ => false,
            }
        }

        // Generate array of collector names
        pub const COLLECTOR_NAMES: &[&'static str] = &[
            $(stringify!($module),)*
        ];
    };
}
