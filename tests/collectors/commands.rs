use super::super::common::{FakeRedis, MASTER_INFO, gauge, series};
use anyhow::Result;
use redis_exporter::collectors::{config::CollectorConfig, registry::CollectorRegistry};
use redis_exporter::redis::Target;
use secrecy::SecretString;
use std::time::Duration;

fn only_commands(addr: &str) -> Result<CollectorRegistry> {
    let target = Target::parse(&SecretString::from(addr.to_string()), "cache")?;
    let config = CollectorConfig::new().with_enabled(&["commands".to_string()]);
    CollectorRegistry::new(target, Duration::from_secs(1), &config)
}

#[tokio::test]
async fn test_commands_collector_exports_calls() -> Result<()> {
    let server = FakeRedis::start(MASTER_INFO).await;
    let registry = only_commands(&server.addr())?;

    let families = registry.collect().await;

    assert_eq!(
        gauge(&families, "redis_cache_cmdstat", &[("cmd", "get")]),
        Some(42.0)
    );
    assert_eq!(
        gauge(&families, "redis_cache_cmdstat", &[("cmd", "set")]),
        Some(7.0)
    );
    // Only the command family and the availability gauge are registered.
    assert_eq!(series(&families, "redis_cache_used_memory"), 0);
    Ok(())
}

#[tokio::test]
async fn test_commands_collector_tracks_new_and_vanished_commands() -> Result<()> {
    let server = FakeRedis::start("cmdstat_get:calls=1,usec=1\r\n").await;
    let registry = only_commands(&server.addr())?;

    registry.collect().await;
    server.set_report("cmdstat_hset:calls=9,usec=1\r\n");
    let families = registry.collect().await;

    assert_eq!(series(&families, "redis_cache_cmdstat"), 1);
    assert_eq!(
        gauge(&families, "redis_cache_cmdstat", &[("cmd", "hset")]),
        Some(9.0)
    );
    Ok(())
}

#[tokio::test]
async fn test_command_without_comma_is_skipped() -> Result<()> {
    let server = FakeRedis::start("cmdstat_get:calls=1\r\ncmdstat_del:calls=2,usec=1\r\n").await;
    let registry = only_commands(&server.addr())?;

    let families = registry.collect().await;

    assert_eq!(series(&families, "redis_cache_cmdstat"), 1);
    assert_eq!(
        gauge(&families, "redis_cache_cmdstat", &[("cmd", "del")]),
        Some(2.0)
    );
    Ok(())
}
