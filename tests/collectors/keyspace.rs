use super::super::common::{FakeRedis, SLAVE_INFO, gauge, series};
use anyhow::Result;
use redis_exporter::collectors::{config::CollectorConfig, registry::CollectorRegistry};
use redis_exporter::redis::Target;
use secrecy::SecretString;
use std::time::Duration;

fn only_keyspace(addr: &str) -> Result<CollectorRegistry> {
    let target = Target::parse(&SecretString::from(addr.to_string()), "cache")?;
    let config = CollectorConfig::new().with_enabled(&["keyspace".to_string()]);
    CollectorRegistry::new(target, Duration::from_secs(1), &config)
}

#[tokio::test]
async fn test_keyspace_collector_labels_db_and_role() -> Result<()> {
    let server = FakeRedis::start(SLAVE_INFO).await;
    let registry = only_keyspace(&server.addr())?;

    let families = registry.collect().await;

    assert_eq!(
        gauge(
            &families,
            "redis_cache_dbkeys",
            &[("db", "0"), ("role", "slave")]
        ),
        Some(5.0)
    );
    assert_eq!(
        gauge(
            &families,
            "redis_cache_dbexpires",
            &[("db", "0"), ("role", "slave")]
        ),
        Some(2.0)
    );
    Ok(())
}

#[tokio::test]
async fn test_keyspace_collector_handles_many_databases() -> Result<()> {
    let report = "role:master\r\n\
db0:keys=1,expires=0,avg_ttl=0\r\n\
db7:keys=70,expires=7,avg_ttl=0\r\n\
db15:keys=150,expires=15,avg_ttl=0\r\n";
    let server = FakeRedis::start(report).await;
    let registry = only_keyspace(&server.addr())?;

    let families = registry.collect().await;

    assert_eq!(series(&families, "redis_cache_dbkeys"), 3);
    assert_eq!(
        gauge(&families, "redis_cache_dbkeys", &[("db", "15")]),
        Some(150.0)
    );
    assert_eq!(
        gauge(&families, "redis_cache_dbexpires", &[("db", "7")]),
        Some(7.0)
    );
    Ok(())
}

#[tokio::test]
async fn test_flushed_database_disappears() -> Result<()> {
    let server = FakeRedis::start("db0:keys=1,expires=0\r\ndb1:keys=2,expires=0\r\n").await;
    let registry = only_keyspace(&server.addr())?;

    registry.collect().await;
    server.set_report("db0:keys=1,expires=0\r\n");
    let families = registry.collect().await;

    assert_eq!(series(&families, "redis_cache_dbkeys"), 1);
    assert_eq!(gauge(&families, "redis_cache_dbkeys", &[("db", "1")]), None);
    Ok(())
}

#[tokio::test]
async fn test_dbfilename_is_not_a_database() -> Result<()> {
    let server = FakeRedis::start("dbfilename:dump.rdb\r\ndb0:keys=3\r\n").await;
    let registry = only_keyspace(&server.addr())?;

    let families = registry.collect().await;

    assert_eq!(series(&families, "redis_cache_dbkeys"), 1);
    assert_eq!(series(&families, "redis_cache_dbexpires"), 0);
    Ok(())
}
