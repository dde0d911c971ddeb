#![allow(dead_code)]

//! In-process stand-in for a Redis server: answers `AUTH` and `INFO` over RESP.

use prometheus::proto::MetricFamily;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;

pub const MASTER_INFO: &str = "# Server\r\n\
redis_version:7.2.4\r\n\
uptime_in_seconds:3600\r\n\
\r\n\
# Clients\r\n\
connected_clients:12\r\n\
blocked_clients:1\r\n\
\r\n\
# Memory\r\n\
used_memory:1048576\r\n\
used_memory_rss:2097152\r\n\
used_memory_peak:1500000\r\n\
used_memory_lua:37888\r\n\
maxmemory:4194304\r\n\
\r\n\
# Stats\r\n\
total_connections_received:120\r\n\
total_commands_processed:5000\r\n\
total_net_input_bytes:64000\r\n\
total_net_output_bytes:128000\r\n\
rejected_connections:0\r\n\
sync_full:1\r\n\
sync_partial_ok:0\r\n\
sync_partial_err:0\r\n\
expired_keys:3\r\n\
evicted_keys:0\r\n\
keyspace_hits:900\r\n\
keyspace_misses:100\r\n\
pubsub_channels:2\r\n\
pubsub_patterns:0\r\n\
\r\n\
# Replication\r\n\
role:master\r\n\
connected_slaves:1\r\n\
\r\n\
# CPU\r\n\
used_cpu_sys:1.50\r\n\
used_cpu_user:2.50\r\n\
\r\n\
# Commandstats\r\n\
cmdstat_get:calls=42,usec=10,usec_per_call=0.24\r\n\
cmdstat_set:calls=7,usec=3,usec_per_call=0.43\r\n\
\r\n\
# Keyspace\r\n\
db0:keys=5,expires=2,avg_ttl=0\r\n\
db3:keys=1,expires=0,avg_ttl=0\r\n";

pub const SLAVE_INFO: &str = "# Memory\r\n\
used_memory:2048\r\n\
maxmemory:8192\r\n\
\r\n\
# Replication\r\n\
role:slave\r\n\
master_host:10.0.0.1\r\n\
\r\n\
# CPU\r\n\
used_cpu_sys:0.25\r\n\
used_cpu_user:0.75\r\n\
\r\n\
# Keyspace\r\n\
db0:keys=5,expires=2,avg_ttl=0\r\n";

#[derive(Default)]
struct State {
    report: Mutex<String>,
    password: Option<String>,
    delay: Mutex<Option<Duration>>,
    auth_delay: Mutex<Option<Duration>>,
    connections: AtomicUsize,
    auth_calls: AtomicUsize,
    info_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub struct FakeRedis {
    addr: SocketAddr,
    state: Arc<State>,
    handle: JoinHandle<()>,
}

impl FakeRedis {
    pub async fn start(report: &str) -> Self {
        Self::start_with(report, None, "127.0.0.1:0").await
    }

    pub async fn with_password(report: &str, password: &str) -> Self {
        Self::start_with(report, Some(password.to_string()), "127.0.0.1:0").await
    }

    /// Serve on a specific address, e.g. one a previous cycle failed to reach.
    pub async fn start_on(report: &str, addr: &str) -> Self {
        Self::start_with(report, None, addr).await
    }

    async fn start_with(report: &str, password: Option<String>, bind: &str) -> Self {
        let listener = TcpListener::bind(bind).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(State {
            report: Mutex::new(report.to_string()),
            password,
            ..State::default()
        });

        let handle = tokio::spawn({
            let state = Arc::clone(&state);
            async move {
                // Dropping the set closes every open connection with the server.
                let mut conns = JoinSet::new();
                while let Ok((stream, _)) = listener.accept().await {
                    state.connections.fetch_add(1, Ordering::SeqCst);
                    conns.spawn(serve(stream, Arc::clone(&state)));
                }
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    pub fn set_report(&self, report: &str) {
        *self.state.report.lock().unwrap() = report.to_string();
    }

    /// Delay every `INFO` reply by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = Some(delay);
    }

    /// Delay every `AUTH` reply by `delay`.
    pub fn set_auth_delay(&self, delay: Duration) {
        *self.state.auth_delay.lock().unwrap() = Some(delay);
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn auth_calls(&self) -> usize {
        self.state.auth_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> usize {
        self.state.info_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for FakeRedis {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(stream: TcpStream, state: Arc<State>) {
    let mut stream = BufReader::new(stream);
    let mut authenticated = state.password.is_none();

    while let Ok(Some(args)) = read_command(&mut stream).await {
        let command = args.first().map(|c| c.to_ascii_uppercase()).unwrap_or_default();

        let reply = match command.as_str() {
            "AUTH" => {
                state.auth_calls.fetch_add(1, Ordering::SeqCst);

                let delay = *state.auth_delay.lock().unwrap();
                if let Some(delay) = delay {
                    sleep(delay).await;
                }

                if args.last() == state.password.as_ref() {
                    authenticated = true;
                    "+OK\r\n".to_string()
                } else {
                    "-WRONGPASS invalid username-password pair\r\n".to_string()
                }
            }
            "INFO" if !authenticated => {
                state.info_calls.fetch_add(1, Ordering::SeqCst);
                "-NOAUTH Authentication required.\r\n".to_string()
            }
            "INFO" => {
                state.info_calls.fetch_add(1, Ordering::SeqCst);
                let current = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                state.max_in_flight.fetch_max(current, Ordering::SeqCst);

                let delay = *state.delay.lock().unwrap();
                if let Some(delay) = delay {
                    sleep(delay).await;
                }

                let report = state.report.lock().unwrap().clone();
                state.in_flight.fetch_sub(1, Ordering::SeqCst);
                format!("${}\r\n{report}\r\n", report.len())
            }
            _ => format!("-ERR unknown command '{command}'\r\n"),
        };

        if stream.get_mut().write_all(reply.as_bytes()).await.is_err() {
            break;
        }
    }
}

async fn read_command<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Vec<String>>> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }

    let count: usize = line
        .trim_end()
        .strip_prefix('*')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| std::io::Error::other("expected a RESP array"))?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len: usize = line
            .trim_end()
            .strip_prefix('$')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| std::io::Error::other("expected a bulk string"))?;

        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok(Some(args))
}

/// An address nothing listens on.
pub fn closed_addr() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

/// Get an available port for testing
pub fn get_available_port() -> u16 {
    StdTcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to ephemeral port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

/// Build test URL for HTTP requests
pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

/// Wait for server to be ready
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    for _ in 0..max_attempts {
        if TcpStream::connect(format!("127.0.0.1:{port}")).await.is_ok() {
            return true;
        }
        sleep(Duration::from_millis(100)).await;
    }
    false
}

/// Value of the gauge `name` whose labels include every pair in `labels`.
pub fn gauge(families: &[MetricFamily], name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    families
        .iter()
        .find(|f| f.name() == name)?
        .get_metric()
        .iter()
        .find(|m| {
            labels.iter().all(|(k, v)| {
                m.get_label()
                    .iter()
                    .any(|l| l.name() == *k && l.value() == *v)
            })
        })
        .and_then(|m| m.get_gauge().value)
}

/// Number of series in family `name`; zero when the family is absent.
pub fn series(families: &[MetricFamily], name: &str) -> usize {
    families
        .iter()
        .find(|f| f.name() == name)
        .map_or(0, |f| f.get_metric().len())
}
