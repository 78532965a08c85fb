//! Pump throughput benchmark suite.
//!
//! Benchmarks one-way message delivery over a loopback connection:
//! - Batch sizes: 100, 1000 messages
//! - Payload sizes: 64 B, 4 KiB
//! - Writer modes: per-message frames, coalesced frames
//!
//! Run with: cargo bench --bench pump
//! Results saved to: target/criterion/

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use websocket_pump::{AcceptConfig, Config, DialConfig, Json, Listener, Socket, connect, encode};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[100, 1000];
const PAYLOAD_SIZES: &[usize] = &[64, 4096];

// ============================================================================
// Helpers
// ============================================================================

/// Opens a connected (sender, receiver) pair over loopback TCP.
async fn socket_pair(config: Config) -> (Socket, Socket) {
    let listener = Listener::bind("127.0.0.1:0", AcceptConfig::new().with_socket(config.clone()))
        .await
        .expect("bind loopback listener");
    let url = listener.ws_url();
    let dial = DialConfig::new().with_socket(config);

    let (accepted, dialed) = tokio::join!(listener.accept(), connect(&url, &dial));
    let (receiver, _) = accepted.expect("accept connection");
    let sender = dialed.expect("dial connection");

    (sender, receiver)
}

/// Sends `count` binary messages and waits until `payload_size * count`
/// bytes have been received.
async fn deliver(sender: &Socket, receiver: &mut Socket, count: usize, payload: &[u8]) {
    for _ in 0..count {
        sender.send(payload).expect("queue has room");
    }

    let expected = payload.len() * count;
    let mut received = 0;
    while received < expected {
        let message = receiver.recv().await.expect("connection open");
        received += message.data.len();
    }
}

// ============================================================================
// Benchmark: Delivery
// ============================================================================

fn bench_delivery(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    let mut group = c.benchmark_group("delivery");
    group.measurement_time(Duration::from_secs(10));

    for (mode, coalesce) in [("framed", false), ("coalesced", true)] {
        for &count in BATCH_SIZES {
            for &size in PAYLOAD_SIZES {
                let mut config = Config::new().with_outbound_capacity(count);
                if coalesce {
                    config = config.with_coalesce();
                }

                let (sender, mut receiver) = rt.block_on(socket_pair(config));
                let payload = vec![0xa5_u8; size];

                group.throughput(Throughput::Bytes((count * size) as u64));
                group.bench_with_input(
                    BenchmarkId::new(format!("{mode}/{size}B"), count),
                    &count,
                    |b, &count| {
                        b.iter(|| rt.block_on(deliver(&sender, &mut receiver, count, &payload)));
                    },
                );
            }
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark: Encoding
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let text = "x".repeat(1024);
    let bytes = vec![0_u8; 1024];
    let value = serde_json::json!({
        "channel": "trades",
        "ids": (0..32).collect::<Vec<u32>>(),
    });

    group.bench_function("raw_text", |b| b.iter(|| encode(text.as_str())));
    group.bench_function("raw_bytes", |b| b.iter(|| encode(&bytes)));
    group.bench_function("json", |b| b.iter(|| encode(&Json(&value))));

    group.finish();
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_delivery, bench_encode);
criterion_main!(benches);
