//! Benchmarks for DNS response cache lookup and store.
//!
//! Measures the read/populate path under a warm cache.

use criterion::{BenchmarkId, Criterion, Throughput, black_box};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use rand::Rng;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use burrow::cache::{CacheKey, ResponseCache};

const WARM_ENTRIES: usize = 1_000;

fn answer(name: &str) -> Message {
    let name = Name::from_str(name).unwrap();
    let mut message = Message::new();
    message.set_id(0);
    message.set_message_type(MessageType::Response);
    message.set_op_code(OpCode::Query);
    message.add_query(Query::query(name.clone(), RecordType::A));
    message.add_answer(Record::from_rdata(
        name,
        300,
        RData::A(A(Ipv4Addr::new(10, 0, 0, 1))),
    ));
    message
}

fn warm_cache() -> ResponseCache {
    let cache = ResponseCache::new();
    for i in 0..WARM_ENTRIES {
        let name = format!("host{i}.example.com.");
        cache.store(
            CacheKey::new(&name, RecordType::A),
            answer(&name),
            Duration::from_secs(300),
        );
    }
    cache
}

fn bench_cache(c: &mut Criterion) {
    let cache = warm_cache();
    let mut rng = rand::rng();

    let mut group = c.benchmark_group("cache");
    group.throughput(Throughput::Elements(1));

    group.bench_function(BenchmarkId::new("lookup", "hit"), |b| {
        b.iter(|| {
            let i = rng.random_range(0..WARM_ENTRIES);
            let key = CacheKey::new(&format!("host{i}.example.com."), RecordType::A);
            cache.lookup(black_box(&key))
        })
    });

    group.bench_function(BenchmarkId::new("lookup", "miss"), |b| {
        let key = CacheKey::new("absent.example.org.", RecordType::A);
        b.iter(|| cache.lookup(black_box(&key)))
    });

    group.bench_function(BenchmarkId::new("store", "overwrite"), |b| {
        let message = answer("host0.example.com.");
        b.iter(|| {
            let i = rng.random_range(0..WARM_ENTRIES);
            let key = CacheKey::new(&format!("host{i}.example.com."), RecordType::A);
            cache.store(
                black_box(key),
                message.clone(),
                Duration::from_secs(300),
            )
        })
    });

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default().configure_from_args();
    bench_cache(&mut criterion);
    criterion.final_summary();
}
