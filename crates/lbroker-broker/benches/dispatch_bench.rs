// Criterion benchmarks for lbroker-broker
//
// Run benchmarks with:
//   cargo bench -p lbroker-broker
//
// For detailed output with plots:
//   cargo bench -p lbroker-broker -- --save-baseline main

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lbroker_broker::{EnvelopeRouter, WorkerQueue};
use lbroker_common::transport::Inbound;
use lbroker_common::{PeerIdentity, WorkerMessage, WorkerReply};

fn identities(count: usize) -> Vec<PeerIdentity> {
    (0..count).map(|i| PeerIdentity::from(format!("worker-{}", i))).collect()
}

fn bench_queue_fill_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_fill_drain");

    for count in [3, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let workers = identities(count);
            b.iter(|| {
                let mut queue = WorkerQueue::new(count);
                for worker in &workers {
                    queue.enqueue(worker.clone()).unwrap();
                }
                while let Ok(worker) = queue.dequeue_front() {
                    black_box(worker);
                }
            });
        });
    }

    group.finish();
}

fn bench_queue_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_rotation");

    for count in [3, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut queue = WorkerQueue::new(count);
            for worker in identities(count) {
                queue.enqueue(worker).unwrap();
            }
            // dispatch then READY again, the steady state of a busy broker
            b.iter(|| {
                let worker = queue.dequeue_front().unwrap();
                queue.enqueue(black_box(worker)).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_duplicate_ready_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("duplicate_ready_check");

    let workers = identities(100);
    let mut queue = WorkerQueue::new(100);
    for worker in &workers {
        queue.enqueue(worker.clone()).unwrap();
    }
    let last = workers[99].clone();

    group.bench_function("100_workers_worst_case", |b| {
        b.iter(|| black_box(queue.enqueue(last.clone()).is_err()));
    });

    group.finish();
}

fn bench_request_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_routing");
    let worker = PeerIdentity::from("worker-0");

    for size in [16usize, 1024, 65536].iter() {
        let payload = Bytes::from(vec![b'x'; *size]);
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                let inbound = Inbound {
                    identity: PeerIdentity::from("client-0"),
                    frames: vec![Bytes::new(), payload.clone()],
                };
                let request = EnvelopeRouter::decode_client(inbound).unwrap();
                let outbound = EnvelopeRouter::to_backend(worker.clone(), request)
                    .into_outbound()
                    .unwrap();
                black_box(outbound)
            });
        });
    }

    group.finish();
}

fn bench_reply_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("reply_routing");

    let frames = WorkerMessage::Reply(WorkerReply {
        client: PeerIdentity::from("client-0"),
        payload: vec![Bytes::from_static(b"OK")],
    })
    .encode();

    group.bench_function("decode_and_route", |b| {
        b.iter(|| {
            let inbound = Inbound {
                identity: PeerIdentity::from("worker-0"),
                frames: frames.clone(),
            };
            let (_, message) = EnvelopeRouter::decode_worker(inbound).unwrap();
            match message {
                WorkerMessage::Reply(reply) => {
                    black_box(EnvelopeRouter::to_frontend(reply).into_outbound().unwrap());
                }
                WorkerMessage::Ready => unreachable!(),
            }
        });
    });

    let ready = WorkerMessage::Ready.encode();
    group.bench_function("decode_ready", |b| {
        b.iter(|| {
            let inbound = Inbound {
                identity: PeerIdentity::from("worker-0"),
                frames: ready.clone(),
            };
            black_box(EnvelopeRouter::decode_worker(inbound).unwrap())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_queue_fill_drain,
    bench_queue_rotation,
    bench_duplicate_ready_check,
    bench_request_routing,
    bench_reply_routing
);
criterion_main!(benches);
