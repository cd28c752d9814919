//! Sequencing-core throughput benchmarks.
//!
//! Measures the claim/publish path and the consumer-side availability scan,
//! with a crossbeam bounded channel as the conventional-queue baseline.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ringflow::{
    BusySpinWaitStrategy, MultiProducerSequencer, Sequence,
    SequenceBarrier, Sequencer,
};
use std::sync::Arc;

const BUFFER_SIZE: usize = 1024;

fn bench_claim_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim_publish");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ringflow_single_claim", |b| {
        // No gating sequences: claims never wrap-block, isolating the
        // cursor CAS and the availability store.
        let sequencer =
            MultiProducerSequencer::new(BUFFER_SIZE, Arc::new(BusySpinWaitStrategy::new()))
                .unwrap();
        b.iter(|| {
            let sequence = sequencer.try_next().unwrap();
            sequencer.publish(black_box(sequence));
        });
    });

    group.bench_function("ringflow_batch_claim_16", |b| {
        let sequencer =
            MultiProducerSequencer::new(BUFFER_SIZE, Arc::new(BusySpinWaitStrategy::new()))
                .unwrap();
        b.iter(|| {
            let high = sequencer.try_next_n(16).unwrap();
            sequencer.publish_range(high - 15, black_box(high));
        });
    });

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");
    group.throughput(Throughput::Elements(BUFFER_SIZE as u64));

    group.bench_function("ringflow_burst", |b| {
        let sequencer: Arc<dyn Sequencer> = Arc::new(
            MultiProducerSequencer::new(BUFFER_SIZE, Arc::new(BusySpinWaitStrategy::new()))
                .unwrap(),
        );
        let consumer_sequence = Arc::new(Sequence::default());
        sequencer.add_gating_sequences(&[Arc::clone(&consumer_sequence)]);
        let barrier = Arc::clone(&sequencer).new_barrier(vec![]);

        b.iter(|| {
            let low = consumer_sequence.get() + 1;
            for _ in 0..BUFFER_SIZE {
                let sequence = sequencer.try_next().unwrap();
                sequencer.publish(sequence);
            }
            let available = barrier.wait_for(low + BUFFER_SIZE as i64 - 1).unwrap();
            consumer_sequence.set(black_box(available));
        });
    });

    group.bench_function("crossbeam_channel_burst", |b| {
        let (sender, receiver) = crossbeam::channel::bounded::<i64>(BUFFER_SIZE);
        b.iter(|| {
            for value in 0..BUFFER_SIZE as i64 {
                sender.send(value).unwrap();
            }
            for _ in 0..BUFFER_SIZE {
                black_box(receiver.recv().unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_claim_publish, bench_round_trip);
criterion_main!(benches);
