//! Benchmarks for the scheduler tick path
//!
//! Run with: cargo bench -p ringos

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ringos::{EntryPoint, Kernel, Mailbox, SavedContext, TimeSlice};
use ringos_port::sim::SimPort;

static SAMPLES: Mailbox<u32> = Mailbox::new(0);

fn sample() {
    SAMPLES.send(0x5A5A);
}

fn launched<const N: usize>() -> Kernel<SimPort, N> {
    let kernel = Kernel::new(SimPort::new());
    kernel.init().unwrap();
    let entries: Vec<EntryPoint> = (0..N as u32)
        .map(|i| EntryPoint::new(0x0800_0101 + i * 0x40))
        .collect();
    kernel.add_thread_set(&entries).unwrap();
    kernel.prepare_launch(TimeSlice::MAX).unwrap();
    kernel
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    let two: Kernel<SimPort, 2> = launched();
    group.bench_function("rotate_2", |b| b.iter(|| black_box(two.tick())));

    let eight: Kernel<SimPort, 8> = launched();
    group.bench_function("rotate_8", |b| b.iter(|| black_box(eight.tick())));

    let periodic: Kernel<SimPort, 2> = launched();
    periodic.add_periodic_event_thread(sample, 1).unwrap();
    group.bench_function("rotate_2_with_callback", |b| {
        b.iter(|| black_box(periodic.tick()))
    });

    group.finish();
}

fn bench_switch(c: &mut Criterion) {
    let kernel: Kernel<SimPort, 2> = launched();
    let saved = SavedContext::from_offset(84);

    c.bench_function("switch_context", |b| {
        b.iter(|| kernel.switch_context(black_box(saved)))
    });
}

fn bench_mailbox(c: &mut Criterion) {
    let mbox = Mailbox::new(0u32);
    c.bench_function("mailbox_send_recv", |b| {
        b.iter(|| {
            mbox.send(black_box(7));
            mbox.recv()
        })
    });
}

criterion_group!(benches, bench_tick, bench_switch, bench_mailbox);
criterion_main!(benches);
