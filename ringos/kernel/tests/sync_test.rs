//! Semaphore and mailbox tests for ringos
//! Host threads stand in for kernel threads where a test needs real
//! concurrency; the `std` critical-section implementation serializes them.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use ringos::{
    BlockingSemaphore, EntryPoint, Kernel, Mailbox, SavedContext, Semaphore, ThreadId, Tick,
    TimeSlice, STACK_WORDS,
};
use ringos_port::sim::SimPort;

fn ready() -> Kernel<SimPort> {
    let kernel = Kernel::new(SimPort::new());
    kernel.init().unwrap();
    kernel
        .add_threads(EntryPoint::new(0x0800_0101), EntryPoint::new(0x0800_0201))
        .unwrap();
    kernel
}

fn launched() -> Kernel<SimPort> {
    let kernel = ready();
    kernel.prepare_launch(TimeSlice::MAX).unwrap();
    kernel
}

#[test]
fn test_semaphore_net_effect() {
    let sem = Semaphore::new(2);
    for _ in 0..5 {
        sem.signal();
    }
    for _ in 0..4 {
        sem.wait();
    }
    assert_eq!(sem.count(), 2 + 5 - 4);
}

#[test]
fn test_mailbox_second_send_overwrites() {
    let mbox = Mailbox::new(0u32);
    mbox.send(11);
    mbox.send(22);

    assert_eq!(mbox.recv(), 22);
    assert_eq!(mbox.lost(), 1);
    assert!(!mbox.has_mail());
}

#[test]
fn test_mailbox_interleaved_delivers_all() {
    let mbox = Mailbox::new(0u32);
    mbox.send(11);
    assert_eq!(mbox.recv(), 11);
    mbox.send(22);
    assert_eq!(mbox.recv(), 22);
    assert_eq!(mbox.lost(), 0);
}

#[test]
fn test_spin_wait_released_by_other_thread() {
    let sem = Semaphore::new(0);

    thread::scope(|s| {
        let waiter = s.spawn(|| {
            sem.wait();
            sem.count()
        });
        thread::sleep(Duration::from_millis(20));
        sem.signal();
        assert_eq!(waiter.join().unwrap(), 0);
    });
}

#[test]
fn test_recv_blocks_until_send() {
    let mbox = Mailbox::new(0u32);

    thread::scope(|s| {
        let consumer = s.spawn(|| mbox.recv());
        thread::sleep(Duration::from_millis(20));
        mbox.send(0xCAFE);
        assert_eq!(consumer.join().unwrap(), 0xCAFE);
    });
    assert_eq!(mbox.lost(), 0);
}

#[test]
fn test_periodic_producer_feeds_mailbox() {
    static SAMPLES: Mailbox<u32> = Mailbox::new(0);
    static NEXT: AtomicU32 = AtomicU32::new(1);

    fn sample() {
        SAMPLES.send(NEXT.fetch_add(1, Ordering::SeqCst));
    }

    let kernel = launched();
    kernel.add_periodic_event_thread(sample, 2).unwrap();

    kernel.tick();
    kernel.tick();
    assert_eq!(SAMPLES.try_recv(), Some(1));

    // consumer falls behind by one sample
    for _ in 0..4 {
        kernel.tick();
    }
    assert_eq!(SAMPLES.try_recv(), Some(3));
    assert_eq!(SAMPLES.lost(), 1);
}

#[test]
fn test_blocking_wait_without_contention() {
    let kernel = launched();
    let sem = BlockingSemaphore::new(1);

    sem.wait(&kernel);
    assert_eq!(sem.count(), 0);
    assert!(!kernel.is_blocked(ThreadId(0)));
    assert_eq!(kernel.port().switch_requests(), 0);
}

#[test]
fn test_blocked_thread_is_skipped_until_signal() {
    let kernel = launched();
    let sem = BlockingSemaphore::new(0);

    thread::scope(|s| {
        // ring thread A waits on its host thread
        let waiter = s.spawn(|| sem.wait(&kernel));

        while !kernel.is_blocked(ThreadId(0)) {
            thread::yield_now();
        }
        assert_eq!(sem.count(), -1);
        assert_eq!(kernel.port().switch_requests(), 1);

        // only B is runnable
        assert_eq!(kernel.tick(), Some(ThreadId(1)));
        assert_eq!(kernel.tick(), Some(ThreadId(1)));

        // B signals
        sem.signal(&kernel);
        waiter.join().unwrap();
    });

    assert_eq!(sem.count(), 0);
    assert!(!kernel.is_blocked(ThreadId(0)));
    assert_eq!(kernel.tick(), Some(ThreadId(0)));
}

#[test]
fn test_signal_without_waiters_counts_up() {
    let kernel = launched();
    let sem = BlockingSemaphore::new(0);
    sem.signal(&kernel);
    sem.signal(&kernel);
    assert_eq!(sem.count(), 2);
    sem.wait(&kernel);
    assert_eq!(sem.count(), 1);
}

#[test]
fn test_blocking_wait_before_launch_takes_unit() {
    let kernel = ready();
    let sem = BlockingSemaphore::new(1);

    sem.wait(&kernel);
    assert_eq!(sem.count(), 0);
    assert_eq!(kernel.port().switch_requests(), 0);
}

#[test]
fn test_blocking_wait_before_launch_spins_for_signal() {
    let kernel = ready();
    let sem = BlockingSemaphore::new(0);

    thread::scope(|s| {
        let waiter = s.spawn(|| sem.wait(&kernel));
        thread::sleep(Duration::from_millis(20));

        // nothing taken yet, nothing parked
        assert!(!waiter.is_finished());
        assert_eq!(sem.count(), 0);
        assert!(!kernel.is_blocked(ThreadId(0)));

        sem.signal(&kernel);
        waiter.join().unwrap();
    });

    // the signal was consumed by the waiter, not lost
    assert_eq!(sem.count(), 0);
    assert_eq!(kernel.port().switch_requests(), 0);
}

#[test]
fn test_yield_from_parked_thread_keeps_period() {
    static FIRED_AT: Mutex<Vec<u32>> = Mutex::new(Vec::new());
    static TICKS: AtomicU32 = AtomicU32::new(0);

    fn on_period() {
        FIRED_AT.lock().unwrap().push(TICKS.load(Ordering::SeqCst));
    }

    let kernel = launched();
    kernel.add_periodic_event_thread(on_period, 3).unwrap();
    let sem = BlockingSemaphore::new(0);

    thread::scope(|s| {
        let waiter = s.spawn(|| sem.wait(&kernel));
        while !kernel.is_blocked(ThreadId(0)) {
            thread::yield_now();
        }
        assert_eq!(kernel.port().switch_requests(), 1);

        // the requested yield trap runs before the next tick
        let next = kernel.yield_context(SavedContext::from_offset(STACK_WORDS - 24));
        assert_eq!(next, SavedContext::from_offset(STACK_WORDS - 16));
        assert_eq!(kernel.current_thread(), Some(ThreadId(1)));
        assert_eq!(kernel.tick_count(), Tick::new(0));
        assert!(FIRED_AT.lock().unwrap().is_empty());

        for _ in 0..6 {
            TICKS.fetch_add(1, Ordering::SeqCst);
            assert_eq!(kernel.tick(), Some(ThreadId(1)));
        }

        sem.signal(&kernel);
        waiter.join().unwrap();
    });

    assert_eq!(*FIRED_AT.lock().unwrap(), [3, 6]);
    assert_eq!(kernel.tick_count(), Tick::new(6));
}
