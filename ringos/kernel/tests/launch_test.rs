//! Bring-up and launch tests for ringos

use ringos::{EntryPoint, Kernel, OsConfig, OsError, ThreadId, TimeSlice, STACK_WORDS};
use ringos_port::frame::{INITIAL_LR, INITIAL_REGISTERS, THUMB_BIT};
use ringos_port::sim::{PortEvent, SimPort};

fn thread_a() -> EntryPoint {
    EntryPoint::new(0x0000_2001)
}

fn thread_b() -> EntryPoint {
    EntryPoint::new(0x0000_3001)
}

#[test]
fn test_port_call_order() {
    let kernel: Kernel<SimPort> = Kernel::new(SimPort::new());
    kernel.init().unwrap();
    kernel.add_threads(thread_a(), thread_b()).unwrap();
    let sp = kernel.prepare_launch(TimeSlice::new(80_000).unwrap()).unwrap();

    assert_eq!(
        kernel.port().take_events(),
        [
            PortEvent::DisableInterrupts,
            PortEvent::InitClock,
            PortEvent::ConfigureTick {
                reload: 79_999,
                priority: 0xE0,
            },
        ]
    );
    assert_ne!(sp, 0);
    assert_eq!(sp % 4, 0);
}

#[test]
fn test_custom_tick_priority() {
    let config = OsConfig::builder().name("lab").tick_priority(2).build();
    let kernel: Kernel<SimPort> = Kernel::with_config(SimPort::new(), config);
    kernel.init().unwrap();
    kernel.add_threads(thread_a(), thread_b()).unwrap();
    kernel.prepare_launch(TimeSlice::MAX).unwrap();

    assert_eq!(kernel.config().name, "lab");
    assert!(kernel.port().events().contains(&PortEvent::ConfigureTick {
        reload: TimeSlice::MAX_RELOAD,
        priority: 2 << 5,
    }));
}

#[test]
fn test_launch_without_threads() {
    let kernel: Kernel<SimPort> = Kernel::new(SimPort::new());
    kernel.init().unwrap();
    assert_eq!(
        kernel.prepare_launch(TimeSlice::MAX),
        Err(OsError::NoThreads)
    );
    assert!(!kernel.is_launched());
}

#[test]
fn test_launch_before_init() {
    let kernel: Kernel<SimPort> = Kernel::new(SimPort::new());
    assert_eq!(
        kernel.prepare_launch(TimeSlice::MAX),
        Err(OsError::NotInitialized)
    );
    assert!(kernel.port().events().is_empty());
}

#[test]
fn test_time_slice_bounds() {
    assert_eq!(TimeSlice::new(0), Err(OsError::InvalidTimeSlice(0)));
    assert_eq!(
        TimeSlice::new(0x0100_0001),
        Err(OsError::InvalidTimeSlice(0x0100_0001))
    );
    assert_eq!(TimeSlice::new(1).unwrap().reload(), 0);
    assert_eq!(TimeSlice::new(0x0100_0000).unwrap(), TimeSlice::MAX);
}

#[test]
fn test_no_threads_added_after_launch() {
    let kernel: Kernel<SimPort> = Kernel::new(SimPort::new());
    kernel.init().unwrap();
    kernel.add_thread_set(&[thread_a()]).unwrap();
    kernel.prepare_launch(TimeSlice::MAX).unwrap();

    assert_eq!(
        kernel.add_threads(thread_a(), thread_b()),
        Err(OsError::AlreadyLaunched)
    );
    assert_eq!(kernel.thread_count(), 1);
}

#[test]
fn test_undersized_stacks_rejected() {
    let kernel: Kernel<SimPort, 2, 8> = Kernel::new(SimPort::new());
    kernel.init().unwrap();
    assert_eq!(
        kernel.add_threads(thread_a(), thread_b()),
        Err(OsError::StackTooSmall {
            words: 8,
            required: 16
        })
    );
}

#[test]
fn test_initial_frames_resume_at_entry() {
    let kernel: Kernel<SimPort> = Kernel::new(SimPort::new());
    kernel.init().unwrap();
    kernel.add_threads(thread_a(), thread_b()).unwrap();

    for (id, entry) in [(ThreadId(0), thread_a()), (ThreadId(1), thread_b())] {
        let regs = kernel.registers_of(id).unwrap();
        assert_eq!(regs.pc, entry.resume_address());
        assert_eq!(regs.r, INITIAL_REGISTERS);
        assert_eq!(regs.lr, INITIAL_LR);
        assert_eq!(regs.xpsr, THUMB_BIT);
        assert_eq!(
            kernel.saved_context(id).unwrap().offset(),
            STACK_WORDS - 16
        );
    }
}
