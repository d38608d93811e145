use anyhow::Result;

use injector_core::wire::{Service, HEADER_WORDS};
use injector_engine::{BootState, Link, MonitorState};

use crate::*;

#[test]
fn test_boot_task_sent_to_pe_zero() -> Result<()> {
    let platform = Platform::new("boot-task").with_management();
    let mut injector = platform.injector();
    let mut link = Link::new();

    run_until(&mut injector, &mut link, 100, |inj, _| {
        inj.bootloader_state() == BootState::BootloaderFinished
    })?;

    let boot = sent(&link, Service::TaskAllocation);
    assert_eq!(boot.len(), 1);
    let words = &boot[0].words;
    assert_eq!(words[0], 0, "boot task goes to PE 0");
    assert_eq!(words[1] as usize, words.len() - 2);
    assert_eq!(words[3], 0, "management app, task 0");
    assert_eq!(words[8], 3, "code size");
    assert_eq!(&words[HEADER_WORDS..], &[0xa0, 0xa1, 0xa2]);
    assert_eq!(link.sink.violations(), 0);
    Ok(())
}

#[test]
fn test_no_credit_until_boot_finishes() -> Result<()> {
    let platform = Platform::new("boot-credit").with_management();
    let mut injector = platform.injector();
    let mut link = Link::new();
    link.source.push_packet(inbound(Service::AppMappingComplete, &[]));

    assert!(!injector.credit_out());
    run_until(&mut injector, &mut link, 100, |inj, _| {
        inj.bootloader_state() == BootState::BootloaderFinished
    })?;
    assert_eq!(link.source.delivered(), 0);

    run_for(&mut injector, &mut link, 20);
    assert!(link.source.is_drained());
    Ok(())
}

#[test]
fn test_boot_finishes_before_any_launch_request() -> Result<()> {
    let app = injector_repo::ApplicationImage::layout(vec![(0, 0, 0, vec![1])]);
    // Start time 0: only the boot gate holds the request back.
    let platform = Platform::new("boot-order")
        .with_management()
        .with_app("appA", 0, 1, &[3], app);
    let mut injector = platform.injector();
    let mut link = Link::new();

    let mut boot_done = None;
    let mut request_staged = None;
    for _ in 0..200 {
        link.step(&mut injector);
        let tick = injector.ticks();
        if boot_done.is_none() && injector.bootloader_state() == BootState::BootloaderFinished {
            boot_done = Some(tick);
        }
        if request_staged.is_none() && injector.monitor_state() == MonitorState::WaitingSendAppReq {
            request_staged = Some(tick);
        }
    }

    let (boot_done, request_staged) = (boot_done.unwrap(), request_staged.unwrap());
    assert!(boot_done < request_staged, "boot {boot_done}, request {request_staged}");
    assert_eq!(count(&link, Service::NewAppRequest), 1);
    Ok(())
}

#[test]
fn test_reset_reboots() -> Result<()> {
    let platform = Platform::new("boot-reset").with_management();
    let mut injector = platform.injector();
    let mut link = Link::new();

    run_until(&mut injector, &mut link, 100, |inj, _| {
        inj.bootloader_state() == BootState::BootloaderFinished
    })?;
    injector.reset();
    assert_eq!(injector.bootloader_state(), BootState::Initialize);
    assert_eq!(injector.current_time(), 0);

    run_until(&mut injector, &mut link, 100, |inj, _| {
        inj.bootloader_state() == BootState::BootloaderFinished
    })?;
    assert_eq!(count(&link, Service::TaskAllocation), 2);
    Ok(())
}
