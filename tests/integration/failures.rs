use anyhow::Result;

use injector_core::wire::{Service, HEADER_WORDS};
use injector_engine::{AppInjector, BootState, Link, MonitorState, ReceiveState, SendState};
use injector_repo::{ApplicationImage, FileRepository};

use crate::*;

#[test]
fn test_malformed_schedule_keeps_monitoring() -> Result<()> {
    let platform = Platform::new("fail-schedule").with_management();
    platform.write();
    // Replace the sentinel with a record whose start time is not a number.
    let mut schedule = std::fs::read_to_string(platform.schedule_path())?;
    schedule = schedule.replace(SENTINEL, "appA\n5x\n1\n1\n7\ndeadc0de");
    std::fs::write(platform.schedule_path(), schedule)?;

    let config = platform.config();
    let repo = FileRepository::from_config(&config);
    let mut injector = AppInjector::new(repo, &config);
    let mut link = Link::new();

    run_for(&mut injector, &mut link, 300);

    assert_eq!(injector.monitor_state(), MonitorState::Monitoring);
    assert!(injector.is_stalled());
    assert!(!injector.is_quiescent());
    assert_eq!(count(&link, Service::NewAppRequest), 0);
    // The boot task still went out.
    assert_eq!(injector.bootloader_state(), BootState::BootloaderFinished);
    Ok(())
}

#[test]
fn test_missing_boot_repository_retries() -> Result<()> {
    let platform = Platform::new("fail-boot").with_management();
    platform.write();
    std::fs::remove_dir_all(platform.apps_dir())?;

    let config = platform.config();
    let repo = FileRepository::from_config(&config);
    let mut injector = AppInjector::new(repo, &config);
    let mut link = Link::new();

    run_for(&mut injector, &mut link, 50);
    assert_eq!(injector.bootloader_state(), BootState::Initialize);
    assert_eq!(injector.outstanding_buffers(), 0);
    assert!(!injector.credit_out());
    assert!(injector.is_stalled());
    assert!(link.sink.packets().is_empty());
    Ok(())
}

#[test]
fn test_unknown_service_stops_receiver_only() -> Result<()> {
    let app = ApplicationImage::layout(vec![(0, 0, 0, vec![1])]);
    let platform = Platform::new("fail-service")
        .with_management()
        .with_app("appA", 20, 1, &[7], app);
    let mut injector = platform.injector();
    let mut link = Link::new();

    let mut bogus = inbound(Service::AppMappingComplete, &[]);
    bogus[2] = 0xbad;
    link.source.push_packet(bogus);

    run_until(&mut injector, &mut link, 100, |_, link| link.source.is_drained())?;
    assert_eq!(injector.receiver_fault(), Some(0xbad));
    assert_eq!(injector.receiver_state(), ReceiveState::Service);

    // Later traffic is swallowed; the monitor never sees an idle receiver.
    link.source.push_packet(inbound(Service::AppAllocationRequest, &[0, 0, 5]));
    run_for(&mut injector, &mut link, 400);
    assert!(link.source.is_drained());
    assert_eq!(injector.monitor_state(), MonitorState::WaitingTime);
    assert_eq!(count(&link, Service::TaskAllocation), 1);
    assert_eq!(count(&link, Service::NewAppRequest), 0);
    Ok(())
}

#[test]
fn test_credit_loss_mid_packet_resumes_in_place() -> Result<()> {
    let platform = Platform::new("fail-credit").with_management();
    let mut injector = platform.injector();
    let mut link = Link::new();

    run_until(&mut injector, &mut link, 50, |inj, link| {
        inj.sender_state() == SendState::SendPacket && link.sink.is_mid_packet()
    })?;
    run_for(&mut injector, &mut link, 4);
    link.sink.withhold_credit(3);
    for _ in 0..3 {
        let out = link.step(&mut injector);
        assert!(!out.tx);
        assert_eq!(injector.sender_state(), SendState::WaitingCredit);
    }

    run_until(&mut injector, &mut link, 50, |inj, _| {
        inj.bootloader_state() == BootState::BootloaderFinished
    })?;
    let boot = &link.sink.packets()[0];
    assert_eq!(boot.words.len(), HEADER_WORDS + 3);
    assert_eq!(&boot.words[HEADER_WORDS..], &[0xa0, 0xa1, 0xa2]);
    assert_eq!(boot.words[1] as usize, HEADER_WORDS + 1);
    assert_eq!(link.sink.violations(), 0);
    Ok(())
}
