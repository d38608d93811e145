use anyhow::Result;

use injector_core::wire::{Service, HEADER_WORDS, TASK_DESCRIPTOR_SIZE};
use injector_engine::{AppInjector, Link, ReceiveState};
use injector_repo::{load_task_allocation, ApplicationImage, FileRepository, RepositoryAccess};

use crate::*;

fn two_tasks() -> ApplicationImage {
    ApplicationImage::layout(vec![
        (0x0001, 2, 1, vec![0xd0, 0xd1, 0xd2, 0xd3]),
        (0x0002, 0, 0, vec![0xe0]),
    ])
}

/// Boot, send the admission request for appA, and return once it is out.
fn admitted(platform: &Platform) -> Result<(AppInjector<FileRepository>, Link)> {
    let mut injector = platform.injector();
    let mut link = Link::new();
    run_until(&mut injector, &mut link, 500, |_, link| {
        count(link, Service::NewAppRequest) == 1
    })?;
    Ok((injector, link))
}

#[test]
fn test_ack_sends_descriptor_with_static_mapping() -> Result<()> {
    let platform = Platform::new("alloc-ack")
        .with_management()
        .with_app("appA", 1, 2, &[0x0102, 0x0201], two_tasks());
    let (mut injector, mut link) = admitted(&platform)?;

    link.source
        .push_packet(inbound(Service::AppRequestAck, &[1, 0x0004_0303]));
    run_until(&mut injector, &mut link, 200, |_, link| {
        count(link, Service::NewApp) == 1
    })?;

    let reply = sent(&link, Service::NewApp)[0];
    let length = 2 * TASK_DESCRIPTOR_SIZE as u32 + 1;
    assert_eq!(reply.target, 0x0303);
    assert_eq!(reply.words[4], 0x0004);
    assert_eq!(reply.words[8], length + 3);

    let mut expected = vec![0x150, 1, length];
    let mut descriptor = platform.image("appA").descriptor_words();
    descriptor[2] = 0x0102;
    descriptor[2 + TASK_DESCRIPTOR_SIZE] = 0x0201;
    expected.extend(descriptor);
    assert_eq!(&reply.words[HEADER_WORDS..], expected.as_slice());

    run_for(&mut injector, &mut link, 5);
    assert_eq!(injector.receiver_state(), ReceiveState::Header);
    Ok(())
}

#[test]
fn test_allocation_request_sends_task_code() -> Result<()> {
    let platform = Platform::new("alloc-code")
        .with_management()
        .with_app("appA", 1, 2, &[0x0102, 0x0201], two_tasks());
    let (mut injector, mut link) = admitted(&platform)?;

    // App 1, task 0, master 0x0200, to PE 0x0102.
    link.source
        .push_packet(inbound(Service::AppAllocationRequest, &[0x0100, 0x0200, 0x0102]));
    run_until(&mut injector, &mut link, 200, |_, link| {
        count(link, Service::TaskAllocation) == 2
    })?;

    let task = sent(&link, Service::TaskAllocation)[1];
    assert_eq!(task.target, 0x0102);
    assert_eq!(task.words[3], 0x0100);
    assert_eq!(task.words[4], 0x0200);
    assert_eq!(task.words[8], 4);
    assert_eq!(&task.words[HEADER_WORDS..], &[0xd0, 0xd1, 0xd2, 0xd3]);
    Ok(())
}

#[test]
fn test_task_range_against_declared_count() -> Result<()> {
    let platform = Platform::new("alloc-range")
        .with_management()
        .with_app("appA", 1, 2, &[0x0102, 0x0201], two_tasks());
    platform.write();
    let repo = FileRepository::from_config(&platform.config());

    let packet = load_task_allocation(&repo, 0x0101, 0, 0x0201)?;
    assert_eq!(packet.header().producer_task, 0x0101);
    assert_eq!(packet.payload(), &[0xe0]);

    let err = load_task_allocation(&repo, 0x0102, 0, 0x0201).unwrap_err();
    assert!(err.is_range_error(), "{err}");
    assert!(repo.read_task_block(1, 2).is_err());
    Ok(())
}

#[test]
fn test_out_of_range_request_is_dropped() -> Result<()> {
    let platform = Platform::new("alloc-drop")
        .with_management()
        .with_app("appA", 1, 2, &[0x0102, 0x0201], two_tasks());
    let (mut injector, mut link) = admitted(&platform)?;

    link.source
        .push_packet(inbound(Service::AppAllocationRequest, &[0x0102, 0, 0x0201]));
    link.source
        .push_packet(inbound(Service::AppAllocationRequest, &[0x0101, 0, 0x0201]));
    run_until(&mut injector, &mut link, 200, |_, link| {
        count(link, Service::TaskAllocation) == 2
    })?;

    // Only the valid request produced a packet.
    let task = sent(&link, Service::TaskAllocation)[1];
    assert_eq!(task.words[3], 0x0101);
    assert!(link.source.is_drained());
    Ok(())
}
