//! Packet loaders turn repository content into staged packets.

use injector_core::wire::{
    split_task_id, PacketHeader, Service, StagedPacket, APP_REQUEST_RECORD, GLOBAL_MAPPER_TASK,
    TASK_DESCRIPTOR_SIZE,
};

use crate::descriptor::STATIC_PE_FIELD;
use crate::repository::{RepoError, RepositoryAccess};
use crate::schedule::LaunchEntry;

/// TASK_ALLOCATION packet carrying the code of one task to `allocated_pe`.
///
/// `full_task_id` is `app_id << 8 | task_id`; the app id selects the
/// schedule record whose repository holds the code.
pub fn load_task_allocation<R: RepositoryAccess + ?Sized>(
    repo: &R,
    full_task_id: u32,
    master_id: u32,
    allocated_pe: u32,
) -> Result<StagedPacket, RepoError> {
    let (app_id, task_id) = split_task_id(full_task_id);
    let image = repo.read_task_block(app_id, task_id)?;

    let mut header = PacketHeader::new(allocated_pe, Service::TaskAllocation);
    header.producer_task = full_task_id;
    header.consumer_task = master_id;
    header.msg_length = image.descriptor.code_size;

    Ok(StagedPacket::new(header, &image.code))
}

/// NEW_APP packet carrying the application descriptor to its cluster manager.
///
/// Every task's statically-mapped PE line is replaced by the mapping from
/// the launch schedule. The launch entry is consumed.
pub fn load_app_descriptor<R: RepositoryAccess + ?Sized>(
    repo: &R,
    launch: LaunchEntry,
    app_id: u32,
    cluster_address: u32,
) -> Result<StagedPacket, RepoError> {
    let LaunchEntry {
        name,
        task_count,
        static_mapping,
        ..
    } = launch;

    if static_mapping.len() < task_count as usize {
        return Err(RepoError::MappingMismatch {
            app: name,
            task_count,
            mappings: static_mapping.len(),
        });
    }

    let mut descriptor = repo.read_descriptor(&name, task_count)?;
    let length = descriptor.len() as u32;

    // Line 0 is the task count, so task t's PE line is 1 + 6t + 1.
    let pe_lines = (1 + STATIC_PE_FIELD..descriptor.len()).step_by(TASK_DESCRIPTOR_SIZE);
    for (line, pe) in pe_lines.zip(static_mapping) {
        descriptor[line] = pe as u32;
    }

    let mut header = PacketHeader::new(cluster_address & 0xFFFF, Service::NewApp);
    header.consumer_task = cluster_address >> 16;
    header.msg_length = length + APP_REQUEST_RECORD as u32;

    let mut payload = Vec::with_capacity(APP_REQUEST_RECORD + descriptor.len());
    payload.extend([Service::NewApp.into(), app_id, length]);
    payload.extend(descriptor);

    Ok(StagedPacket::new(header, &payload))
}

/// NEW_APP_REQ packet asking the global mapper to admit an application.
pub fn app_request(manager_address: u32, cluster_id: i32, task_count: u32) -> StagedPacket {
    let mut header = PacketHeader::new(manager_address, Service::NewAppRequest);
    header.consumer_task = GLOBAL_MAPPER_TASK;
    header.msg_length = APP_REQUEST_RECORD as u32;

    StagedPacket::new(
        header,
        &[Service::NewAppRequest.into(), cluster_id as u32, task_count],
    )
}
