//! Call contract of the per-task runtime used by management tasks.
//!
//! The runtime itself lives on the processing elements and is not part of
//! the injector. This module pins down the call numbers and the blocking
//! semantics a management task relies on, so host-side models and tests
//! can speak the same interface.

/// Set on a target address to deliver a service message to the kernel
/// instead of a task.
pub const TO_KERNEL: u32 = 0x0001_0000;

/// Management system calls. Numbering continues the user-level API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ManagementCall {
    RequestServiceMode = 9,
    WriteService = 10,
    ReadService = 11,
    Puts = 12,
    NocSendFree = 13,
    IncomingPacket = 14,
    GetNetAddress = 15,
    AddTaskLocation = 16,
    GetTaskLocation = 17,
    SetTaskRelease = 18,
}

impl ManagementCall {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            9 => Some(Self::RequestServiceMode),
            10 => Some(Self::WriteService),
            11 => Some(Self::ReadService),
            12 => Some(Self::Puts),
            13 => Some(Self::NocSendFree),
            14 => Some(Self::IncomingPacket),
            15 => Some(Self::GetNetAddress),
            16 => Some(Self::AddTaskLocation),
            17 => Some(Self::GetTaskLocation),
            18 => Some(Self::SetTaskRelease),
            _ => None,
        }
    }
}

/// Arguments of a single call.
#[derive(Debug)]
pub enum CallArgs<'a> {
    None,
    Message { target: u32, msg: &'a [u32] },
    Receive { msg: &'a mut [u32] },
    Text(&'a str),
    TaskLocation { task_id: u32, location: u32 },
    Task(u32),
    Release { msg: &'a [u32] },
}

/// The raw trap into the runtime. Returns 0 when the channel is busy.
pub trait SystemCall {
    fn system_call(&mut self, call: ManagementCall, args: CallArgs<'_>) -> u32;
}

/// Blocking wrappers over [`SystemCall`].
///
/// Sends, receives and prints retry until the runtime accepts them.
/// The remaining calls return the runtime's answer directly.
pub trait ManagementApi: SystemCall {
    fn request_service_mode(&mut self) -> u32 {
        self.system_call(ManagementCall::RequestServiceMode, CallArgs::None)
    }

    fn send_service(&mut self, target: u32, msg: &[u32]) {
        while self.system_call(ManagementCall::WriteService, CallArgs::Message { target, msg }) == 0 {}
    }

    fn receive_service(&mut self, msg: &mut [u32]) {
        while self.system_call(ManagementCall::ReadService, CallArgs::Receive { msg: &mut *msg }) == 0 {}
    }

    fn puts(&mut self, text: &str) {
        while self.system_call(ManagementCall::Puts, CallArgs::Text(text)) == 0 {}
    }

    fn noc_send_free(&mut self) -> bool {
        self.system_call(ManagementCall::NocSendFree, CallArgs::None) != 0
    }

    fn incoming_packet(&mut self) -> bool {
        self.system_call(ManagementCall::IncomingPacket, CallArgs::None) != 0
    }

    fn net_address(&mut self) -> u32 {
        self.system_call(ManagementCall::GetNetAddress, CallArgs::None)
    }

    fn add_task_location(&mut self, task_id: u32, location: u32) {
        self.system_call(
            ManagementCall::AddTaskLocation,
            CallArgs::TaskLocation { task_id, location },
        );
    }

    fn task_location(&mut self, task_id: u32) -> u32 {
        self.system_call(ManagementCall::GetTaskLocation, CallArgs::Task(task_id))
    }

    fn set_task_release(&mut self, msg: &[u32]) {
        self.system_call(ManagementCall::SetTaskRelease, CallArgs::Release { msg });
    }
}

impl<T: SystemCall> ManagementApi for T {}
