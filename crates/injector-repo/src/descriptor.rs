//! Task descriptors and application images as stored in a repository.
//!
//! Repository layout, one 8-digit hex field per line:
//!
//! ```text
//! task count
//! ┌ task id
//! │ statically mapped PE
//! │ code size        (words)          × task count
//! │ data size        (words)
//! │ bss size         (words)
//! └ initial address  (bytes; line of the first code word × 4)
//! code words ...
//! ```

use injector_core::wire::TASK_DESCRIPTOR_SIZE;

use crate::field::format_hex;
use crate::lines::LineReader;
use crate::repository::RepoError;

/// Bytes per machine word; initial addresses are byte offsets.
pub const WORD_BYTES: u32 = 4;

/// Offset of the statically-mapped PE line within a descriptor.
pub const STATIC_PE_FIELD: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub task_id: u32,
    pub static_pe: u32,
    pub code_size: u32,
    pub data_size: u32,
    pub bss_size: u32,
    pub initial_address: u32,
}

impl TaskDescriptor {
    pub(crate) fn read(reader: &mut LineReader) -> Result<Self, RepoError> {
        Ok(Self {
            task_id: reader.hex()?,
            static_pe: reader.hex()?,
            code_size: reader.hex()?,
            data_size: reader.hex()?,
            bss_size: reader.hex()?,
            initial_address: reader.hex()?,
        })
    }

    /// Line index where this task's code starts.
    pub fn code_line(&self) -> usize {
        (self.initial_address / WORD_BYTES) as usize
    }

    pub fn to_lines(&self) -> [String; TASK_DESCRIPTOR_SIZE] {
        [
            format_hex(self.task_id),
            format_hex(self.static_pe),
            format_hex(self.code_size),
            format_hex(self.data_size),
            format_hex(self.bss_size),
            format_hex(self.initial_address),
        ]
    }
}

/// A task's descriptor together with its machine code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskImage {
    pub descriptor: TaskDescriptor,
    pub code: Vec<u32>,
}

/// Everything a repository file holds for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationImage {
    pub tasks: Vec<TaskImage>,
}

impl ApplicationImage {
    /// Build an image with consistent ids, sizes, and code addresses.
    ///
    /// Each task is `(static_pe, data_size, bss_size, code)`. Code blocks
    /// are laid out back to back after the last descriptor.
    pub fn layout(tasks: Vec<(u32, u32, u32, Vec<u32>)>) -> Self {
        let mut next_line = 1 + tasks.len() * TASK_DESCRIPTOR_SIZE;
        let tasks = tasks
            .into_iter()
            .enumerate()
            .map(|(task_id, (static_pe, data_size, bss_size, code))| {
                let descriptor = TaskDescriptor {
                    task_id: task_id as u32,
                    static_pe,
                    code_size: code.len() as u32,
                    data_size,
                    bss_size,
                    initial_address: next_line as u32 * WORD_BYTES,
                };
                next_line += code.len();
                TaskImage { descriptor, code }
            })
            .collect();
        Self { tasks }
    }

    pub fn task_count(&self) -> u32 {
        self.tasks.len() as u32
    }

    /// Descriptor section: task count followed by every descriptor.
    pub fn descriptor_words(&self) -> Vec<u32> {
        let mut words = vec![self.task_count()];
        for task in &self.tasks {
            let d = &task.descriptor;
            words.extend([
                d.task_id,
                d.static_pe,
                d.code_size,
                d.data_size,
                d.bss_size,
                d.initial_address,
            ]);
        }
        words
    }

    /// Render the repository file. Code is written in task order.
    pub fn render(&self) -> String {
        let mut lines = vec![format_hex(self.task_count())];
        for task in &self.tasks {
            lines.extend(task.descriptor.to_lines());
        }
        for task in &self.tasks {
            lines.extend(task.code.iter().copied().map(format_hex));
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}
