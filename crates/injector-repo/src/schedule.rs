//! Launch schedule, the time-ordered list of applications to inject.
//!
//! One record per application:
//!
//! ```text
//! name
//! start time        (decimal, schedule units)
//! cluster id        (signed decimal)
//! task count        (decimal)
//! mapping × count   (signed decimal, one PE address per task; -1 = dynamic)
//! ```
//!
//! The first record is the management application, loaded by the
//! bootloader. The stream ends at a sentinel name. Records are expected in
//! ascending start-time order; the reader never re-sorts.

use std::path::Path;

use crate::lines::LineReader;
use crate::repository::RepoError;

/// Lines in a record before the per-task mappings.
pub const RECORD_FIXED_LINES: usize = 4;

/// One application launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEntry {
    pub name: String,
    /// Start time in schedule units.
    pub start_time: u32,
    pub cluster_id: i32,
    pub task_count: u32,
    /// Statically assigned PE per task, in task-id order.
    pub static_mapping: Vec<i32>,
}

impl LaunchEntry {
    /// Lines this record occupies in the schedule file.
    pub fn line_count(&self) -> usize {
        RECORD_FIXED_LINES + self.static_mapping.len()
    }

    /// Render the record as schedule lines.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.line_count());
        lines.push(self.name.clone());
        lines.push(self.start_time.to_string());
        lines.push(self.cluster_id.to_string());
        lines.push(self.task_count.to_string());
        lines.extend(self.static_mapping.iter().map(|pe| pe.to_string()));
        lines
    }
}

/// Result of reading one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchRecord {
    /// A launch, and the line where the following record starts.
    Entry { entry: LaunchEntry, next_line: usize },
    /// The sentinel was reached.
    End,
}

/// Read the record starting at `line`.
pub fn read_launch(path: &Path, line: usize, sentinel: &str) -> Result<LaunchRecord, RepoError> {
    let mut reader = LineReader::open(path)?;
    reader.skip(line)?;

    let name = reader.next_line()?.trim().to_string();
    if name == sentinel {
        return Ok(LaunchRecord::End);
    }

    let start_time = reader.decimal()?;
    let cluster_id = reader.signed()?;
    let task_count = reader.decimal()?;

    let mut static_mapping = Vec::new();
    for _ in 0..task_count {
        static_mapping.push(reader.signed()?);
    }

    Ok(LaunchRecord::Entry {
        entry: LaunchEntry {
            name,
            start_time,
            cluster_id,
            task_count,
            static_mapping,
        },
        next_line: reader.line_number(),
    })
}

/// Name of the `app_id`-th record, scanning from the top of the file.
///
/// Each preceding record is skipped by reading its fixed lines and then
/// its declared number of mapping lines.
pub fn resolve_app_name(path: &Path, app_id: u32, sentinel: &str) -> Result<String, RepoError> {
    let mut reader = LineReader::open(path)?;

    for _ in 0..app_id {
        let name = reader.next_line()?;
        if name.trim() == sentinel {
            return Err(RepoError::AppNotFound(app_id));
        }
        reader.skip(RECORD_FIXED_LINES - 2)?;
        let task_count = reader.decimal()?;
        reader.skip(task_count as usize)?;
    }

    let name = reader.next_line()?.trim().to_string();
    if name == sentinel {
        return Err(RepoError::AppNotFound(app_id));
    }
    Ok(name)
}

/// Line of the first record after the management application.
pub fn first_launch_line(path: &Path) -> Result<usize, RepoError> {
    let mut reader = LineReader::open(path)?;
    reader.skip(RECORD_FIXED_LINES - 1)?;
    let task_count = reader.decimal()?;
    reader.skip(task_count as usize)?;
    Ok(reader.line_number())
}

/// Render a complete schedule file, sentinel included.
pub fn render_schedule(entries: &[LaunchEntry], sentinel: &str) -> String {
    let mut text = String::new();
    for line in entries.iter().flat_map(LaunchEntry::to_lines) {
        text.push_str(&line);
        text.push('\n');
    }
    text.push_str(sentinel);
    text.push('\n');
    text
}
