//! Repository access: where application code and descriptors come from.
//!
//! `FileRepository` scans text files sequentially from the top on every
//! request. Nothing is indexed or cached; the state machines only see the
//! `RepositoryAccess` trait, so an indexed backend can replace it.

use std::path::{Path, PathBuf};

use injector_core::config::InjectorConfig;
use injector_core::wire::TASK_DESCRIPTOR_SIZE;

use crate::descriptor::{TaskDescriptor, TaskImage};
use crate::field::FieldKind;
use crate::lines::LineReader;
use crate::schedule::{self, LaunchRecord};

/// An application's repository on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLocation {
    pub name: String,
    pub path: PathBuf,
}

/// Read-only access to the schedule and the application repositories.
pub trait RepositoryAccess {
    /// Locate the repository of the `app_id`-th application in the schedule.
    fn resolve(&self, app_id: u32) -> Result<AppLocation, RepoError>;

    /// Descriptor and code of one task.
    ///
    /// Fails with [`RepoError::TaskOutOfRange`] when `task_id` is not below
    /// the task count declared by the repository.
    fn read_task_block(&self, app_id: u32, task_id: u32) -> Result<TaskImage, RepoError>;

    /// The descriptor section of `app_name`: task count plus
    /// `task_count × TASK_DESCRIPTOR_SIZE` lines.
    fn read_descriptor(&self, app_name: &str, task_count: u32) -> Result<Vec<u32>, RepoError>;

    /// Line of the first launch after the management application.
    fn first_launch_line(&self) -> Result<usize, RepoError>;

    /// The launch record starting at `line`.
    fn read_launch(&self, line: usize) -> Result<LaunchRecord, RepoError>;
}

/// Repository backed by the schedule file and per-application directories.
#[derive(Debug, Clone)]
pub struct FileRepository {
    schedule_file: PathBuf,
    applications_dir: PathBuf,
    repository_file: String,
    sentinel: String,
}

impl FileRepository {
    pub fn new(
        schedule_file: impl Into<PathBuf>,
        applications_dir: impl Into<PathBuf>,
        repository_file: impl Into<String>,
        sentinel: impl Into<String>,
    ) -> Self {
        Self {
            schedule_file: schedule_file.into(),
            applications_dir: applications_dir.into(),
            repository_file: repository_file.into(),
            sentinel: sentinel.into(),
        }
    }

    pub fn from_config(config: &InjectorConfig) -> Self {
        Self::new(
            config.paths.schedule_file.clone(),
            config.paths.applications_dir.clone(),
            config.paths.repository_file.clone(),
            config.schedule.sentinel.clone(),
        )
    }

    pub fn schedule_file(&self) -> &Path {
        &self.schedule_file
    }

    /// Path of the repository file for an application name.
    pub fn repository_path(&self, app_name: &str) -> PathBuf {
        self.applications_dir
            .join(app_name)
            .join(&self.repository_file)
    }
}

impl RepositoryAccess for FileRepository {
    fn resolve(&self, app_id: u32) -> Result<AppLocation, RepoError> {
        let name = schedule::resolve_app_name(&self.schedule_file, app_id, &self.sentinel)?;
        let path = self.repository_path(&name);
        Ok(AppLocation { name, path })
    }

    fn read_task_block(&self, app_id: u32, task_id: u32) -> Result<TaskImage, RepoError> {
        let location = self.resolve(app_id)?;
        let mut reader = LineReader::open(&location.path)?;

        let task_count = reader.hex()?;
        if task_id >= task_count {
            return Err(RepoError::TaskOutOfRange { task_id, task_count });
        }

        reader.skip(TASK_DESCRIPTOR_SIZE * task_id as usize)?;
        let descriptor = TaskDescriptor::read(&mut reader)?;

        reader.seek_line(descriptor.code_line())?;
        let mut code = Vec::new();
        for _ in 0..descriptor.code_size {
            code.push(reader.hex()?);
        }

        tracing::trace!(
            app = %location.name,
            task_id,
            code_size = descriptor.code_size,
            code_line = descriptor.code_line(),
            "task block read"
        );

        Ok(TaskImage { descriptor, code })
    }

    fn read_descriptor(&self, app_name: &str, task_count: u32) -> Result<Vec<u32>, RepoError> {
        let path = self.repository_path(app_name);
        let mut reader = LineReader::open(&path)?;

        let length = task_count as usize * TASK_DESCRIPTOR_SIZE + 1;
        let mut words = Vec::new();
        for _ in 0..length {
            words.push(reader.hex()?);
        }
        Ok(words)
    }

    fn first_launch_line(&self) -> Result<usize, RepoError> {
        schedule::first_launch_line(&self.schedule_file)
    }

    fn read_launch(&self, line: usize) -> Result<LaunchRecord, RepoError> {
        schedule::read_launch(&self.schedule_file, line, &self.sentinel)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("failed to open {0}: {1}")]
    Open(PathBuf, std::io::Error),

    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("{}:{line}: unexpected end of file", .path.display())]
    Truncated { path: PathBuf, line: usize },

    #[error("{}:{line}: invalid {kind} field {token:?}", .path.display())]
    InvalidField {
        path: PathBuf,
        line: usize,
        kind: FieldKind,
        token: String,
    },

    #[error("task id {task_id} is out of range, application declares {task_count} tasks")]
    TaskOutOfRange { task_id: u32, task_count: u32 },

    #[error("schedule has no application with id {0}")]
    AppNotFound(u32),

    #[error("application {app} declares {task_count} tasks but has {mappings} static mappings")]
    MappingMismatch {
        app: String,
        task_count: u32,
        mappings: usize,
    },
}

impl RepoError {
    /// Range errors abort one load; everything else points at bad input files.
    pub fn is_range_error(&self) -> bool {
        matches!(self, RepoError::TaskOutOfRange { .. })
    }
}
