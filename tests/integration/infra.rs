use std::path::PathBuf;

use anyhow::{bail, Result};

use injector_core::wire::{Service, HEADER_WORDS};
use injector_core::InjectorConfig;
use injector_engine::{AppInjector, Link, ReceivedPacket};
use injector_repo::schedule::render_schedule;
use injector_repo::{ApplicationImage, FileRepository, LaunchEntry};

/// Ticks per schedule time unit in every test.
pub const SCALE: u64 = 10;

pub const SENTINEL: &str = "deadc0de";

/// Launch schedule and repositories under a scratch directory.
pub struct Platform {
    root: PathBuf,
    apps: Vec<(LaunchEntry, ApplicationImage)>,
}

impl Platform {
    pub fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!("injector-it-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        Self { root, apps: Vec::new() }
    }

    /// Management application: two tasks, boot code `[0xa0, 0xa1, 0xa2]`.
    pub fn with_management(self) -> Self {
        let image = ApplicationImage::layout(vec![
            (0, 0, 0, vec![0xa0, 0xa1, 0xa2]),
            (0, 0, 0, vec![0xb0, 0xb1]),
        ]);
        self.with_app("mapping", 0, 0, &[0, -1], image)
    }

    pub fn with_app(
        mut self,
        name: &str,
        start_time: u32,
        cluster_id: i32,
        mapping: &[i32],
        image: ApplicationImage,
    ) -> Self {
        let entry = LaunchEntry {
            name: name.to_string(),
            start_time,
            cluster_id,
            task_count: mapping.len() as u32,
            static_mapping: mapping.to_vec(),
        };
        self.apps.push((entry, image));
        self
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.root.join("appstart.txt")
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.root.join("applications")
    }

    pub fn config(&self) -> InjectorConfig {
        let mut config = InjectorConfig::default();
        config.paths.schedule_file = self.schedule_path();
        config.paths.applications_dir = self.apps_dir();
        config.timing.ticks_per_time_unit = SCALE;
        config
    }

    /// Write schedule and repositories.
    pub fn write(&self) {
        for (entry, image) in &self.apps {
            let dir = self.apps_dir().join(&entry.name);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("repository.txt"), image.render()).unwrap();
        }
        let entries: Vec<_> = self.apps.iter().map(|(entry, _)| entry.clone()).collect();
        std::fs::write(self.schedule_path(), render_schedule(&entries, SENTINEL)).unwrap();
    }

    pub fn image(&self, name: &str) -> &ApplicationImage {
        self.apps
            .iter()
            .find(|(entry, _)| entry.name == name)
            .map(|(_, image)| image)
            .unwrap()
    }

    /// Write everything and build an injector over it.
    pub fn injector(&self) -> AppInjector<FileRepository> {
        self.write();
        let config = self.config();
        AppInjector::new(FileRepository::from_config(&config), &config)
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Step until `done` holds, checking the single-buffer invariant each tick.
pub fn run_until(
    injector: &mut AppInjector<FileRepository>,
    link: &mut Link,
    limit: u64,
    done: impl Fn(&AppInjector<FileRepository>, &Link) -> bool,
) -> Result<u64> {
    for _ in 0..limit {
        link.step(injector);
        assert!(
            injector.outstanding_buffers() <= 1,
            "two packets outstanding at tick {}",
            injector.ticks()
        );
        if done(injector, link) {
            return Ok(injector.ticks());
        }
    }
    bail!("condition not reached within {limit} ticks: {:?}", injector.view())
}

pub fn run_for(injector: &mut AppInjector<FileRepository>, link: &mut Link, ticks: u64) {
    for _ in 0..ticks {
        link.step(injector);
        assert!(injector.outstanding_buffers() <= 1);
    }
}

/// Header-only inbound packet with the given fields from word 3 on.
pub fn inbound(service: Service, fields: &[u32]) -> Vec<u32> {
    let mut words = vec![0u32; HEADER_WORDS];
    words[1] = (HEADER_WORDS - 2) as u32;
    words[2] = service.into();
    words[3..3 + fields.len()].copy_from_slice(fields);
    words
}

pub fn sent(link: &Link, service: Service) -> Vec<&ReceivedPacket> {
    link.sink
        .packets()
        .iter()
        .filter(|p| p.service == u32::from(service))
        .collect()
}

pub fn count(link: &Link, service: Service) -> usize {
    sent(link, service).len()
}
