use anyhow::Result;

use injector_core::wire::TASK_DESCRIPTOR_SIZE;
use injector_core::InjectorConfig;
use injector_repo::{ApplicationImage, FileRepository, RepositoryAccess};

use crate::*;

#[test]
fn test_repository_text_round_trip() -> Result<()> {
    let image = ApplicationImage::layout(vec![
        (0x0101, 16, 4, (0..40).map(|w| 0x1000_0000 | w).collect()),
        (0x0202, 0, 0, vec![0xffff_ffff]),
        (0x0303, 8, 8, vec![0, 1, 2]),
    ]);
    let platform = Platform::new("rt-repo")
        .with_management()
        .with_app("appA", 1, 0, &[1, 2, 3], image.clone());
    platform.write();
    let repo = FileRepository::from_config(&platform.config());

    for (task_id, task) in image.tasks.iter().enumerate() {
        let read = repo.read_task_block(1, task_id as u32)?;
        assert_eq!(read.descriptor.code_size, task.descriptor.code_size);
        assert_eq!(read.descriptor.data_size, task.descriptor.data_size);
        assert_eq!(read.descriptor.bss_size, task.descriptor.bss_size);
        assert_eq!(read.code, task.code);
    }

    let descriptor = repo.read_descriptor("appA", image.task_count())?;
    assert_eq!(descriptor.len(), 3 * TASK_DESCRIPTOR_SIZE + 1);
    assert_eq!(descriptor, image.descriptor_words());
    Ok(())
}

#[test]
fn test_resolve_skips_preceding_records() -> Result<()> {
    let image = ApplicationImage::layout(vec![(0, 0, 0, vec![1]), (1, 0, 0, vec![2])]);
    let platform = Platform::new("rt-resolve")
        .with_management()
        .with_app("appA", 1, 0, &[1, 2], image.clone())
        .with_app("appB", 2, 0, &[3], image);
    platform.write();
    let repo = FileRepository::from_config(&platform.config());

    assert_eq!(repo.resolve(0)?.name, "mapping");
    assert_eq!(repo.resolve(2)?.name, "appB");
    assert_eq!(
        repo.resolve(2)?.path,
        platform.apps_dir().join("appB").join("repository.txt")
    );
    assert!(repo.resolve(3).is_err());
    Ok(())
}

#[test]
fn test_config_file_drives_repository() -> Result<()> {
    let platform = Platform::new("rt-config").with_management();
    platform.write();

    let config_path = platform.apps_dir().join("injector.toml");
    let text = format!(
        "[paths]\nschedule_file = {:?}\napplications_dir = {:?}\n\n[timing]\nticks_per_time_unit = 7\n",
        platform.schedule_path(),
        platform.apps_dir(),
    );
    std::fs::write(&config_path, text)?;

    let config = InjectorConfig::load_from(&config_path)?;
    assert_eq!(config.timing.ticks_per_time_unit, 7);
    assert_eq!(config.paths.repository_file, "repository.txt");
    assert_eq!(config.schedule.sentinel, SENTINEL);

    let repo = FileRepository::from_config(&config);
    // Management record: four fixed lines and two mappings.
    assert_eq!(repo.first_launch_line()?, 4 + 2);
    Ok(())
}
