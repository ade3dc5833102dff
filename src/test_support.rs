use std::fs;
use std::path;
use std::sync;

static NEXT_DIR: sync::atomic::AtomicU64 = sync::atomic::AtomicU64::new(0);

/// Fresh per-test directory under the system temp dir.
pub fn scratch_dir(label: &str) -> path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "bower-test-{}-{}-{}",
        label,
        std::process::id(),
        NEXT_DIR.fetch_add(1, sync::atomic::Ordering::Relaxed)
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_file(dir: &path::Path, name: &str, contents: &str) -> path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}
