use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use tracing::warn;

static QUARANTINED: AtomicU64 = AtomicU64::new(0);

/// Name an unreadable store is renamed to. Unique within and across processes.
fn quarantine_path(path: &Utf8Path) -> Utf8PathBuf {
    let stem = path.file_name().unwrap_or(academy_config::DRAFTS_DB_FILENAME);
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
    let seq = QUARANTINED.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(
        "{stem}.corrupt-{stamp}-{}-{seq}",
        std::process::id()
    ))
}

/// Move an unreadable draft store aside so a fresh one can be created. The
/// old file is kept for inspection.
pub fn quarantine_corrupt_file(path: &Utf8Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let target = quarantine_path(path);
    warn!(from = %path, to = %target, "draft store unreadable, moving it aside");
    std::fs::rename(path, &target)
}
