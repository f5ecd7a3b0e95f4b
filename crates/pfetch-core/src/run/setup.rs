//! Startup phase: destination root, job list, local directories.
//! Any failure here is fatal and happens before a single transfer starts.

use std::io;
use std::path::{Path, PathBuf};

use crate::job::{Job, JobTemplate};
use crate::manifest::ManifestEntry;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("create destination {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn ensure_root(root: &Path) -> Result<(), SetupError> {
    if root.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(root).map_err(|source| SetupError::CreateDir {
        path: root.to_path_buf(),
        source,
    })?;
    tracing::info!("created destination {}", root.display());
    Ok(())
}

/// Build one job per entry (ids follow manifest order) and create every
/// directory the jobs write into.
pub fn plan_jobs(
    template: &JobTemplate,
    entries: &[ManifestEntry],
) -> Result<Vec<Job>, SetupError> {
    ensure_root(&template.local_root)?;
    let mut jobs = Vec::with_capacity(entries.len());
    for (id, entry) in entries.iter().enumerate() {
        let job = template.build(id, &entry.path);
        job.prepare_destination()
            .map_err(|source| SetupError::CreateDir {
                path: job.local_path.clone(),
                source,
            })?;
        tracing::debug!(job = id, kind = ?job.kind, "planned {}", job.command);
        jobs.push(job);
    }
    Ok(jobs)
}
