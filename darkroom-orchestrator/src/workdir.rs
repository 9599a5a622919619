//! Working directory management
//!
//! Workers read inputs from and write outputs to a filesystem shared with
//! the orchestrator. Each (owner, project) pair gets `src/`, `out/` and
//! `preview/` directories under a configured root; full runs wipe and
//! recreate theirs, previews only ensure theirs exist, and cancellation
//! removes them.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use darkroom_core::domain::run::RunKind;

/// Per-(owner, project) working directory layout
#[derive(Debug, Clone)]
pub struct WorkDirs {
    root: PathBuf,
}

impl WorkDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, owner: &str, project: Uuid) -> io::Result<PathBuf> {
        // Owner ids arrive as URL path segments; refuse anything that could
        // escape the root.
        let owner = safe_segment(owner)?;
        Ok(self
            .root
            .join("users")
            .join(owner)
            .join("projects")
            .join(project.to_string()))
    }

    pub fn source_dir(&self, owner: &str, project: Uuid) -> io::Result<PathBuf> {
        Ok(self.project_dir(owner, project)?.join("src"))
    }

    pub fn output_dir(&self, owner: &str, project: Uuid) -> io::Result<PathBuf> {
        Ok(self.project_dir(owner, project)?.join("out"))
    }

    pub fn preview_dir(&self, owner: &str, project: Uuid) -> io::Result<PathBuf> {
        Ok(self.project_dir(owner, project)?.join("preview"))
    }

    /// Path a source image is staged at before the first dispatch
    pub fn source_path(&self, owner: &str, project: Uuid, file_name: &str) -> io::Result<PathBuf> {
        let file_name = safe_segment(file_name)?;
        Ok(self.source_dir(owner, project)?.join(file_name))
    }

    /// Output path for the step at `position`
    ///
    /// Every step writes a fresh per-position file so a step's input is never
    /// clobbered by its own output.
    pub fn step_output_path(
        &self,
        owner: &str,
        project: Uuid,
        kind: RunKind,
        file_name: &str,
        position: u32,
    ) -> io::Result<PathBuf> {
        let file_name = safe_segment(file_name)?;
        let dir = match kind {
            RunKind::Full => self.output_dir(owner, project)?,
            RunKind::Preview => self.preview_dir(owner, project)?,
        };
        Ok(dir.join(step_file_name(file_name, position)))
    }

    /// Wipe and recreate a full run's directories
    ///
    /// Previous run contents must be gone before anything new is dispatched.
    pub async fn recreate_run_dirs(&self, owner: &str, project: Uuid) -> io::Result<()> {
        for dir in [
            self.source_dir(owner, project)?,
            self.output_dir(owner, project)?,
        ] {
            remove_dir_if_present(&dir).await?;
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Ensure a preview run's directories exist without disturbing contents
    pub async fn ensure_run_dirs(&self, owner: &str, project: Uuid) -> io::Result<()> {
        for dir in [
            self.source_dir(owner, project)?,
            self.preview_dir(owner, project)?,
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Remove a run's directories on cancellation
    pub async fn remove_run_dirs(&self, owner: &str, project: Uuid) -> io::Result<()> {
        for dir in [
            self.source_dir(owner, project)?,
            self.output_dir(owner, project)?,
        ] {
            remove_dir_if_present(&dir).await?;
        }
        Ok(())
    }
}

async fn remove_dir_if_present(dir: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn safe_segment(segment: &str) -> io::Result<&str> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsafe path segment: {segment:?}"),
        ));
    }
    Ok(segment)
}

/// `cat.png` at position 2 becomes `cat.s2.png`
fn step_file_name(file_name: &str, position: u32) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.s{position}.{ext}"),
        _ => format!("{file_name}.s{position}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_file_name() {
        assert_eq!(step_file_name("cat.png", 0), "cat.s0.png");
        assert_eq!(step_file_name("archive.tar.gz", 3), "archive.tar.s3.gz");
        assert_eq!(step_file_name("noext", 1), "noext.s1");
        assert_eq!(step_file_name(".hidden", 2), ".hidden.s2");
    }

    #[test]
    fn test_safe_segment_rejects_traversal() {
        assert!(safe_segment("alice").is_ok());
        assert!(safe_segment("cat.png").is_ok());
        assert!(safe_segment("..").is_err());
        assert!(safe_segment("a/b").is_err());
        assert!(safe_segment("").is_err());
    }

    #[tokio::test]
    async fn test_recreate_wipes_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::new(tmp.path());
        let project = Uuid::new_v4();

        dirs.recreate_run_dirs("alice", project).await.unwrap();
        let stale = dirs.source_path("alice", project, "old.png").unwrap();
        tokio::fs::write(&stale, b"stale").await.unwrap();

        dirs.recreate_run_dirs("alice", project).await.unwrap();
        assert!(!stale.exists());
        assert!(dirs.source_dir("alice", project).unwrap().exists());
    }

    #[tokio::test]
    async fn test_ensure_keeps_existing_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::new(tmp.path());
        let project = Uuid::new_v4();

        dirs.ensure_run_dirs("alice", project).await.unwrap();
        let kept = dirs.source_path("alice", project, "keep.png").unwrap();
        tokio::fs::write(&kept, b"keep").await.unwrap();

        dirs.ensure_run_dirs("alice", project).await.unwrap();
        assert!(kept.exists());
    }

    #[tokio::test]
    async fn test_remove_run_dirs_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::new(tmp.path());
        let project = Uuid::new_v4();

        dirs.recreate_run_dirs("alice", project).await.unwrap();
        dirs.remove_run_dirs("alice", project).await.unwrap();
        // A second removal finds nothing and still succeeds
        dirs.remove_run_dirs("alice", project).await.unwrap();
        assert!(!dirs.source_dir("alice", project).unwrap().exists());
    }
}
