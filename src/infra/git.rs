//! Git operations
//!
//! Clones unit repositories at a given ref using the gix crate.

use gix::remote::fetch::Shallow;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::infra::filesystem;

/// Result of a git clone operation
#[derive(Debug, Clone)]
pub struct CloneResult {
    /// Path to the cloned repository
    pub path: PathBuf,
    /// Commit checked out
    pub commit_sha: String,
}

/// Git repository operations
#[derive(Debug, Clone)]
pub struct GitOperations {
    /// Directory receiving one clone per repository
    work_dir: PathBuf,
}

impl GitOperations {
    /// Create a new git operations handler
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    /// Get the working directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Clone a repository into `<work_dir>/<dest_name>` at `reference`
    ///
    /// `reference` is a branch or tag name. An existing destination is never
    /// touched. On failure the partial clone is removed, so the unit does
    /// not show up as a build candidate.
    pub fn clone_repo(
        &self,
        url: &str,
        reference: &str,
        dest_name: &str,
    ) -> Result<CloneResult, GitError> {
        let dest_path = self.work_dir.join(dest_name);
        if dest_path.exists() {
            return Err(GitError::DestinationExists { path: dest_path });
        }

        match Self::clone_internal(url, &dest_path, reference) {
            Ok(commit_sha) => Ok(CloneResult {
                path: dest_path,
                commit_sha,
            }),
            Err(e) => {
                if let Err(cleanup) = filesystem::remove_dir_all(&dest_path) {
                    tracing::warn!("{cleanup}");
                }
                Err(e)
            }
        }
    }

    /// Internal clone implementation using gix
    fn clone_internal(url: &str, dest: &Path, reference: &str) -> Result<String, GitError> {
        let clone_failed = |e: &dyn std::fmt::Display| GitError::CloneFailed {
            url: url.to_string(),
            error: e.to_string(),
        };

        let prepare = gix::prepare_clone(url, dest).map_err(|e| clone_failed(&e))?;

        // Fetch only the requested ref; a missing ref fails the fetch
        let mut prepare = prepare
            .with_ref_name(Some(reference))
            .map_err(|e| GitError::InvalidRef {
                reference: reference.to_string(),
                error: e.to_string(),
            })?
            .with_shallow(Shallow::DepthAtRemote(NonZeroU32::MIN));

        let (mut checkout, _outcome) = prepare
            .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
            .map_err(|e| clone_failed(&e))?;

        let (repo, _outcome) = checkout
            .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
            .map_err(|e| clone_failed(&e))?;

        let head = repo.head_id().map_err(|e| clone_failed(&e))?;
        Ok(head.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_git_operations_new() {
        let temp = TempDir::new().unwrap();
        let ops = GitOperations::new(temp.path().to_path_buf());
        assert_eq!(ops.work_dir(), temp.path());
    }

    #[test]
    fn test_existing_destination_is_left_alone() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("vyatta-cfg/debian")).unwrap();
        let ops = GitOperations::new(temp.path().to_path_buf());

        let result = ops.clone_repo(
            "https://github.com/danos/vyatta-cfg.git",
            "master",
            "vyatta-cfg",
        );

        assert!(matches!(result, Err(GitError::DestinationExists { .. })));
        assert!(temp.path().join("vyatta-cfg/debian").is_dir());
    }

    #[test]
    fn test_clone_repo_invalid_url_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let ops = GitOperations::new(temp.path().to_path_buf());

        let result = ops.clone_repo(
            "https://invalid-url-that-does-not-exist.example.com/repo.git",
            "main",
            "invalid",
        );

        match result {
            Err(GitError::CloneFailed { url, .. }) => assert!(url.contains("invalid-url")),
            other => panic!("Expected CloneFailed error, got: {other:?}"),
        }
        assert!(!temp.path().join("invalid").exists());
    }

    #[test]
    #[ignore = "requires network access - run with --ignored"]
    fn test_clone_repo_with_branch() {
        let temp = TempDir::new().unwrap();
        let ops = GitOperations::new(temp.path().to_path_buf());

        let result = ops
            .clone_repo("https://github.com/danos/vyatta-cfg.git", "master", "vyatta-cfg")
            .unwrap();

        assert!(result.path.join("debian/control").is_file());
        assert_eq!(result.commit_sha.len(), 40);
    }

    #[test]
    #[ignore = "requires network access - run with --ignored"]
    fn test_clone_repo_missing_ref_is_removed() {
        let temp = TempDir::new().unwrap();
        let ops = GitOperations::new(temp.path().to_path_buf());

        let result = ops.clone_repo(
            "https://github.com/danos/vyatta-cfg.git",
            "no-such-branch-anywhere",
            "vyatta-cfg",
        );

        assert!(result.is_err());
        assert!(!temp.path().join("vyatta-cfg").exists());
    }
}
