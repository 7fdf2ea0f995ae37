//! Cloning an organisation's repositories
//!
//! Every non-archived repository is cloned into the source root at the
//! requested ref. A failing clone does not stop the others; each failure is
//! reported as it happens and all of them again at the end.

use crate::error::{CloneFailure, ForgeError};
use crate::infra::git::{CloneResult, GitOperations};
use crate::registry::RemoteRepository;

/// Progress of a clone run
#[derive(Debug)]
pub enum CloneEvent<'a> {
    /// About to clone `repo`; `done` repositories were handled before it
    Cloning {
        done: usize,
        total: usize,
        repo: &'a str,
    },
    /// A repository could not be cloned
    Failed(&'a CloneFailure),
    /// Every repository was handled
    Finished { total: usize },
}

/// Progress callback
pub type CloneProgress<'a> = &'a dyn Fn(CloneEvent<'_>);

/// Repositories that should be cloned, in listing order
pub fn active(repos: &[RemoteRepository]) -> Vec<&RemoteRepository> {
    repos
        .iter()
        .filter(|repo| {
            if repo.archived {
                tracing::debug!("skipping archived repository {}", repo.name);
            }
            !repo.archived
        })
        .collect()
}

/// Clone every active repository at `reference`
pub fn clone_all(
    git: &GitOperations,
    repos: &[RemoteRepository],
    reference: &str,
    progress: Option<CloneProgress<'_>>,
) -> Result<Vec<CloneResult>, ForgeError> {
    let todo = active(repos);
    let total = todo.len();
    let mut cloned = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (done, repo) in todo.into_iter().enumerate() {
        if let Some(report) = progress {
            report(CloneEvent::Cloning {
                done,
                total,
                repo: &repo.name,
            });
        }

        match git.clone_repo(&repo.clone_url, reference, &repo.name) {
            Ok(result) => {
                tracing::info!("cloned {} at {}", repo.name, result.commit_sha);
                cloned.push(result);
            }
            Err(error) => {
                let failure = CloneFailure {
                    repo: repo.name.clone(),
                    error,
                };
                tracing::debug!("{failure}");
                if let Some(report) = progress {
                    report(CloneEvent::Failed(&failure));
                }
                failures.push(failure);
            }
        }
    }

    if let Some(report) = progress {
        report(CloneEvent::Finished { total });
    }

    if failures.is_empty() {
        Ok(cloned)
    } else {
        Err(ForgeError::ClonesFailed { failures })
    }
}
