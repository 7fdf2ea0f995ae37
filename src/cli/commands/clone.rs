//! Clone command implementation
//!
//! Lists the organisation's repositories and clones each one into the
//! source directory.

use anyhow::{Context, Result};

use crate::cli::output::{create_clone_bar, create_spinner, status, OutputConfig};
use crate::core::clone::{self, CloneEvent};
use crate::core::config::Settings;
use crate::infra::filesystem;
use crate::infra::git::GitOperations;
use crate::registry::{GitHubOrg, RepositorySource};

/// Clone every active repository of the configured organisation
pub async fn execute(settings: &Settings, output: &OutputConfig) -> Result<()> {
    let reference = settings.clone_reference()?.to_string();
    filesystem::create_dir_all(&settings.src_dir)?;

    let source = GitHubOrg::with_api_url(&settings.api_url, &settings.org)
        .with_token(settings.github_token.clone());

    let spinner = create_spinner(
        &format!("Listing repositories of {}", settings.org),
        output,
    );
    let listed = source.list_repositories().await;
    spinner.finish_and_clear();
    let repos = listed?;

    let git = GitOperations::new(settings.src_dir.clone());
    let bar = create_clone_bar(clone::active(&repos).len() as u64, output);
    let cloned = tokio::task::spawn_blocking({
        let bar = bar.clone();
        move || {
            let progress = |event: CloneEvent<'_>| match event {
                CloneEvent::Cloning { done, repo, .. } => {
                    bar.set_position(done as u64);
                    bar.set_message(repo.to_string());
                }
                CloneEvent::Failed(failure) => {
                    bar.suspend(|| eprintln!("{} {failure}", status::ERROR));
                }
                CloneEvent::Finished { total } => bar.set_position(total as u64),
            };
            clone::clone_all(&git, &repos, &reference, Some(&progress))
        }
    })
    .await
    .context("clone worker terminated unexpectedly")?;
    bar.finish_and_clear();

    let cloned = cloned?;
    if output.human() {
        println!(
            "{} cloned {} repositories into {}",
            status::SUCCESS,
            cloned.len(),
            settings.src_dir.display()
        );
    }
    Ok(())
}
