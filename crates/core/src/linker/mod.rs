//! Publishing mounted content as symlinks.

mod planner;
pub mod season;

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::metrics;

pub use planner::{plan_links, LinkPlan};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Failed to walk mount folder: {0}")]
    Walk(String),

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("Failed to create link: {0}")]
    Io(#[from] std::io::Error),
}

/// Create every planned link, parent folders first.
///
/// Fails if a destination is already taken; links made before that stay.
pub async fn apply_links(plans: &[LinkPlan]) -> Result<usize, LinkError> {
    for plan in plans {
        if let Some(parent) = plan.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::symlink_metadata(&plan.destination).await.is_ok() {
            return Err(LinkError::DestinationExists(plan.destination.clone()));
        }
        tokio::fs::symlink(&plan.source, &plan.destination).await?;
        metrics::LINKS_CREATED.inc();
        debug!(
            "Linked {} -> {}",
            plan.destination.display(),
            plan.source.display()
        );
    }
    Ok(plans.len())
}
