//! Linked Azure DevOps projects.
//!
//! A user links a project once; linking it again is a no-op. Project
//! identity within a user's partition is organization + project name, both
//! compared case-insensitively as Azure DevOps does.

use serde::{Deserialize, Serialize};

use crate::{
  Result, Store,
  collection::{DedupKey, Entry, OwnerFilter},
  kv::KvBackend,
  store::{PROJECT_LIST_KEY, require_id},
};

/// One project linked by one chat user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetails {
  /// Chat user who linked the project.
  pub owner_id:          String,
  pub organization_name: String,
  pub project_name:      String,
  /// Azure DevOps project GUID, descriptive only.
  #[serde(default)]
  pub project_id:        String,
}

pub(crate) fn project_key(organization: &str, project: &str) -> DedupKey {
  DedupKey::new()
    .field(&organization.to_ascii_lowercase())
    .field(&project.to_ascii_lowercase())
}

impl Entry for ProjectDetails {
  fn owner(&self) -> &str { &self.owner_id }

  fn dedup_key(&self) -> DedupKey { project_key(&self.organization_name, &self.project_name) }
}

impl<B: KvBackend> Store<B> {
  /// Link a project. Linking an already-linked project changes nothing.
  pub async fn store_project(&self, project: &ProjectDetails) -> Result<()> {
    require_id("owner id", &project.owner_id)?;
    self
      .modify_collection::<ProjectDetails, _>(PROJECT_LIST_KEY, |projects| {
        projects.insert_if_absent(project.clone())
      })
      .await
  }

  /// All projects linked by `owner_id`; empty when none are stored.
  pub async fn get_all_projects(&self, owner_id: &str) -> Result<Vec<ProjectDetails>> {
    let projects = self.load_collection::<ProjectDetails>(PROJECT_LIST_KEY).await?;
    Ok(projects.entries(OwnerFilter::Only(owner_id)))
  }

  /// Linked projects across the owners `filter` selects. Unlike
  /// [`get_all_projects`](Self::get_all_projects), this can list every owner.
  pub async fn list_projects(&self, filter: OwnerFilter<'_>) -> Result<Vec<ProjectDetails>> {
    let projects = self.load_collection::<ProjectDetails>(PROJECT_LIST_KEY).await?;
    Ok(projects.entries(filter))
  }

  pub async fn is_project_linked(
    &self,
    owner_id: &str,
    organization: &str,
    project: &str,
  ) -> Result<bool> {
    let projects = self.load_collection::<ProjectDetails>(PROJECT_LIST_KEY).await?;
    Ok(projects.get(owner_id, &project_key(organization, project)).is_some())
  }

  /// Remove a linked project. Removing one that is not linked is a no-op.
  pub async fn delete_project(&self, project: &ProjectDetails) -> Result<()> {
    self
      .modify_collection::<ProjectDetails, _>(PROJECT_LIST_KEY, |projects| {
        projects.remove(project).is_some()
      })
      .await
  }

  /// Remove a linked project together with its owner's subscriptions to it.
  ///
  /// The two collections live under different keys, so the removals are
  /// separate atomic steps. Returns the number of subscriptions removed.
  pub async fn unlink_project(&self, project: &ProjectDetails) -> Result<usize> {
    self.delete_project(project).await?;
    let removed = self
      .delete_subscriptions_for_project(
        &project.owner_id,
        &project.organization_name,
        &project.project_name,
      )
      .await?;
    tracing::info!(
      owner = %project.owner_id,
      organization = %project.organization_name,
      project = %project.project_name,
      removed,
      "unlinked project"
    );
    Ok(removed)
  }
}
