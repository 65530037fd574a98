//! Webhook event subscriptions.
//!
//! A subscription routes one Azure DevOps event type for one project into one
//! channel, optionally narrowed by filters. Identity is owner + organization +
//! project + channel + event type + every filter field. Display metadata
//! (channel name, creator, human-readable filter names) is not part of it, so
//! storing a subscription that differs only in display metadata replaces the
//! stored one.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result, Store,
  collection::{DedupKey, Entry, OwnerFilter},
  kv::KvBackend,
  store::{SUBSCRIPTION_LIST_KEY, require_id},
};

// ─── Event types ─────────────────────────────────────────────────────────────

/// Azure DevOps service-hook event types a channel can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
  #[serde(rename = "workitem.created")]
  WorkItemCreated,
  #[serde(rename = "workitem.updated")]
  WorkItemUpdated,
  #[serde(rename = "workitem.deleted")]
  WorkItemDeleted,
  #[serde(rename = "workitem.commented")]
  WorkItemCommented,
  #[serde(rename = "git.pullrequest.created")]
  PullRequestCreated,
  #[serde(rename = "git.pullrequest.updated")]
  PullRequestUpdated,
  #[serde(rename = "git.pullrequest.merged")]
  PullRequestMerged,
  #[serde(rename = "ms.vss-code.git-pullrequest-comment-event")]
  PullRequestCommented,
  #[serde(rename = "git.push")]
  CodePushed,
  #[serde(rename = "build.complete")]
  BuildCompleted,
  #[serde(rename = "ms.vss-release.release-created-event")]
  ReleaseCreated,
  #[serde(rename = "ms.vss-release.release-abandoned-event")]
  ReleaseAbandoned,
  #[serde(rename = "ms.vss-release.deployment-started-event")]
  ReleaseDeploymentStarted,
  #[serde(rename = "ms.vss-release.deployment-completed-event")]
  ReleaseDeploymentCompleted,
  #[serde(rename = "ms.vss-release.deployment-approval-pending-event")]
  ReleaseApprovalPending,
  #[serde(rename = "ms.vss-release.deployment-approval-completed-event")]
  ReleaseApprovalCompleted,
  #[serde(rename = "ms.vss-pipelines.run-state-changed-event")]
  RunStateChanged,
  #[serde(rename = "ms.vss-pipelines.stage-state-changed-event")]
  RunStageStateChanged,
  #[serde(rename = "ms.vss-pipelines.job-state-changed-event")]
  RunJobStateChanged,
  #[serde(rename = "ms.vss-pipelinechecks-events.approval-pending")]
  RunStageApprovalPending,
  #[serde(rename = "ms.vss-pipelinechecks-events.approval-completed")]
  RunStageApprovalCompleted,
}

impl EventType {
  pub const ALL: [EventType; 21] = [
    Self::WorkItemCreated,
    Self::WorkItemUpdated,
    Self::WorkItemDeleted,
    Self::WorkItemCommented,
    Self::PullRequestCreated,
    Self::PullRequestUpdated,
    Self::PullRequestMerged,
    Self::PullRequestCommented,
    Self::CodePushed,
    Self::BuildCompleted,
    Self::ReleaseCreated,
    Self::ReleaseAbandoned,
    Self::ReleaseDeploymentStarted,
    Self::ReleaseDeploymentCompleted,
    Self::ReleaseApprovalPending,
    Self::ReleaseApprovalCompleted,
    Self::RunStateChanged,
    Self::RunStageStateChanged,
    Self::RunJobStateChanged,
    Self::RunStageApprovalPending,
    Self::RunStageApprovalCompleted,
  ];

  /// The Azure DevOps wire name, e.g. `git.push`.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::WorkItemCreated => "workitem.created",
      Self::WorkItemUpdated => "workitem.updated",
      Self::WorkItemDeleted => "workitem.deleted",
      Self::WorkItemCommented => "workitem.commented",
      Self::PullRequestCreated => "git.pullrequest.created",
      Self::PullRequestUpdated => "git.pullrequest.updated",
      Self::PullRequestMerged => "git.pullrequest.merged",
      Self::PullRequestCommented => "ms.vss-code.git-pullrequest-comment-event",
      Self::CodePushed => "git.push",
      Self::BuildCompleted => "build.complete",
      Self::ReleaseCreated => "ms.vss-release.release-created-event",
      Self::ReleaseAbandoned => "ms.vss-release.release-abandoned-event",
      Self::ReleaseDeploymentStarted => "ms.vss-release.deployment-started-event",
      Self::ReleaseDeploymentCompleted => "ms.vss-release.deployment-completed-event",
      Self::ReleaseApprovalPending => "ms.vss-release.deployment-approval-pending-event",
      Self::ReleaseApprovalCompleted => "ms.vss-release.deployment-approval-completed-event",
      Self::RunStateChanged => "ms.vss-pipelines.run-state-changed-event",
      Self::RunStageStateChanged => "ms.vss-pipelines.stage-state-changed-event",
      Self::RunJobStateChanged => "ms.vss-pipelines.job-state-changed-event",
      Self::RunStageApprovalPending => "ms.vss-pipelinechecks-events.approval-pending",
      Self::RunStageApprovalCompleted => "ms.vss-pipelinechecks-events.approval-completed",
    }
  }
}

impl fmt::Display for EventType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for EventType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|event| event.as_str() == s)
      .ok_or_else(|| Error::UnknownEventType(s.to_owned()))
  }
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// Narrowing filters. An empty field matches anything. Every field is part
/// of the subscription's identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionFilters {
  // Repos
  pub repository:              String,
  pub target_branch:           String,
  pub pull_request_created_by: String,
  pub pull_request_reviewer:   String,
  pub pushed_by:               String,
  pub merge_result:            String,
  pub notification_type:       String,
  // Boards
  pub area_path:               String,
  // Classic releases
  pub release_pipeline:        String,
  pub release_stage:           String,
  pub release_approval_type:   String,
  pub release_approval_status: String,
  pub release_status:          String,
  // Classic builds
  pub build_pipeline:          String,
  pub build_status:            String,
  // YAML pipelines
  pub run_pipeline:            String,
  pub run_stage:               String,
  pub run_environment:         String,
  pub run_stage_state_id:      String,
  pub run_stage_state:         String,
  pub run_stage_result:        String,
  pub run_state:               String,
  pub run_result:              String,
}

impl SubscriptionFilters {
  /// Filter values in a fixed order. Adding a field means adding it here.
  fn identity_fields(&self) -> [&str; 23] {
    [
      self.repository.as_str(),
      self.target_branch.as_str(),
      self.pull_request_created_by.as_str(),
      self.pull_request_reviewer.as_str(),
      self.pushed_by.as_str(),
      self.merge_result.as_str(),
      self.notification_type.as_str(),
      self.area_path.as_str(),
      self.release_pipeline.as_str(),
      self.release_stage.as_str(),
      self.release_approval_type.as_str(),
      self.release_approval_status.as_str(),
      self.release_status.as_str(),
      self.build_pipeline.as_str(),
      self.build_status.as_str(),
      self.run_pipeline.as_str(),
      self.run_stage.as_str(),
      self.run_environment.as_str(),
      self.run_stage_state_id.as_str(),
      self.run_stage_state.as_str(),
      self.run_stage_result.as_str(),
      self.run_state.as_str(),
      self.run_result.as_str(),
    ]
  }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// One channel subscription created by one chat user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDetails {
  pub owner_id:          String,
  pub organization_name: String,
  pub project_name:      String,
  pub channel_id:        String,
  pub event_type:        EventType,
  #[serde(default)]
  pub filters:           SubscriptionFilters,

  // Display metadata; not part of identity.
  #[serde(default)]
  pub project_id:        String,
  #[serde(default)]
  pub channel_name:      String,
  #[serde(default)]
  pub channel_type:      String,
  #[serde(default)]
  pub created_by:        String,
  #[serde(default)]
  pub filter_names:      FilterDisplayNames,
}

/// Human-readable names for filter ids, shown when listing subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterDisplayNames {
  pub repository:              String,
  pub pull_request_created_by: String,
  pub pull_request_reviewer:   String,
  pub pushed_by:               String,
  pub release_pipeline:        String,
  pub release_stage:           String,
  pub build_pipeline:          String,
  pub run_pipeline:            String,
  pub run_stage:               String,
  pub run_environment:         String,
}

impl SubscriptionDetails {
  pub(crate) fn is_for_project(&self, organization: &str, project: &str) -> bool {
    self.organization_name.eq_ignore_ascii_case(organization)
      && self.project_name.eq_ignore_ascii_case(project)
  }
}

impl Entry for SubscriptionDetails {
  fn owner(&self) -> &str { &self.owner_id }

  fn dedup_key(&self) -> DedupKey {
    let key = DedupKey::new()
      .field(&self.owner_id)
      .field(&self.organization_name.to_ascii_lowercase())
      .field(&self.project_name.to_ascii_lowercase())
      .field(&self.channel_id)
      .field(self.event_type.as_str());
    self
      .filters
      .identity_fields()
      .into_iter()
      .fold(key, DedupKey::field)
  }
}

// ─── Repository ──────────────────────────────────────────────────────────────

impl<B: KvBackend> Store<B> {
  /// Store a subscription, replacing any stored one with the same identity.
  pub async fn store_subscription(&self, subscription: &SubscriptionDetails) -> Result<()> {
    require_id("owner id", &subscription.owner_id)?;
    self
      .modify_collection::<SubscriptionDetails, _>(SUBSCRIPTION_LIST_KEY, |subscriptions| {
        subscriptions.upsert(subscription.clone())
      })
      .await
  }

  /// Subscriptions of `owner_id`.
  ///
  /// The empty string is a wildcard: it returns every owner's subscriptions
  /// in one flat list.
  pub async fn get_all_subscriptions(&self, owner_id: &str) -> Result<Vec<SubscriptionDetails>> {
    let subscriptions = self
      .load_collection::<SubscriptionDetails>(SUBSCRIPTION_LIST_KEY)
      .await?;
    Ok(subscriptions.entries(OwnerFilter::from_param(owner_id)))
  }

  /// Every owner's subscriptions that post into `channel_id`.
  pub async fn get_subscriptions_for_channel(
    &self,
    channel_id: &str,
  ) -> Result<Vec<SubscriptionDetails>> {
    let subscriptions = self
      .load_collection::<SubscriptionDetails>(SUBSCRIPTION_LIST_KEY)
      .await?;
    Ok(
      subscriptions
        .iter(OwnerFilter::All)
        .filter(|s| s.channel_id == channel_id)
        .cloned()
        .collect(),
    )
  }

  /// Remove a subscription. Removing one that is not stored is a no-op.
  pub async fn delete_subscription(&self, subscription: &SubscriptionDetails) -> Result<()> {
    self
      .modify_collection::<SubscriptionDetails, _>(SUBSCRIPTION_LIST_KEY, |subscriptions| {
        subscriptions.remove(subscription).is_some()
      })
      .await
  }

  /// Remove every subscription `owner_id` holds on one project. Returns the
  /// number removed.
  pub async fn delete_subscriptions_for_project(
    &self,
    owner_id: &str,
    organization: &str,
    project: &str,
  ) -> Result<usize> {
    let mut removed = 0;
    self
      .modify_collection::<SubscriptionDetails, _>(SUBSCRIPTION_LIST_KEY, |subscriptions| {
        removed =
          subscriptions.retain_owner(owner_id, |s| !s.is_for_project(organization, project));
        removed > 0
      })
      .await?;
    Ok(removed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn event_type_parses_wire_names() {
    for event in EventType::ALL {
      assert_eq!(event.as_str().parse::<EventType>().unwrap(), event);
      let json = serde_json::to_string(&event).unwrap();
      assert_eq!(json, format!("\"{}\"", event.as_str()));
    }
    assert!(matches!(
      "git.pull".parse::<EventType>(),
      Err(Error::UnknownEventType(_))
    ));
  }

  fn base() -> SubscriptionDetails {
    SubscriptionDetails {
      owner_id:          "u1".into(),
      organization_name: "contoso".into(),
      project_name:      "web".into(),
      channel_id:        "c1".into(),
      event_type:        EventType::CodePushed,
      filters:           SubscriptionFilters::default(),
      project_id:        String::new(),
      channel_name:      "town-square".into(),
      channel_type:      "O".into(),
      created_by:        "alice".into(),
      filter_names:      FilterDisplayNames::default(),
    }
  }

  #[test]
  fn display_metadata_does_not_change_identity() {
    let a = base();
    let mut b = base();
    b.channel_name = "renamed".into();
    b.created_by = "bob".into();
    b.filter_names.repository = "Web".into();
    assert_eq!(a.dedup_key(), b.dedup_key());
  }

  #[test]
  fn every_filter_field_changes_identity() {
    let a = base();
    let fields = SubscriptionFilters::default().identity_fields().len();
    for index in 0..fields {
      let mut b = base();
      let mut values: Vec<String> = vec![String::new(); fields];
      values[index] = "x".into();
      b.filters = filters_from(&values);
      assert_ne!(a.dedup_key(), b.dedup_key(), "filter #{index} ignored");
    }
  }

  fn filters_from(v: &[String]) -> SubscriptionFilters {
    SubscriptionFilters {
      repository:              v[0].clone(),
      target_branch:           v[1].clone(),
      pull_request_created_by: v[2].clone(),
      pull_request_reviewer:   v[3].clone(),
      pushed_by:               v[4].clone(),
      merge_result:            v[5].clone(),
      notification_type:       v[6].clone(),
      area_path:               v[7].clone(),
      release_pipeline:        v[8].clone(),
      release_stage:           v[9].clone(),
      release_approval_type:   v[10].clone(),
      release_approval_status: v[11].clone(),
      release_status:          v[12].clone(),
      build_pipeline:          v[13].clone(),
      build_status:            v[14].clone(),
      run_pipeline:            v[15].clone(),
      run_stage:               v[16].clone(),
      run_environment:         v[17].clone(),
      run_stage_state_id:      v[18].clone(),
      run_stage_state:         v[19].clone(),
      run_stage_result:        v[20].clone(),
      run_state:               v[21].clone(),
      run_result:              v[22].clone(),
    }
  }

  #[test]
  fn identity_ignores_org_and_project_case() {
    let a = base();
    let mut b = base();
    b.organization_name = "Contoso".into();
    b.project_name = "WEB".into();
    assert_eq!(a.dedup_key(), b.dedup_key());
  }
}
