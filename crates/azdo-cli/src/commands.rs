//! Operator subcommands over a [`Store`].

use anyhow::Context as _;
use azdo_core::{
  Store,
  collection::OwnerFilter,
  kv::KvBackend,
  project::ProjectDetails,
  subscription::{EventType, FilterDisplayNames, SubscriptionDetails, SubscriptionFilters},
};
use clap::{Args, Subcommand};
use serde::Serialize;

#[derive(Subcommand)]
pub enum Command {
  /// Linked Azure DevOps projects.
  #[command(subcommand)]
  Project(ProjectCommand),
  /// Event subscriptions routed into chat channels.
  #[command(subcommand)]
  Subscription(SubscriptionCommand),
  /// Stored user credentials.
  #[command(subcommand)]
  User(UserCommand),
  /// OAuth state values.
  #[command(subcommand)]
  Oauth(OauthCommand),
  /// Reclaim space held by expired keys.
  PurgeExpired,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
  Link(ProjectArgs),
  /// Remove the project and the owner's subscriptions to it.
  Unlink(ProjectArgs),
  List {
    /// Only this owner's projects. Omitted lists every owner.
    #[arg(long)]
    owner: Option<String>,
  },
}

#[derive(Subcommand)]
pub enum SubscriptionCommand {
  Add(SubscriptionArgs),
  Remove(SubscriptionArgs),
  List {
    /// Only this owner's subscriptions. Empty lists every owner.
    #[arg(long, default_value = "")]
    owner: String,
  },
  /// Subscriptions posting into one channel.
  Channel { channel: String },
}

#[derive(Subcommand)]
pub enum UserCommand {
  Show { chat_user_id: String },
  Delete { chat_user_id: String },
}

#[derive(Subcommand)]
pub enum OauthCommand {
  Issue { chat_user_id: String },
  Verify { chat_user_id: String, state: String },
}

#[derive(Args)]
pub struct ProjectArgs {
  #[arg(long)]
  owner:        String,
  #[arg(long)]
  organization: String,
  #[arg(long)]
  project:      String,
  #[arg(long, default_value = "")]
  project_id:   String,
}

impl From<ProjectArgs> for ProjectDetails {
  fn from(args: ProjectArgs) -> Self {
    Self {
      owner_id:          args.owner,
      organization_name: args.organization,
      project_name:      args.project,
      project_id:        args.project_id,
    }
  }
}

#[derive(Args)]
pub struct SubscriptionArgs {
  #[arg(long)]
  owner:        String,
  #[arg(long)]
  organization: String,
  #[arg(long)]
  project:      String,
  #[arg(long)]
  channel:      String,
  /// Wire name of the event, e.g. `git.pullrequest.merged`.
  #[arg(long)]
  event:        EventType,
  #[arg(long, default_value = "")]
  project_id:   String,
  #[arg(long, default_value = "")]
  channel_name: String,
  #[arg(long, default_value = "")]
  channel_type: String,
  #[arg(long, default_value = "")]
  created_by:   String,
  #[command(flatten)]
  filters:      FilterArgs,
}

impl From<SubscriptionArgs> for SubscriptionDetails {
  fn from(args: SubscriptionArgs) -> Self {
    Self {
      owner_id:          args.owner,
      organization_name: args.organization,
      project_name:      args.project,
      channel_id:        args.channel,
      event_type:        args.event,
      filters:           args.filters.into(),
      project_id:        args.project_id,
      channel_name:      args.channel_name,
      channel_type:      args.channel_type,
      created_by:        args.created_by,
      filter_names:      FilterDisplayNames::default(),
    }
  }
}

/// Optional event filters. An omitted filter matches everything.
#[derive(Args)]
pub struct FilterArgs {
  #[arg(long, default_value = "")]
  repository:              String,
  #[arg(long, default_value = "")]
  target_branch:           String,
  #[arg(long, default_value = "")]
  pull_request_created_by: String,
  #[arg(long, default_value = "")]
  pull_request_reviewer:   String,
  #[arg(long, default_value = "")]
  pushed_by:               String,
  #[arg(long, default_value = "")]
  merge_result:            String,
  #[arg(long, default_value = "")]
  notification_type:       String,
  #[arg(long, default_value = "")]
  area_path:               String,
  #[arg(long, default_value = "")]
  release_pipeline:        String,
  #[arg(long, default_value = "")]
  release_stage:           String,
  #[arg(long, default_value = "")]
  release_approval_type:   String,
  #[arg(long, default_value = "")]
  release_approval_status: String,
  #[arg(long, default_value = "")]
  release_status:          String,
  #[arg(long, default_value = "")]
  build_pipeline:          String,
  #[arg(long, default_value = "")]
  build_status:            String,
  #[arg(long, default_value = "")]
  run_pipeline:            String,
  #[arg(long, default_value = "")]
  run_stage:               String,
  #[arg(long, default_value = "")]
  run_environment:         String,
  #[arg(long, default_value = "")]
  run_stage_state_id:      String,
  #[arg(long, default_value = "")]
  run_stage_state:         String,
  #[arg(long, default_value = "")]
  run_stage_result:        String,
  #[arg(long, default_value = "")]
  run_state:               String,
  #[arg(long, default_value = "")]
  run_result:              String,
}

impl From<FilterArgs> for SubscriptionFilters {
  fn from(f: FilterArgs) -> Self {
    Self {
      repository:              f.repository,
      target_branch:           f.target_branch,
      pull_request_created_by: f.pull_request_created_by,
      pull_request_reviewer:   f.pull_request_reviewer,
      pushed_by:               f.pushed_by,
      merge_result:            f.merge_result,
      notification_type:       f.notification_type,
      area_path:               f.area_path,
      release_pipeline:        f.release_pipeline,
      release_stage:           f.release_stage,
      release_approval_type:   f.release_approval_type,
      release_approval_status: f.release_approval_status,
      release_status:          f.release_status,
      build_pipeline:          f.build_pipeline,
      build_status:            f.build_status,
      run_pipeline:            f.run_pipeline,
      run_stage:               f.run_stage,
      run_environment:         f.run_environment,
      run_stage_state_id:      f.run_stage_state_id,
      run_stage_state:         f.run_stage_state,
      run_stage_result:        f.run_stage_result,
      run_state:               f.run_state,
      run_result:              f.run_result,
    }
  }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("failed to serialise output")?;
  println!("{json}");
  Ok(())
}

/// Run every subcommand except `purge-expired`, which is specific to the
/// SQLite backend and handled by the caller.
pub async fn run<B>(store: &Store<B>, command: Command) -> anyhow::Result<()>
where
  B: KvBackend,
{
  match command {
    Command::Project(cmd) => run_project(store, cmd).await,
    Command::Subscription(cmd) => run_subscription(store, cmd).await,
    Command::User(cmd) => run_user(store, cmd).await,
    Command::Oauth(cmd) => run_oauth(store, cmd).await,
    Command::PurgeExpired => anyhow::bail!("purge-expired is not supported by this backend"),
  }
}

async fn run_project<B: KvBackend>(store: &Store<B>, cmd: ProjectCommand) -> anyhow::Result<()> {
  match cmd {
    ProjectCommand::Link(args) => {
      let project = ProjectDetails::from(args);
      store.store_project(&project).await?;
      print_json(&project)
    }
    ProjectCommand::Unlink(args) => {
      let removed = store.unlink_project(&args.into()).await?;
      println!("unlinked; removed {removed} subscription(s)");
      Ok(())
    }
    ProjectCommand::List { owner } => print_json(&list_projects(store, owner.as_deref()).await?),
  }
}

async fn list_projects<B: KvBackend>(
  store: &Store<B>,
  owner: Option<&str>,
) -> anyhow::Result<Vec<ProjectDetails>> {
  let filter = owner.map_or(OwnerFilter::All, OwnerFilter::Only);
  Ok(store.list_projects(filter).await?)
}

async fn run_subscription<B: KvBackend>(
  store: &Store<B>,
  cmd: SubscriptionCommand,
) -> anyhow::Result<()> {
  match cmd {
    SubscriptionCommand::Add(args) => {
      let subscription = SubscriptionDetails::from(args);
      store.store_subscription(&subscription).await?;
      print_json(&subscription)
    }
    SubscriptionCommand::Remove(args) => {
      store.delete_subscription(&args.into()).await?;
      Ok(())
    }
    SubscriptionCommand::List { owner } => {
      print_json(&store.get_all_subscriptions(&owner).await?)
    }
    SubscriptionCommand::Channel { channel } => {
      print_json(&store.get_subscriptions_for_channel(&channel).await?)
    }
  }
}

async fn run_user<B: KvBackend>(store: &Store<B>, cmd: UserCommand) -> anyhow::Result<()> {
  match cmd {
    UserCommand::Show { chat_user_id } => match store.load_user(&chat_user_id).await? {
      Some(user) => print_json(&user),
      None => anyhow::bail!("no user stored for {chat_user_id}"),
    },
    UserCommand::Delete { chat_user_id } => {
      store.delete_user(&chat_user_id).await?;
      Ok(())
    }
  }
}

async fn run_oauth<B: KvBackend>(store: &Store<B>, cmd: OauthCommand) -> anyhow::Result<()> {
  match cmd {
    OauthCommand::Issue { chat_user_id } => {
      println!("{}", store.store_oauth_state(&chat_user_id).await?);
      Ok(())
    }
    OauthCommand::Verify { chat_user_id, state } => {
      store.verify_oauth_state(&chat_user_id, &state).await?;
      println!("ok");
      Ok(())
    }
  }
}
