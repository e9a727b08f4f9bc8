//! SIG welcome bot entry point.
//!
//! This binary is the composition root. It loads the configuration, installs
//! the tracing subscriber, builds the Gitee adapter and the
//! [`welcome::EventDispatcher`], then runs one of:
//!
//! - `serve`: the webhook listener until Ctrl-C;
//! - `welcome`: one synthesised "opened" event, exiting non-zero on error;
//! - `check-config`: configuration validation only.

mod config;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use gitee::{GiteeClient, GiteeConfig, PullHistoryDirectory};
use listener::AppState;
use tracing::{info, warn};
use welcome::{
    EventDispatcher, EventOutcome, IssueNumber, ItemRef, Login, PullNumber, RepoRef, WelcomeEvent,
};

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(
    name = "sig-welcome",
    version,
    about = "Welcomes new issues and pull requests on behalf of their SIG"
)]
struct Cli {
    /// Configuration file (YAML).
    #[arg(long, short, env = "SIG_WELCOME_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the webhook listener.
    Serve,
    /// Handle a single opened issue or pull request.
    Welcome(WelcomeArgs),
    /// Validate the configuration and exit.
    CheckConfig,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("item").required(true).args(["issue", "pr"])))]
struct WelcomeArgs {
    #[arg(long)]
    org: String,
    #[arg(long)]
    repo: String,
    /// Issue number, e.g. `I4ABCD`.
    #[arg(long)]
    issue: Option<String>,
    /// Pull request number.
    #[arg(long)]
    pr: Option<u64>,
    /// Login of the item's author.
    #[arg(long)]
    author: String,
}

impl WelcomeArgs {
    fn to_event(&self) -> Result<WelcomeEvent> {
        let repo = RepoRef::new(self.org.as_str(), self.repo.as_str())
            .context("--org and --repo must be non-empty")?;
        let item = match (&self.issue, self.pr) {
            (Some(issue), _) => ItemRef::Issue(
                IssueNumber::new(issue.as_str()).context("--issue must be non-empty")?,
            ),
            (None, Some(pr)) => ItemRef::PullRequest(PullNumber::new(pr)),
            (None, None) => anyhow::bail!("one of --issue or --pr is required"),
        };
        let author = Login::new(self.author.as_str()).context("--author must be non-empty")?;
        Ok(WelcomeEvent::opened(repo, item, author))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    if let Command::CheckConfig = cli.command {
        let settings = config.settings()?;
        println!("configuration ok: {} repository entries", settings.len());
        return Ok(());
    }

    let telemetry = telemetry::init(&config.logging)?;
    let result = run(cli.command, &config).await;
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "sig-welcome failed");
    }
    telemetry.shutdown();
    result
}

async fn run(command: Command, config: &AppConfig) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    match command {
        Command::Serve => {
            ensure!(
                !config.server.webhook_secret.is_empty(),
                "server.webhook_secret must be set to run the listener"
            );
            let state = AppState::new(Arc::new(dispatcher), config.server.webhook_secret.as_str())
                .with_drain_timeout(Duration::from_secs(config.server.drain_timeout_secs));
            listener::serve(config.server.address, state, shutdown_signal()).await?;
            info!("webhook listener stopped");
            Ok(())
        }
        Command::Welcome(args) => {
            let event = args.to_event()?;
            match dispatcher.handle(&event).await? {
                EventOutcome::Completed { sig } => info!(sig = %sig, "welcome completed"),
                EventOutcome::Ignored => info!("event ignored"),
            }
            Ok(())
        }
        Command::CheckConfig => Ok(()),
    }
}

fn build_dispatcher(config: &AppConfig) -> Result<EventDispatcher> {
    let timeout = Duration::from_secs(config.gitee.timeout_secs);
    let client = GiteeClient::new(&GiteeConfig {
        api_base: config.gitee.api_base.clone(),
        token: config.gitee.token.clone(),
        timeout,
    })?;

    let mut dispatcher = EventDispatcher::new(Arc::new(client), config.settings()?);
    if let Some(newcomer) = &config.newcomer {
        let directory = PullHistoryDirectory::new(&newcomer.endpoint, timeout)?;
        dispatcher = dispatcher.with_newcomer_directory(Arc::new(directory));
    }
    Ok(dispatcher)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_welcome_requires_an_item() {
        let parsed = Cli::try_parse_from([
            "sig-welcome", "welcome", "--org", "openeuler", "--repo", "kernel", "--author", "a",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_welcome_args_build_pull_request_event() {
        let cli = Cli::try_parse_from([
            "sig-welcome", "welcome", "--org", "openeuler", "--repo", "kernel", "--pr", "12",
            "--author", "newbie",
        ])
        .unwrap();
        let Command::Welcome(args) = cli.command else {
            panic!("expected the welcome subcommand");
        };
        let event = args.to_event().unwrap();
        assert_eq!(event.repo.full_name(), "openeuler/kernel");
        assert_eq!(event.item, ItemRef::PullRequest(PullNumber::new(12)));
        assert_eq!(event.author.as_str(), "newbie");
    }

    #[test]
    fn test_issue_and_pr_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "sig-welcome", "welcome", "--org", "o", "--repo", "r", "--issue", "I1", "--pr", "1",
            "--author", "a",
        ]);
        assert!(parsed.is_err());
    }
}
