//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`project`] - Project details
//! - [`experiment`] - Experiment details and statuses
//! - [`job`] - Job details, statuses, logs and resources
//! - [`context`] - Cached context inspection
//! - [`dashboard`] - Dashboard location

pub mod context;
pub mod dashboard;
pub mod experiment;
pub mod job;
pub mod project;

use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;

use jobscope_core::{
    CancellationToken, ContextBackend, ContextCache, CoreError, ExplicitParts, RemoteClient,
    Selector, Session,
};
use jobscope_proto::{EntityKind, ProjectRef, StreamKind, StreamMessage};
use tracing::debug;

use crate::cli::Cli;
use crate::client::GatewayClient;
use crate::config::CliConfig;
use crate::error::CliError;
use crate::output::{EntityView, OutputFormat, StatusListing};

pub use context::ContextCommand;
pub use dashboard::DashboardCommand;
pub use experiment::ExperimentCommand;
pub use job::JobCommand;
pub use project::ProjectCommand;

/// Settings shared by every command, after flags, environment and config
/// file have been merged.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Loaded configuration file.
    pub config: CliConfig,
    /// Gateway URL in effect.
    pub gateway: String,
    /// State directory in effect.
    pub state_dir: PathBuf,
}

impl CommandContext {
    /// Merge command-line settings over the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or no state
    /// directory can be determined.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let config = CliConfig::load(cli.config.as_deref())?;
        let gateway = cli
            .gateway
            .clone()
            .unwrap_or_else(|| config.gateway_url.clone());
        let state_dir = config.state_dir(cli.state_dir.as_deref())?;

        debug!(%gateway, state_dir = %state_dir.display(), "command context");
        Ok(Self {
            config,
            gateway,
            state_dir,
        })
    }

    /// Directory holding the cached context files.
    #[must_use]
    pub fn context_dir(&self) -> PathBuf {
        self.state_dir.join("context")
    }

    /// Open the file-backed context cache.
    #[must_use]
    pub fn cache(&self) -> ContextCache {
        ContextCache::open(self.context_dir())
    }

    /// Create a gateway client. No connection is made until first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway URL is invalid.
    pub fn client(&self) -> Result<GatewayClient, CliError> {
        Ok(GatewayClient::new(&self.gateway)?
            .with_timeouts(self.config.connect_timeout(), self.config.request_timeout()))
    }

    /// Parse a `-p` value, qualifying bare names with the configured username.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAddress`] if the name is malformed or has
    /// no owner.
    pub fn project_ref(&self, text: Option<&str>) -> Result<Option<ProjectRef>, CliError> {
        text.map(|text| {
            ProjectRef::parse(text, self.config.username.as_deref())
                .map_err(|e| {
                    CliError::from(CoreError::InvalidAddress(format!("project `{text}`: {e}")))
                })
        })
        .transpose()
    }

    /// Parts for a project-level selector.
    ///
    /// # Errors
    ///
    /// See [`CommandContext::project_ref`].
    pub fn parts(&self, project: Option<&str>) -> Result<ExplicitParts, CliError> {
        Ok(ExplicitParts {
            project: self.project_ref(project)?,
            ..ExplicitParts::default()
        })
    }
}

/// Token cancelled on the first Ctrl-C.
///
/// Installed only by commands that follow a stream, so one-shot commands keep
/// the default interrupt behavior.
#[must_use]
pub fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, stopping stream");
            signal.cancel();
        }
    });
    token
}

/// Fetch one entity and print it.
pub(crate) async fn show_entity<W, C, B>(
    out: &mut W,
    format: &OutputFormat,
    session: &mut Session<'_, C, B>,
    kind: EntityKind,
    selector: &Selector,
) -> Result<(), CliError>
where
    W: Write,
    C: RemoteClient,
    B: ContextBackend,
{
    let (address, entity) = session.get(kind, selector).await?;
    format.write(
        out,
        &EntityView {
            kind,
            address: address.to_string(),
            entity,
        },
    )
}

/// Fetch the first status page, or every page with `all`, and print it.
pub(crate) async fn show_statuses<W, C, B>(
    out: &mut W,
    format: &OutputFormat,
    session: &mut Session<'_, C, B>,
    kind: EntityKind,
    selector: &Selector,
    all: bool,
) -> Result<(), CliError>
where
    W: Write,
    C: RemoteClient,
    B: ContextBackend,
{
    let (first, walker) = session.statuses(kind, selector).await?;
    let address = walker.address().to_string();
    let number = first.number;
    let (mut statuses, navigation) = first.into_parts();

    let listing = if all {
        statuses.extend(walker.collect_all().await?);
        StatusListing {
            kind,
            address,
            page: None,
            navigation: None,
            statuses,
        }
    } else {
        StatusListing {
            kind,
            address,
            page: Some(number),
            navigation,
            statuses,
        }
    };

    format.write(out, &listing)
}

/// Print every message of a job stream until it ends or is cancelled.
pub(crate) async fn follow<W, C, B>(
    out: &mut W,
    format: &OutputFormat,
    session: &mut Session<'_, C, B>,
    kind: StreamKind,
    selector: &Selector,
    cancel: &CancellationToken,
) -> Result<(), CliError>
where
    W: Write,
    C: RemoteClient,
    B: ContextBackend,
{
    let mut write_error = None;
    let on_message = |message: StreamMessage| match format.write_line(out, &message) {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => {
            write_error = Some(e);
            ControlFlow::Break(())
        }
    };

    let outcome = match kind {
        StreamKind::Logs => session.logs(selector, cancel, on_message).await?,
        StreamKind::Resources => session.resources(selector, cancel, on_message).await?,
    };

    if let Some(e) = write_error {
        return Err(e);
    }
    debug!(
        delivered = outcome.delivered(),
        cancelled = outcome.is_cancelled(),
        "stream finished"
    );
    Ok(())
}
