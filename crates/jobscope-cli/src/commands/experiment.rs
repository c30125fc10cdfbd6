//! Experiment command implementation.

use std::io::Write;

use jobscope_core::{Selector, Session};
use jobscope_proto::EntityKind;

use super::{CommandContext, show_entity, show_statuses};
use crate::cli::{ExperimentArgs, ExperimentCommands};
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for experiment subcommands.
pub struct ExperimentCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> ExperimentCommand<'a> {
    /// Creates a new experiment command handler.
    #[must_use]
    pub const fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Executes the experiment subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the experiment cannot be resolved or fetched.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ExperimentArgs,
    ) -> Result<(), CliError> {
        let mut parts = self.ctx.parts(args.project.as_deref())?;
        parts.experiment = args.experiment;
        let selector = Selector::Hierarchical(parts);

        let cache = self.ctx.cache();
        let mut client = self.ctx.client()?;

        let result = {
            let mut session = Session::new(&mut client, &cache);
            match args.command {
                ExperimentCommands::Get => {
                    show_entity(out, format, &mut session, EntityKind::Experiment, &selector).await
                }
                ExperimentCommands::Statuses(opts) => {
                    show_statuses(
                        out,
                        format,
                        &mut session,
                        EntityKind::Experiment,
                        &selector,
                        opts.all,
                    )
                    .await
                }
            }
        };

        client.shutdown().await;
        result
    }
}
