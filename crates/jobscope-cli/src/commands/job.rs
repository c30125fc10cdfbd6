//! Job command implementation.
//!
//! Jobs are addressed hierarchically (`-p`, `-x`, `-j`, with missing parts
//! taken from the cached context) or by UUID alone with `--flat`.

use std::io::Write;

use jobscope_core::{Selector, Session};
use jobscope_proto::{EntityKind, StreamKind};

use super::{CommandContext, cancel_on_interrupt, follow, show_entity, show_statuses};
use crate::cli::{JobArgs, JobCommands};
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for job subcommands.
pub struct JobCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> JobCommand<'a> {
    /// Creates a new job command handler.
    #[must_use]
    pub const fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Executes the job subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the job cannot be resolved, fetched or streamed.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &JobArgs,
    ) -> Result<(), CliError> {
        let selector = self.selector(args)?;
        let cache = self.ctx.cache();
        let mut client = self.ctx.client()?;

        let result = {
            let mut session = Session::new(&mut client, &cache);
            match args.command {
                JobCommands::Get => {
                    show_entity(out, format, &mut session, EntityKind::Job, &selector).await
                }
                JobCommands::Statuses(opts) => {
                    show_statuses(
                        out,
                        format,
                        &mut session,
                        EntityKind::Job,
                        &selector,
                        opts.all,
                    )
                    .await
                }
                JobCommands::Logs => {
                    let cancel = cancel_on_interrupt();
                    follow(out, format, &mut session, StreamKind::Logs, &selector, &cancel).await
                }
                JobCommands::Resources => {
                    let cancel = cancel_on_interrupt();
                    follow(
                        out,
                        format,
                        &mut session,
                        StreamKind::Resources,
                        &selector,
                        &cancel,
                    )
                    .await
                }
            }
        };

        client.shutdown().await;
        result
    }

    fn selector(&self, args: &JobArgs) -> Result<Selector, CliError> {
        if let Some(uuid) = args.flat {
            return Ok(Selector::Flat { uuid });
        }
        let mut parts = self.ctx.parts(args.project.as_deref())?;
        parts.experiment = args.experiment;
        parts.job = args.job;
        Ok(Selector::Hierarchical(parts))
    }
}
