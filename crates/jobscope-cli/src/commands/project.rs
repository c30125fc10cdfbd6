//! Project command implementation.

use std::io::Write;

use jobscope_core::{Selector, Session};
use jobscope_proto::EntityKind;

use super::{CommandContext, show_entity};
use crate::cli::{ProjectArgs, ProjectCommands};
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for project subcommands.
pub struct ProjectCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> ProjectCommand<'a> {
    /// Creates a new project command handler.
    #[must_use]
    pub const fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Executes the project subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the project cannot be resolved or fetched.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ProjectArgs,
    ) -> Result<(), CliError> {
        let selector = Selector::Hierarchical(self.ctx.parts(args.project.as_deref())?);
        let cache = self.ctx.cache();
        let mut client = self.ctx.client()?;

        let result = {
            let mut session = Session::new(&mut client, &cache);
            match args.command {
                ProjectCommands::Get => {
                    show_entity(out, format, &mut session, EntityKind::Project, &selector).await
                }
            }
        };

        client.shutdown().await;
        result
    }
}
