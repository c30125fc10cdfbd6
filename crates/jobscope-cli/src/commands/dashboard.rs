//! Dashboard command implementation.

use std::io::Write;

use super::CommandContext;
use crate::cli::DashboardArgs;
use crate::error::CliError;
use crate::output::{DashboardUrl, OutputFormat};

/// Handler for the dashboard command.
pub struct DashboardCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> DashboardCommand<'a> {
    /// Creates a new dashboard command handler.
    #[must_use]
    pub const fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Prints the dashboard URL derived from the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if writing fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: DashboardArgs,
    ) -> Result<(), CliError> {
        let url = self.ctx.config.dashboard_url(&self.ctx.gateway);
        format.write(
            out,
            &DashboardUrl {
                url,
                bare: args.url,
            },
        )
    }
}
