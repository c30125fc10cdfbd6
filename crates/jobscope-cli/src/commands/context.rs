//! Context command implementation.

use std::io::Write;

use super::CommandContext;
use crate::cli::ContextCommands;
use crate::error::CliError;
use crate::output::{ActionResult, OutputFormat};

/// Handler for context subcommands.
pub struct ContextCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> ContextCommand<'a> {
    /// Creates a new context command handler.
    #[must_use]
    pub const fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Executes the context subcommand. Never contacts the gateway.
    ///
    /// # Errors
    ///
    /// Returns error if the cache cannot be read or cleared.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: ContextCommands,
    ) -> Result<(), CliError> {
        let cache = self.ctx.cache();
        match command {
            ContextCommands::Show => format.write(out, &cache.snapshot()?),
            ContextCommands::Clear => {
                cache.clear()?;
                format.write(
                    out,
                    &ActionResult {
                        success: true,
                        message: "Cached context cleared".to_string(),
                    },
                )
            }
        }
    }
}
