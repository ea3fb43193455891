//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Builds the records and proxy it works on
//! 3. Formats and displays output

mod completion;
mod stage;

pub use completion::completion;
pub use stage::{stage, Entry, Outcome, Report, StageRequest};

use crate::cli::args::Command;
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Stage {
            fixture,
            set,
            push,
            remove,
            apply,
            save,
            json,
            output,
        } => stage::stage(
            ctx,
            StageRequest {
                fixture,
                set,
                push,
                remove,
                apply,
                save,
                json,
                output,
            },
        ),
        Command::Completion { shell } => completion::completion(shell),
    }
}
