//! `snapls cursor`: inspect pagination tokens.

use crate::output::{OutputMode, listing_failure, pretty_kv, pretty_section, render_mode};
use clap::{Args, Subcommand};
use serde::Serialize;
use snaplist_core::After;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct CursorArgs {
    #[command(subcommand)]
    pub command: CursorCommand,
}

#[derive(Subcommand, Debug)]
pub enum CursorCommand {
    #[command(
        about = "Decode a `next` token",
        after_help = "EXAMPLES:\n    snapls cursor decode MTUwLHIyLGM="
    )]
    Decode {
        /// Token printed by `snapls list`.
        #[arg(value_name = "TOKEN")]
        token: String,
    },
}

#[derive(Debug, Serialize)]
struct DecodedCursor {
    value: String,
    repository: String,
    snapshot: String,
}

impl From<After> for DecodedCursor {
    fn from(after: After) -> Self {
        Self {
            value: after.value,
            repository: after.repo_name,
            snapshot: after.snapshot_name,
        }
    }
}

pub fn run_cursor(args: &CursorArgs, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        CursorCommand::Decode { token } => {
            let after = After::from_token(token).map_err(|err| listing_failure(output, err))?;
            tracing::debug!(?after, "decoded cursor");
            render_mode(output, &DecodedCursor::from(after), render_text, render_pretty)
        }
    }
}

fn render_text(cursor: &DecodedCursor, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}  {}  {}", cursor.value, cursor.repository, cursor.snapshot)
}

fn render_pretty(cursor: &DecodedCursor, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Cursor")?;
    pretty_kv(w, "value", &cursor.value)?;
    pretty_kv(w, "repository", &cursor.repository)?;
    pretty_kv(w, "snapshot", &cursor.snapshot)
}
