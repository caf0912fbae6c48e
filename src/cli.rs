use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use shell_commands::environment::{Cursor, EditorState};

#[derive(Parser)]
#[command(name = "shc", version, about = "Shell Commands: run configured commands and jump to their diagnostics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command defined in .shell-commands.toml or the global config
    #[command(visible_alias = "r")]
    Run {
        name: String,

        /// Print the collected diagnostics once the command has finished
        #[arg(short = 'q', long)]
        quickfix: bool,

        #[command(flatten)]
        editor: EditorArgs,
    },

    /// List all available commands
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        editor: EditorArgs,
    },

    /// Show the variables available for substitution
    #[command(visible_alias = "e")]
    Env {
        #[command(flatten)]
        editor: EditorArgs,
    },
}

/// Editor context, as an editor integration would pass it on the command line.
#[derive(Args, Clone, Default)]
pub struct EditorArgs {
    /// Project directory (repeatable, defaults to the current directory)
    #[arg(short = 'p', long = "project")]
    pub projects: Vec<PathBuf>,

    /// Active file
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Cursor row (zero-based)
    #[arg(long)]
    pub row: Option<u32>,

    /// Cursor column (zero-based)
    #[arg(long)]
    pub col: Option<u32>,

    #[arg(long, default_value = "")]
    pub word: String,

    #[arg(long, default_value = "")]
    pub selection: String,

    #[arg(long = "line-text", default_value = "")]
    pub line_text: String,

    /// An editor is active even without a file or cursor
    #[arg(long)]
    pub editor: bool,
}

impl EditorArgs {
    pub fn project_dirs(&self) -> Result<Vec<PathBuf>> {
        if !self.projects.is_empty() {
            return Ok(self.projects.clone());
        }
        let current_dir = env::current_dir().context("Failed to read the current directory")?;
        Ok(vec![current_dir])
    }

    pub fn state(&self) -> Option<EditorState> {
        if !self.editor && self.file.is_none() && self.row.is_none() {
            return None;
        }
        Some(EditorState {
            path: self.file.clone(),
            cursor: self.row.map(|row| Cursor {
                row,
                column: self.col.unwrap_or(0),
            }),
            selection: self.selection.clone(),
            line_text: self.line_text.clone(),
            word: self.word.clone(),
        })
    }
}
