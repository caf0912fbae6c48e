use anyhow::Result;
use colored::*;
use shell_commands::environment::{Environment, STRUCTURAL_VARIABLES};
use crate::cli::EditorArgs;

pub fn handle_env(editor: &EditorArgs) -> Result<()> {
    let project_dirs = editor.project_dirs()?;
    let env = Environment::snapshot(editor.state().as_ref(), &project_dirs);

    println!("{} Variables (context '{}'):", "🔍".cyan(), env.context());
    for (name, value) in env.iter() {
        if STRUCTURAL_VARIABLES.contains(&name.as_str()) {
            println!("  {} = {} {}", name.dimmed(), value, "(not substituted)".italic().dimmed());
        } else {
            println!("  {} = {}", format!("{{{}}}", name).bold(), value);
        }
    }

    Ok(())
}
