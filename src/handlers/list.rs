use anyhow::Result;
use colored::*;
use shell_commands::config::{Registry, global_config_path};
use shell_commands::utils::join_command_line;
use crate::cli::EditorArgs;

pub fn handle_list(editor: &EditorArgs) -> Result<()> {
    let project_dirs = editor.project_dirs()?;
    let registry = Registry::load(&project_dirs, global_config_path().as_deref());

    if registry.sets().iter().all(|s| s.commands.is_empty()) {
        println!("No commands defined in configuration.");
        return Ok(());
    }

    let max_len = registry
        .sets()
        .iter()
        .flat_map(|s| s.commands.iter())
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);

    for set in registry.sets() {
        if set.commands.is_empty() {
            continue;
        }
        println!("{} {} {}", "📦".green(), set.label.bold(), format!("({})", set.source.display()).dimmed());

        for command in &set.commands {
            let padding = " ".repeat(max_len - command.name.len() + 2);
            let line = join_command_line(&command.command, &command.arguments);
            println!("  {}{}{}", command.name.cyan(), padding, line.italic());
        }
        println!();
    }

    Ok(())
}
