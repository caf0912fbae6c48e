use anyhow::{Context, Result, bail};
use colored::*;
use log::info;
use std::sync::{Arc, Mutex};
use shell_commands::config::{Registry, global_config_path};
use shell_commands::console::{Console, SharedSink, TerminalRenderer, lock_sink};
use shell_commands::environment::Environment;
use shell_commands::executor::Outcome;
use shell_commands::host::Host;
use shell_commands::session::Session;
use crate::cli::EditorArgs;

pub fn handle_run(name: &str, editor: &EditorArgs, show_quickfix: bool) -> Result<()> {
    let project_dirs = editor.project_dirs()?;
    let registry = Registry::load(&project_dirs, global_config_path().as_deref());
    let definition = registry
        .find(name)
        .cloned()
        .with_context(|| format!("Command '{}' not found", name))?;

    let env = Environment::snapshot(editor.state().as_ref(), &project_dirs);

    let console = Console::with_renderer(Box::new(TerminalRenderer::stdout()));
    let sink: SharedSink = Arc::new(Mutex::new(console));
    let session = Session::new(sink.clone(), Host::system());

    // Children would outlive us otherwise.
    let processes = session.processes().clone();
    ctrlc::set_handler(move || {
        let killed = processes.kill_all();
        eprintln!("\n{} Interrupted, killed {} process(es)", "⛔".red(), killed);
    })
    .context("Failed to install the Ctrl-C handler")?;

    match session.execute(&definition, &env) {
        Outcome::Skipped => {
            println!(
                "{} '{}' does not apply here (needs context '{}', have '{}')",
                "⏭️".yellow(),
                name.bold(),
                definition.options.get("context").and_then(|c| c.as_str()).unwrap_or(""),
                env.context()
            );
            Ok(())
        }
        Outcome::Terminal => {
            println!("{} Opened '{}' in a new terminal", "🖥️".cyan(), name.bold());
            Ok(())
        }
        Outcome::Failed(message) => bail!(message),
        Outcome::Spawned(handle) => {
            let summary = handle.wait()?;
            info!("'{}' finished: {:?}", name, summary);

            if show_quickfix {
                print_quickfix(&sink);
            }

            if !summary.success() {
                match summary.exit_code {
                    Some(code) => bail!("Command '{}' failed with exit code {}", name, code),
                    None => bail!("Command '{}' was terminated", name),
                }
            }
            Ok(())
        }
    }
}

fn print_quickfix(sink: &SharedSink) {
    let sink = lock_sink(sink);
    let entries = sink.quickfix().entries();
    if entries.is_empty() {
        println!("{} No diagnostics", "✅".green());
        return;
    }

    println!("\n{}", "Diagnostics:".bold().underline());
    for (idx, entry) in entries.iter().enumerate() {
        let location = format!(
            "{}:{}:{}",
            entry.location.file.display(),
            entry.location.line,
            entry.location.column
        );
        println!("  {:>3}  {}  {}", idx + 1, location.cyan(), entry.style.class_name().dimmed());
    }
}
