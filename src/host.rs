use anyhow::{Context, Result};
use log::debug;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use crate::config::CommandOptions;
use crate::utils::join_command_line;

/// Opens an interactive terminal running a command; nothing is captured.
pub trait TerminalOpener: Send + Sync {
    fn open(&self, command: &str, argv: &[String], options: &CommandOptions) -> Result<()>;
}

/// Notification side-channel, keyed by the `sound` option.
pub trait SoundPlayer: Send + Sync {
    fn play(&self, sound: &str);
}

/// The editor that provided the context snapshot.
pub trait Editor: Send + Sync {
    /// Saves the active buffer, if there is one.
    fn save_active(&self) -> Result<()>;
}

/// Collaborators supplied by whatever embeds the runner.
#[derive(Clone)]
pub struct Host {
    pub terminal: Arc<dyn TerminalOpener>,
    pub sounds: Arc<dyn SoundPlayer>,
    pub editor: Arc<dyn Editor>,
}

impl Host {
    /// Native terminal, terminal bell, and no editor.
    pub fn system() -> Self {
        Self {
            terminal: Arc::new(SystemTerminal),
            sounds: Arc::new(Bell),
            editor: Arc::new(NoEditor),
        }
    }
}

pub struct SystemTerminal;

impl SystemTerminal {
    fn command(command_line: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "cmd", "/K", command_line]);
            cmd
        } else if cfg!(target_os = "macos") {
            let script = format!(
                "tell application \"Terminal\" to do script \"{}\"",
                command_line.replace('\\', "\\\\").replace('"', "\\\"")
            );
            let mut cmd = Command::new("osascript");
            cmd.args(["-e", &script]);
            cmd
        } else {
            let terminal = std::env::var("TERMINAL").unwrap_or_else(|_| "x-terminal-emulator".to_string());
            let mut cmd = Command::new(terminal);
            cmd.args(["-e", "sh", "-c", command_line]);
            cmd
        }
    }
}

impl TerminalOpener for SystemTerminal {
    fn open(&self, command: &str, argv: &[String], options: &CommandOptions) -> Result<()> {
        let command_line = join_command_line(command, argv);
        let mut cmd = Self::command(&command_line);
        if let Some(cwd) = options.cwd() {
            cmd.current_dir(cwd);
        }
        cmd.envs(&options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        debug!("Opening terminal for: {}", command_line);
        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to open a terminal for: {}", command_line))?;
        // Reap in the background; the terminal's outcome is not reported.
        thread::spawn(move || child.wait().ok());
        Ok(())
    }
}

/// Rings the terminal bell whatever the sound id.
pub struct Bell;

impl SoundPlayer for Bell {
    fn play(&self, sound: &str) {
        debug!("Playing sound '{}'", sound);
        let mut err = io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }
}

pub struct NoEditor;

impl Editor for NoEditor {
    fn save_active(&self) -> Result<()> {
        debug!("No active editor to save");
        Ok(())
    }
}
