use anyhow::{Context, Result};
use colored::*;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT_CONFIG: &str = ".shell-commands.toml";
pub const GLOBAL_CONFIG: &str = "global-shell-commands.toml";

/// A named command as written in a config file.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDefinition {
    pub name: String,
    pub command: String,
    pub arguments: Vec<String>,
    /// Kept as a raw table: placeholders are expanded per invocation.
    pub options: toml::Table,
    pub matchs: Vec<String>,
}

impl CommandDefinition {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            arguments: Vec::new(),
            options: toml::Table::new(),
            matchs: Vec::new(),
        }
    }
}

/// Options of one invocation, read after placeholder expansion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandOptions {
    pub mode: String,
    pub silent: bool,
    /// Required context flags, a subset of `fep`.
    pub context: String,
    pub cwd: Option<String>,
    pub env: HashMap<String, String>,
    /// Run the command line through the user's shell.
    pub shell: bool,
    /// Redirect raw output to this file.
    pub file: Option<String>,
    pub save: bool,
    pub sound: Option<String>,
    pub close_when_finished: bool,
    pub keep_open_on_match: bool,
    /// Accepted for compatibility; key bindings are the host's business.
    pub keymap: Option<String>,
}

impl CommandOptions {
    pub fn from_table(table: &toml::Table) -> Result<Self> {
        toml::Value::Table(table.clone())
            .try_into()
            .context("Invalid command options")
    }

    pub fn from_value(value: toml::Value) -> Result<Self> {
        value.try_into().context("Invalid command options")
    }

    /// Working directory, if one was given.
    pub fn cwd(&self) -> Option<PathBuf> {
        self.cwd.as_deref().filter(|c| !c.is_empty()).map(PathBuf::from)
    }
}

#[derive(Debug, Deserialize)]
struct CommandsFile {
    commands: Option<Vec<RawCommand>>,
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    name: Option<String>,
    command: Option<String>,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    options: toml::Table,
    #[serde(default)]
    matchs: Vec<String>,
}

/// Commands loaded from one config file.
#[derive(Debug, Clone)]
pub struct CommandSet {
    /// Display label, unique across the registry.
    pub label: String,
    pub source: PathBuf,
    pub commands: Vec<CommandDefinition>,
}

fn config_warning(path: &Path, description: &str) {
    warn!("Error parsing '{}': {}", path.display(), description);
    eprintln!("{} Error parsing '{}': {}", "⚠️".yellow(), path.display(), description);
}

/// Parses one config file. Entries missing `name` or `command` are skipped
/// with a warning; their siblings still load.
pub fn parse_commands(path: &Path, content: &str) -> Result<Vec<CommandDefinition>> {
    let file: CommandsFile = toml::from_str(content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let Some(raw) = file.commands else {
        config_warning(path, "Could not find 'commands' array");
        return Ok(Vec::new());
    };

    let mut commands = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(name) = entry.name.filter(|n| !n.is_empty()) else {
            let command = entry.command.unwrap_or_default();
            config_warning(path, &format!("Could not find 'name' for command {}", command));
            continue;
        };
        let Some(command) = entry.command.filter(|c| !c.is_empty()) else {
            config_warning(path, &format!("Could not find 'command' for command named {}", name));
            continue;
        };
        commands.push(CommandDefinition {
            name,
            command,
            arguments: entry.arguments,
            options: entry.options,
            matchs: entry.matchs,
        });
    }
    Ok(commands)
}

pub fn load_commands(path: &Path) -> Result<Vec<CommandDefinition>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_commands(path, &content)
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shell-commands").join(GLOBAL_CONFIG))
}

/// Writes an empty global config when none exists yet.
pub fn ensure_global_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    fs::write(path, "commands = []\n")
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Every command visible from a set of project directories plus the global file.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    sets: Vec<CommandSet>,
}

impl Registry {
    /// Project files first (in directory order), the global file last.
    /// A file that fails to load is reported and left out.
    pub fn load(project_dirs: &[PathBuf], global: Option<&Path>) -> Self {
        let mut registry = Self::default();

        for dir in project_dirs {
            let path = dir.join(PROJECT_CONFIG);
            if !path.exists() {
                debug!("No {} in {}", PROJECT_CONFIG, dir.display());
                continue;
            }
            let base = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.to_string_lossy().into_owned());
            registry.add_file(&base, &path);
        }

        if let Some(path) = global {
            if let Err(e) = ensure_global_config(path) {
                warn!("{:#}", e);
            }
            if path.exists() {
                registry.add_file("Global Commands", path);
            }
        }
        registry
    }

    fn add_file(&mut self, base: &str, path: &Path) {
        match load_commands(path) {
            Ok(commands) => {
                let label = self.unique_label(base);
                self.sets.push(CommandSet {
                    label,
                    source: path.to_path_buf(),
                    commands,
                });
            }
            Err(e) => {
                warn!("{:#}", e);
                eprintln!("{} {:#}", "❌".red(), e);
            }
        }
    }

    /// `name`, then `name{1}`, `name{2}`... for same-named directories.
    fn unique_label(&self, base: &str) -> String {
        let taken = |label: &str| self.sets.iter().any(|s| s.label == label);
        let mut num = 0;
        let mut label = base.to_string();
        while taken(&label) {
            num += 1;
            label = format!("{}{{{}}}", base, num);
        }
        label
    }

    pub fn push(&mut self, set: CommandSet) {
        self.sets.push(set);
    }

    pub fn sets(&self) -> &[CommandSet] {
        &self.sets
    }

    /// First command with this name, project sets taking precedence.
    pub fn find(&self, name: &str) -> Option<&CommandDefinition> {
        self.sets
            .iter()
            .flat_map(|s| s.commands.iter())
            .find(|c| c.name == name)
    }
}
