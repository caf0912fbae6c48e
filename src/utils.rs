use std::env;
use std::path::PathBuf;

/// Removes one pair of surrounding double quotes, which would otherwise end up
/// in the program name.
pub fn strip_quotes(command: &str) -> &str {
    if command.len() >= 2 && command.starts_with('"') && command.ends_with('"') {
        &command[1..command.len() - 1]
    } else {
        command
    }
}

/// Prefers an executable shipped inside one of the project directories,
/// then a PATH lookup, then the bare name (the spawn reports the failure).
pub fn resolve_program(command: &str, project_dirs: &[PathBuf]) -> String {
    if let Some(local) = project_dirs
        .iter()
        .map(|dir| dir.join(command))
        .find(|candidate| candidate.is_file())
    {
        return local.to_string_lossy().into_owned();
    }

    match which::which(command) {
        Ok(found) => found.to_string_lossy().into_owned(),
        Err(_) => command.to_string(),
    }
}

/// The user's shell from `$SHELL`, else the platform default.
pub fn detect_shell() -> String {
    env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| if cfg!(windows) { "cmd".to_string() } else { "sh".to_string() })
}

/// Program and argv that run `command_line` through `shell`.
pub fn shell_invocation(shell: &str, command_line: &str) -> (String, Vec<String>) {
    // Simple heuristic: "cmd" or "cmd.exe" uses /C, others use -c
    let flag = if shell.contains("cmd") && !shell.contains("sh") {
        "/C"
    } else {
        "-c"
    };
    (shell.to_string(), vec![flag.to_string(), command_line.to_string()])
}

/// Joins a program and its arguments into one shell-safe command line.
pub fn join_command_line(program: &str, args: &[String]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(program);
    words.extend(args.iter().map(String::as_str));
    shell_words::join(words)
}
