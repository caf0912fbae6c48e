use log::{debug, info, warn};
use std::env;
use std::fmt;
use std::path::PathBuf;
use toml::Value;
use crate::config::{CommandDefinition, CommandOptions};
use crate::console::{SharedSink, Style, lock_sink};
use crate::environment::{ContextFlags, Environment};
use crate::host::Host;
use crate::output_file::OutputFile;
use crate::runner::{Finish, Launch, ProcessRunner, RunHandle};
use crate::stream::PatternMatcher;
use crate::substitute::{substitute, substitute_all, substitute_str};
use crate::utils::{detect_shell, join_command_line, resolve_program, shell_invocation, strip_quotes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Default,
    /// Runs without clearing or showing the console and without an echo line.
    /// Diagnostics are still matched and recorded.
    Silent,
    /// Handed to an interactive terminal; nothing is captured.
    Terminal,
}

impl Mode {
    pub fn resolve(options: &CommandOptions) -> Self {
        match options.mode.as_str() {
            "" if options.silent => Mode::Silent,
            "silent" => Mode::Silent,
            "terminal" | "window" | "open" => Mode::Terminal,
            _ => Mode::Default,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Default => write!(f, "default"),
            Mode::Silent => write!(f, "silent"),
            Mode::Terminal => write!(f, "terminal"),
        }
    }
}

pub enum Outcome {
    /// The snapshot lacked a required context flag.
    Skipped,
    Terminal,
    Spawned(RunHandle),
    Failed(String),
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Skipped => write!(f, "Skipped"),
            Outcome::Terminal => write!(f, "Terminal"),
            Outcome::Spawned(handle) => write!(f, "Spawned({})", handle.pid()),
            Outcome::Failed(message) => write!(f, "Failed({:?})", message),
        }
    }
}

/// Turns a command definition plus an environment snapshot into a running process.
pub struct Executor {
    sink: SharedSink,
    runner: ProcessRunner,
    host: Host,
}

impl Executor {
    pub fn new(sink: SharedSink, runner: ProcessRunner, host: Host) -> Self {
        Self { sink, runner, host }
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    fn error_line(&self, message: &str) {
        lock_sink(&self.sink).append_plain(message, Style::Error);
    }

    fn fail(&self, message: String) -> Outcome {
        warn!("{}", message);
        self.error_line(&message);
        Outcome::Failed(message)
    }

    pub fn execute(&self, definition: &CommandDefinition, env: &Environment) -> Outcome {
        let raw = match CommandOptions::from_table(&definition.options) {
            Ok(options) => options,
            Err(e) => return self.fail(format!("{}: {:#}", definition.name, e)),
        };

        let mode = Mode::resolve(&raw);
        debug!("Executing '{}' in {} mode", definition.name, mode);
        if mode == Mode::Default {
            let mut sink = lock_sink(&self.sink);
            sink.clear();
            sink.show();
        }

        let required = ContextFlags::parse(&raw.context);
        if !env.context().satisfies(&required) {
            debug!(
                "Skipping '{}': needs context '{}', have '{}'",
                definition.name,
                required,
                env.context()
            );
            return Outcome::Skipped;
        }

        let command = substitute_str(&definition.command, env);
        let args = substitute_all(&definition.arguments, env);
        let options = match CommandOptions::from_value(substitute(&Value::Table(definition.options.clone()), env)) {
            Ok(options) => options,
            Err(e) => return self.fail(format!("{}: {:#}", definition.name, e)),
        };

        if options.save {
            if let Err(e) = self.host.editor.save_active() {
                warn!("Failed to save the active editor: {:#}", e);
            }
        }

        if mode == Mode::Terminal {
            return match self.host.terminal.open(&command, &args, &options) {
                Ok(()) => Outcome::Terminal,
                Err(e) => self.fail(format!("{:#}", e)),
            };
        }

        let cwd = options.cwd();
        let match_base = cwd
            .clone()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let matcher = match PatternMatcher::compile(&definition.matchs, match_base) {
            Ok(matcher) => matcher,
            Err(e) => return self.fail(format!("{:#}", e)),
        };

        let tee = options.file.as_deref().filter(|f| !f.is_empty()).and_then(|raw| {
            let path = OutputFile::resolve(raw, cwd.as_deref(), env.project_dir().as_deref());
            match OutputFile::create(&path) {
                Ok(file) => Some(file),
                Err(e) => {
                    let message = format!("{:#}", e);
                    warn!("{}", message);
                    self.error_line(&message);
                    None
                }
            }
        });

        if mode == Mode::Default {
            lock_sink(&self.sink).append_plain(&echo_line(&command, &args), Style::Echo);
        }

        let program = resolve_program(strip_quotes(&command), &env.project_dirs());
        let (program, args) = if options.shell {
            shell_invocation(&detect_shell(), &join_command_line(&program, &args))
        } else {
            (program, args)
        };

        info!("Running '{}': {} {:?}", definition.name, program, args);
        let launch = Launch {
            program,
            args,
            cwd,
            env: options.env.clone(),
        };
        let finish = Finish {
            sound: options.sound.clone(),
            close_when_finished: options.close_when_finished,
            keep_open_on_match: options.keep_open_on_match,
        };

        match self.runner.spawn(launch, matcher, tee, finish) {
            Some(handle) => Outcome::Spawned(handle),
            None => Outcome::Failed(format!("Failed to execute command: {}", command)),
        }
    }
}

/// The invocation as a JSON array, e.g. `["make","-j4"]`.
pub fn echo_line(command: &str, args: &[String]) -> String {
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(command);
    argv.extend(args.iter().map(String::as_str));
    serde_json::to_string(&argv).unwrap_or_else(|_| join_command_line(command, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use crate::console::{Console, Sink};
    use crate::environment::{Cursor, EditorState};
    use crate::host::{Editor, SoundPlayer, TerminalOpener};
    use crate::runner::table::ProcessTable;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeTerminal(Mutex<Vec<(String, Vec<String>)>>);

    impl TerminalOpener for FakeTerminal {
        fn open(&self, command: &str, argv: &[String], _options: &CommandOptions) -> Result<()> {
            self.0.lock().unwrap().push((command.to_string(), argv.to_vec()));
            Ok(())
        }
    }

    struct Quiet;

    impl SoundPlayer for Quiet {
        fn play(&self, _sound: &str) {}
    }

    #[derive(Default)]
    struct FailingEditor(AtomicUsize);

    impl Editor for FailingEditor {
        fn save_active(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            bail!("read-only buffer")
        }
    }

    struct Fixture {
        console: Arc<Mutex<Console>>,
        terminal: Arc<FakeTerminal>,
        editor: Arc<FailingEditor>,
        executor: Executor,
    }

    fn fixture() -> Fixture {
        let console = Arc::new(Mutex::new(Console::new()));
        let terminal = Arc::new(FakeTerminal::default());
        let editor = Arc::new(FailingEditor::default());
        let sink: SharedSink = console.clone();
        let host = Host {
            terminal: terminal.clone(),
            sounds: Arc::new(Quiet),
            editor: editor.clone(),
        };
        let runner = ProcessRunner::new(sink.clone(), ProcessTable::new(), host.sounds.clone());
        Fixture {
            console,
            terminal,
            editor,
            executor: Executor::new(sink, runner, host),
        }
    }

    fn definition(command: &str, args: &[&str], options: &str) -> CommandDefinition {
        let mut def = CommandDefinition::new("test", command);
        def.arguments = args.iter().map(|a| a.to_string()).collect();
        def.options = toml::from_str(options).unwrap();
        def
    }

    fn editor_env(dir: &Path) -> Environment {
        let state = EditorState {
            path: Some(dir.join("main.c")),
            cursor: Some(Cursor { row: 3, column: 7 }),
            word: "hello".to_string(),
            ..EditorState::default()
        };
        Environment::snapshot(Some(&state), &[dir.to_path_buf()])
    }

    fn texts(console: &Arc<Mutex<Console>>) -> Vec<String> {
        console.lock().unwrap().texts().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_mode_resolution() {
        let mut options = CommandOptions::default();
        assert_eq!(Mode::resolve(&options), Mode::Default);
        options.silent = true;
        assert_eq!(Mode::resolve(&options), Mode::Silent);
        options.mode = "window".to_string();
        assert_eq!(Mode::resolve(&options), Mode::Terminal);
        options.mode = "open".to_string();
        assert_eq!(Mode::resolve(&options), Mode::Terminal);
        options.mode = "fullscreen".to_string();
        assert_eq!(Mode::resolve(&options), Mode::Default);
    }

    #[test]
    fn test_echo_line_is_json() {
        let line = echo_line("echo", &["hello".to_string(), "a \"b\"".to_string()]);
        assert_eq!(line, r#"["echo","hello","a \"b\""]"#);
    }

    #[test]
    fn test_missing_context_skips_silently() {
        let f = fixture();
        let def = definition("echo", &["{FilePath}"], "context = \"fp\"");
        let env = Environment::snapshot(None, &[PathBuf::from("/tmp")]);

        assert!(matches!(f.executor.execute(&def, &env), Outcome::Skipped));
        assert!(f.executor.runner().table().is_empty());
        assert!(f.terminal.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_terminal_mode_bypasses_console() {
        let f = fixture();
        f.console.lock().unwrap().append_plain("previous run", Style::Stdout);
        let dir = tempfile::tempdir().unwrap();
        let def = definition("vim", &["{FileName}"], "mode = \"window\"\nsave = true");

        let outcome = f.executor.execute(&def, &editor_env(dir.path()));
        assert!(matches!(outcome, Outcome::Terminal));
        assert_eq!(
            *f.terminal.0.lock().unwrap(),
            vec![("vim".to_string(), vec!["main.c".to_string()])]
        );
        assert_eq!(texts(&f.console), vec!["previous run"]);
        assert_eq!(f.editor.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_pattern_fails_before_spawn() {
        let f = fixture();
        let mut def = definition("true", &[], "");
        def.matchs = vec!["(?P<file>[a-z".to_string()];

        let outcome = f.executor.execute(&def, &Environment::new());
        let Outcome::Failed(message) = outcome else {
            panic!("expected failure, got {:?}", outcome);
        };
        assert!(message.contains("#1"), "{}", message);
        let console = f.console.lock().unwrap();
        assert_eq!(console.messages().len(), 1);
        assert_eq!(console.messages()[0].style, Style::Error);
        assert!(f.executor.runner().table().is_empty());
    }

    #[test]
    fn test_invalid_options_are_reported() {
        let f = fixture();
        let def = definition("true", &[], "closeWhenFinished = \"soon\"");
        assert!(matches!(f.executor.execute(&def, &Environment::new()), Outcome::Failed(_)));
        assert_eq!(f.console.lock().unwrap().messages()[0].style, Style::Error);
    }

    #[cfg(unix)]
    #[test]
    fn test_default_mode_echoes_and_runs() {
        let f = fixture();
        f.console.lock().unwrap().append_plain("stale", Style::Stdout);
        let dir = tempfile::tempdir().unwrap();
        let def = definition("echo", &["{CurWord}"], "context = \"fep\"");

        let Outcome::Spawned(handle) = f.executor.execute(&def, &editor_env(dir.path())) else {
            panic!("expected a spawned process");
        };
        assert!(handle.wait().unwrap().success());

        let lines = texts(&f.console);
        assert_eq!(&lines[..2], &[r#"["echo","hello"]"#, "hello"]);
        assert_eq!(f.console.lock().unwrap().messages()[0].style, Style::Echo);
        assert!(f.console.lock().unwrap().is_visible());
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_mode_keeps_console_but_records_diagnostics() {
        let f = fixture();
        f.console.lock().unwrap().append_plain("stale", Style::Stdout);
        let mut def = definition("sh", &["-c", "echo 'x.c:2:1: oops' >&2"], "silent = true");
        def.matchs = vec![r"(?P<file>[\w.]+):(?P<line>\d+):(?P<col>\d+)".to_string()];

        let Outcome::Spawned(handle) = f.executor.execute(&def, &Environment::new()) else {
            panic!("expected a spawned process");
        };
        assert!(handle.wait().unwrap().matched);

        let console = f.console.lock().unwrap();
        assert!(!console.is_visible());
        assert_eq!(console.texts()[..2], ["stale", "x.c:2:1: oops"]);
        assert_eq!(console.quickfix().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_redirect_relative_to_cwd() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let options = format!("cwd = {:?}\nfile = \"out.log\"", dir.path().to_string_lossy());
        let def = definition("sh", &["-c", "echo to-file; echo err >&2"], &options);

        let Outcome::Spawned(handle) = f.executor.execute(&def, &Environment::new()) else {
            panic!("expected a spawned process");
        };
        handle.wait().unwrap();

        let written = fs::read_to_string(dir.path().join("out.log")).unwrap();
        assert!(written.contains("to-file\n"));
        assert!(written.contains("err\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unopenable_redirect_still_runs() {
        let f = fixture();
        let def = definition("true", &[], "file = \"/nonexistent-dir/out.log\"");

        let Outcome::Spawned(handle) = f.executor.execute(&def, &Environment::new()) else {
            panic!("expected a spawned process");
        };
        assert!(handle.wait().unwrap().success());
        let console = f.console.lock().unwrap();
        assert_eq!(console.messages()[0].style, Style::Error);
        assert!(console.texts()[0].contains("Failed to open output file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_option_runs_through_shell() {
        let f = fixture();
        let def = definition("echo", &["$((1 + 2))"], "shell = true");

        let Outcome::Spawned(handle) = f.executor.execute(&def, &Environment::new()) else {
            panic!("expected a spawned process");
        };
        handle.wait().unwrap();
        // Quoted by the join, so the shell prints it verbatim.
        assert_eq!(texts(&f.console)[1], "$((1 + 2))");
    }
}
