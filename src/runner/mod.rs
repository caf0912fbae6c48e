pub mod pipeline;
pub mod table;


use anyhow::{Result, anyhow};
use colored::*;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crate::console::{SharedSink, Style, lock_sink};
use crate::host::SoundPlayer;
use crate::output_file::OutputFile;
use crate::stream::{PatternMatcher, Stream};
use self::pipeline::OutputPipeline;
use self::table::{ProcessRecord, ProcessTable};

/// What to start.
#[derive(Debug, Clone, Default)]
pub struct Launch {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

/// What to do once the process has closed.
#[derive(Debug, Clone, Default)]
pub struct Finish {
    pub sound: Option<String>,
    pub close_when_finished: bool,
    pub keep_open_on_match: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub pid: u32,
    /// `None` when the process was ended by a signal or could not be waited on.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    pub matched: bool,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A spawned process whose output is still being consumed.
pub struct RunHandle {
    pid: u32,
    consumer: JoinHandle<RunSummary>,
}

impl RunHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Blocks until the process has closed and its output has been drained.
    pub fn wait(self) -> Result<RunSummary> {
        self.consumer
            .join()
            .map_err(|_| anyhow!("Output consumer for process {} panicked", self.pid))
    }
}

enum Event {
    Data(Stream, Vec<u8>),
    End(Stream),
    Failed(String),
    Exited(Option<i32>),
}

/// `[Finished in N seconds]`, with the exit code appended when it is non-zero.
pub fn finished_line(elapsed: Duration, exit_code: Option<i32>) -> String {
    let seconds = elapsed.as_secs_f64();
    match exit_code {
        Some(code) if code != 0 => {
            format!("[Finished in {:.2} seconds, with code {}]", seconds, code)
        }
        _ => format!("[Finished in {:.2} seconds]", seconds),
    }
}

/// Spawns processes and wires their output into the shared sink.
#[derive(Clone)]
pub struct ProcessRunner {
    sink: SharedSink,
    table: ProcessTable,
    sounds: Arc<dyn SoundPlayer>,
}

impl ProcessRunner {
    pub fn new(sink: SharedSink, table: ProcessTable, sounds: Arc<dyn SoundPlayer>) -> Self {
        Self { sink, table, sounds }
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    /// Starts `launch` and returns immediately.
    ///
    /// A spawn failure is reported to the sink as an error line and yields `None`.
    /// No process ran, so there is no `[Finished ...]` line and no sound.
    pub fn spawn(
        &self,
        launch: Launch,
        matcher: PatternMatcher,
        tee: Option<OutputFile>,
        finish: Finish,
    ) -> Option<RunHandle> {
        let mut command = Command::new(&launch.program);
        command
            .args(&launch.args)
            .envs(&launch.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &launch.cwd {
            command.current_dir(cwd);
        }

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("{} Failed to spawn '{}': {}", "❌".red(), launch.program, e);
                let message = format!("Failed to execute command: {}: {}", launch.program, e);
                lock_sink(&self.sink).append_plain(&message, Style::Error);
                return None;
            }
        };

        let pid = child.id();
        let record = ProcessRecord::new(pid, &launch.program);
        let reaped = record.clone();
        self.table.insert(record);
        info!("{} Spawned '{}' as pid {}", "⚡".yellow(), launch.program.bold(), pid);

        let (tx, rx) = mpsc::channel();

        if let Some(out) = child.stdout.take() {
            spawn_reader(Stream::Stdout, out, tx.clone(), tee.clone());
        }
        if let Some(err) = child.stderr.take() {
            spawn_reader(Stream::Stderr, err, tx.clone(), tee);
        }

        // Waiter: owns the child, reports its exit status.
        thread::spawn(move || {
            let event = match child.wait() {
                Ok(status) => Event::Exited(status.code()),
                Err(e) => Event::Failed(e.to_string()),
            };
            reaped.mark_exited();
            let _ = tx.send(event);
        });

        let sink = self.sink.clone();
        let table = self.table.clone();
        let sounds = self.sounds.clone();
        let program = launch.program;

        // Consumer: the channel closes once both readers and the waiter are done,
        // which is the moment the process counts as closed.
        let consumer = thread::spawn(move || {
            let mut pipeline = OutputPipeline::new(matcher);
            let mut exit_code = None;

            for event in rx {
                let mut sink = lock_sink(&sink);
                match event {
                    Event::Data(stream, bytes) => pipeline.on_data(&mut *sink, stream, &bytes),
                    Event::End(stream) => pipeline.on_end(&mut *sink, stream),
                    Event::Failed(message) => {
                        sink.append_plain(&message, Style::Error);
                    }
                    Event::Exited(code) => exit_code = code,
                }
            }

            let elapsed = started.elapsed();
            let matched = pipeline.matched();
            {
                let mut sink = lock_sink(&sink);
                sink.append_plain(&finished_line(elapsed, exit_code), Style::Echo);
            }
            table.remove(pid);
            info!(
                "Process {} ('{}') finished in {:.2}s with code {:?}",
                pid,
                program,
                elapsed.as_secs_f64(),
                exit_code
            );

            if let Some(sound) = finish.sound.as_deref().filter(|s| !s.is_empty()) {
                sounds.play(sound);
            }

            if finish.close_when_finished
                && exit_code == Some(0)
                && !(finish.keep_open_on_match && matched)
            {
                debug!("Closing console after clean run of pid {}", pid);
                lock_sink(&sink).close();
            }

            RunSummary {
                pid,
                exit_code,
                elapsed,
                matched,
            }
        });

        Some(RunHandle { pid, consumer })
    }

    pub fn stop(&self, pid: u32) -> bool {
        self.table.stop(pid)
    }

    pub fn kill(&self, pid: u32) -> bool {
        self.table.kill(pid)
    }

    pub fn stop_all(&self) -> usize {
        self.table.stop_all()
    }

    pub fn kill_all(&self) -> usize {
        self.table.kill_all()
    }
}

fn spawn_reader<R>(stream: Stream, mut source: R, tx: Sender<Event>, tee: Option<OutputFile>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Some(tee) = &tee {
                        tee.write(&buf[..n]);
                    }
                    if tx.send(Event::Data(stream, buf[..n].to_vec())).is_err() {
                        return;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = tx.send(Event::Failed(format!("Failed to read {:?}: {}", stream, e)));
                    break;
                }
            }
        }
        let _ = tx.send(Event::End(stream));
    });
}
