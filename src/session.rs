use log::info;
use crate::config::CommandDefinition;
use crate::console::{QuickfixEntry, SharedSink, Step, lock_sink};
use crate::environment::Environment;
use crate::executor::{Executor, Outcome};
use crate::host::Host;
use crate::runner::ProcessRunner;
use crate::runner::table::ProcessTable;

/// Everything that lives between activation and deactivation: the shared
/// console, the process table and the executor feeding them.
pub struct Session {
    sink: SharedSink,
    processes: ProcessTable,
    executor: Executor,
}

impl Session {
    pub fn new(sink: SharedSink, host: Host) -> Self {
        let processes = ProcessTable::new();
        let runner = ProcessRunner::new(sink.clone(), processes.clone(), host.sounds.clone());
        let executor = Executor::new(sink.clone(), runner, host);
        info!("Session started");
        Self {
            sink,
            processes,
            executor,
        }
    }

    pub fn execute(&self, definition: &CommandDefinition, env: &Environment) -> Outcome {
        self.executor.execute(definition, env)
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// Quickfix navigation; `None` when the step has nowhere to go.
    pub fn navigate(&self, step: Step) -> Option<QuickfixEntry> {
        lock_sink(&self.sink).navigate(step)
    }

    pub fn stop(&self, pid: u32) -> bool {
        self.executor.runner().stop(pid)
    }

    pub fn kill(&self, pid: u32) -> bool {
        self.executor.runner().kill(pid)
    }

    pub fn stop_all(&self) -> usize {
        self.executor.runner().stop_all()
    }

    pub fn kill_all(&self) -> usize {
        self.executor.runner().kill_all()
    }

    /// Kills every tracked process, then clears and closes the console.
    pub fn shutdown(self) {
        let killed = self.kill_all();
        let mut sink = lock_sink(&self.sink);
        sink.clear();
        sink.close();
        info!("Session ended, {} process(es) killed", killed);
    }
}
