use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub pid: u32,
    pub command: String,
    pub started: Instant,
    /// Set by the waiter once the child has been reaped. A record can outlive
    /// its process while a grandchild still holds the pipes open.
    pub exited: Arc<AtomicBool>,
}

impl ProcessRecord {
    pub fn new(pid: u32, command: &str) -> Self {
        Self {
            pid,
            command: command.to_string(),
            started: Instant::now(),
            exited: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    pub fn mark_exited(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}

/// Every child process the session currently tracks, keyed by pid.
///
/// A record lives from a successful spawn until the process closes, or until
/// it is killed explicitly, whichever comes first.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    records: Arc<Mutex<HashMap<u32, ProcessRecord>>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, ProcessRecord>> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn insert(&self, record: ProcessRecord) {
        self.lock().insert(record.pid, record);
    }

    pub fn remove(&self, pid: u32) -> Option<ProcessRecord> {
        self.lock().remove(&pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.lock().contains_key(&pid)
    }

    pub fn get(&self, pid: u32) -> Option<ProcessRecord> {
        self.lock().get(&pid).cloned()
    }

    pub fn pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.lock().keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Asks a tracked process to terminate. The record goes away when it closes.
    /// A process that was already reaped is not signalled; its pid may belong
    /// to someone else by now.
    pub fn stop(&self, pid: u32) -> bool {
        let Some(record) = self.get(pid) else {
            return false;
        };
        if record.has_exited() {
            debug!("Process {} already exited, not stopping", pid);
            return true;
        }
        debug!("Stopping process {}", pid);
        if let Err(e) = send_signal(pid, false) {
            warn!("{:#}", e);
        }
        true
    }

    /// Forcibly terminates a tracked process and forgets it immediately.
    /// Killing an unknown or already killed pid does nothing.
    pub fn kill(&self, pid: u32) -> bool {
        let Some(record) = self.remove(pid) else {
            return false;
        };
        if record.has_exited() {
            debug!("Process {} ({}) already exited, forgetting it", pid, record.command);
            return true;
        }
        debug!("Killing process {} ({})", pid, record.command);
        if let Err(e) = send_signal(pid, true) {
            warn!("{:#}", e);
        }
        true
    }

    pub fn stop_all(&self) -> usize {
        self.pids().into_iter().filter(|pid| self.stop(*pid)).count()
    }

    pub fn kill_all(&self) -> usize {
        self.pids().into_iter().filter(|pid| self.kill(*pid)).count()
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, force: bool) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
    kill(Pid::from_raw(pid as i32), signal)
        .with_context(|| format!("Failed to send {:?} to process {}", signal, pid))
}

#[cfg(windows)]
fn send_signal(pid: u32, force: bool) -> Result<()> {
    use std::process::{Command, Stdio};

    let pid_arg = pid.to_string();
    let mut cmd = Command::new("taskkill");
    cmd.args(["/pid", &pid_arg, "/t"]);
    if force {
        cmd.arg("/f");
    }
    cmd.stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to run taskkill for process {}", pid))?;
    Ok(())
}
