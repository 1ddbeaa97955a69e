use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::BridgeError;
use crate::platform::Platform;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream { Out, Err }

/// Runs command strings through the platform shell with a hard deadline.
/// Shell metacharacters are interpreted; nothing here sandboxes the command.
#[derive(Debug, Clone)]
pub struct Executor {
    platform: Platform,
    timeout: Duration,
}

impl Executor {
    pub fn new(platform: Platform, timeout: Duration) -> Self { Executor { platform, timeout } }

    pub fn run(&self, cmd: &str, cwd: &Path) -> Result<CommandOutput, BridgeError> {
        let deadline = Instant::now() + self.timeout;
        let (shell, flag) = self.platform.shell();
        let mut command = Command::new(shell);
        command.arg(flag).arg(cmd).current_dir(cwd)
            .stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn()?;
        debug!("spawned pid={} cwd={} cmd={:?}", child.id(), cwd.display(), cmd);

        let (tx, rx) = mpsc::channel();
        if let Some(out) = child.stdout.take() { drain(Stream::Out, out, tx.clone()); }
        if let Some(err) = child.stderr.take() { drain(Stream::Err, err, tx); }

        let status = wait_or_kill(&mut child, self.timeout)?;

        let mut result = CommandOutput { exit_code: status.code(), ..Default::default() };
        let (mut got_out, mut got_err) = (false, false);
        while !(got_out && got_err) {
            let left = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(left) {
                Ok((Stream::Out, bytes)) => { result.stdout = String::from_utf8_lossy(&bytes).into_owned(); got_out = true; }
                Ok((Stream::Err, bytes)) => { result.stderr = String::from_utf8_lossy(&bytes).into_owned(); got_err = true; }
                // a background job inherited the pipes and outlived the shell
                Err(RecvTimeoutError::Timeout) => {
                    warn!("command output still open after deadline, killing pid={}", child.id());
                    terminate(&mut child);
                    return Err(BridgeError::Timeout);
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(result)
    }
}

fn drain(stream: Stream, mut pipe: impl Read + Send + 'static, tx: Sender<(Stream, Vec<u8>)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((stream, buf));
    });
}

// No path out of here leaves the shell's process group running.
fn wait_or_kill(child: &mut Child, timeout: Duration) -> Result<ExitStatus, BridgeError> {
    match child.wait_timeout(timeout) {
        Ok(Some(status)) => Ok(status),
        Ok(None) => {
            warn!("command timed out, killing pid={}", child.id());
            terminate(child);
            Err(BridgeError::Timeout)
        }
        Err(e) => {
            warn!("wait on pid={} failed, killing: {}", child.id(), e);
            terminate(child);
            Err(BridgeError::Unexpected(e))
        }
    }
}

// Kill the whole process group, not just the shell.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        let _ = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Optional allow-list for commands that reach the shell.
#[derive(Debug, Clone, Default)]
pub struct CommandPolicy { allowed: Option<Vec<String>> }

const CONTROL_CHARS: &[char] = &[';', '&', '|', '$', '<', '>', '`', '(', ')', '\n', '\r'];

impl CommandPolicy {
    pub fn new(allowed: Option<Vec<String>>) -> Self { CommandPolicy { allowed } }

    pub fn check(&self, cmd: &str) -> Result<(), BridgeError> {
        let Some(allowed) = &self.allowed else { return Ok(()) };
        let program = cmd.split_whitespace().next().unwrap_or("");
        if cmd.contains(CONTROL_CHARS) || !allowed.iter().any(|a| a == program) {
            warn!("rejected command {:?}", cmd);
            return Err(BridgeError::NotAllowed(program.to_string()));
        }
        Ok(())
    }
}
