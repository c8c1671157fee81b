use super::Invocation;
use crate::cancel::CancelFlag;
use crate::error::DispatchError;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct ProcessOutcome {
    pub stderr: String,
    pub elapsed: Duration,
}

/// Run an invocation to completion, killing it on timeout or cancellation.
///
/// Exit code 0 is the only success signal. On Unix the child gets its own
/// process group: a terminal Ctrl-C reaches only us, and termination takes
/// down everything the backend spawned.
pub fn run(
    invocation: &Invocation,
    timeout: Option<Duration>,
    cancel: &CancelFlag,
) -> Result<ProcessOutcome, DispatchError> {
    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    debug!("Running {:?} {:?}", invocation.program, invocation.args);
    let start = Instant::now();
    let mut child = command.spawn().map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => DispatchError::BinaryNotFound(invocation.program.clone()),
        _ => DispatchError::Spawn {
            binary: invocation.program.clone(),
            reason: err.to_string(),
        },
    })?;

    // Drain stderr on its own thread so a chatty backend never blocks on a
    // full pipe while we poll.
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    });

    let waited = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) => {}
            Err(err) => {
                terminate(&mut child);
                break Err(DispatchError::from(err));
            }
        }
        if cancel.is_cancelled() {
            warn!("Cancelling {:?} (pid {})", invocation.program, child.id());
            terminate(&mut child);
            break Err(DispatchError::Cancelled);
        }
        if let Some(limit) = timeout {
            if start.elapsed() >= limit {
                warn!(
                    "Killing {:?} (pid {}) after {}s",
                    invocation.program,
                    child.id(),
                    limit.as_secs()
                );
                terminate(&mut child);
                break Err(DispatchError::Timeout(limit));
            }
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    let status = waited?;
    let elapsed = start.elapsed();

    if status.success() {
        Ok(ProcessOutcome { stderr, elapsed })
    } else {
        Err(DispatchError::NonZeroExit {
            code: status.code(),
            stderr,
        })
    }
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        // The group id equals the child's pid because of process_group(0).
        let _ = Command::new("kill")
            .args(["-s", "KILL", "--"])
            .arg(format!("-{}", child.id()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
    let _ = child.wait();
}
