//! Shared child-process supervision for the process-based adapters.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

struct Running {
    token: u64,
    kill_tx: oneshot::Sender<()>,
}

/// Holds at most one running child process.
///
/// [`watch`](Self::watch) hands a spawned child to a supervisor task that
/// awaits its exit. [`kill`](Self::kill) never blocks: it signals
/// the supervisor, which kills and reaps the child. A killed child's exit is
/// never reported.
#[derive(Clone, Default)]
pub(super) struct ChildSlot {
    running: Arc<Mutex<Option<Running>>>,
    next_token: Arc<AtomicU64>,
}

impl ChildSlot {
    /// Kill the current child, if any. Returns whether one was running.
    pub(super) fn kill(&self) -> bool {
        let taken = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match taken {
            Some(running) => {
                // A supervisor that already finished has dropped the receiver.
                let _ = running.kill_tx.send(());
                true
            }
            None => false,
        }
    }

    /// Kill whatever ran before and spawn `command`. `input`, when given,
    /// is written to the child's stdin.
    ///
    /// Must be called from within a tokio runtime. Pass the child to
    /// [`watch`](Self::watch) straight away.
    pub(super) fn spawn(
        &self,
        command: &mut Command,
        input: Option<Arc<[u8]>>,
    ) -> io::Result<Child> {
        let handle = Handle::try_current()
            .map_err(|_| io::Error::other("no tokio runtime to supervise the child process"))?;

        self.kill();

        let mut child = command
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
            handle.spawn(async move {
                if let Err(e) = stdin.write_all(&bytes).await {
                    tracing::debug!(error = %e, "Child closed stdin early");
                }
            });
        }
        Ok(child)
    }

    /// Track `child` and report its exit to `on_exit` from a supervisor task.
    pub(super) fn watch<F>(&self, child: Child, on_exit: F)
    where
        F: FnOnce(io::Result<ExitStatus>) + Send + 'static,
    {
        self.kill();

        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let (kill_tx, kill_rx) = oneshot::channel();
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Running { token, kill_tx });

        tokio::spawn(supervise(
            child,
            Arc::clone(&self.running),
            token,
            kill_rx,
            on_exit,
        ));
    }

    /// Whether a tracked child is still running.
    pub(super) fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

async fn supervise<F>(
    mut child: Child,
    running: Arc<Mutex<Option<Running>>>,
    token: u64,
    kill_rx: oneshot::Receiver<()>,
    on_exit: F,
) where
    F: FnOnce(io::Result<ExitStatus>),
{
    tokio::select! {
        status = child.wait() => {
            let current = {
                let mut guard = running.lock().unwrap_or_else(PoisonError::into_inner);
                match guard.as_ref() {
                    Some(r) if r.token == token => {
                        guard.take();
                        true
                    }
                    _ => false,
                }
            };
            // A kill that raced the exit wins; its owner has moved on.
            if current {
                on_exit(status);
            }
        }
        // Fires on an explicit kill and when the slot itself is dropped.
        _ = kill_rx => {
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "Child process already exited");
            }
        }
    }
}

/// Whether `program` can be launched at all.
pub(super) fn program_exists(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn natural_exit_is_reported() {
        let slot = ChildSlot::default();
        let (tx, rx) = oneshot::channel();

        let child = slot.spawn(&mut Command::new("true"), None).unwrap();
        slot.watch(child, move |exit| {
            let _ = tx.send(exit.map(|s| s.success()));
        });

        assert!(rx.await.unwrap().unwrap());
        assert!(!slot.is_running());
    }

    #[tokio::test]
    async fn killed_child_is_not_reported() {
        let slot = ChildSlot::default();
        let (tx, rx) = oneshot::channel::<()>();

        let mut command = Command::new("sleep");
        command.arg("30");
        let child = slot.spawn(&mut command, None).unwrap();
        slot.watch(child, move |_| {
            let _ = tx.send(());
        });
        assert!(slot.is_running());

        assert!(slot.kill());
        assert!(!slot.is_running());
        assert!(!slot.kill());

        // The callback is dropped without being called.
        let outcome = tokio::time::timeout(Duration::from_secs(5), rx).await;
        assert!(matches!(outcome, Ok(Err(_))));
    }

    #[tokio::test]
    async fn stdin_is_fed_to_the_child() {
        let slot = ChildSlot::default();
        let (tx, rx) = oneshot::channel();

        let mut command = Command::new("grep");
        command.args(["-q", "vakya"]);
        let child = slot.spawn(&mut command, Some(Arc::from(&b"om vakya\n"[..]))).unwrap();
        slot.watch(child, move |exit| {
            let _ = tx.send(exit.map(|s| s.success()));
        });

        assert!(rx.await.unwrap().unwrap());
    }

    #[test]
    fn spawn_outside_runtime_fails() {
        let slot = ChildSlot::default();
        assert!(slot.spawn(&mut Command::new("true"), None).is_err());
        assert!(!slot.is_running());
    }
}
