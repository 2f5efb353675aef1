// src/shutdown.rs

use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{info, warn};

// Time the loop gets to log its summary before the process exits.
const GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Lets the poll loop sleep until either the interval passes or the user
/// presses Ctrl-C.
pub struct Shutdown {
    rx: Receiver<()>,
    requested: Cell<bool>,
}

impl Shutdown {
    /// Spawns a thread that waits for Ctrl-C. An interrupt wakes a sleeping
    /// loop and then exits with status 0 shortly after, whatever the loop is
    /// doing (startup fetch, mid-cycle, `--once`).
    pub fn listen() -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        std::thread::Builder::new()
            .name("ctrl-c".into())
            .spawn(move || {
                if let Err(e) = runtime.block_on(tokio::signal::ctrl_c()) {
                    warn!("Cannot listen for Ctrl-C: {e}");
                    return;
                }
                interrupted(&tx, GRACE_PERIOD, || std::process::exit(0));
            })?;

        Ok(Self::from_receiver(rx))
    }

    /// A handle driven by hand, plus the sender that triggers it.
    #[cfg(test)]
    pub fn manual() -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (Self::from_receiver(rx), tx)
    }

    fn from_receiver(rx: Receiver<()>) -> Self {
        Self {
            rx,
            requested: Cell::new(false),
        }
    }

    /// True once an interrupt has arrived. Never blocks.
    pub fn requested(&self) -> bool {
        if !self.requested.get() && self.rx.try_recv().is_ok() {
            self.requested.set(true);
        }
        self.requested.get()
    }

    /// Sleeps for `timeout` or until interrupted. Returns true if interrupted.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.requested.get() {
            return true;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(()) => {
                self.requested.set(true);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            // Listener is gone; nothing can interrupt us any more.
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                false
            }
        }
    }
}

/// Tells the loop, waits `grace`, then calls `exit`.
fn interrupted(tx: &Sender<()>, grace: Duration, exit: impl FnOnce()) {
    info!("Interrupt received, exiting");
    let _ = tx.send(());
    std::thread::sleep(grace);
    exit();
}
