use std::fmt;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    ConsoleClosed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShutdownReason::Interrupt => "interrupt",
            ShutdownReason::Terminate => "terminate",
            ShutdownReason::ConsoleClosed => "console closed",
        };
        f.write_str(label)
    }
}

/// First trigger wins; later ones are ignored.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<Option<ShutdownReason>>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<Option<ShutdownReason>>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownListener) {
        let (sender, receiver) = watch::channel(None);
        (Self { sender }, ShutdownListener { receiver })
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self, reason: ShutdownReason) {
        let first = self.sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if first {
            tracing::info!(target: "lifecycle", %reason, "shutdown requested");
        }
    }
}

impl ShutdownListener {
    pub async fn notified(&mut self) -> ShutdownReason {
        loop {
            if let Some(reason) = *self.receiver.borrow_and_update() {
                return reason;
            }
            if self.receiver.changed().await.is_err() {
                // every sender is gone; nothing can trigger anymore
                return ShutdownReason::ConsoleClosed;
            }
        }
    }
}

pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc.trigger(ShutdownReason::Interrupt);
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let term = shutdown;
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                term.trigger(ShutdownReason::Terminate);
            }
        });
    }
}
