//! One-shot readiness barriers
//!
//! Two independent conditions gate the public operations: the filesystem
//! node is up, and the crypto subsystem has finished initializing. Each
//! is a [`Gate`]: a latch that starts closed, opens exactly once, and
//! lets every later waiter through immediately.

use std::sync::Arc;

use tokio::sync::watch;

/// An idempotent one-shot latch
#[derive(Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Gate {
    /// A closed gate; waiters suspend until [`release`](Self::release)
    pub fn closed() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// A gate that is already open
    pub fn open() -> Self {
        let gate = Self::closed();
        gate.release();
        gate
    }

    /// Open the gate; releasing an open gate is a no-op
    pub fn release(&self) {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        });
    }

    /// Suspend until the gate is open; returns immediately afterwards
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        // The sender lives inside self, so the channel cannot close
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

/// The readiness conditions shared by all public operations
#[derive(Clone)]
pub struct Readiness {
    /// The content-addressed filesystem node is ready.
    pub filesystem: Gate,
    /// The crypto subsystem is initialized.
    pub crypto: Gate,
}

impl Readiness {
    /// Both gates closed; the embedding process releases them
    pub fn closed() -> Self {
        Self {
            filesystem: Gate::closed(),
            crypto: Gate::closed(),
        }
    }

    /// Both gates already open (collaborators were ready before build)
    pub fn open() -> Self {
        Self {
            filesystem: Gate::open(),
            crypto: Gate::open(),
        }
    }

    /// Wait for both conditions
    pub async fn wait_all(&self) {
        self.crypto.wait().await;
        self.filesystem.wait().await;
    }
}
