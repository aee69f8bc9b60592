use tokio::sync::watch;

/// Owner side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// Cloneable listener handed to a running calculation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle { sender }, CancelSignal { receiver })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
