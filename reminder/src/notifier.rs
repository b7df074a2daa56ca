use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::{AppError, Res},
    events::OutboundCommand,
    http::CommandBatch,
};
use tokio::{sync::mpsc, task::JoinHandle};

/// Hands an unsolicited command over for delivery. `Ok` means the command was
/// accepted, not that the user has seen it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, command: OutboundCommand) -> Res<()>;
}

/// Used when no gateway URL is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, command: OutboundCommand) -> Res<()> {
        log::info!("No outbound gateway configured, dropping {:?}", command);
        Ok(())
    }
}

/// POSTs `{"commands": [...]}` to the gateway, the same body the event
/// webhook answers with.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            secret,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, command: OutboundCommand) -> Res<()> {
        let mut request = self.client.post(&self.url).json(&CommandBatch {
            commands: vec![command],
        });
        if let Some(secret) = &self.secret {
            request = request.header("X-Gateway-Secret", secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Delivery(format!("gateway unreachable: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Delivery(format!("gateway answered {status}")));
        }
        Ok(())
    }
}

/// Front of the bounded outbound queue. A full queue fails the hand-off
/// instead of waiting.
#[derive(Clone)]
pub struct QueueNotifier {
    sender: mpsc::Sender<OutboundCommand>,
}

#[async_trait]
impl Notifier for QueueNotifier {
    async fn notify(&self, command: OutboundCommand) -> Res<()> {
        self.sender.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AppError::Delivery("outbound queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::Delivery("outbound queue is closed".to_string())
            }
        })
    }
}

/// Creates the outbound queue and spawns the worker draining it into `sink`.
/// Failed deliveries are logged and dropped. The worker stops once every
/// [`QueueNotifier`] is gone.
pub fn outbound_queue(
    capacity: usize,
    sink: Arc<dyn Notifier>,
) -> (QueueNotifier, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel::<OutboundCommand>(capacity.max(1));

    let worker = tokio::spawn(async move {
        while let Some(command) = receiver.recv().await {
            let recipient = command.user_id();
            if let Err(error) = sink.notify(command).await {
                log::warn!("Dropping message for {:?}: {}", recipient, error);
            }
        }
        log::info!("Outbound queue closed");
    });

    (QueueNotifier { sender }, worker)
}
