//! # Message Coordinator
//!
//! Delivery capability for builder messages. Delivery is fire-and-forget
//! from the agent's perspective: the agent awaits the send completing, not
//! any downstream processing. Reliability semantics belong to the
//! implementation; the idempotency key on each envelope lets consumers
//! deduplicate redeliveries.

use super::messages::{BuilderErrorMessage, BuilderNotificationMessage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Either builder message, as carried by in-process delivery
#[derive(Debug, Clone)]
pub enum BuilderMessage {
    Notification(BuilderNotificationMessage),
    Error(BuilderErrorMessage),
}

/// Capability: deliver builder messages to downstream consumers
#[async_trait]
pub trait MessageCoordinator: Send + Sync {
    /// Deliver a completion notification
    async fn send_notification(
        &self,
        message: BuilderNotificationMessage,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Deliver a defect notice
    async fn send_error(
        &self,
        message: BuilderErrorMessage,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// In-process delivery over a bounded tokio channel
///
/// Used by tests and single-process deployments; the receiver side plays
/// the remediation spawner.
pub struct ChannelCoordinator {
    tx: mpsc::Sender<BuilderMessage>,
}

impl ChannelCoordinator {
    /// Create a coordinator and the receiving end of its channel
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BuilderMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    async fn send(&self, message: BuilderMessage, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            sent = self.tx.send(message) => {
                sent.ok().context("message channel closed")
            }
            _ = cancel.cancelled() => {
                anyhow::bail!("message delivery cancelled")
            }
        }
    }
}

#[async_trait]
impl MessageCoordinator for ChannelCoordinator {
    async fn send_notification(
        &self,
        message: BuilderNotificationMessage,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.send(BuilderMessage::Notification(message), cancel).await
    }

    async fn send_error(
        &self,
        message: BuilderErrorMessage,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.send(BuilderMessage::Error(message), cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentExecutionContext;

    #[tokio::test]
    async fn test_channel_delivery() {
        let (coordinator, mut rx) = ChannelCoordinator::new(8);
        let ctx = AgentExecutionContext::new("proj-1", "pipe-1", "exec-1");
        let cancel = CancellationToken::new();

        let msg = BuilderNotificationMessage::completed(&ctx, "UserService", "UserService.cs", 4, 9, "inv-1");
        coordinator.send_notification(msg, &cancel).await.unwrap();

        match rx.recv().await.unwrap() {
            BuilderMessage::Notification(n) => assert_eq!(n.code_unit, "UserService"),
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped() {
        let (coordinator, rx) = ChannelCoordinator::new(1);
        drop(rx);

        let ctx = AgentExecutionContext::new("proj-1", "pipe-1", "exec-1");
        let msg = BuilderNotificationMessage::dispatched(&ctx, "UserService", "inv-1");
        let result = coordinator
            .send_notification(msg, &CancellationToken::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_send_observes_cancellation() {
        // Capacity 1, fill the channel, keep the receiver so send blocks
        let (coordinator, _rx) = ChannelCoordinator::new(1);
        let ctx = AgentExecutionContext::new("proj-1", "pipe-1", "exec-1");
        let cancel = CancellationToken::new();

        let first = BuilderNotificationMessage::dispatched(&ctx, "A", "inv-1");
        coordinator.send_notification(first, &cancel).await.unwrap();

        cancel.cancel();
        let second = BuilderNotificationMessage::dispatched(&ctx, "B", "inv-1");
        let result = coordinator.send_notification(second, &cancel).await;
        assert!(result.is_err());
    }
}
