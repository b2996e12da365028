//! Background delivery of audit entries to the log channel.
//!
//! Handlers call [`AuditLogger::log`], which only enqueues. A single worker
//! task drains the queue and hands each entry to an [`AuditSink`]. Delivery
//! failures never reach the user; they are logged and counted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor: String,
    pub title: String,
    pub description: String,
    pub colour: serenity::Colour,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        colour: serenity::Colour,
    ) -> Self {
        Self {
            actor: actor.into(),
            title: title.into(),
            description: description.into(),
            colour,
            timestamp: Utc::now(),
        }
    }

    pub fn to_embed(&self) -> serenity::CreateEmbed {
        serenity::CreateEmbed::new()
            .title(&self.title)
            .description(&self.description)
            .colour(self.colour)
            .footer(serenity::CreateEmbedFooter::new(format!("By {}", self.actor)))
            .timestamp(serenity::Timestamp::from(self.timestamp))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("log channel {0} could not be resolved")]
    Unresolved(u64),
    #[error("failed to send audit entry: {0}")]
    Send(#[from] serenity::Error),
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn deliver(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

#[derive(Clone)]
pub struct AuditLogger {
    tx: Option<mpsc::UnboundedSender<AuditEntry>>,
    failures: Arc<AtomicU64>,
}

impl AuditLogger {
    /// Spawn the delivery worker on the current runtime.
    pub fn spawn(sink: Arc<dyn AuditSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();
        let failures = Arc::new(AtomicU64::new(0));

        let counter = failures.clone();
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                match sink.deliver(&entry).await {
                    Ok(()) => debug!("Audit entry delivered: {}", entry.title),
                    Err(e) => {
                        let total = counter.fetch_add(1, Ordering::Relaxed) + 1;
                        error!(
                            "Dropped audit entry '{}' by {} ({} failures so far): {}",
                            entry.title, entry.actor, total, e
                        );
                    }
                }
            }
            debug!("Audit queue closed");
        });

        Self {
            tx: Some(tx),
            failures,
        }
    }

    /// A logger that accepts and discards everything.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue an entry. Never waits on delivery.
    pub fn log(&self, entry: AuditEntry) {
        let Some(tx) = &self.tx else {
            debug!("No log channel configured, skipping audit entry: {}", entry.title);
            return;
        };
        if tx.send(entry).is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
            warn!("Audit worker is gone, entry dropped");
        }
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Sends entries as embeds to a Discord channel.
pub struct ChannelSink {
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    resolved: OnceCell<bool>,
}

impl ChannelSink {
    pub fn new(http: Arc<serenity::Http>, channel_id: serenity::ChannelId) -> Self {
        Self {
            http,
            channel_id,
            resolved: OnceCell::new(),
        }
    }

    /// Build a logger for the configured channel; id 0 disables audit logging.
    pub fn logger(http: Arc<serenity::Http>, channel_id: u64) -> AuditLogger {
        if channel_id == 0 {
            return AuditLogger::disabled();
        }
        AuditLogger::spawn(Arc::new(Self::new(http, serenity::ChannelId::new(channel_id))))
    }
}

#[async_trait]
impl AuditSink for ChannelSink {
    async fn deliver(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let exists = *self
            .resolved
            .get_or_init(|| async {
                match self.channel_id.to_channel(&*self.http).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("Log channel {} is not reachable: {}", self.channel_id, e);
                        false
                    }
                }
            })
            .await;
        if !exists {
            return Err(AuditError::Unresolved(self.channel_id.get()));
        }

        self.channel_id
            .send_message(
                &*self.http,
                serenity::CreateMessage::new().embed(entry.to_embed()),
            )
            .await?;
        Ok(())
    }
}
