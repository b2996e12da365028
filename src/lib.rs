pub mod audit;
pub mod cache;
pub mod commands;
pub mod config;
pub mod gate;
pub mod memes;
pub mod message;
pub mod relay;
pub mod roles;

use std::sync::Arc;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub gate: gate::AccessGate,
    pub relay: Arc<dyn relay::CompletionBackend>,
    pub memes: memes::MemeCache,
    pub audit: audit::AuditLogger,
    /// Bot's own user ID, to ignore our own messages
    pub bot_id: u64,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type ApplicationContext<'a> = poise::ApplicationContext<'a, Data, Error>;
