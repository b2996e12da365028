use crate::config::DISCORD_MESSAGE_LIMIT;
use crate::gate::AccessGate;
use crate::relay::{CompletionBackend, RelayError};
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{debug, error, info, warn};

pub const QUERY_PREFIX: &str = "!q";
pub const NO_PERMISSION: &str = "You do not have permission to use this bot.";
pub const FORBIDDEN_REPLY: &str =
    "This query contains a forbidden topic and will not be processed.";
const RELAY_UNAVAILABLE: &str = "The answer service is unavailable right now, try again later.";

/// The parts of an inbound message the gate looks at.
pub struct InboundMessage<'a> {
    pub author_id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub role_ids: Vec<u64>,
    pub content: &'a str,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Not for us; say nothing.
    Ignore,
    /// Author lacks an authorized role.
    Denied,
    /// A `!q` query that mentions a forbidden topic.
    Forbidden,
    /// A `!q` query to relay, prefix stripped.
    Query(String),
    /// Authorized chatter that is not a query.
    Pass,
}

pub fn evaluate(gate: &AccessGate, bot_id: u64, message: &InboundMessage<'_>) -> Verdict {
    if message.author_id == bot_id {
        return Verdict::Ignore;
    }

    let authorized = match message.guild_id {
        Some(guild_id) => gate.is_authorized(message.author_id, guild_id, &message.role_ids),
        None => false,
    };
    if !authorized {
        return Verdict::Denied;
    }

    let Some(rest) = message.content.strip_prefix(QUERY_PREFIX) else {
        return Verdict::Pass;
    };
    if gate.contains_forbidden_topic(message.content) {
        return Verdict::Forbidden;
    }
    Verdict::Query(rest.trim().to_string())
}

/// Run the relay and build the channel reply for one query.
pub async fn answer_query(relay: &dyn CompletionBackend, mention: &str, query: &str) -> String {
    let reply = match relay.complete(query).await {
        Ok(text) => format!("{} Answer from Lucifer Bot: {}", mention, text),
        Err(RelayError::Status(status)) => {
            warn!("Relay answered with status {}", status);
            format!("{} {}", mention, RELAY_UNAVAILABLE)
        }
        Err(e) => {
            error!("Relay call failed: {}", e);
            format!("{} An error occurred: {}", mention, e)
        }
    };
    truncate_chars(reply, DISCORD_MESSAGE_LIMIT)
}

/// The text to post for a verdict, if any. Only `Query` reaches the relay.
pub async fn reply_for(
    verdict: Verdict,
    relay: &dyn CompletionBackend,
    mention: &str,
) -> Option<String> {
    match verdict {
        Verdict::Ignore | Verdict::Pass => None,
        Verdict::Denied => Some(NO_PERMISSION.to_string()),
        Verdict::Forbidden => Some(FORBIDDEN_REPLY.to_string()),
        Verdict::Query(query) => Some(answer_query(relay, mention, &query).await),
    }
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}

/// Handle a message-create event.
pub async fn handle_message(
    ctx: &serenity::Context,
    new_message: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    let inbound = InboundMessage {
        author_id: new_message.author.id.get(),
        guild_id: new_message.guild_id.map(|id| id.get()),
        channel_id: new_message.channel_id.get(),
        role_ids: new_message
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| r.get()).collect())
            .unwrap_or_default(),
        content: &new_message.content,
    };

    let verdict = evaluate(&data.gate, data.bot_id, &inbound);
    match &verdict {
        Verdict::Ignore | Verdict::Pass => return Ok(()),
        Verdict::Denied => debug!(
            "Denied message from {} in channel {}",
            new_message.author.name, new_message.channel_id
        ),
        Verdict::Forbidden => react_ack(ctx, new_message).await,
        Verdict::Query(_) => {
            react_ack(ctx, new_message).await;
            info!(
                "Relaying query from {} in channel {}",
                new_message.author.name, new_message.channel_id
            );
        }
    }

    let typing = matches!(verdict, Verdict::Query(_))
        .then(|| new_message.channel_id.start_typing(&ctx.http));
    let mention = format!("<@{}>", new_message.author.id);
    let reply = reply_for(verdict, data.relay.as_ref(), &mention).await;
    drop(typing);

    if let Some(reply) = reply {
        new_message.channel_id.say(&ctx.http, reply).await?;
    }
    Ok(())
}

async fn react_ack(ctx: &serenity::Context, message: &serenity::Message) {
    let thumbs_up = serenity::ReactionType::Unicode("👍".to_string());
    if let Err(e) = message.react(ctx, thumbs_up).await {
        debug!("Could not react to message {}: {}", message.id, e);
    }
}
