use crate::memes::MemeError;
use crate::{Context, Error};
use tracing::warn;

pub const WRONG_CHANNEL: &str = "This command is not available in this channel.";
pub const EMPTY_LIST: &str = "The meme list is empty.";

/// Sends a random meme
#[poise::command(slash_command)]
pub async fn meme(ctx: Context<'_>) -> Result<(), Error> {
    let reply = if ctx.data().gate.is_channel_allowed(ctx.channel_id().get()) {
        meme_reply(ctx.data().memes.random_meme().await)
    } else {
        WRONG_CHANNEL.to_string()
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

fn meme_reply(result: Result<Option<String>, MemeError>) -> String {
    match result {
        Ok(Some(url)) => url,
        Ok(None) => EMPTY_LIST.to_string(),
        Err(e) => {
            warn!("Meme lookup failed: {}", e);
            format!("Error: {}", e)
        }
    }
}
