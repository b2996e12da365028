use crate::{Context, Error};

/// Say hello
#[poise::command(slash_command)]
pub async fn hello(ctx: Context<'_>) -> Result<(), Error> {
    let greeting = format!("Hello, <@{}>!", ctx.author().id);
    ctx.send(
        poise::CreateReply::default()
            .content(greeting)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Check the bot's latency
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    ctx.send(
        poise::CreateReply::default()
            .content(format!("Pong! Latency: {}ms", latency.as_millis()))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
