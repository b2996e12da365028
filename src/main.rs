use lucifer::audit::ChannelSink;
use lucifer::config::Config;
use lucifer::gate::AccessGate;
use lucifer::memes::MemeCache;
use lucifer::relay::HttpRelay;
use lucifer::{commands, message, Data, Error};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, error, info};

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let description = match missing_permissions {
                Some(perms) => format!("You are missing the following permissions: {}", perms),
                None => "You do not have permission to use this command.".to_string(),
            };
            let embed = serenity::CreateEmbed::new()
                .title("❌ Error")
                .description(description)
                .colour(serenity::Colour::RED);
            if let Err(e) = ctx
                .send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await
            {
                error!("Failed to send permission error: {}", e);
            }
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {}", ctx.command().name, error);
            if let Err(e) = ctx
                .send(
                    poise::CreateReply::default()
                        .content(format!("An error occurred: {}", error))
                        .ephemeral(true),
                )
                .await
            {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e)
            }
        }
    }
}

async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = message::handle_message(ctx, new_message, data).await {
                error!(
                    "Failed to handle message {} in channel {}: {}",
                    new_message.id, new_message.channel_id, e
                );
            }
        }
        serenity::FullEvent::GuildMemberUpdate { event, .. } => {
            data.gate.on_member_changed(event.user.id.get(), event.guild_id.get());
        }
        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            data.gate.on_member_changed(user.id.get(), guild_id.get());
        }
        serenity::FullEvent::GuildRoleDelete { guild_id, .. } => {
            data.gate.on_role_deleted(guild_id.get());
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    debug!("Loaded configuration: {:?}", config);
    let discord_token = config.discord_token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(handle_event(ctx, event, data))
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                ctx.set_presence(
                    Some(serenity::ActivityData::listening(&config.status_message)),
                    serenity::OnlineStatus::Online,
                );

                let relay = HttpRelay::new(reqwest::Client::new(), &config);
                let audit = ChannelSink::logger(ctx.http.clone(), config.log_channel_id);

                Ok(Data {
                    gate: AccessGate::from_config(&config),
                    relay: Arc::new(relay),
                    memes: MemeCache::new(config.meme_dir.clone()),
                    audit,
                    bot_id: ready.user.id.get(),
                    config,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
