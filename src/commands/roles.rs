use crate::audit::AuditEntry;
use crate::roles::{hex, random_colour, role_mention};
use crate::{ApplicationContext, Context, Error};
use poise::serenity_prelude as serenity;
use poise::Modal;
use std::num::NonZeroU64;
use std::time::Duration;
use tracing::{info, warn};

const MODAL_TIMEOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, poise::Modal)]
#[name = "Assign Role"]
struct RoleInputModal {
    #[name = "Role ID"]
    #[placeholder = "Enter role ID"]
    role_id: String,
    #[name = "User ID"]
    #[placeholder = "Enter user ID"]
    user_id: String,
}

impl RoleInputModal {
    fn ids(&self) -> Result<(serenity::RoleId, serenity::UserId), String> {
        let role_id: NonZeroU64 = self
            .role_id
            .trim()
            .parse()
            .map_err(|e| format!("Invalid input: role ID: {}", e))?;
        let user_id: NonZeroU64 = self
            .user_id
            .trim()
            .parse()
            .map_err(|e| format!("Invalid input: user ID: {}", e))?;
        Ok((
            serenity::RoleId::new(role_id.get()),
            serenity::UserId::new(user_id.get()),
        ))
    }
}

fn access_denied(reason: &str) -> poise::CreateReply {
    poise::CreateReply::default()
        .embed(
            serenity::CreateEmbed::new()
                .title("Access Denied")
                .description(reason)
                .colour(serenity::Colour::RED),
        )
        .ephemeral(true)
}

fn ephemeral_message(content: impl Into<String>) -> serenity::CreateInteractionResponse {
    serenity::CreateInteractionResponse::Message(
        serenity::CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    )
}

/// Assign a role to a user
#[poise::command(slash_command, guild_only)]
pub async fn give_role(ctx: ApplicationContext<'_>) -> Result<(), Error> {
    let generic = Context::Application(ctx);
    let data = generic.data();
    let serenity_ctx = generic.serenity_context();

    if !data.gate.is_channel_allowed(generic.channel_id().get()) {
        generic
            .send(access_denied(
                "This command is only available in a designated channel.",
            ))
            .await?;
        return Ok(());
    }

    let guild_id = generic.guild_id().ok_or("Must be run in a guild")?;
    let role_ids: Vec<serenity::RoleId> = generic
        .author_member()
        .await
        .map(|m| m.roles.clone())
        .unwrap_or_default();
    if !data
        .gate
        .is_authorized(generic.author().id.get(), guild_id.get(), &role_ids)
    {
        generic
            .send(access_denied(
                "You do not have the required role to use this command.",
            ))
            .await?;
        return Ok(());
    }

    let custom_id = generic.id().to_string();
    ctx.interaction
        .create_response(
            serenity_ctx,
            RoleInputModal::create(None, custom_id.clone()),
        )
        .await?;
    ctx.has_sent_initial_response
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let author_id = generic.author().id;
    let Some(submission) = serenity::ModalInteractionCollector::new(serenity_ctx)
        .filter(move |m| m.data.custom_id == custom_id && m.user.id == author_id)
        .timeout(MODAL_TIMEOUT)
        .next()
        .await
    else {
        return Ok(());
    };

    let input = RoleInputModal::parse(submission.data.clone())?;
    let (role_id, user_id) = match input.ids() {
        Ok(ids) => ids,
        Err(msg) => {
            submission
                .create_response(serenity_ctx, ephemeral_message(msg))
                .await?;
            return Ok(());
        }
    };

    let reason = format!("Assigned by {}", generic.author().name);
    if let Err(e) = serenity_ctx
        .http
        .add_member_role(guild_id, user_id, role_id, Some(reason.as_str()))
        .await
    {
        warn!("Failed to add role {} to user {}: {}", role_id, user_id, e);
        submission
            .create_response(
                serenity_ctx,
                ephemeral_message(format!("An error occurred: {}", e)),
            )
            .await?;
        return Ok(());
    }

    info!(
        "{} assigned role {} to user {} in guild {}",
        generic.author().name,
        role_id,
        user_id,
        guild_id
    );
    data.audit.log(AuditEntry::new(
        generic.author().name.clone(),
        "Logging Data",
        format!("Role ID: {}, User ID: {}", role_id, user_id),
        serenity::Colour::BLUE,
    ));

    submission
        .create_response(
            serenity_ctx,
            ephemeral_message("Role assigned successfully!"),
        )
        .await?;
    Ok(())
}

/// Create a new role with a random color
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn create_role(
    ctx: Context<'_>,
    #[description = "The name of the new role"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let colour = random_colour(&mut rand::thread_rng());
    let reason = format!("Created by {}", ctx.author().name);

    let builder = serenity::EditRole::new()
        .name(name)
        .colour(colour)
        .audit_log_reason(&reason);
    let role = match guild_id.create_role(ctx.serenity_context(), builder).await {
        Ok(role) => role,
        Err(e) => {
            warn!("Role creation failed in guild {}: {}", guild_id, e);
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("Error: {}", e))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    let mention = role_mention(role.id);
    let embed = serenity::CreateEmbed::new()
        .title("✅ Role Created")
        .description(format!(
            "The role {} was created\nColor: {}",
            mention,
            hex(colour)
        ))
        .colour(colour);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    // Queued only after the user already has their confirmation.
    ctx.data().audit.log(AuditEntry::new(
        ctx.author().name.clone(),
        "📝 Role Creation",
        format!(
            "Administrator <@{}> created role {}",
            ctx.author().id,
            mention
        ),
        colour,
    ));

    Ok(())
}
