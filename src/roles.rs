use poise::serenity_prelude as serenity;
use rand::Rng;

/// A colour with each RGB channel drawn uniformly from 0..=255.
pub fn random_colour<R: Rng + ?Sized>(rng: &mut R) -> serenity::Colour {
    serenity::Colour::from_rgb(
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
    )
}

/// `#rrggbb`, zero padded.
pub fn hex(colour: serenity::Colour) -> String {
    format!("#{:06x}", colour.0)
}

pub fn role_mention(role_id: serenity::RoleId) -> String {
    format!("<@&{}>", role_id)
}
