pub mod general;
pub mod meme;
pub mod roles;

use crate::{Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        general::hello(),
        general::ping(),
        meme::meme(),
        roles::give_role(),
        roles::create_role(),
    ]
}
