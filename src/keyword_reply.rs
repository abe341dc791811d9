//! Keyword auto-replies for inbound messages.

use std::sync::Arc;

use log::{debug, info};
use poise::serenity_prelude::{Context, GuildId, Message as SerenityMessage, MessageId};

use crate::{
    bot::Data,
    error::{BotError, Result},
    matcher::match_reply_blocking,
    retraction::SentMessage,
};

/// Reply to a message that matches a registered keyword.
///
/// Replies sent in a guild are scheduled for deletion. Returns `true` if a
/// reply was sent, `false` otherwise.
pub async fn handle_keyword_reply(
    ctx: &Context,
    new_message: &SerenityMessage,
    data: &Data,
) -> Result<bool> {
    if new_message.author.bot || new_message.content.starts_with(data.command_prefix()) {
        return Ok(false);
    }

    let snapshot = data.store().read().await.snapshot();
    let Some(reply) = match_reply_blocking(new_message.content.clone(), snapshot).await else {
        return Ok(false);
    };
    debug!(
        "Keyword match for '{}' in channel {}",
        new_message.content, new_message.channel_id
    );

    let sent = new_message.channel_id.say(&ctx.http, &reply).await?;
    info!(
        "Sent keyword reply to {} in channel {}: {}",
        new_message.author.tag(),
        new_message.channel_id,
        reply
    );

    let group_id = new_message.guild_id.map(GuildId::get);
    let self_id = ctx.cache.current_user().id.get();
    debug!("Keyword reply group context: {group_id:?}");

    let http = Arc::clone(&ctx.http);
    let channel_id = new_message.channel_id;
    data.retraction().schedule(
        SentMessage::new(sent.id.get()),
        group_id,
        self_id,
        move |message_id, _self_id| async move {
            channel_id
                .delete_message(&http, MessageId::new(message_id))
                .await
                .map_err(BotError::from)
        },
    );

    Ok(true)
}
