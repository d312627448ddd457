//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - checks the whitelist and the per-user rate limit
//! - serializes work per chat
//! - calls into `tam-core` services and renders the result as a screen
//!
//! Everything below the teloxide entry points talks to the `MessagingPort`
//! only, so flows are exercised in tests with a fake messenger.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use tam_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    formatting,
    utils::AuditEvent,
    Result,
};

use crate::actions::CallbackAction;
use crate::router::AppState;
use crate::screens::Screen;

mod admin;
mod callback;
mod commands;
mod document;
mod export;
mod text;

/// Who is talking to the bot and where to reply.
#[derive(Clone)]
pub(crate) struct Ctx {
    pub state: Arc<AppState>,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
}

impl Ctx {
    pub fn is_admin(&self) -> bool {
        self.state.whitelist.is_admin(Some(self.user_id))
    }

    /// Send `html`, split on line boundaries when it exceeds the configured
    /// message size. Returns the last message sent.
    pub async fn send_html(&self, html: &str) -> Result<MessageRef> {
        let limit = self.state.cfg.telegram_safe_limit;
        if html.len() <= limit {
            return self.state.messenger.send_html(self.chat_id, html).await;
        }
        let mut last = None;
        for chunk in formatting::split_lines(html, limit) {
            last = Some(self.state.messenger.send_html(self.chat_id, &chunk).await?);
        }
        last.ok_or_else(|| tam_core::Error::Validation("empty message".to_string()))
    }

    pub async fn send(&self, screen: Screen) -> Result<MessageRef> {
        self.state
            .messenger
            .send_inline_keyboard(self.chat_id, &screen.html, screen.keyboard)
            .await
    }

    /// Edit `origin` in place when there is one, otherwise send a new message.
    pub async fn show(&self, origin: Option<MessageRef>, screen: Screen) -> Result<()> {
        match origin {
            Some(msg) => {
                self.state
                    .messenger
                    .edit_inline_keyboard(msg, &screen.html, screen.keyboard)
                    .await
            }
            None => self.send(screen).await.map(|_| ()),
        }
    }

    pub fn audit(&self, event: AuditEvent) {
        self.state
            .audit
            .record(event.with_username(self.username.as_deref()));
    }

    /// Log the failure and tell the user something they can act on.
    pub async fn report(&self, err: &tam_core::Error, context: &str) {
        tracing::warn!(user_id = self.user_id.0, context, error = %err, "handler failed");
        self.audit(AuditEvent::error(self.user_id, &err.to_string(), Some(context)));
        let html = format!("❌ {}", formatting::escape_html(&err.user_message()));
        let _ = self.send_html(&html).await;
    }
}

enum Access {
    Granted,
    Denied,
    RateLimited(f64),
}

async fn check_access(state: &AppState, user_id: UserId, username: Option<&str>) -> Access {
    if !state.whitelist.is_allowed(Some(user_id)) {
        tracing::info!(user_id = user_id.0, "unauthorized access attempt");
        state
            .audit
            .record(AuditEvent::auth(user_id, username, false));
        return Access::Denied;
    }

    let mut rl = state.rate_limiter.lock().await;
    let (ok, retry_after) = rl.check(user_id);
    if !ok {
        let retry = retry_after.unwrap_or_default().as_secs_f64();
        state
            .audit
            .record(AuditEvent::rate_limit(user_id, retry).with_username(username));
        return Access::RateLimited(retry);
    }
    Access::Granted
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let ctx = Ctx {
        state: state.clone(),
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(user.id.0 as i64),
        username: user.username.clone(),
    };

    match check_access(&state, ctx.user_id, ctx.username.as_deref()).await {
        Access::Granted => {}
        Access::Denied => {
            let _ = ctx.send_html(&formatting::access_denied_html()).await;
            return Ok(());
        }
        Access::RateLimited(retry) => {
            let _ = ctx
                .send_html(&format!("⏳ Rate limited. Please wait {retry:.1} seconds."))
                .await;
            return Ok(());
        }
    }

    // Sequentialize per chat so dialogue steps apply in order.
    let _guard = state.chat_locks.lock_chat(ctx.chat_id.0).await;

    let result = if let Some(doc) = msg.document() {
        document::handle_document(&bot, &ctx, doc).await
    } else if let Some(text) = msg.text() {
        if text.starts_with('/') {
            commands::handle_command(&ctx, text, &user.first_name).await
        } else {
            text::handle_text(&ctx, text).await
        }
    } else {
        ctx.send_html("Please use the menu buttons, or send a <code>.session</code> file.")
            .await
            .map(|_| ())
    };

    if let Err(e) = result {
        ctx.report(&e, "message").await;
    }
    Ok(())
}

pub async fn handle_callback(
    _bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let cb_id = q.id.clone();
    let messenger = state.messenger.clone();
    let data = q.data.clone().unwrap_or_default();

    // Callbacks from inline messages carry no chat; nothing to edit.
    let Some(message) = q.message.as_ref() else {
        let _ = messenger.answer_callback_query(&cb_id, None, false).await;
        return Ok(());
    };
    let origin = MessageRef {
        chat_id: ChatId(message.chat.id.0),
        message_id: MessageId(message.id.0),
    };
    let ctx = Ctx {
        state: state.clone(),
        chat_id: origin.chat_id,
        user_id: UserId(q.from.id.0 as i64),
        username: q.from.username.clone(),
    };

    match check_access(&state, ctx.user_id, ctx.username.as_deref()).await {
        Access::Granted => {}
        Access::Denied => {
            let _ = messenger
                .answer_callback_query(&cb_id, Some("❌ Access denied"), true)
                .await;
            return Ok(());
        }
        Access::RateLimited(retry) => {
            let text = format!("⏳ Rate limited. Please wait {retry:.1} seconds.");
            let _ = messenger
                .answer_callback_query(&cb_id, Some(&text), false)
                .await;
            return Ok(());
        }
    }

    let Some(action) = CallbackAction::parse(&data) else {
        tracing::debug!(data = %data, "unknown callback data");
        let _ = messenger
            .answer_callback_query(&cb_id, Some("Unknown action"), false)
            .await;
        return Ok(());
    };

    let _guard = state.chat_locks.lock_chat(ctx.chat_id.0).await;
    callback::handle_action(&ctx, &cb_id, action, Some(origin)).await;
    Ok(())
}
