use tam_core::{errors::Error, formatting, phone, Result};

use crate::dialogue::DialogueState;
use crate::screens;

use super::{admin, export, Ctx};

const CONFIRM_WORDS: &[&str] = &["yes", "y", "ok", "confirm", "✅"];

/// Free text is only meaningful inside a dialogue step.
pub(super) async fn handle_text(ctx: &Ctx, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }

    let state = &ctx.state;
    let owner = ctx.user_id;

    match state.dialogues.take(owner).await {
        DialogueState::Idle => {
            ctx.send(screens::main_menu(ctx.is_admin())).await?;
        }

        DialogueState::AwaitingPhone => classify_phone(ctx, text).await?,

        DialogueState::AwaitingPhoneConfirm { phone } => {
            if CONFIRM_WORDS.contains(&text.to_lowercase().as_str()) {
                let account = state.accounts.add(owner, &phone)?;
                ctx.send_html(&formatting::account_added_html(&account))
                    .await?;
                ctx.send(screens::main_menu(ctx.is_admin())).await?;
            } else {
                // Anything else is taken as a corrected number.
                classify_phone(ctx, text).await?;
            }
        }

        DialogueState::AwaitingProxy => match state.proxies.add_from_input(owner, text) {
            Ok(proxy) => {
                ctx.send_html("✅ Proxy added.").await?;
                ctx.send(screens::proxy_detail(&proxy)).await?;
            }
            Err(e @ (Error::InvalidFormat(_) | Error::Validation(_))) => {
                state
                    .dialogues
                    .set(owner, DialogueState::AwaitingProxy)
                    .await;
                ctx.send(screens::prompt(format!(
                    "❌ {}\n\n{}",
                    formatting::escape_html(&e.user_message()),
                    formatting::proxy_prompt_html()
                )))
                .await?;
            }
            Err(e) => return Err(e),
        },

        DialogueState::AwaitingExportCount { format, manifest } => {
            match text.parse::<usize>() {
                Ok(limit) => export::run_export(ctx, format, manifest, limit).await?,
                Err(_) => {
                    state
                        .dialogues
                        .set(owner, DialogueState::AwaitingExportCount { format, manifest })
                        .await;
                    ctx.send_html("❌ Please send a whole number, or <b>0</b> for all.")
                        .await?;
                }
            }
        }

        DialogueState::AwaitingWhitelistAdd => {
            if let Err(e) = admin::add_user(ctx, text).await {
                state
                    .dialogues
                    .set(owner, DialogueState::AwaitingWhitelistAdd)
                    .await;
                return Err(e);
            }
        }

        DialogueState::AwaitingWhitelistRemove => {
            if let Err(e) = admin::remove_user(ctx, text).await {
                state
                    .dialogues
                    .set(owner, DialogueState::AwaitingWhitelistRemove)
                    .await;
                return Err(e);
            }
        }
    }
    Ok(())
}

async fn classify_phone(ctx: &Ctx, raw: &str) -> Result<()> {
    let c = phone::classify(raw);
    if !c.ok {
        ctx.state
            .dialogues
            .set(ctx.user_id, DialogueState::AwaitingPhone)
            .await;
        let reason = c.detail.as_deref().unwrap_or("Unrecognized phone number.");
        ctx.send(screens::prompt(formatting::invalid_phone_html(reason)))
            .await?;
        return Ok(());
    }

    ctx.state
        .dialogues
        .set(
            ctx.user_id,
            DialogueState::AwaitingPhoneConfirm {
                phone: c.canonical_number.clone(),
            },
        )
        .await;
    ctx.send(screens::prompt(formatting::phone_confirm_html(&c)))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tam_core::{
        domain::{ChatId, UserId},
        export::ExportFormat,
        store::AccountStore,
    };

    use super::*;
    use crate::router::tests::{harness, Harness, Sent, USER};

    fn ctx(h: &Harness) -> Ctx {
        Ctx {
            state: h.state.clone(),
            chat_id: ChatId(USER),
            user_id: UserId(USER),
            username: None,
        }
    }

    #[tokio::test]
    async fn add_account_dialogue() {
        let h = harness("tam-text-phone");
        let c = ctx(&h);
        h.state
            .dialogues
            .set(UserId(USER), DialogueState::AwaitingPhone)
            .await;

        handle_text(&c, "not a phone").await.unwrap();
        assert_eq!(
            h.state.dialogues.get(UserId(USER)).await,
            DialogueState::AwaitingPhone
        );
        assert!(matches!(&h.messenger.take()[0], Sent::Keyboard(s, _) if s.contains("Invalid Phone Number")));

        handle_text(&c, "+98 912 345 6789").await.unwrap();
        assert_eq!(
            h.state.dialogues.get(UserId(USER)).await,
            DialogueState::AwaitingPhoneConfirm {
                phone: "+989123456789".to_string()
            }
        );
        assert!(matches!(&h.messenger.take()[0], Sent::Keyboard(s, _) if s.contains("Iran")));

        handle_text(&c, "YES").await.unwrap();
        assert!(h.state.dialogues.get(UserId(USER)).await.is_idle());
        let accounts = h.state.store.list(UserId(USER), true).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].country_code, "IR");
        assert!(matches!(&h.messenger.take()[0], Sent::Html(s) if s.contains("Account Added")));
    }

    #[tokio::test]
    async fn corrected_number_replaces_pending_one() {
        let h = harness("tam-text-correct");
        let c = ctx(&h);
        h.state
            .dialogues
            .set(
                UserId(USER),
                DialogueState::AwaitingPhoneConfirm {
                    phone: "+989123456789".to_string(),
                },
            )
            .await;
        handle_text(&c, "+447911123456").await.unwrap();
        assert_eq!(
            h.state.dialogues.get(UserId(USER)).await,
            DialogueState::AwaitingPhoneConfirm {
                phone: "+447911123456".to_string()
            }
        );
        assert!(h.state.store.list(UserId(USER), true).unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_proxy_keeps_prompting() {
        let h = harness("tam-text-proxy");
        let c = ctx(&h);
        h.state
            .dialogues
            .set(UserId(USER), DialogueState::AwaitingProxy)
            .await;

        handle_text(&c, "garbage").await.unwrap();
        assert_eq!(
            h.state.dialogues.get(UserId(USER)).await,
            DialogueState::AwaitingProxy
        );

        handle_text(&c, "user:pass@10.0.0.1:1080").await.unwrap();
        assert!(h.state.dialogues.get(UserId(USER)).await.is_idle());
        let proxies = h.state.proxies.list(UserId(USER)).unwrap();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].descriptor.username.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn export_count_must_be_numeric() {
        let h = harness("tam-text-export");
        let c = ctx(&h);
        let waiting = DialogueState::AwaitingExportCount {
            format: ExportFormat::Telethon,
            manifest: false,
        };
        h.state.dialogues.set(UserId(USER), waiting.clone()).await;

        handle_text(&c, "lots").await.unwrap();
        assert_eq!(h.state.dialogues.get(UserId(USER)).await, waiting);

        handle_text(&c, "3").await.unwrap();
        assert!(h.state.dialogues.get(UserId(USER)).await.is_idle());
        assert!(matches!(h.messenger.take().last(), Some(Sent::Html(s)) if s.contains("no accounts")));
    }

    #[tokio::test]
    async fn idle_text_shows_menu() {
        let h = harness("tam-text-idle");
        handle_text(&ctx(&h), "hello").await.unwrap();
        assert!(matches!(&h.messenger.take()[0], Sent::Keyboard(s, _) if s.contains("Main Menu")));
    }
}
