use tam_core::{
    dates, formatting,
    domain::MessageRef,
    index,
    messaging::types::ChatAction,
};

use crate::actions::CallbackAction;
use crate::dialogue::DialogueState;
use crate::screens;

use super::{admin, export, Ctx};

/// Toast shown when answering the callback query.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct Answer {
    pub text: Option<String>,
    pub alert: bool,
}

impl Answer {
    fn toast(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            alert: false,
        }
    }

    fn alert(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            alert: true,
        }
    }
}

/// Run `action` and always answer the callback query, even on failure.
pub(super) async fn handle_action(
    ctx: &Ctx,
    callback_id: &str,
    action: CallbackAction,
    origin: Option<MessageRef>,
) {
    let messenger = ctx.state.messenger.clone();
    let answer = if action.requires_admin() && !ctx.is_admin() {
        Answer::alert("🛡 Admins only")
    } else {
        match dispatch(ctx, action, origin).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(user_id = ctx.user_id.0, error = %e, "callback failed");
                ctx.audit(tam_core::utils::AuditEvent::error(
                    ctx.user_id,
                    &e.to_string(),
                    Some("callback"),
                ));
                Answer::alert(format!("❌ {}", e.user_message()))
            }
        }
    };
    let _ = messenger
        .answer_callback_query(callback_id, answer.text.as_deref(), answer.alert)
        .await;
}

pub(super) async fn dispatch(
    ctx: &Ctx,
    action: CallbackAction,
    origin: Option<MessageRef>,
) -> tam_core::Result<Answer> {
    let state = &ctx.state;
    let cfg = &state.cfg;
    let owner = ctx.user_id;

    // Any button press abandons a half-finished text dialogue, except the
    // ones that start or continue one.
    let keeps_dialogue = matches!(
        action,
        CallbackAction::Noop | CallbackAction::ExportFormat { .. }
    );
    if !keeps_dialogue {
        state.dialogues.take(owner).await;
    }

    match action {
        CallbackAction::Noop => {}

        CallbackAction::Menu => ctx.show(origin, screens::main_menu(ctx.is_admin())).await?,

        CallbackAction::Help => ctx.show(origin, screens::help()).await?,

        CallbackAction::Cancel => {
            ctx.show(origin, screens::main_menu(ctx.is_admin())).await?;
            return Ok(Answer::toast("Cancelled"));
        }

        CallbackAction::Stats => {
            let stats = index::stats_for(state.accounts.store(), owner)?;
            ctx.show(origin, screens::stats(formatting::stats_html(&stats)))
                .await?;
        }

        CallbackAction::AddAccount => {
            state
                .dialogues
                .set(owner, DialogueState::AwaitingPhone)
                .await;
            ctx.show(origin, screens::prompt(formatting::phone_prompt_html()))
                .await?;
        }

        CallbackAction::Countries { page } => {
            let screen =
                screens::countries(state.accounts.store(), owner, page, cfg.countries_per_page)?;
            ctx.show(origin, screen).await?;
        }

        CallbackAction::Country { country_code, page } => {
            let screen = screens::dates(
                state.accounts.store(),
                owner,
                &country_code,
                page,
                cfg.dates_per_page,
            )?;
            ctx.show(origin, screen).await?;
        }

        CallbackAction::Date {
            country_code,
            key,
            page,
        } => {
            let screen = screens::accounts(
                state.accounts.store(),
                owner,
                &country_code,
                &key,
                page,
                cfg.accounts_per_page,
            )?;
            ctx.show(origin, screen).await?;
        }

        CallbackAction::Account(id) => {
            let account = state.accounts.get_active(owner, id)?;
            ctx.show(origin, screens::account_detail(&account, &dates::today_utc()))
                .await?;
        }

        CallbackAction::CopyPhone(id) => {
            let account = state.accounts.get_active(owner, id)?;
            ctx.send_html(&format!(
                "<code>{}</code>",
                formatting::escape_html(&account.phone)
            ))
            .await?;
            return Ok(Answer::toast("📋 Phone sent, tap it to copy"));
        }

        CallbackAction::Forwarded(id) => {
            state.accounts.record_forward(owner, id)?;
            let account = state.accounts.get_active(owner, id)?;
            ctx.show(origin, screens::account_detail(&account, &dates::today_utc()))
                .await?;
            return Ok(Answer::toast(format!(
                "📤 Forwards: {}",
                account.forward_count
            )));
        }

        CallbackAction::Delete(id) => {
            let account = state.accounts.get_active(owner, id)?;
            ctx.show(origin, screens::confirm_delete(&account)).await?;
        }

        CallbackAction::ConfirmDelete(id) => {
            let account = state.accounts.delete(owner, id)?;
            // Back to the date list, which may now be empty.
            let screen = screens::accounts(
                state.accounts.store(),
                owner,
                &account.country_code,
                &account.date_key(),
                0,
                cfg.accounts_per_page,
            )?;
            ctx.show(origin, screen).await?;
            return Ok(Answer::toast(format!("🗑 {} deleted", account.phone)));
        }

        CallbackAction::ExportMenu => ctx.show(origin, screens::export_menu()).await?,

        CallbackAction::ExportFormat { format, manifest } => {
            let available = state.accounts.store().list(owner, true)?.len();
            state
                .dialogues
                .set(owner, DialogueState::AwaitingExportCount { format, manifest })
                .await;
            ctx.show(origin, screens::export_options(format, manifest, available))
                .await?;
        }

        CallbackAction::ExportRun {
            format,
            manifest,
            limit,
        } => {
            export::run_export(ctx, format, manifest, limit).await?;
            return Ok(Answer::toast("📦 Export finished"));
        }

        CallbackAction::ProxyMenu => {
            let list = state.proxies.list(owner)?;
            ctx.show(origin, screens::proxies(&list)).await?;
        }

        CallbackAction::ProxyAdd => {
            state
                .dialogues
                .set(owner, DialogueState::AwaitingProxy)
                .await;
            ctx.show(origin, screens::prompt(formatting::proxy_prompt_html()))
                .await?;
        }

        CallbackAction::Proxy(id) => {
            let proxy = state.proxies.get(owner, id)?;
            ctx.show(origin, screens::proxy_detail(&proxy)).await?;
        }

        CallbackAction::ProxyTest(id) => {
            let _ = state
                .messenger
                .send_chat_action(ctx.chat_id, ChatAction::Typing)
                .await;
            return Ok(match state.proxies.test(owner, id).await {
                Ok(latency) => {
                    Answer::alert(format!("✅ Proxy works ({} ms)", latency.as_millis()))
                }
                Err(e) => Answer::alert(format!("❌ Proxy test failed: {e}")),
            });
        }

        CallbackAction::ProxyDelete(id) => {
            let proxy = state.proxies.get(owner, id)?;
            ctx.show(origin, screens::confirm_proxy_delete(&proxy))
                .await?;
        }

        CallbackAction::ProxyDeleteConfirm(id) => {
            state.proxies.delete(owner, id)?;
            let list = state.proxies.list(owner)?;
            ctx.show(origin, screens::proxies(&list)).await?;
            return Ok(Answer::toast("🗑 Proxy deleted"));
        }

        CallbackAction::Admin => ctx.show(origin, screens::admin_panel()).await?,

        CallbackAction::AdminWhitelist => {
            ctx.show(origin, admin::whitelist_screen(ctx)?).await?;
        }

        CallbackAction::WhitelistAdd => {
            state
                .dialogues
                .set(owner, DialogueState::AwaitingWhitelistAdd)
                .await;
            ctx.show(
                origin,
                screens::prompt("➕ Send the Telegram user ID to whitelist."),
            )
            .await?;
        }

        CallbackAction::WhitelistRemove => {
            state
                .dialogues
                .set(owner, DialogueState::AwaitingWhitelistRemove)
                .await;
            ctx.show(
                origin,
                screens::prompt("➖ Send the Telegram user ID to remove."),
            )
            .await?;
        }

        CallbackAction::AdminStats => {
            ctx.show(origin, admin::global_stats_screen(ctx)?).await?;
        }
    }

    Ok(Answer::default())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tam_core::{
        domain::{ChatId, UserId},
        proxy::ProxyScheme,
    };

    use super::*;
    use crate::router::tests::{harness, Harness, Sent, ADMIN, USER};

    fn ctx(h: &Harness, user: i64) -> Ctx {
        Ctx {
            state: h.state.clone(),
            chat_id: ChatId(user),
            user_id: UserId(user),
            username: Some("tester".to_string()),
        }
    }

    fn origin() -> Option<MessageRef> {
        Some(MessageRef {
            chat_id: ChatId(1),
            message_id: tam_core::domain::MessageId(1),
        })
    }

    fn last_edit(h: &Harness) -> String {
        match h.messenger.take().pop() {
            Some(Sent::EditKeyboard(html, _)) => html,
            other => panic!("expected an edited screen, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn browse_and_delete_account() {
        let h = harness("tam-cb-browse");
        let c = ctx(&h, USER);
        let account = h
            .state
            .accounts
            .add(UserId(USER), "+989123456789")
            .unwrap();

        dispatch(&c, CallbackAction::Countries { page: 0 }, origin())
            .await
            .unwrap();
        assert!(last_edit(&h).contains("<b>1</b> account(s)"));

        dispatch(&c, CallbackAction::Account(account.id), origin())
            .await
            .unwrap();
        assert!(last_edit(&h).contains("+989123456789"));

        let answer = dispatch(&c, CallbackAction::ConfirmDelete(account.id), origin())
            .await
            .unwrap();
        assert!(answer.text.unwrap().contains("deleted"));
        assert!(last_edit(&h).contains("No accounts for this date"));

        // Deleted accounts are gone from every view.
        let err = dispatch(&c, CallbackAction::Account(account.id), origin())
            .await
            .unwrap_err();
        assert!(matches!(err, tam_core::Error::NotFound(_)));
    }

    #[tokio::test]
    async fn forwarded_button_counts_login_codes() {
        let h = harness("tam-cb-forward");
        let c = ctx(&h, USER);
        let account = h
            .state
            .accounts
            .add(UserId(USER), "+989123456789")
            .unwrap();

        for expected in 1..=2 {
            let answer = dispatch(&c, CallbackAction::Forwarded(account.id), origin())
                .await
                .unwrap();
            assert_eq!(answer.text, Some(format!("📤 Forwards: {expected}")));
        }
        assert!(last_edit(&h).contains("Login Code Forwards:</b> 2"));
        let stored = h.state.accounts.get(UserId(USER), account.id).unwrap();
        assert_eq!(stored.forward_count, 2);

        let other = ctx(&h, ADMIN);
        let err = dispatch(&other, CallbackAction::Forwarded(account.id), origin())
            .await
            .unwrap_err();
        assert!(matches!(err, tam_core::Error::NotFound(_)));
        assert_eq!(
            h.state.accounts.get(UserId(USER), account.id).unwrap().forward_count,
            2
        );
    }

    #[tokio::test]
    async fn accounts_are_owner_scoped() {
        let h = harness("tam-cb-owner");
        let account = h
            .state
            .accounts
            .add(UserId(ADMIN), "+447911123456")
            .unwrap();
        let c = ctx(&h, USER);
        assert!(dispatch(&c, CallbackAction::Delete(account.id), origin())
            .await
            .is_err());
        assert!(dispatch(&c, CallbackAction::ConfirmDelete(account.id), origin())
            .await
            .is_err());
        assert!(h
            .state
            .accounts
            .get_active(UserId(ADMIN), account.id)
            .is_ok());
    }

    #[tokio::test]
    async fn add_account_starts_dialogue_and_cancel_clears_it() {
        let h = harness("tam-cb-dialogue");
        let c = ctx(&h, USER);

        dispatch(&c, CallbackAction::AddAccount, origin())
            .await
            .unwrap();
        assert_eq!(
            h.state.dialogues.get(UserId(USER)).await,
            DialogueState::AwaitingPhone
        );

        let answer = dispatch(&c, CallbackAction::Cancel, origin()).await.unwrap();
        assert_eq!(answer.text.as_deref(), Some("Cancelled"));
        assert!(h.state.dialogues.get(UserId(USER)).await.is_idle());
    }

    #[tokio::test]
    async fn admin_actions_are_gated() {
        let h = harness("tam-cb-admin");

        handle_action(&ctx(&h, USER), "cb", CallbackAction::AdminStats, origin()).await;
        assert_eq!(
            h.messenger.take(),
            vec![Sent::Answer(Some("🛡 Admins only".to_string()), true)]
        );

        handle_action(&ctx(&h, ADMIN), "cb", CallbackAction::AdminStats, origin()).await;
        let sent = h.messenger.take();
        assert!(matches!(&sent[0], Sent::EditKeyboard(html, _) if html.contains("Global Statistics")));
        assert_eq!(sent[1], Sent::Answer(None, false));
    }

    #[tokio::test]
    async fn failures_are_answered_with_an_alert() {
        let h = harness("tam-cb-fail");
        handle_action(
            &ctx(&h, USER),
            "cb",
            CallbackAction::Account(tam_core::domain::AccountId(42)),
            origin(),
        )
        .await;
        match h.messenger.take().pop() {
            Some(Sent::Answer(Some(text), true)) => assert!(text.contains("not found")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn proxy_delete_flow() {
        let h = harness("tam-cb-proxy");
        let c = ctx(&h, USER);
        let proxy = h
            .state
            .proxies
            .add_from_input(UserId(USER), "home\n10.0.0.1:1080")
            .unwrap();
        assert_eq!(proxy.descriptor.scheme, ProxyScheme::Socks5);

        dispatch(&c, CallbackAction::ProxyMenu, origin())
            .await
            .unwrap();
        assert!(last_edit(&h).contains("<b>1</b> proxy(ies)"));

        dispatch(&c, CallbackAction::ProxyDeleteConfirm(proxy.id), origin())
            .await
            .unwrap();
        assert!(last_edit(&h).contains("no proxies yet"));
    }

    #[tokio::test]
    async fn socks4_proxy_test_reports_failure() {
        let h = harness("tam-cb-ptest");
        let c = ctx(&h, USER);
        let proxy = h
            .state
            .proxies
            .add_from_input(UserId(USER), "socks4://10.0.0.1:1080")
            .unwrap();
        let answer = tokio::time::timeout(
            Duration::from_secs(5),
            dispatch(&c, CallbackAction::ProxyTest(proxy.id), origin()),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(answer.alert);
        assert!(answer.text.unwrap().starts_with("❌"));
        assert_eq!(h.messenger.take(), vec![Sent::Action(ChatAction::Typing)]);
    }
}
