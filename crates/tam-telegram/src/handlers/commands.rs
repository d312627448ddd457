use tam_core::{formatting, index, utils::AuditEvent, Result};

use crate::screens;

use super::Ctx;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub(super) async fn handle_command(ctx: &Ctx, text: &str, first_name: &str) -> Result<()> {
    let (cmd, _args) = parse_command(text);
    let state = &ctx.state;
    let owner = ctx.user_id;

    // Commands always leave any pending dialogue.
    let previous = state.dialogues.take(owner).await;

    match cmd.as_str() {
        "start" => {
            ctx.audit(AuditEvent::auth(owner, ctx.username.as_deref(), true));
            ctx.send(screens::welcome(first_name, ctx.is_admin())).await?;
        }

        "help" => {
            ctx.send(screens::help()).await?;
        }

        "menu" => {
            ctx.send(screens::main_menu(ctx.is_admin())).await?;
        }

        "stats" => {
            let stats = index::stats_for(state.accounts.store(), owner)?;
            ctx.send(screens::stats(formatting::stats_html(&stats)))
                .await?;
        }

        "accounts" => {
            let screen = screens::countries(
                state.accounts.store(),
                owner,
                0,
                state.cfg.countries_per_page,
            )?;
            ctx.send(screen).await?;
        }

        "export" => {
            ctx.send(screens::export_menu()).await?;
        }

        "proxy" => {
            let list = state.proxies.list(owner)?;
            ctx.send(screens::proxies(&list)).await?;
        }

        "cancel" => {
            let html = if previous.is_idle() {
                "Nothing to cancel."
            } else {
                "❌ Cancelled."
            };
            ctx.send_html(html).await?;
            ctx.send(screens::main_menu(ctx.is_admin())).await?;
        }

        "admin" => {
            if ctx.is_admin() {
                ctx.send(screens::admin_panel()).await?;
            } else {
                ctx.send_html("🛡 This command is for administrators only.")
                    .await?;
            }
        }

        _ => {
            let msg = format!(
                "Unknown command: /{}\nUse /help to see what I can do.",
                formatting::escape_html(&cmd)
            );
            ctx.send_html(&msg).await?;
        }
    }

    if !previous.is_idle() && cmd != "cancel" {
        tracing::debug!(user_id = owner.0, ?previous, "dialogue abandoned by command");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tam_core::domain::{ChatId, UserId};

    use super::*;
    use crate::dialogue::DialogueState;
    use crate::router::tests::{harness, Sent, ADMIN, USER};

    fn ctx(h: &crate::router::tests::Harness, user: i64) -> Ctx {
        Ctx {
            state: h.state.clone(),
            chat_id: ChatId(user),
            user_id: UserId(user),
            username: None,
        }
    }

    #[test]
    fn parses_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/Stats@my_bot extra words"),
            ("stats".to_string(), "extra words".to_string())
        );
        assert_eq!(parse_command("/menu"), ("menu".to_string(), String::new()));
    }

    #[tokio::test]
    async fn start_greets_by_name() {
        let h = harness("tam-cmd-start");
        handle_command(&ctx(&h, USER), "/start", "Ana <3").await.unwrap();
        match &h.messenger.take()[0] {
            Sent::Keyboard(html, kb) => {
                assert!(html.contains("Welcome, Ana &lt;3!"));
                assert!(!kb.buttons().any(|b| b.callback_data == "admin"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_resets_dialogue() {
        let h = harness("tam-cmd-cancel");
        h.state
            .dialogues
            .set(UserId(USER), DialogueState::AwaitingProxy)
            .await;
        handle_command(&ctx(&h, USER), "/cancel", "x").await.unwrap();
        assert!(h.state.dialogues.get(UserId(USER)).await.is_idle());
        assert_eq!(h.messenger.take()[0], Sent::Html("❌ Cancelled.".to_string()));
    }

    #[tokio::test]
    async fn admin_command_requires_admin() {
        let h = harness("tam-cmd-admin");
        handle_command(&ctx(&h, USER), "/admin", "x").await.unwrap();
        assert!(matches!(&h.messenger.take()[0], Sent::Html(s) if s.contains("administrators only")));

        handle_command(&ctx(&h, ADMIN), "/admin", "x").await.unwrap();
        assert!(matches!(&h.messenger.take()[0], Sent::Keyboard(s, _) if s.contains("Admin Panel")));
    }

    #[tokio::test]
    async fn unknown_command_is_escaped() {
        let h = harness("tam-cmd-unknown");
        handle_command(&ctx(&h, USER), "/<b>", "x").await.unwrap();
        assert!(matches!(&h.messenger.take()[0], Sent::Html(s) if s.contains("/&lt;b&gt;")));
    }
}
