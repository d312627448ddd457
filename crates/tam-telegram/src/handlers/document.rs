use teloxide::{net::Download, prelude::*, types::Document};

use tam_core::{
    errors::Error,
    formatting::{self, escape_html},
    sessions::SESSION_EXTENSION,
    Result,
};

use super::Ctx;

/// Session databases are small; anything larger is not one.
const MAX_FILE_SIZE: u32 = 10 * 1024 * 1024; // 10MB

fn is_session_file(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SESSION_EXTENSION))
}

pub(super) async fn handle_document(bot: &Bot, ctx: &Ctx, doc: &Document) -> Result<()> {
    let Some(file_name) = doc.file_name.as_deref().filter(|n| is_session_file(n)) else {
        ctx.send_html("❌ Only <code>.session</code> files are accepted.")
            .await?;
        return Ok(());
    };
    if doc.file.size > MAX_FILE_SIZE {
        ctx.send_html("❌ File too large (max 10MB).").await?;
        return Ok(());
    }

    let bytes = download(bot, doc)
        .await
        .map_err(|e| Error::External(format!("download failed: {e}")))?;
    accept_session(ctx, file_name, &bytes).await
}

async fn download(bot: &Bot, doc: &Document) -> anyhow::Result<Vec<u8>> {
    let file = bot.get_file(doc.file.id.clone()).await?;
    let mut dst: Vec<u8> = Vec::with_capacity(file.size as usize);
    bot.download_file(&file.path, &mut dst).await?;
    Ok(dst)
}

/// Attach an uploaded session to the account named by the file stem.
pub(super) async fn accept_session(ctx: &Ctx, file_name: &str, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        ctx.send_html("❌ The file is empty.").await?;
        return Ok(());
    }

    match ctx.state.accounts.attach_session(ctx.user_id, file_name, bytes) {
        Ok(account) => {
            tracing::info!(
                user_id = ctx.user_id.0,
                account_id = account.id.0,
                file_name,
                "session attached"
            );
            ctx.send_html(&format!(
                "💾 Session saved for <code>{}</code>.",
                escape_html(&account.phone)
            ))
            .await?;
        }
        Err(e @ (Error::NotFound(_) | Error::Validation(_))) => {
            ctx.send_html(&format!(
                "❌ {}\n\nName the file after the account's phone number, \
                 e.g. <code>989123456789.session</code>, and add the account first.",
                formatting::escape_html(&e.user_message())
            ))
            .await?;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
