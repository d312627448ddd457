use tam_core::{
    errors::Error,
    export::ExportFormat,
    formatting,
    messaging::types::ChatAction,
    utils::AuditEvent,
    Result,
};

use super::Ctx;

const NO_SESSION_FILES: &str = "📭 None of your accounts has a session file yet.\n\
     Send <code>.session</code> files as documents first.";

/// Build the archive for the user's live accounts and send it as a document.
/// `limit == 0` exports everything.
pub(super) async fn run_export(
    ctx: &Ctx,
    format: ExportFormat,
    manifest: bool,
    limit: usize,
) -> Result<()> {
    let state = &ctx.state;
    let refs = state.accounts.session_refs(ctx.user_id, None, None)?;
    if refs.is_empty() {
        if state.accounts.store().list(ctx.user_id, true)?.is_empty() {
            ctx.send_html("📭 You have no accounts to export.").await?;
        } else {
            ctx.send_html(NO_SESSION_FILES).await?;
        }
        return Ok(());
    }

    let _ = state
        .messenger
        .send_chat_action(ctx.chat_id, ChatAction::UploadDocument)
        .await;

    let exporter = state.exporter.clone();
    let limit = (limit > 0).then_some(limit);
    let outcome = tokio::task::spawn_blocking(move || {
        exporter.export(&refs, format, limit, manifest)
    })
    .await
    .map_err(|e| Error::External(format!("export task failed: {e}")))??;

    if outcome.exported.is_empty() {
        let _ = std::fs::remove_file(&outcome.archive_path);
        ctx.send_html(NO_SESSION_FILES).await?;
        return Ok(());
    }

    tracing::info!(
        user_id = ctx.user_id.0,
        format = %format,
        count = outcome.exported.len(),
        skipped = outcome.skipped,
        archive = %outcome.archive_path.display(),
        "export ready to send"
    );
    ctx.audit(AuditEvent::export(
        ctx.user_id,
        format.as_str(),
        outcome.exported.len(),
        &outcome.archive_path,
    ));

    let caption = formatting::export_done_caption(format, &outcome);
    let sent = state
        .messenger
        .send_document(ctx.chat_id, &outcome.archive_path, Some(&caption))
        .await;

    // Archives are one-shot; keep the exports dir from growing.
    if let Err(e) = std::fs::remove_file(&outcome.archive_path) {
        tracing::warn!(archive = %outcome.archive_path.display(), error = %e, "failed to remove archive");
    }
    sent.map(|_| ())
}
