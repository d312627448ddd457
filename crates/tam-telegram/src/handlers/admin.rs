//! Whitelist management and global statistics for administrators.

use std::collections::BTreeSet;

use chrono::Utc;

use tam_core::{
    domain::UserId,
    errors::Error,
    formatting, index,
    store::{WhitelistEntry, WhitelistStore},
    utils::AuditEvent,
    Result,
};

use crate::screens::{self, Screen};

use super::Ctx;

pub(super) fn whitelist_screen(ctx: &Ctx) -> Result<Screen> {
    let wl = &ctx.state.whitelist;
    let entries = ctx.state.store.list_whitelisted()?;
    Ok(screens::whitelist(formatting::whitelist_html(
        wl.configured_users(),
        wl.admins(),
        &entries,
    )))
}

pub(super) fn global_stats_screen(ctx: &Ctx) -> Result<Screen> {
    let accounts = ctx.state.accounts.store().all_active()?;
    let owners: BTreeSet<UserId> = accounts.iter().map(|a| a.owner).collect();
    let whitelisted = ctx.state.store.list_whitelisted()?.len();
    let stats = index::summarize(&accounts);
    Ok(screens::admin_stats(formatting::global_stats_html(
        &stats,
        owners.len(),
        whitelisted,
    )))
}

/// Accepts a bare id, optionally followed by a note: `123456789 reseller`.
fn parse_target(input: &str) -> Result<(UserId, Option<String>)> {
    let mut parts = input.trim().splitn(2, char::is_whitespace);
    let id = parts
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| Error::InvalidFormat("Please send a numeric Telegram user ID.".to_string()))?;
    let note = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    Ok((UserId(id), note))
}

pub(super) async fn add_user(ctx: &Ctx, input: &str) -> Result<()> {
    let (target, note) = parse_target(input)?;
    let added = ctx.state.store.add_whitelisted(WhitelistEntry {
        user_id: target,
        username: None,
        added_by: Some(ctx.user_id),
        added_at: Utc::now(),
        note,
    })?;

    if added {
        tracing::info!(admin = ctx.user_id.0, target = target.0, "user whitelisted");
        ctx.audit(AuditEvent::whitelist("whitelist_added", ctx.user_id, target));
        ctx.send_html(&format!("✅ User <code>{}</code> added to the whitelist.", target.0))
            .await?;
    } else {
        ctx.send_html(&format!("ℹ️ User <code>{}</code> is already whitelisted.", target.0))
            .await?;
    }
    ctx.send(whitelist_screen(ctx)?).await?;
    Ok(())
}

pub(super) async fn remove_user(ctx: &Ctx, input: &str) -> Result<()> {
    let (target, _) = parse_target(input)?;
    if ctx.state.store.remove_whitelisted(target)? {
        tracing::info!(admin = ctx.user_id.0, target = target.0, "user removed from whitelist");
        ctx.audit(AuditEvent::whitelist("whitelist_removed", ctx.user_id, target));
        ctx.send_html(&format!("✅ User <code>{}</code> removed.", target.0))
            .await?;
    } else {
        let configured = ctx.state.whitelist.configured_users().contains(&target.0)
            || ctx.state.whitelist.admins().contains(&target.0);
        let hint = if configured {
            " They are configured in the environment and cannot be removed here."
        } else {
            ""
        };
        ctx.send_html(&format!(
            "ℹ️ User <code>{}</code> was not in the whitelist.{hint}",
            target.0
        ))
        .await?;
    }
    ctx.send(whitelist_screen(ctx)?).await?;
    Ok(())
}
