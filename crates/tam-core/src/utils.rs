use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    domain::{AccountId, ProxyId, UserId},
    errors::Error,
    Result,
};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

// ============== Audit Logging ==============

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Default, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
}

impl AuditEvent {
    fn base(event: &str, user_id: UserId) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            user_id: Some(user_id.0),
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: Option<&str>) -> Self {
        self.username = username.map(str::to_string);
        self
    }

    pub fn auth(user_id: UserId, username: Option<&str>, authorized: bool) -> Self {
        Self {
            authorized: Some(authorized),
            ..Self::base("auth", user_id)
        }
        .with_username(username)
    }

    pub fn account_added(user_id: UserId, id: AccountId, phone: &str, country_code: &str) -> Self {
        Self {
            account_id: Some(id.0),
            phone: Some(phone.to_string()),
            country_code: Some(country_code.to_string()),
            ..Self::base("account_added", user_id)
        }
    }

    pub fn account_deleted(user_id: UserId, id: AccountId, phone: &str) -> Self {
        Self {
            account_id: Some(id.0),
            phone: Some(phone.to_string()),
            ..Self::base("account_deleted", user_id)
        }
    }

    pub fn session_uploaded(user_id: UserId, id: AccountId, file_name: &str) -> Self {
        Self {
            account_id: Some(id.0),
            context: Some(file_name.to_string()),
            ..Self::base("session_uploaded", user_id)
        }
    }

    pub fn export(user_id: UserId, format: &str, count: usize, archive: &Path) -> Self {
        Self {
            format: Some(format.to_string()),
            count: Some(count),
            archive: archive
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            ..Self::base("export", user_id)
        }
    }

    pub fn proxy(event: &str, user_id: UserId, id: ProxyId, masked: &str) -> Self {
        Self {
            proxy_id: Some(id.0),
            proxy: Some(masked.to_string()),
            ..Self::base(event, user_id)
        }
    }

    pub fn whitelist(event: &str, admin: UserId, target: UserId) -> Self {
        Self {
            target_user_id: Some(target.0),
            ..Self::base(event, admin)
        }
    }

    pub fn error(user_id: UserId, error: &str, context: Option<&str>) -> Self {
        Self {
            error: Some(error.to_string()),
            context: context.map(str::to_string),
            ..Self::base("error", user_id)
        }
    }

    pub fn rate_limit(user_id: UserId, retry_after: f64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::base("rate_limit", user_id)
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.error {
            event.error = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.context {
            event.context = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Write and log on failure; audit problems never fail the caller.
    pub fn record(&self, event: AuditEvent) {
        let kind = event.event.clone();
        if let Err(e) = self.write(event) {
            tracing::warn!(event = %kind, error = %e, "failed to write audit event");
        }
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), AUDIT_MAX_TEXT + 3);
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn json_lines_skip_empty_fields() {
        let log = AuditLogger::new(tmp_file("tam-audit-json"), true);
        log.write(AuditEvent::account_added(
            UserId(7),
            AccountId(3),
            "+989123456789",
            "IR",
        ))
        .unwrap();
        log.write(AuditEvent::auth(UserId(8), Some("mallory"), false))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "account_added");
        assert_eq!(lines[0]["account_id"], 3);
        assert_eq!(lines[0]["country_code"], "IR");
        assert!(lines[0].get("proxy").is_none());
        assert_eq!(lines[1]["authorized"], false);
        assert_eq!(lines[1]["username"], "mallory");
    }

    #[test]
    fn text_format_truncates_errors() {
        let log = AuditLogger::new(tmp_file("tam-audit-text"), false);
        let long = "e".repeat(AUDIT_MAX_TEXT + 50);
        log.write(AuditEvent::error(UserId(1), &long, Some("export")))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("event: error"));
        assert!(written.contains("context: export"));
        assert!(written.contains("..."));
        assert!(!written.contains(&long));
    }

    #[test]
    fn export_event_keeps_only_file_name() {
        let ev = AuditEvent::export(
            UserId(1),
            "telethon",
            4,
            Path::new("/data/exports/telegram_accounts_telethon_20240102_030405.zip"),
        );
        assert_eq!(
            ev.archive.as_deref(),
            Some("telegram_accounts_telethon_20240102_030405.zip")
        );
        assert_eq!(ev.count, Some(4));
    }
}
