//! Typed inline-button payloads.
//!
//! Telegram limits callback data to 64 bytes, so actions are encoded as short
//! `kind:arg:arg` strings.

use std::fmt;

use tam_core::{
    dates::DateKey,
    domain::{AccountId, ProxyId},
    export::ExportFormat,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Menu,
    Help,
    Stats,
    AddAccount,
    Cancel,
    Countries { page: usize },
    Country { country_code: String, page: usize },
    Date { country_code: String, key: DateKey, page: usize },
    Account(AccountId),
    CopyPhone(AccountId),
    /// A login code was forwarded for this account.
    Forwarded(AccountId),
    Delete(AccountId),
    ConfirmDelete(AccountId),
    ExportMenu,
    ExportFormat { format: ExportFormat, manifest: bool },
    ExportRun { format: ExportFormat, manifest: bool, limit: usize },
    ProxyMenu,
    ProxyAdd,
    Proxy(ProxyId),
    ProxyTest(ProxyId),
    ProxyDelete(ProxyId),
    ProxyDeleteConfirm(ProxyId),
    Admin,
    AdminWhitelist,
    WhitelistAdd,
    WhitelistRemove,
    AdminStats,
    /// Inert button (page counters).
    Noop,
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(data: &str) -> Option<Self> {
        let parts: Vec<&str> = data.split(':').collect();
        let action = match parts.as_slice() {
            ["menu"] => Self::Menu,
            ["help"] => Self::Help,
            ["stats"] => Self::Stats,
            ["add_account"] => Self::AddAccount,
            ["cancel"] => Self::Cancel,
            ["noop"] => Self::Noop,
            ["countries", page] => Self::Countries {
                page: page.parse().ok()?,
            },
            ["country", cc, page] => Self::Country {
                country_code: parse_country(cc)?,
                page: page.parse().ok()?,
            },
            ["date", cc, key, page] => Self::Date {
                country_code: parse_country(cc)?,
                key: DateKey::from_compact(key)?,
                page: page.parse().ok()?,
            },
            ["account", id] => Self::Account(AccountId(id.parse().ok()?)),
            ["copy", id] => Self::CopyPhone(AccountId(id.parse().ok()?)),
            ["forwarded", id] => Self::Forwarded(AccountId(id.parse().ok()?)),
            ["delete", id] => Self::Delete(AccountId(id.parse().ok()?)),
            ["confirm_delete", id] => Self::ConfirmDelete(AccountId(id.parse().ok()?)),
            ["export_menu"] => Self::ExportMenu,
            ["export", fmt, manifest] => Self::ExportFormat {
                format: ExportFormat::parse(fmt)?,
                manifest: parse_flag(manifest)?,
            },
            ["export_run", fmt, manifest, limit] => Self::ExportRun {
                format: ExportFormat::parse(fmt)?,
                manifest: parse_flag(manifest)?,
                limit: limit.parse().ok()?,
            },
            ["proxy_menu"] => Self::ProxyMenu,
            ["proxy_add"] => Self::ProxyAdd,
            ["proxy", id] => Self::Proxy(ProxyId(id.parse().ok()?)),
            ["proxy_test", id] => Self::ProxyTest(ProxyId(id.parse().ok()?)),
            ["proxy_delete", id] => Self::ProxyDelete(ProxyId(id.parse().ok()?)),
            ["proxy_delete_confirm", id] => Self::ProxyDeleteConfirm(ProxyId(id.parse().ok()?)),
            ["admin"] => Self::Admin,
            ["admin_whitelist"] => Self::AdminWhitelist,
            ["wl_add"] => Self::WhitelistAdd,
            ["wl_remove"] => Self::WhitelistRemove,
            ["admin_stats"] => Self::AdminStats,
            _ => return None,
        };
        Some(action)
    }

    /// Actions that only administrators may trigger.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::Admin
                | Self::AdminWhitelist
                | Self::WhitelistAdd
                | Self::WhitelistRemove
                | Self::AdminStats
        )
    }
}

fn parse_country(s: &str) -> Option<String> {
    let ok = !s.is_empty() && s.len() <= 16 && s.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then(|| s.to_string())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

fn flag(b: bool) -> u8 {
    u8::from(b)
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Menu => f.write_str("menu"),
            Self::Help => f.write_str("help"),
            Self::Stats => f.write_str("stats"),
            Self::AddAccount => f.write_str("add_account"),
            Self::Cancel => f.write_str("cancel"),
            Self::Noop => f.write_str("noop"),
            Self::Countries { page } => write!(f, "countries:{page}"),
            Self::Country { country_code, page } => write!(f, "country:{country_code}:{page}"),
            Self::Date {
                country_code,
                key,
                page,
            } => write!(f, "date:{country_code}:{}:{page}", key.compact()),
            Self::Account(id) => write!(f, "account:{id}"),
            Self::CopyPhone(id) => write!(f, "copy:{id}"),
            Self::Forwarded(id) => write!(f, "forwarded:{id}"),
            Self::Delete(id) => write!(f, "delete:{id}"),
            Self::ConfirmDelete(id) => write!(f, "confirm_delete:{id}"),
            Self::ExportMenu => f.write_str("export_menu"),
            Self::ExportFormat { format, manifest } => {
                write!(f, "export:{format}:{}", flag(*manifest))
            }
            Self::ExportRun {
                format,
                manifest,
                limit,
            } => write!(f, "export_run:{format}:{}:{limit}", flag(*manifest)),
            Self::ProxyMenu => f.write_str("proxy_menu"),
            Self::ProxyAdd => f.write_str("proxy_add"),
            Self::Proxy(id) => write!(f, "proxy:{id}"),
            Self::ProxyTest(id) => write!(f, "proxy_test:{id}"),
            Self::ProxyDelete(id) => write!(f, "proxy_delete:{id}"),
            Self::ProxyDeleteConfirm(id) => write!(f, "proxy_delete_confirm:{id}"),
            Self::Admin => f.write_str("admin"),
            Self::AdminWhitelist => f.write_str("admin_whitelist"),
            Self::WhitelistAdd => f.write_str("wl_add"),
            Self::WhitelistRemove => f.write_str("wl_remove"),
            Self::AdminStats => f.write_str("admin_stats"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paged_navigation() {
        assert_eq!(
            CallbackAction::parse("country:IR:2"),
            Some(CallbackAction::Country {
                country_code: "IR".to_string(),
                page: 2
            })
        );
        let date = CallbackAction::parse("date:US:20240115:0").unwrap();
        assert_eq!(
            date,
            CallbackAction::Date {
                country_code: "US".to_string(),
                key: DateKey::from_compact("20240115").unwrap(),
                page: 0
            }
        );
        assert_eq!(date.encode(), "date:US:20240115:0");
    }

    #[test]
    fn parses_export_actions() {
        assert_eq!(
            CallbackAction::parse("export:pyrogram:1"),
            Some(CallbackAction::ExportFormat {
                format: ExportFormat::Pyrogram,
                manifest: true
            })
        );
        let run = CallbackAction::ExportRun {
            format: ExportFormat::Telethon,
            manifest: false,
            limit: 0,
        };
        assert_eq!(run.encode(), "export_run:telethon:0:0");
        assert_eq!(CallbackAction::parse(&run.encode()), Some(run));
    }

    #[test]
    fn parses_account_actions() {
        let forwarded = CallbackAction::Forwarded(AccountId(7));
        assert_eq!(forwarded.encode(), "forwarded:7");
        assert_eq!(CallbackAction::parse("forwarded:7"), Some(forwarded));
        assert_eq!(
            CallbackAction::parse("copy:7"),
            Some(CallbackAction::CopyPhone(AccountId(7)))
        );
        assert!(!CallbackAction::Forwarded(AccountId(7)).requires_admin());
    }

    #[test]
    fn rejects_malformed_data() {
        for bad in [
            "",
            "unknown",
            "account:abc",
            "forwarded:",
            "forwarded:1:2",
            "account",
            "country:IR",
            "country:I/R:0",
            "date:IR:2024-01-15:0",
            "export:zip:1",
            "export:telethon:2",
            "proxy_test:-1",
            "menu:extra",
        ] {
            assert_eq!(CallbackAction::parse(bad), None, "{bad}");
        }
    }

    #[test]
    fn admin_gate() {
        assert!(CallbackAction::AdminStats.requires_admin());
        assert!(CallbackAction::WhitelistAdd.requires_admin());
        assert!(!CallbackAction::Stats.requires_admin());
    }

    #[test]
    fn encoded_actions_fit_telegram_limit() {
        let longest = CallbackAction::ExportRun {
            format: ExportFormat::Pyrogram,
            manifest: true,
            limit: usize::MAX,
        };
        assert!(longest.encode().len() <= 64);
        let date = CallbackAction::Date {
            country_code: "unknown".to_string(),
            key: DateKey::from_compact("20241231").unwrap(),
            page: 999,
        };
        assert!(date.encode().len() <= 64);
    }
}
