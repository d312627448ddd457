use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration, loaded once from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub telegram_allowed_users: Vec<i64>,
    pub admin_ids: Vec<i64>,

    // Storage
    pub data_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub exports_dir: PathBuf,
    pub store_file: PathBuf,
    pub whitelist_file: PathBuf,

    // Export
    pub export_prefix: String,

    // Pagination
    pub countries_per_page: usize,
    pub dates_per_page: usize,
    pub accounts_per_page: usize,

    // Proxy
    pub proxy_test_timeout: Duration,

    // Telegram limits
    pub telegram_safe_limit: usize,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in `load`).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let str_of = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |k: &str| str_of(k).and_then(|v| v.parse::<u64>().ok());

        // Required env vars
        let telegram_bot_token = str_of("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let telegram_allowed_users = parse_csv_i64(str_of("TELEGRAM_ALLOWED_USERS"));
        let admin_ids = parse_csv_i64(str_of("ADMIN_IDS"));
        if telegram_allowed_users.is_empty() && admin_ids.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_ALLOWED_USERS or ADMIN_IDS must list at least one user".to_string(),
            ));
        }

        // Storage layout
        let data_dir = str_of("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let path_or = |k: &str, default: &str| {
            str_of(k)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(default))
        };
        let sessions_dir = path_or("SESSIONS_DIR", "sessions");
        let exports_dir = path_or("EXPORTS_DIR", "exports");
        let store_file = path_or("STORE_FILE", "store.json");
        let whitelist_file = path_or("WHITELIST_FILE", "whitelist.txt");
        let audit_log_path = path_or("AUDIT_LOG_PATH", "audit.log");

        let export_prefix =
            str_of("EXPORT_PREFIX").unwrap_or_else(|| "telegram_accounts".to_string());
        if export_prefix.contains(['/', '\\']) {
            return Err(Error::Config(
                "EXPORT_PREFIX must not contain path separators".to_string(),
            ));
        }

        // Pagination (0 would make every list empty)
        let per_page = |k: &str, default: u64| parsed(k).unwrap_or(default).max(1) as usize;
        let countries_per_page = per_page("COUNTRIES_PER_PAGE", 5);
        let dates_per_page = per_page("DATES_PER_PAGE", 4);
        let accounts_per_page = per_page("ACCOUNTS_PER_PAGE", 5);

        let proxy_test_timeout =
            Duration::from_millis(parsed("PROXY_TEST_TIMEOUT_MS").unwrap_or(10_000));

        let telegram_safe_limit = parsed("TELEGRAM_SAFE_LIMIT").unwrap_or(4000) as usize;

        let audit_log_json = str_of("AUDIT_LOG_JSON").map(|v| parse_bool(&v)).unwrap_or(false);

        // Rate limiting
        let rate_limit_enabled = str_of("RATE_LIMIT_ENABLED")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);
        let rate_limit_requests = parsed("RATE_LIMIT_REQUESTS")
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(20);
        let rate_limit_window = Duration::from_secs(parsed("RATE_LIMIT_WINDOW").unwrap_or(60));

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            admin_ids,
            data_dir,
            sessions_dir,
            exports_dir,
            store_file,
            whitelist_file,
            export_prefix,
            countries_per_page,
            dates_per_page,
            accounts_per_page,
            proxy_test_timeout,
            telegram_safe_limit,
            audit_log_path,
            audit_log_json,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_window,
        })
    }

    /// Create every directory the bot writes into.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.sessions_dir, &self.exports_dir] {
            fs::create_dir_all(dir)?;
        }
        for file in [&self.store_file, &self.audit_log_path] {
            if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    let quoted = val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')));
    if quoted {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_hang_off_data_dir() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_ALLOWED_USERS", "1, 2,x"),
            ("DATA_DIR", "/srv/tam"),
        ]))
        .unwrap();

        assert_eq!(cfg.telegram_allowed_users, vec![1, 2]);
        assert!(cfg.admin_ids.is_empty());
        assert_eq!(cfg.sessions_dir, PathBuf::from("/srv/tam/sessions"));
        assert_eq!(cfg.exports_dir, PathBuf::from("/srv/tam/exports"));
        assert_eq!(cfg.store_file, PathBuf::from("/srv/tam/store.json"));
        assert_eq!(cfg.whitelist_file, PathBuf::from("/srv/tam/whitelist.txt"));
        assert_eq!(cfg.export_prefix, "telegram_accounts");
        assert_eq!(cfg.countries_per_page, 5);
        assert_eq!(cfg.dates_per_page, 4);
        assert_eq!(cfg.accounts_per_page, 5);
        assert_eq!(cfg.proxy_test_timeout, Duration::from_secs(10));
        assert!(cfg.rate_limit_enabled);
        assert!(!cfg.audit_log_json);
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[("TELEGRAM_ALLOWED_USERS", "1")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn admins_alone_satisfy_the_whitelist() {
        assert!(Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "t")])).is_err());
        let cfg =
            Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "t"), ("ADMIN_IDS", "9")]))
                .unwrap();
        assert_eq!(cfg.admin_ids, vec![9]);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("ADMIN_IDS", "9"),
            ("EXPORTS_DIR", "/tmp/out"),
            ("EXPORT_PREFIX", "accts"),
            ("COUNTRIES_PER_PAGE", "0"),
            ("PROXY_TEST_TIMEOUT_MS", "2500"),
            ("RATE_LIMIT_ENABLED", "off"),
            ("AUDIT_LOG_JSON", "yes"),
        ]))
        .unwrap();
        assert_eq!(cfg.exports_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.export_prefix, "accts");
        assert_eq!(cfg.countries_per_page, 1);
        assert_eq!(cfg.proxy_test_timeout, Duration::from_millis(2500));
        assert!(!cfg.rate_limit_enabled);
        assert!(cfg.audit_log_json);
    }

    #[test]
    fn prefix_with_separator_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("ADMIN_IDS", "9"),
            ("EXPORT_PREFIX", "../x"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unquote_strips_matching_quotes() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("\"abc'"), "\"abc'");
        assert_eq!(unquote("x"), "x");
    }
}
