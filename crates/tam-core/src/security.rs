use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{domain::UserId, store::WhitelistStore};

// ============== Authorization ==============

pub fn is_authorized(user_id: Option<UserId>, allowed_users: &[i64]) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    if allowed_users.is_empty() {
        return false;
    }
    allowed_users.contains(&user_id.0)
}

/// Union of every source that can grant access: configured users, admins,
/// store entries and the optional whitelist file.
#[derive(Clone)]
pub struct Whitelist {
    allowed_users: Vec<i64>,
    admins: Vec<i64>,
    file: Option<PathBuf>,
    store: Arc<dyn WhitelistStore>,
}

impl Whitelist {
    pub fn new(
        allowed_users: Vec<i64>,
        admins: Vec<i64>,
        file: Option<PathBuf>,
        store: Arc<dyn WhitelistStore>,
    ) -> Self {
        Self {
            allowed_users,
            admins,
            file,
            store,
        }
    }

    pub fn is_admin(&self, user_id: Option<UserId>) -> bool {
        is_authorized(user_id, &self.admins)
    }

    pub fn is_allowed(&self, user_id: Option<UserId>) -> bool {
        let Some(uid) = user_id else {
            return false;
        };
        if is_authorized(user_id, &self.allowed_users) || self.is_admin(user_id) {
            return true;
        }
        match self.store.is_whitelisted(uid) {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => tracing::warn!(user_id = uid.0, error = %e, "whitelist lookup failed"),
        }
        is_authorized(user_id, &self.file_entries())
    }

    /// User ids listed in the whitelist file, one per line; `#` starts a comment.
    pub fn file_entries(&self) -> Vec<i64> {
        let Some(path) = &self.file else {
            return Vec::new();
        };
        let Ok(contents) = fs::read_to_string(path) else {
            return Vec::new();
        };
        parse_whitelist_file(&contents)
    }

    pub fn configured_users(&self) -> &[i64] {
        &self.allowed_users
    }

    pub fn admins(&self) -> &[i64] {
        &self.admins
    }
}

fn parse_whitelist_file(contents: &str) -> Vec<i64> {
    contents
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .filter_map(|l| l.parse::<i64>().ok())
        .collect()
}

// ============== Rate Limiter (Token Bucket) ==============

#[derive(Clone, Debug)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    enabled: bool,
    max_tokens: f64,
    refill_per_sec: f64,
    buckets: HashMap<UserId, Bucket>,
}

impl RateLimiter {
    pub fn new(enabled: bool, max_tokens: u32, window: Duration) -> Self {
        let max_tokens_f = max_tokens as f64;
        let window_secs = window.as_secs_f64().max(1e-9);

        Self {
            enabled,
            max_tokens: max_tokens_f,
            refill_per_sec: max_tokens_f / window_secs,
            buckets: HashMap::new(),
        }
    }

    pub fn check(&mut self, user_id: UserId) -> (bool, Option<Duration>) {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&mut self, user_id: UserId, now: Instant) -> (bool, Option<Duration>) {
        if !self.enabled {
            return (true, None);
        }

        let bucket = self.buckets.entry(user_id).or_insert_with(|| Bucket {
            tokens: self.max_tokens,
            last_update: now,
        });

        let elapsed = now.duration_since(bucket.last_update).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return (true, None);
        }

        let secs = (1.0 - bucket.tokens) / self.refill_per_sec;
        (false, Some(Duration::from_secs_f64(secs.max(0.0))))
    }
}
