//! Persistence ports and the JSON file store behind them.
//!
//! The ports are synchronous: every call runs to completion while holding the
//! store's own lock. Owner isolation is enforced by the store, not by callers.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    dates::{self, DateKey},
    domain::{AccountId, ProxyId, UserId},
    errors::Error,
    proxy::ProxyDescriptor,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: UserId,
    pub phone: String,
    pub country_code: String,
    pub country_name: String,
    pub added_date: NaiveDate,
    #[serde(default)]
    pub session_ref: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub forward_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn date_key(&self) -> DateKey {
        dates::key_of(&self.added_date)
    }

    pub fn phone_digits(&self) -> String {
        self.phone.chars().filter(char::is_ascii_digit).collect()
    }
}

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub owner: UserId,
    pub phone: String,
    pub country_code: String,
    pub country_name: String,
    pub added_date: NaiveDate,
    pub session_ref: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub id: ProxyId,
    pub owner: UserId,
    #[serde(flatten)]
    pub descriptor: ProxyDescriptor,
    #[serde(default)]
    pub name: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Proxy {
    pub fn label(&self) -> String {
        match &self.name {
            Some(n) => format!("{n} ({}:{})", self.descriptor.host, self.descriptor.port),
            None => format!("{}:{}", self.descriptor.host, self.descriptor.port),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewProxy {
    pub owner: UserId,
    pub descriptor: ProxyDescriptor,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub user_id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub added_by: Option<UserId>,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

pub trait AccountStore: Send + Sync {
    fn insert(&self, account: NewAccount) -> Result<AccountId>;
    fn list(&self, owner: UserId, active_only: bool) -> Result<Vec<Account>>;
    fn get(&self, owner: UserId, id: AccountId) -> Result<Option<Account>>;
    /// Marks the account inactive. Returns `false` if it is missing, owned by
    /// someone else, or already inactive.
    fn soft_delete(&self, owner: UserId, id: AccountId) -> Result<bool>;
    fn increment_forwards(&self, owner: UserId, id: AccountId) -> Result<bool>;
    fn set_session_ref(&self, owner: UserId, id: AccountId, name: &str) -> Result<bool>;
    /// Live accounts of `owner`, optionally narrowed to a country and a day.
    fn list_filtered(
        &self,
        owner: UserId,
        country_code: Option<&str>,
        date: Option<&DateKey>,
    ) -> Result<Vec<Account>>;
    /// Live accounts of every owner.
    fn all_active(&self) -> Result<Vec<Account>>;
}

pub trait ProxyStore: Send + Sync {
    fn insert_proxy(&self, proxy: NewProxy) -> Result<ProxyId>;
    fn list_proxies(&self, owner: UserId) -> Result<Vec<Proxy>>;
    fn get_proxy(&self, owner: UserId, id: ProxyId) -> Result<Option<Proxy>>;
    fn deactivate_proxy(&self, owner: UserId, id: ProxyId) -> Result<bool>;
}

pub trait WhitelistStore: Send + Sync {
    fn is_whitelisted(&self, user_id: UserId) -> Result<bool>;
    /// Returns `false` when the user is already present.
    fn add_whitelisted(&self, entry: WhitelistEntry) -> Result<bool>;
    fn remove_whitelisted(&self, user_id: UserId) -> Result<bool>;
    fn list_whitelisted(&self) -> Result<Vec<WhitelistEntry>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    next_account_id: u64,
    #[serde(default)]
    next_proxy_id: u64,
    #[serde(default)]
    accounts: Vec<Account>,
    #[serde(default)]
    proxies: Vec<Proxy>,
    #[serde(default)]
    whitelist: Vec<WhitelistEntry>,
}

/// JSON-file backed store. State lives in memory and is rewritten to disk
/// after every mutation (temp file + rename).
#[derive(Debug)]
pub struct FileStore {
    path: Option<PathBuf>,
    state: Mutex<StoreState>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let state = load_state(&path)?;
        tracing::info!(
            path = %path.display(),
            accounts = state.accounts.len(),
            proxies = state.proxies.len(),
            "store opened"
        );
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| Error::External("store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> Result<T> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    /// Apply `f`; persist only when it reports a change.
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreState) -> (T, bool)) -> Result<T> {
        let mut guard = self.lock()?;
        let (out, changed) = f(&mut guard);
        if changed {
            self.persist(&guard)?;
        }
        Ok(out)
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let txt = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, txt)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn load_state(path: &Path) -> Result<StoreState> {
    if !path.exists() {
        return Ok(StoreState::default());
    }
    let txt = fs::read_to_string(path)?;
    if txt.trim().is_empty() {
        return Ok(StoreState::default());
    }
    let mut state: StoreState = serde_json::from_str(&txt)?;

    // Ids must stay unique even if the counters were lost or edited by hand.
    let max_account = state.accounts.iter().map(|a| a.id.0).max().unwrap_or(0);
    let max_proxy = state.proxies.iter().map(|p| p.id.0).max().unwrap_or(0);
    state.next_account_id = state.next_account_id.max(max_account);
    state.next_proxy_id = state.next_proxy_id.max(max_proxy);
    Ok(state)
}

fn owned_mut(state: &mut StoreState, owner: UserId, id: AccountId) -> Option<&mut Account> {
    state
        .accounts
        .iter_mut()
        .find(|a| a.id == id && a.owner == owner)
}

impl AccountStore for FileStore {
    fn insert(&self, account: NewAccount) -> Result<AccountId> {
        if account.phone.trim().is_empty() {
            return Err(Error::Validation("phone number cannot be empty".to_string()));
        }
        self.mutate(|st| {
            st.next_account_id += 1;
            let id = AccountId(st.next_account_id);
            st.accounts.push(Account {
                id,
                owner: account.owner,
                phone: account.phone,
                country_code: account.country_code,
                country_name: account.country_name,
                added_date: account.added_date,
                session_ref: account.session_ref,
                active: true,
                forward_count: 0,
                created_at: Utc::now(),
            });
            (id, true)
        })
    }

    fn list(&self, owner: UserId, active_only: bool) -> Result<Vec<Account>> {
        self.read(|st| {
            st.accounts
                .iter()
                .filter(|a| a.owner == owner && (a.active || !active_only))
                .cloned()
                .collect()
        })
    }

    fn get(&self, owner: UserId, id: AccountId) -> Result<Option<Account>> {
        self.read(|st| {
            st.accounts
                .iter()
                .find(|a| a.id == id && a.owner == owner)
                .cloned()
        })
    }

    fn soft_delete(&self, owner: UserId, id: AccountId) -> Result<bool> {
        self.mutate(|st| match owned_mut(st, owner, id) {
            Some(a) if a.active => {
                a.active = false;
                (true, true)
            }
            _ => (false, false),
        })
    }

    fn increment_forwards(&self, owner: UserId, id: AccountId) -> Result<bool> {
        self.mutate(|st| match owned_mut(st, owner, id) {
            Some(a) if a.active => {
                a.forward_count = a.forward_count.saturating_add(1);
                (true, true)
            }
            _ => (false, false),
        })
    }

    fn set_session_ref(&self, owner: UserId, id: AccountId, name: &str) -> Result<bool> {
        self.mutate(|st| match owned_mut(st, owner, id) {
            Some(a) => {
                a.session_ref = Some(name.to_string());
                (true, true)
            }
            None => (false, false),
        })
    }

    fn list_filtered(
        &self,
        owner: UserId,
        country_code: Option<&str>,
        date: Option<&DateKey>,
    ) -> Result<Vec<Account>> {
        self.read(|st| {
            st.accounts
                .iter()
                .filter(|a| a.owner == owner && a.active)
                .filter(|a| country_code.map_or(true, |c| a.country_code == c))
                .filter(|a| date.map_or(true, |d| a.date_key() == *d))
                .cloned()
                .collect()
        })
    }

    fn all_active(&self) -> Result<Vec<Account>> {
        self.read(|st| st.accounts.iter().filter(|a| a.active).cloned().collect())
    }
}

impl ProxyStore for FileStore {
    fn insert_proxy(&self, proxy: NewProxy) -> Result<ProxyId> {
        proxy.descriptor.validate()?;
        self.mutate(|st| {
            st.next_proxy_id += 1;
            let id = ProxyId(st.next_proxy_id);
            st.proxies.push(Proxy {
                id,
                owner: proxy.owner,
                descriptor: proxy.descriptor,
                name: proxy.name,
                active: true,
                created_at: Utc::now(),
            });
            (id, true)
        })
    }

    fn list_proxies(&self, owner: UserId) -> Result<Vec<Proxy>> {
        self.read(|st| {
            st.proxies
                .iter()
                .filter(|p| p.owner == owner && p.active)
                .cloned()
                .collect()
        })
    }

    fn get_proxy(&self, owner: UserId, id: ProxyId) -> Result<Option<Proxy>> {
        self.read(|st| {
            st.proxies
                .iter()
                .find(|p| p.id == id && p.owner == owner && p.active)
                .cloned()
        })
    }

    fn deactivate_proxy(&self, owner: UserId, id: ProxyId) -> Result<bool> {
        self.mutate(|st| {
            match st
                .proxies
                .iter_mut()
                .find(|p| p.id == id && p.owner == owner && p.active)
            {
                Some(p) => {
                    p.active = false;
                    (true, true)
                }
                None => (false, false),
            }
        })
    }
}

impl WhitelistStore for FileStore {
    fn is_whitelisted(&self, user_id: UserId) -> Result<bool> {
        self.read(|st| st.whitelist.iter().any(|e| e.user_id == user_id))
    }

    fn add_whitelisted(&self, entry: WhitelistEntry) -> Result<bool> {
        self.mutate(|st| {
            if st.whitelist.iter().any(|e| e.user_id == entry.user_id) {
                return (false, false);
            }
            st.whitelist.push(entry);
            (true, true)
        })
    }

    fn remove_whitelisted(&self, user_id: UserId) -> Result<bool> {
        self.mutate(|st| {
            let before = st.whitelist.len();
            st.whitelist.retain(|e| e.user_id != user_id);
            let removed = st.whitelist.len() != before;
            (removed, removed)
        })
    }

    fn list_whitelisted(&self) -> Result<Vec<WhitelistEntry>> {
        self.read(|st| st.whitelist.clone())
    }
}
