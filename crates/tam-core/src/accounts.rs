//! Account operations that span classification, the store, session artifacts
//! and the audit log.

use std::{path::PathBuf, sync::Arc};

use chrono::NaiveDate;

use crate::{
    dates::{self, DateKey},
    domain::{AccountId, UserId},
    errors::Error,
    phone,
    sessions::{self, SessionDir, SessionResolver},
    store::{Account, AccountStore, NewAccount},
    utils::{AuditEvent, AuditLogger},
    Result,
};

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    sessions: Arc<SessionDir>,
    audit: Option<AuditLogger>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        sessions: Arc<SessionDir>,
        audit: Option<AuditLogger>,
    ) -> Self {
        Self {
            store,
            sessions,
            audit,
        }
    }

    pub fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }

    pub fn sessions(&self) -> &SessionDir {
        &self.sessions
    }

    /// Classify `raw_phone` and record it under today's date.
    pub fn add(&self, owner: UserId, raw_phone: &str) -> Result<Account> {
        self.add_on(owner, raw_phone, dates::today_utc())
    }

    pub fn add_on(&self, owner: UserId, raw_phone: &str, added: NaiveDate) -> Result<Account> {
        let c = phone::classify(raw_phone).into_result()?;
        let id = self.store.insert(NewAccount {
            owner,
            phone: c.canonical_number.clone(),
            country_code: c.country_code.clone(),
            country_name: c.country_name.clone(),
            added_date: added,
            session_ref: None,
        })?;

        tracing::info!(
            owner = owner.0,
            account_id = id.0,
            country = %c.country_code,
            "account added"
        );
        self.audit(AuditEvent::account_added(
            owner,
            id,
            &c.canonical_number,
            &c.country_code,
        ));
        self.get(owner, id)
    }

    pub fn get(&self, owner: UserId, id: AccountId) -> Result<Account> {
        self.store
            .get(owner, id)?
            .ok_or_else(|| Error::NotFound(format!("account {id} not found")))
    }

    pub fn get_active(&self, owner: UserId, id: AccountId) -> Result<Account> {
        let account = self.get(owner, id)?;
        if !account.active {
            return Err(Error::NotFound(format!("account {id} not found")));
        }
        Ok(account)
    }

    /// Soft delete plus best-effort removal of the session artifact.
    pub fn delete(&self, owner: UserId, id: AccountId) -> Result<Account> {
        let account = self.get_active(owner, id)?;
        if !self.store.soft_delete(owner, id)? {
            return Err(Error::NotFound(format!("account {id} not found")));
        }

        if let Err(e) = self.sessions.remove(&account) {
            tracing::warn!(account_id = id.0, error = %e, "failed to remove session artifact");
        }
        tracing::info!(owner = owner.0, account_id = id.0, "account deleted");
        self.audit(AuditEvent::account_deleted(owner, id, &account.phone));
        Ok(account)
    }

    /// Count one forwarded login code against a live account.
    pub fn record_forward(&self, owner: UserId, id: AccountId) -> Result<()> {
        if self.store.increment_forwards(owner, id)? {
            tracing::info!(owner = owner.0, account_id = id.0, "login code forward recorded");
            Ok(())
        } else {
            Err(Error::NotFound(format!("account {id} not found")))
        }
    }

    /// Stored artifact paths of the owner's live accounts, oldest account
    /// first. Accounts without an artifact are left out.
    pub fn session_refs(
        &self,
        owner: UserId,
        country_code: Option<&str>,
        date: Option<&DateKey>,
    ) -> Result<Vec<PathBuf>> {
        let mut accounts = self.store.list_filtered(owner, country_code, date)?;
        accounts.sort_by_key(|a| a.id);
        Ok(accounts
            .iter()
            .filter_map(|a| self.sessions.resolve(a))
            .collect())
    }

    /// Store an uploaded `.session` file against the live account whose phone
    /// digits match the file stem.
    pub fn attach_session(&self, owner: UserId, file_name: &str, bytes: &[u8]) -> Result<Account> {
        let digits = sessions::stem_digits(file_name).ok_or_else(|| {
            Error::Validation(format!("{file_name} does not name a phone number"))
        })?;
        let account = self
            .store
            .list(owner, true)?
            .into_iter()
            .find(|a| a.phone_digits() == digits)
            .ok_or_else(|| Error::NotFound(format!("no account with phone +{digits}")))?;

        let name = SessionDir::default_name(&account);
        self.sessions.store_upload(&name, bytes)?;
        self.store.set_session_ref(owner, account.id, &name)?;

        self.audit(AuditEvent::session_uploaded(owner, account.id, file_name));
        self.get(owner, account.id)
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(log) = &self.audit {
            log.record(event);
        }
    }
}
