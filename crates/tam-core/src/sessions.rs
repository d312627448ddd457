//! Session artifacts on disk: one `.session` file per account.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use crate::{errors::Error, store::Account, Result};

pub const SESSION_EXTENSION: &str = "session";

/// Maps an account to the location of its session artifact.
pub trait SessionResolver: Send + Sync {
    /// Path of the account's artifact, or `None` if it has not been stored.
    fn resolve(&self, account: &Account) -> Option<PathBuf>;
}

#[derive(Clone, Debug)]
pub struct SessionDir {
    root: PathBuf,
}

impl SessionDir {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `user_<owner>_<digits>.session`. The owner prefix keeps two users who
    /// registered the same phone from sharing one artifact.
    pub fn default_name(account: &Account) -> String {
        format!(
            "user_{}_{}.{SESSION_EXTENSION}",
            account.owner.0,
            account.phone_digits()
        )
    }

    /// Where the account's artifact lives or would live.
    fn location(&self, account: &Account) -> Option<PathBuf> {
        match account.session_ref.as_deref() {
            Some(name) => self.path_for(name).ok(),
            None => self.path_for(&Self::default_name(account)).ok(),
        }
    }

    /// Resolve a bare file name inside the sessions directory.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let candidate = Path::new(name);
        let mut comps = candidate.components();
        match (comps.next(), comps.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(candidate)),
            _ => Err(Error::InvalidPath {
                path: candidate.to_path_buf(),
                reason: "session reference must be a plain file name".to_string(),
            }),
        }
    }

    /// Save an uploaded artifact. Only `*.session` names are accepted.
    pub fn store_upload(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let has_ext = Path::new(name)
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(SESSION_EXTENSION));
        if !has_ext {
            return Err(Error::Validation(format!(
                "expected a .{SESSION_EXTENSION} file, got {name}"
            )));
        }
        if bytes.is_empty() {
            return Err(Error::Validation("session file is empty".to_string()));
        }
        let path = self.path_for(name)?;
        fs::write(&path, bytes)?;
        tracing::info!(path = %path.display(), size = bytes.len(), "session artifact stored");
        Ok(path)
    }

    /// Delete the account's artifact and its `-journal` companion. Returns
    /// whether anything was removed.
    pub fn remove(&self, account: &Account) -> Result<bool> {
        let Some(path) = self.location(account) else {
            return Ok(false);
        };
        let mut removed = false;
        for p in [path.clone(), journal_path(&path)] {
            match fs::remove_file(&p) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(removed)
    }
}

impl SessionResolver for SessionDir {
    fn resolve(&self, account: &Account) -> Option<PathBuf> {
        self.location(account).filter(|p| p.is_file())
    }
}

fn journal_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push("-journal");
    PathBuf::from(os)
}

/// Digits of a `.session` file stem, used to match uploads to accounts.
pub fn stem_digits(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let digits: String = stem.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{AccountId, UserId},
        store::tests::date,
    };
    use chrono::Utc;

    fn tmp_dir(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}"))
    }

    fn account(phone: &str, session_ref: Option<&str>) -> Account {
        owned_account(1, phone, session_ref)
    }

    fn owned_account(owner: i64, phone: &str, session_ref: Option<&str>) -> Account {
        Account {
            id: AccountId(1),
            owner: UserId(owner),
            phone: phone.to_string(),
            country_code: "IR".to_string(),
            country_name: "Iran".to_string(),
            added_date: date(2024, 1, 2),
            session_ref: session_ref.map(str::to_string),
            active: true,
            forward_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn resolves_reference_or_owner_scoped_default() {
        let dir = SessionDir::new(tmp_dir("tam-sessions")).unwrap();
        let a = account("+98 912 345 6789", None);
        assert_eq!(SessionDir::default_name(&a), "user_1_989123456789.session");
        assert_eq!(dir.resolve(&a), None);

        let stored = dir.store_upload("user_1_989123456789.session", b"x").unwrap();
        assert_eq!(dir.resolve(&a), Some(stored));

        let b = account("+989123456789", Some("custom.session"));
        assert_eq!(dir.resolve(&b), None);
        let custom = dir.store_upload("custom.session", b"x").unwrap();
        assert_eq!(dir.resolve(&b), Some(custom));
    }

    #[test]
    fn same_phone_under_two_owners_has_two_artifacts() {
        let dir = SessionDir::new(tmp_dir("tam-sessions")).unwrap();
        let first = owned_account(1, "+989123456789", None);
        let second = owned_account(2, "+989123456789", None);
        assert_ne!(
            SessionDir::default_name(&first),
            SessionDir::default_name(&second)
        );

        dir.store_upload(&SessionDir::default_name(&first), b"first")
            .unwrap();
        assert!(dir.resolve(&second).is_none());
        assert!(!dir.remove(&second).unwrap());
        assert!(dir.resolve(&first).is_some());
    }

    #[test]
    fn traversal_is_rejected() {
        let dir = SessionDir::new(tmp_dir("tam-sessions")).unwrap();
        for bad in ["../etc/passwd", "/etc/passwd", "a/b.session", "..", ""] {
            assert!(dir.path_for(bad).is_err(), "{bad:?}");
        }
        assert!(dir.resolve(&account("+1", Some("../x.session"))).is_none());
    }

    #[test]
    fn upload_then_remove_with_journal() {
        let dir = SessionDir::new(tmp_dir("tam-sessions")).unwrap();
        let a = account("+989123456789", None);

        let path = dir
            .store_upload("user_1_989123456789.session", b"data")
            .unwrap();
        fs::write(journal_path(&path), b"j").unwrap();
        assert!(path.exists());

        assert!(dir.remove(&a).unwrap());
        assert!(!path.exists());
        assert!(!journal_path(&path).exists());
        assert!(!dir.remove(&a).unwrap());
    }

    #[test]
    fn upload_requires_session_extension() {
        let dir = SessionDir::new(tmp_dir("tam-sessions")).unwrap();
        assert!(dir.store_upload("notes.txt", b"x").is_err());
        assert!(dir.store_upload("a.session", b"").is_err());
        assert!(dir.store_upload("../a.session", b"x").is_err());
    }

    #[test]
    fn digits_from_stem() {
        assert_eq!(stem_digits("+989123456789.session").as_deref(), Some("989123456789"));
        assert_eq!(stem_digits("user_42.session").as_deref(), Some("42"));
        assert_eq!(stem_digits("abc.session"), None);
    }
}
