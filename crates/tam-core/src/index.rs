//! Country and date views over an owner's live accounts.
//!
//! Views are recomputed from the store on every call, so a soft delete is
//! reflected on the next read and an empty bucket can never be observed.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    dates::DateKey,
    domain::UserId,
    phone,
    store::{Account, AccountStore},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CountryBucket {
    pub country_code: String,
    pub country_name: String,
    pub count: usize,
}

impl CountryBucket {
    pub fn flag(&self) -> String {
        phone::flag_emoji(&self.country_code)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DateBucket {
    pub country_code: String,
    pub key: DateKey,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 0-indexed.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 0 && self.page < self.total_pages
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }
}

/// Slice `items` into page `page` of `per_page` items. Out-of-range pages are
/// empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);
    let start = page.saturating_mul(per_page);
    let slice = if start < total_items {
        let end = (start + per_page).min(total_items);
        items[start..end].to_vec()
    } else {
        Vec::new()
    };
    Page {
        items: slice,
        page,
        total_pages,
        total_items,
    }
}

/// Countries with at least one live account, ordered by country code.
pub fn countries_for(store: &dyn AccountStore, owner: UserId) -> Result<Vec<CountryBucket>> {
    let accounts = store.list(owner, true)?;
    Ok(country_buckets(&accounts))
}

/// Days with at least one live account in `country_code`, oldest first.
pub fn dates_for(
    store: &dyn AccountStore,
    owner: UserId,
    country_code: &str,
) -> Result<Vec<DateBucket>> {
    let accounts = store.list(owner, true)?;
    let mut by_date: BTreeMap<DateKey, usize> = BTreeMap::new();
    for a in accounts.iter().filter(|a| a.country_code == country_code) {
        *by_date.entry(a.date_key()).or_default() += 1;
    }
    Ok(by_date
        .into_iter()
        .map(|(key, count)| DateBucket {
            country_code: country_code.to_string(),
            key,
            count,
        })
        .collect())
}

pub fn accounts_for(
    store: &dyn AccountStore,
    owner: UserId,
    country_code: &str,
    key: &DateKey,
) -> Result<Vec<Account>> {
    let mut accounts = store.list_filtered(owner, Some(country_code), Some(key))?;
    accounts.sort_by_key(|a| a.id);
    Ok(accounts)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OwnerStats {
    pub total: usize,
    pub countries: Vec<CountryBucket>,
    /// Live accounts per day across all countries, oldest first.
    pub per_date: Vec<(DateKey, usize)>,
    pub total_forwards: u64,
}

pub fn stats_for(store: &dyn AccountStore, owner: UserId) -> Result<OwnerStats> {
    let accounts = store.list(owner, true)?;
    Ok(summarize(&accounts))
}

/// Stats over a pre-fetched account set (used for the global admin view).
pub fn summarize(accounts: &[Account]) -> OwnerStats {
    let mut per_date: BTreeMap<DateKey, usize> = BTreeMap::new();
    for a in accounts.iter().filter(|a| a.active) {
        *per_date.entry(a.date_key()).or_default() += 1;
    }
    let live: Vec<Account> = accounts.iter().filter(|a| a.active).cloned().collect();
    OwnerStats {
        total: live.len(),
        countries: country_buckets(&live),
        per_date: per_date.into_iter().collect(),
        total_forwards: live.iter().map(|a| u64::from(a.forward_count)).sum(),
    }
}

fn country_buckets(accounts: &[Account]) -> Vec<CountryBucket> {
    let mut by_country: BTreeMap<&str, (&str, usize)> = BTreeMap::new();
    for a in accounts.iter().filter(|a| a.active) {
        let slot = by_country
            .entry(a.country_code.as_str())
            .or_insert((a.country_name.as_str(), 0));
        slot.1 += 1;
    }
    by_country
        .into_iter()
        .map(|(code, (name, count))| CountryBucket {
            country_code: code.to_string(),
            country_name: name.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dates,
        store::{
            tests::{date, new_account},
            FileStore,
        },
    };

    #[test]
    fn buckets_exist_only_for_live_accounts() {
        let s = FileStore::in_memory();
        let owner = UserId(1);
        let a = s.insert(new_account(1, "+1", "IR", date(2024, 1, 2))).unwrap();
        s.insert(new_account(1, "+2", "GB", date(2024, 1, 2))).unwrap();
        s.insert(new_account(2, "+3", "US", date(2024, 1, 2))).unwrap();

        let countries = countries_for(&s, owner).unwrap();
        let codes: Vec<&str> = countries.iter().map(|c| c.country_code.as_str()).collect();
        assert_eq!(codes, vec!["GB", "IR"]);
        assert!(countries.iter().all(|c| c.count > 0));

        s.soft_delete(owner, a).unwrap();
        let codes: Vec<String> = countries_for(&s, owner)
            .unwrap()
            .into_iter()
            .map(|c| c.country_code)
            .collect();
        assert_eq!(codes, vec!["GB".to_string()]);
    }

    #[test]
    fn dates_for_after_soft_delete() {
        let s = FileStore::in_memory();
        let owner = UserId(1);
        let a1 = s.insert(new_account(1, "+1", "IR", date(2024, 1, 2))).unwrap();
        let a2 = s.insert(new_account(1, "+2", "IR", date(2024, 1, 2))).unwrap();
        s.insert(new_account(1, "+3", "IR", date(2024, 1, 3))).unwrap();

        let buckets = dates_for(&s, owner, "IR").unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, dates::key_of(&date(2024, 1, 2)));
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].count, 1);

        s.soft_delete(owner, a1).unwrap();
        let buckets = dates_for(&s, owner, "IR").unwrap();
        assert_eq!(buckets[0].count, 1);

        s.soft_delete(owner, a2).unwrap();
        let buckets = dates_for(&s, owner, "IR").unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key, dates::key_of(&date(2024, 1, 3)));
    }

    #[test]
    fn dates_are_ascending() {
        let s = FileStore::in_memory();
        s.insert(new_account(1, "+1", "IR", date(2024, 3, 1))).unwrap();
        s.insert(new_account(1, "+2", "IR", date(2023, 12, 31))).unwrap();
        s.insert(new_account(1, "+3", "IR", date(2024, 1, 15))).unwrap();

        let keys: Vec<String> = dates_for(&s, UserId(1), "IR")
            .unwrap()
            .into_iter()
            .map(|b| b.key.to_iso())
            .collect();
        assert_eq!(keys, vec!["2023-12-31", "2024-01-15", "2024-03-01"]);
    }

    #[test]
    fn unknown_country_has_no_dates() {
        let s = FileStore::in_memory();
        s.insert(new_account(1, "+1", "IR", date(2024, 3, 1))).unwrap();
        assert!(dates_for(&s, UserId(1), "DE").unwrap().is_empty());
    }

    #[test]
    fn accounts_for_a_day() {
        let s = FileStore::in_memory();
        s.insert(new_account(1, "+1", "IR", date(2024, 1, 2))).unwrap();
        s.insert(new_account(1, "+2", "IR", date(2024, 1, 3))).unwrap();
        s.insert(new_account(1, "+3", "IR", date(2024, 1, 2))).unwrap();

        let key = dates::key_of(&date(2024, 1, 2));
        let phones: Vec<String> = accounts_for(&s, UserId(1), "IR", &key)
            .unwrap()
            .into_iter()
            .map(|a| a.phone)
            .collect();
        assert_eq!(phones, vec!["+1".to_string(), "+3".to_string()]);
    }

    #[test]
    fn pagination_is_zero_indexed() {
        let items: Vec<u32> = (1..=12).collect();
        let p0 = paginate(&items, 0, 5);
        assert_eq!(p0.items, vec![1, 2, 3, 4, 5]);
        assert_eq!(p0.total_pages, 3);
        assert!(!p0.has_prev());
        assert!(p0.has_next());

        let p2 = paginate(&items, 2, 5);
        assert_eq!(p2.items, vec![11, 12]);
        assert!(p2.has_prev());
        assert!(!p2.has_next());

        let out = paginate(&items, 3, 5);
        assert!(out.items.is_empty());
        assert!(!out.has_next());

        let empty: Page<u32> = paginate(&[], 0, 5);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.items.is_empty());
    }

    #[test]
    fn stats_summarize_live_accounts() {
        let s = FileStore::in_memory();
        let owner = UserId(1);
        let a = s.insert(new_account(1, "+1", "IR", date(2024, 1, 2))).unwrap();
        s.insert(new_account(1, "+2", "GB", date(2024, 1, 2))).unwrap();
        let gone = s.insert(new_account(1, "+3", "GB", date(2024, 1, 5))).unwrap();
        s.increment_forwards(owner, a).unwrap();
        s.soft_delete(owner, gone).unwrap();

        let stats = stats_for(&s, owner).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.countries.len(), 2);
        assert_eq!(stats.per_date.len(), 1);
        assert_eq!(stats.per_date[0].1, 2);
        assert_eq!(stats.total_forwards, 1);
    }
}
