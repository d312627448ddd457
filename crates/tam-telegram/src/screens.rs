//! Message text + inline keyboard pairs for every menu the bot shows.
//!
//! Screens are plain data so callbacks can edit a message in place while
//! commands send the same screen as a new message.

use chrono::NaiveDate;

use tam_core::{
    dates::DateKey,
    domain::UserId,
    export::ExportFormat,
    formatting::{self, escape_html},
    index::{self, Page},
    messaging::types::{InlineButton, InlineKeyboard},
    store::{Account, AccountStore, Proxy},
    Result,
};

use crate::actions::CallbackAction;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screen {
    pub html: String,
    pub keyboard: InlineKeyboard,
}

impl Screen {
    pub fn new(html: impl Into<String>, keyboard: InlineKeyboard) -> Self {
        Self {
            html: html.into(),
            keyboard,
        }
    }
}

fn btn(label: impl Into<String>, action: CallbackAction) -> InlineButton {
    InlineButton::new(label, action.encode())
}

fn back(to: CallbackAction) -> InlineButton {
    btn("🔙 Back", to)
}

fn home() -> InlineButton {
    btn("🏠 Main Menu", CallbackAction::Menu)
}

/// Prev / counter / next row. Empty when everything fits on one page.
fn pager<T>(page: &Page<T>, to: impl Fn(usize) -> CallbackAction) -> Vec<InlineButton> {
    if page.total_pages <= 1 {
        return Vec::new();
    }
    let mut row = Vec::new();
    if page.has_prev() {
        row.push(btn("◀️ Prev", to(page.page - 1)));
    }
    row.push(btn(
        format!("{}/{}", page.page + 1, page.total_pages),
        CallbackAction::Noop,
    ));
    if page.has_next() {
        row.push(btn("Next ▶️", to(page.page + 1)));
    }
    row
}

pub fn main_menu(is_admin: bool) -> Screen {
    let mut kb = InlineKeyboard::new()
        .row(vec![
            btn("➕ Add Account", CallbackAction::AddAccount),
            btn("📱 My Accounts", CallbackAction::Countries { page: 0 }),
        ])
        .row(vec![
            btn("📦 Bulk Export", CallbackAction::ExportMenu),
            btn("🔒 Proxy Manager", CallbackAction::ProxyMenu),
        ])
        .row(vec![
            btn("📊 Statistics", CallbackAction::Stats),
            btn("❓ Help", CallbackAction::Help),
        ]);
    if is_admin {
        kb = kb.button("🛡 Admin Panel", CallbackAction::Admin.encode());
    }
    Screen::new("🏠 <b>Main Menu</b>\n\nChoose an option:", kb)
}

pub fn welcome(first_name: &str, is_admin: bool) -> Screen {
    Screen {
        html: formatting::welcome_html(first_name),
        ..main_menu(is_admin)
    }
}

pub fn help() -> Screen {
    Screen::new(
        formatting::help_html(),
        InlineKeyboard::new().row(vec![home()]),
    )
}

/// A prompt waiting for free-text input.
pub fn prompt(html: impl Into<String>) -> Screen {
    Screen::new(
        html,
        InlineKeyboard::new().button("❌ Cancel", CallbackAction::Cancel.encode()),
    )
}

pub fn stats(html: String) -> Screen {
    Screen::new(html, InlineKeyboard::new().row(vec![home()]))
}

// ============== Browsing ==============

pub fn countries(
    store: &dyn AccountStore,
    owner: UserId,
    page: usize,
    per_page: usize,
) -> Result<Screen> {
    let buckets = index::countries_for(store, owner)?;
    if buckets.is_empty() {
        return Ok(Screen::new(
            "📱 <b>My Accounts</b>\n\nYou haven't added any accounts yet!",
            InlineKeyboard::new()
                .button("➕ Add Account", CallbackAction::AddAccount.encode())
                .row(vec![home()]),
        ));
    }

    let total: usize = buckets.iter().map(|b| b.count).sum();
    let page = index::paginate(&buckets, page, per_page);
    let mut kb = InlineKeyboard::new();
    for b in &page.items {
        kb = kb.row(vec![btn(
            formatting::country_button_label(b),
            CallbackAction::Country {
                country_code: b.country_code.clone(),
                page: 0,
            },
        )]);
    }
    kb = kb
        .row(pager(&page, |p| CallbackAction::Countries { page: p }))
        .row(vec![home()]);

    Ok(Screen::new(
        format!(
            "📱 <b>My Accounts</b>\n\n\
             Total: <b>{total}</b> account(s) in <b>{}</b> countries.\n\
             Select a country:",
            page.total_items
        ),
        kb,
    ))
}

pub fn dates(
    store: &dyn AccountStore,
    owner: UserId,
    country_code: &str,
    page: usize,
    per_page: usize,
) -> Result<Screen> {
    let buckets = index::dates_for(store, owner, country_code)?;
    let name = tam_core::phone::country_name_for(country_code);
    let flag = tam_core::phone::flag_emoji(country_code);
    let back_to_countries = back(CallbackAction::Countries { page: 0 });

    if buckets.is_empty() {
        return Ok(Screen::new(
            format!(
                "{flag} <b>{}</b>\n\nNo accounts left for this country.",
                escape_html(&name)
            ),
            InlineKeyboard::new().row(vec![back_to_countries]),
        ));
    }

    let page = index::paginate(&buckets, page, per_page);
    let mut kb = InlineKeyboard::new();
    for b in &page.items {
        kb = kb.row(vec![btn(
            formatting::date_button_label(b),
            CallbackAction::Date {
                country_code: country_code.to_string(),
                key: b.key.clone(),
                page: 0,
            },
        )]);
    }
    kb = kb
        .row(pager(&page, |p| CallbackAction::Country {
            country_code: country_code.to_string(),
            page: p,
        }))
        .row(vec![back_to_countries, home()]);

    Ok(Screen::new(
        format!(
            "{flag} <b>{}</b>\n\nSelect a date:",
            escape_html(&name)
        ),
        kb,
    ))
}

pub fn accounts(
    store: &dyn AccountStore,
    owner: UserId,
    country_code: &str,
    key: &DateKey,
    page: usize,
    per_page: usize,
) -> Result<Screen> {
    let list = index::accounts_for(store, owner, country_code, key)?;
    let back_to_dates = back(CallbackAction::Country {
        country_code: country_code.to_string(),
        page: 0,
    });
    let flag = tam_core::phone::flag_emoji(country_code);

    if list.is_empty() {
        return Ok(Screen::new(
            format!("{flag} 📅 <b>{key}</b>\n\nNo accounts for this date."),
            InlineKeyboard::new().row(vec![back_to_dates]),
        ));
    }

    let page = index::paginate(&list, page, per_page);
    let mut kb = InlineKeyboard::new();
    for a in &page.items {
        kb = kb.row(vec![btn(
            format!("📱 {}", a.phone),
            CallbackAction::Account(a.id),
        )]);
    }
    kb = kb
        .row(pager(&page, |p| CallbackAction::Date {
            country_code: country_code.to_string(),
            key: key.clone(),
            page: p,
        }))
        .row(vec![back_to_dates, home()]);

    Ok(Screen::new(
        format!(
            "{flag} 📅 <b>{key}</b>\n\n{} account(s). Select one:",
            page.total_items
        ),
        kb,
    ))
}

pub fn account_detail(account: &Account, today: &NaiveDate) -> Screen {
    let kb = InlineKeyboard::new()
        .row(vec![
            btn("📋 Copy Phone", CallbackAction::CopyPhone(account.id)),
            btn("📤 Code Forwarded", CallbackAction::Forwarded(account.id)),
        ])
        .row(vec![btn("🗑 Delete", CallbackAction::Delete(account.id))])
        .row(vec![
            back(CallbackAction::Date {
                country_code: account.country_code.clone(),
                key: account.date_key(),
                page: 0,
            }),
            home(),
        ]);
    Screen::new(formatting::account_detail_html(account, today), kb)
}

pub fn confirm_delete(account: &Account) -> Screen {
    Screen::new(
        format!(
            "⚠️ <b>Delete account?</b>\n\n📱 <code>{}</code>\n\n\
             Its session file will be removed as well.",
            escape_html(&account.phone)
        ),
        InlineKeyboard::new().row(vec![
            btn("✅ Yes, delete", CallbackAction::ConfirmDelete(account.id)),
            btn("❌ No", CallbackAction::Account(account.id)),
        ]),
    )
}

// ============== Export ==============

pub fn export_menu() -> Screen {
    let mut kb = InlineKeyboard::new();
    for format in ExportFormat::ALL {
        kb = kb.row(vec![
            btn(
                format!("📦 {}", format.label()),
                CallbackAction::ExportFormat {
                    format,
                    manifest: false,
                },
            ),
            btn(
                format!("📦 {} + Stats", format.label()),
                CallbackAction::ExportFormat {
                    format,
                    manifest: true,
                },
            ),
        ]);
    }
    Screen::new(
        formatting::export_menu_html(),
        kb.row(vec![home()]),
    )
}

/// Count prompt for a chosen format. Free-text numbers are handled by the
/// dialogue; the buttons cover the common cases.
pub fn export_options(format: ExportFormat, manifest: bool, available: usize) -> Screen {
    let manifest_label = if manifest {
        "☑️ Stats file: on"
    } else {
        "⬜ Stats file: off"
    };
    let kb = InlineKeyboard::new()
        .button(
            format!("📦 Export all ({available})"),
            CallbackAction::ExportRun {
                format,
                manifest,
                limit: 0,
            }
            .encode(),
        )
        .button(
            manifest_label,
            CallbackAction::ExportFormat {
                format,
                manifest: !manifest,
            }
            .encode(),
        )
        .row(vec![back(CallbackAction::ExportMenu), home()]);
    Screen::new(formatting::export_count_prompt_html(format, available), kb)
}

// ============== Proxies ==============

pub fn proxies(list: &[Proxy]) -> Screen {
    let mut html = String::from("🔒 <b>Proxy Manager</b>\n\n");
    if list.is_empty() {
        html.push_str("You have no proxies yet.");
    } else {
        html.push_str(&format!("You have <b>{}</b> proxy(ies):", list.len()));
    }

    let mut kb = InlineKeyboard::new();
    for p in list {
        kb = kb.row(vec![btn(
            format!("🌐 {}", p.label()),
            CallbackAction::Proxy(p.id),
        )]);
    }
    kb = kb
        .button("➕ Add Proxy", CallbackAction::ProxyAdd.encode())
        .row(vec![home()]);
    Screen::new(html, kb)
}

pub fn proxy_detail(proxy: &Proxy) -> Screen {
    let kb = InlineKeyboard::new()
        .row(vec![
            btn("🧪 Test", CallbackAction::ProxyTest(proxy.id)),
            btn("🗑 Delete", CallbackAction::ProxyDelete(proxy.id)),
        ])
        .row(vec![back(CallbackAction::ProxyMenu), home()]);
    Screen::new(formatting::proxy_detail_html(proxy), kb)
}

pub fn confirm_proxy_delete(proxy: &Proxy) -> Screen {
    Screen::new(
        format!(
            "⚠️ <b>Delete proxy?</b>\n\n🌐 {}",
            escape_html(&proxy.label())
        ),
        InlineKeyboard::new().row(vec![
            btn("✅ Yes, delete", CallbackAction::ProxyDeleteConfirm(proxy.id)),
            btn("❌ No", CallbackAction::Proxy(proxy.id)),
        ]),
    )
}

// ============== Admin ==============

pub fn admin_panel() -> Screen {
    Screen::new(
        "🛡 <b>Admin Panel</b>",
        InlineKeyboard::new()
            .button("✅ Whitelist", CallbackAction::AdminWhitelist.encode())
            .button("📊 Global Stats", CallbackAction::AdminStats.encode())
            .row(vec![home()]),
    )
}

pub fn whitelist(html: String) -> Screen {
    Screen::new(
        html,
        InlineKeyboard::new()
            .row(vec![
                btn("➕ Add User", CallbackAction::WhitelistAdd),
                btn("➖ Remove User", CallbackAction::WhitelistRemove),
            ])
            .row(vec![back(CallbackAction::Admin)]),
    )
}

pub fn admin_stats(html: String) -> Screen {
    Screen::new(
        html,
        InlineKeyboard::new().row(vec![back(CallbackAction::Admin), home()]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tam_core::store::{AccountStore, FileStore, NewAccount};

    fn add(store: &FileStore, phone: &str, cc: &str, day: u32) {
        store
            .insert(NewAccount {
                owner: UserId(1),
                phone: phone.to_string(),
                country_code: cc.to_string(),
                country_name: tam_core::phone::country_name_for(cc),
                added_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                session_ref: None,
            })
            .unwrap();
    }

    fn callbacks(s: &Screen) -> Vec<String> {
        s.keyboard
            .buttons()
            .map(|b| b.callback_data.clone())
            .collect()
    }

    #[test]
    fn every_button_parses_back() {
        let store = FileStore::in_memory();
        add(&store, "+989123456789", "IR", 1);
        let key = DateKey::from_compact("20240101").unwrap();
        let screens = vec![
            main_menu(true),
            help(),
            countries(&store, UserId(1), 0, 5).unwrap(),
            dates(&store, UserId(1), "IR", 0, 5).unwrap(),
            accounts(&store, UserId(1), "IR", &key, 0, 5).unwrap(),
            export_menu(),
            export_options(ExportFormat::Telethon, true, 3),
            proxies(&[]),
            admin_panel(),
            whitelist(String::new()),
        ];
        for s in &screens {
            for data in callbacks(s) {
                assert!(CallbackAction::parse(&data).is_some(), "{data}");
            }
        }
    }

    #[test]
    fn admin_button_only_for_admins() {
        let admin = CallbackAction::Admin.encode();
        assert!(callbacks(&main_menu(true)).contains(&admin));
        assert!(!callbacks(&main_menu(false)).contains(&admin));
    }

    #[test]
    fn countries_paginate() {
        let store = FileStore::in_memory();
        add(&store, "+989123456789", "IR", 1);
        add(&store, "+12025550123", "US", 1);
        add(&store, "+447911123456", "GB", 2);

        let first = countries(&store, UserId(1), 0, 2).unwrap();
        let data = callbacks(&first);
        assert!(data.contains(&"country:GB:0".to_string()));
        assert!(data.contains(&"country:IR:0".to_string()));
        assert!(data.contains(&"countries:1".to_string()));
        assert!(!data.iter().any(|d| d == "country:US:0"));

        let second = countries(&store, UserId(1), 1, 2).unwrap();
        let data = callbacks(&second);
        assert!(data.contains(&"country:US:0".to_string()));
        assert!(data.contains(&"countries:0".to_string()));
    }

    #[test]
    fn empty_views_offer_a_way_out() {
        let store = FileStore::in_memory();
        let s = countries(&store, UserId(1), 0, 5).unwrap();
        assert!(s.html.contains("haven't added"));
        assert!(callbacks(&s).contains(&"add_account".to_string()));

        let s = dates(&store, UserId(1), "IR", 0, 5).unwrap();
        assert_eq!(callbacks(&s), vec!["countries:0".to_string()]);
    }

    #[test]
    fn export_options_toggle_manifest() {
        let s = export_options(ExportFormat::Pyrogram, false, 7);
        let data = callbacks(&s);
        assert!(data.contains(&"export_run:pyrogram:0:0".to_string()));
        assert!(data.contains(&"export:pyrogram:1".to_string()));
        assert!(s.html.contains("<b>7</b>"));
    }
}
