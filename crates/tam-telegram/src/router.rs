use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use tam_core::{
    accounts::AccountService,
    config::Config,
    export::Exporter,
    messaging::port::MessagingPort,
    messaging::throttled::{ThrottleConfig, ThrottledMessenger},
    proxies::ProxyService,
    security::{RateLimiter, Whitelist},
    sessions::SessionDir,
    store::FileStore,
    utils::AuditLogger,
};

use crate::dialogue::Dialogues;
use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<FileStore>,
    pub accounts: AccountService,
    pub proxies: ProxyService,
    pub exporter: Exporter,
    pub whitelist: Whitelist,
    pub messenger: Arc<dyn MessagingPort>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub chat_locks: Arc<ChatLocks>,
    pub dialogues: Arc<Dialogues>,
    pub audit: Arc<AuditLogger>,
}

impl AppState {
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<FileStore>,
        messenger: Arc<dyn MessagingPort>,
    ) -> tam_core::Result<Self> {
        let audit = AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json);
        let sessions = Arc::new(SessionDir::new(cfg.sessions_dir.clone())?);

        Ok(Self {
            accounts: AccountService::new(store.clone(), sessions, Some(audit.clone())),
            proxies: ProxyService::new(store.clone(), Some(audit.clone()), cfg.proxy_test_timeout),
            exporter: Exporter::new(cfg.exports_dir.clone(), cfg.export_prefix.clone()),
            whitelist: Whitelist::new(
                cfg.telegram_allowed_users.clone(),
                cfg.admin_ids.clone(),
                Some(cfg.whitelist_file.clone()),
                store.clone(),
            ),
            messenger,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
                cfg.rate_limit_enabled,
                cfg.rate_limit_requests,
                cfg.rate_limit_window,
            ))),
            chat_locks: Arc::new(ChatLocks::default()),
            dialogues: Arc::new(Dialogues::default()),
            audit: Arc::new(audit),
            store,
            cfg,
        })
    }
}

#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>, store: Arc<FileStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "bot started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed"),
    }
    tracing::info!(
        allowed_users = cfg.telegram_allowed_users.len(),
        admins = cfg.admin_ids.len(),
        data_dir = %cfg.data_dir.display(),
        "configuration loaded"
    );

    // The adapter still retries a single 429 RetryAfter on its own.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let state = Arc::new(AppState::new(cfg, store, messenger)?);

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
