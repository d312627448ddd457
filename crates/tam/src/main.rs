use std::sync::Arc;

use tam_core::{config::Config, store::FileStore};

#[tokio::main]
async fn main() -> Result<(), tam_core::Error> {
    tam_core::logging::init("tam")?;

    let cfg = Arc::new(Config::load()?);
    cfg.ensure_dirs()?;

    let store = Arc::new(FileStore::open(cfg.store_file.clone())?);
    tracing::info!(store = %cfg.store_file.display(), "store opened");

    tam_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| tam_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
