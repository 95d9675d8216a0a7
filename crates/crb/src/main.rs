use std::sync::Arc;

use crb_core::{config::Config, registry::ClientRegistry, relay::RelayService};

#[tokio::main]
async fn main() -> Result<(), crb_core::Error> {
    crb_core::logging::init("crb")?;

    let cfg = Arc::new(Config::load()?);

    // A malformed registry document is an unrecoverable startup fault.
    let registry = ClientRegistry::load(&cfg.clients_file)?;
    let relay = Arc::new(RelayService::new(cfg.clone(), registry));

    crb_telegram::router::run_polling(cfg, relay)
        .await
        .map_err(|e| crb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
