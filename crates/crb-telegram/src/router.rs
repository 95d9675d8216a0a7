use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use crb_core::{config::Config, messaging::port::MessagingPort, relay::RelayService};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub relay: Arc<RelayService>,
    pub messenger: Arc<dyn MessagingPort>,
}

pub async fn run_polling(cfg: Arc<Config>, relay: Arc<RelayService>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    // Basic startup info.
    if let Ok(me) = bot.get_me().await {
        println!("crb started: @{}", me.username());
    }
    println!("Known clients: {}", relay.client_count().await);
    match cfg.crm_group_id {
        Some(id) => println!("CRM group: {id}"),
        None => println!("CRM group not configured; staff commands disabled"),
    }
    if let Some(id) = cfg.superchat_id {
        println!("Broadcast channel: {id}");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    let state = Arc::new(AppState {
        cfg,
        relay,
        messenger,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
