/* ===============================================================================
HomeKitchen ordering bot.
Main module. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use std::{env, fmt::Debug, net::SocketAddr, sync::Arc};
use futures::future::BoxFuture;
use teloxide::{prelude::*,
   dispatching::dialogue::InMemStorage,
   error_handlers::ErrorHandler,
   update_listeners::webhooks,
};
use reqwest::Url;

mod environment;
mod models;
mod api;
mod session;
mod database;
mod cart;
mod orders;
mod checkout;
mod states;
mod form;
mod general;
mod registration;
mod customer;
mod navigation;
mod basket;
mod caterer;
mod driver;
mod admin;
mod callback;
use crate::states::*;
use crate::session::{MemStore, SessionStore};

// ============================================================================
// [Run!]
// ============================================================================
#[tokio::main]
async fn main() {
   run().await;
}

struct MyErrorHandler {}
impl<E> ErrorHandler<E> for MyErrorHandler
where
    E: Debug,
{
    fn handle_error(self: Arc<Self>, error: E) -> BoxFuture<'static, ()> {
      let text = format!("main::handle_error: {:?}", error);
      log::error!("{}", text);

      let fut = async move {
         if environment::log(&text).await.is_none() {
            log::info!("main::Unable to send message to the service chat");
         };
      };

      Box::pin(fut)
   }
}

// Sessions survive restarts only with the database
async fn session_store(vars: &environment::Vars) -> Arc<dyn SessionStore> {
   let database_url = match &vars.database_url {
      Some(url) => url,
      None => {
         log::info!("There is no environment variable DATABASE_URL, sessions are kept in memory");
         return Arc::new(MemStore::default());
      }
   };

   if let Err(e) = database::connect(database_url) {
      log::error!("{}", e);
      environment::log(&format!("Database connection error: {}, sessions are kept in memory", e)).await;
      return Arc::new(MemStore::default());
   }

   // Check and create tables
   if database::is_tables_exist().await {
      log::info!("Table sessions exist, open existing data");
   } else {
      log::info!("Table sessions do not exist, create new tables: {}", database::is_success(database::create_tables().await));
   }

   Arc::new(database::PgStore)
}

async fn run() {
   let mut builder = pretty_env_logger::formatted_timed_builder();
   builder.parse_filters(&env::var("RUST_LOG").unwrap_or_else(|_| String::from("info")));
   builder.init();

   log::info!("Starting...");

   let bot = Bot::from_env();

   // Settings from environments
   let vars = environment::Vars::from_env();
   if environment::VARS.set(vars).is_err() {
      log::info!("Something wrong with settings");
   }
   let vars = environment::vars();
   environment::set_service_chat(bot.clone());
   environment::log(&format!("Bot restarted, API {}, {}", vars.api_url, environment::time_zone_info())).await;

   let ctx = Ctx::new(api::Api::new(&vars.api_url), session_store(vars).await);

   let mut dispatcher = Dispatcher::builder(bot.clone(), states::schema())
   .dependencies(dptree::deps![InMemStorage::<State>::new(), ctx])
   .default_handler(|upd| async move {
      environment::log(&format!("main::Unhandled update: {:?}", upd)).await;
   })
   // If the dispatcher fails for some reason, execute this handler.
   .error_handler(Arc::new(MyErrorHandler{}))
   .enable_ctrlc_handler()
   .build();

   // Webhook when the host is known, else polling
   match (&vars.host, vars.port) {
      (Some(host), Some(port)) => {
         let addr = SocketAddr::from(([0, 0, 0, 0], port));
         let url = match Url::parse(&format!("https://{}/webhook", host)) {
            Ok(url) => url,
            Err(e) => {
               log::error!("Wrong HOST {}: {}", host, e);
               return;
            }
         };

         let listener = match webhooks::axum(bot, webhooks::Options::new(addr, url)).await {
            Ok(listener) => listener,
            Err(e) => {
               log::error!("Cannot setup a webhook: {}", e);
               environment::log(&format!("Cannot setup a webhook: {}", e)).await;
               return;
            }
         };

         dispatcher
         .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("main::An error from the update listener"),
         )
         .await;
      }
      _ => {
         log::info!("There are no HOST and PORT, long polling");
         dispatcher.dispatch().await;
      }
   }
}
