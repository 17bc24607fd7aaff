/* ===============================================================================
HomeKitchen ordering bot.
Dialogue FSM. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use std::sync::Arc;
use derive_more::From;
use teloxide::{prelude::*,
   types::{InlineKeyboardMarkup, ParseMode, },
   dispatching::{dialogue::{self, InMemStorage}, UpdateHandler, },
   utils::command::BotCommands,
};

use crate::api::{Api, ApiError};
use crate::session::{Session, SessionStore};
use crate::checkout::{CheckoutPhase, InFlight};
use crate::form::{self, FormState};
use crate::general;
use crate::callback;

pub type MyDialogue = Dialogue<State, InMemStorage<State>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

// FSM states
#[derive(Clone, From)]
pub enum State {
   Start(StartState), // initial state
   Form(FormState), // entering fields of a form
   Checkout(CheckoutState), // reviewing the cart before placing orders
}

impl Default for State {
   fn default() -> Self {
      Self::Start(StartState { restarted: true })
   }
}

#[derive(Clone)]
pub struct StartState {
   pub restarted: bool,
}

#[derive(Clone)]
pub struct CheckoutState {
   pub phase: CheckoutPhase,
}

// Main menu
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
   #[command(description = "welcome screen")]
   Start,
   #[command(description = "this help")]
   Help,
   #[command(description = "log in with email and password")]
   Login,
   #[command(description = "create an account")]
   Signup,
   #[command(description = "log out, the cart is kept")]
   Logout,
   #[command(description = "list of kitchens")]
   Feed,
   #[command(description = "your cart")]
   Cart,
   #[command(description = "review and place orders")]
   Checkout,
   #[command(description = "your account")]
   Account,
   #[command(description = "register a kitchen (owners)")]
   NewKitchen,
   #[command(description = "orders to deliver (drivers)")]
   Driver,
   #[command(description = "approvals and users (admins)")]
   Admin,
   #[command(description = "state of the server")]
   Status,
   #[command(description = "stop entering a form")]
   Cancel,
}

// Things every handler needs
#[derive(Clone)]
pub struct Ctx {
   pub api: Api,
   pub store: Arc<dyn SessionStore>,
   pub in_flight: InFlight, // users placing orders now
}

impl Ctx {
   pub fn new(api: Api, store: Arc<dyn SessionStore>) -> Self {
      Self { api, store, in_flight: InFlight::default() }
   }

   // Private chats only, so chat id is the user id
   pub fn session(&self, chat_id: ChatId) -> Session {
      Session::new(self.store.clone(), chat_id.0)
   }
}

// ============================================================================
// [Screen helpers]
// ============================================================================

pub async fn send_html(bot: &Bot, chat_id: ChatId, text: String, markup: Option<InlineKeyboardMarkup>) -> HandlerResult {
   let mut req = bot.send_message(chat_id, text)
   .parse_mode(ParseMode::Html);

   if let Some(markup) = markup {
      req = req.reply_markup(markup);
   }

   req.await?;
   Ok(())
}

// Token of the user or an invitation to log in
pub async fn require_token(bot: &Bot, chat_id: ChatId, session: &Session) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
   let res = session.token().await?;
   if res.is_none() {
      bot.send_message(chat_id, "Please /login first, or /signup if you are new here.").await?;
   }
   Ok(res)
}

// Show the problem to the user. Expired token is dropped.
pub async fn report(bot: &Bot, chat_id: ChatId, session: &Session, err: ApiError, fallback: &str) -> HandlerResult {
   if let ApiError::Unauthorized = err {
      session.sign_out().await?;
   } else {
      log::info!("report for {}: {}", chat_id, err);
   }

   let text = err.reason(fallback);
   bot.send_message(chat_id, text).await?;
   Ok(())
}

pub fn escape(s: &str) -> String {
   teloxide::utils::html::escape(s)
}

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {

   let command_handler = teloxide::filter_command::<Command, _>()
   .endpoint(general::command);

   let message_handler = Update::filter_message()
   .branch(
      // Private message handler
      dptree::filter(|msg: Message| {
         msg.chat.is_private()
      })
      .branch(command_handler)
      .branch(dptree::case![State::Form(form_state)].endpoint(form::update))
      .branch(dptree::endpoint(general::fallback))
   )
   .branch(dptree::endpoint(general::group_message));

   let callback_query_handler = Update::filter_callback_query()
   .endpoint(callback::update);

   dialogue::enter::<Update, InMemStorage<State>, State, _>()
   .branch(message_handler)
   .branch(callback_query_handler)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn commands_are_lowercase() {
      assert_eq!(Command::parse("/newkitchen", "bot").unwrap(), Command::NewKitchen);
      assert_eq!(Command::parse("/checkout", "bot").unwrap(), Command::Checkout);
      assert!(Command::parse("/order", "bot").is_err());
   }

   #[test]
   fn fresh_dialogue_reports_restart() {
      assert!(matches!(State::default(), State::Start(StartState { restarted: true })));
   }
}
