/* ===============================================================================
HomeKitchen ordering bot.
General commands. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use teloxide::{prelude::*, utils::command::BotCommands, };

use crate::states::*;
use crate::models::{OrderStatus, Role};
use crate::environment as env;
use crate::form::{self, FormKind};
use crate::registration;
use crate::customer;
use crate::navigation;
use crate::basket;
use crate::caterer;
use crate::driver;
use crate::admin;

pub async fn command(bot: Bot, msg: Message, dialogue: MyDialogue, ctx: Ctx, state: State, cmd: Command) -> HandlerResult {
   let chat_id = msg.chat.id;

   // Report about a possible restart and loss of context
   if let State::Start(StartState { restarted: true }) = state {
      bot.send_message(chat_id, "Sorry, the bot was restarted").await?;
   }

   // Any command ends the form in progress
   dialogue.update(StartState { restarted: false }).await?;

   match cmd {
      Command::Start => start(&bot, chat_id, &ctx).await,
      Command::Help => {
         bot.send_message(chat_id, Command::descriptions().to_string()).await?;
         Ok(())
      }
      Command::Login => form::enter(&bot, chat_id, &dialogue, FormKind::Login).await,
      Command::Signup => form::enter(&bot, chat_id, &dialogue, FormKind::Signup).await,
      Command::Logout => registration::logout(&bot, chat_id, &ctx).await,
      Command::Feed => navigation::feed(&bot, chat_id, &ctx).await,
      Command::Cart => basket::view(&bot, chat_id, &ctx).await,
      Command::Checkout => basket::review(&bot, chat_id, &dialogue, &ctx).await,
      Command::Account => customer::account(&bot, chat_id, &ctx).await,
      Command::NewKitchen => caterer::new_kitchen(&bot, chat_id, &dialogue, &ctx).await,
      Command::Driver => driver::enter(&bot, chat_id, &ctx, OrderStatus::Claimed).await,
      Command::Admin => admin::enter(&bot, chat_id, &ctx).await,
      Command::Status => status(&bot, chat_id, &ctx).await,
      Command::Cancel => {
         let text = match state {
            State::Form(_) => "Cancelled",
            _ => "Nothing to cancel",
         };
         bot.send_message(chat_id, text).await?;
         Ok(())
      }
   }
}

async fn start(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> HandlerResult {
   let session = ctx.session(chat_id);
   let text = match session.role().await? {
      Some(role) => format!("Welcome back! You are logged in as {}.\n/feed to see the kitchens, /help for all commands", role),
      None => String::from("Welcome to HomeKitchen, home-cooked food from your neighbours.\n/login or /signup to start, /help for all commands"),
   };
   bot.send_message(chat_id, text).await?;
   Ok(())
}

// Health of the remote API
async fn status(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> HandlerResult {
   let text = match ctx.api.health().await {
      Ok(text) => text,
      Err(err) => {
         log::info!("status: {}", err);
         String::from("Error checking health")
      }
   };
   bot.send_message(chat_id, text).await?;
   Ok(())
}

// First screen after login
pub async fn land(bot: &Bot, chat_id: ChatId, ctx: &Ctx, role: Role) -> HandlerResult {
   match role {
      Role::Driver => driver::enter(bot, chat_id, ctx, OrderStatus::Claimed).await,
      Role::Admin => admin::enter(bot, chat_id, ctx).await,
      Role::Customer | Role::Owner => navigation::feed(bot, chat_id, ctx).await,
   }
}

// Text outside of forms
pub async fn fallback(bot: Bot, msg: Message, dialogue: MyDialogue, state: State) -> HandlerResult {
   let chat_id = msg.chat.id;

   if let State::Start(StartState { restarted: true }) = state {
      bot.send_message(chat_id, "Sorry, the bot was restarted").await?;
      dialogue.update(StartState { restarted: false }).await?;
   }

   let text = match msg.text() {
      Some(_) => "Please use the buttons or commands, /help for the list",
      None => "Text message, please!",
   };
   bot.send_message(chat_id, text).await?;
   Ok(())
}

// In groups only tell the chat id, needed to set up the service chat
pub async fn group_message(bot: Bot, msg: Message) -> HandlerResult {
   let input = msg.text().unwrap_or_default();
   if input.starts_with("/chat") {
      let text = format!("Chat id={}", msg.chat.id);
      bot.send_message(msg.chat.id, text).await?;
   }
   Ok(())
}

// Mirror important events
pub async fn log_event(chat_id: ChatId, text: &str) {
   let text = format!("{}: {}", chat_id, text);
   log::info!("{}", text);
   env::log(&text).await;
}
