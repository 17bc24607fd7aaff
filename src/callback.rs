/* ===============================================================================
HomeKitchen ordering bot.
Callback from inline button. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use parse_display::{Display, FromStr};
use teloxide::{
   prelude::*,
   types::{CallbackQuery, InlineKeyboardButton, },
};

use crate::states::*;
use crate::models::OrderStatus;
use crate::navigation;
use crate::basket;
use crate::caterer;
use crate::driver;
use crate::admin;

// Data of inline buttons, short enough for the 64 bytes limit
#[derive(Clone, Copy, Debug, PartialEq, Display, FromStr)]
pub enum Command {
   #[display("fed")]
   Feed, // list of kitchens
   #[display("kit{0}")]
   Kitchen(i64), // page of the kitchen
   #[display("pln{0}:{1}")]
   MealPlan(i64, i64), // items of the plan of the kitchen
   #[display("add{0}:{1}")]
   AddToCart(i64, i64), // kitchen id, menu item id
   #[display("crt")]
   Cart,
   #[display("inc{0}:{1}")]
   IncAmount(i64, i64), // kitchen id, menu item id of the cart line
   #[display("dec{0}:{1}")]
   DecAmount(i64, i64),
   #[display("del{0}:{1}")]
   Remove(i64, i64),
   #[display("chk")]
   Review, // checkout screen
   #[display("pay")]
   PlaceOrders,
   #[display("nmi{0}")]
   NewMenuItem(i64), // kitchen id
   #[display("nmp{0}")]
   NewMealPlan(i64),
   #[display("dmi{0}:{1}")]
   DeleteMenuItem(i64, i64), // kitchen id, item id
   #[display("dmp{0}:{1}")]
   DeleteMealPlan(i64, i64), // kitchen id, plan id
   #[display("tab{0}")]
   DriverTab(OrderStatus),
   #[display("clm{0}")]
   Claim(i64), // order id
   #[display("cmp{0}")]
   Complete(i64),
   #[display("apd{0}")]
   ApproveDriver(i64),
   #[display("apk{0}")]
   ApproveKitchen(i64),
   #[display("rmu{0}")]
   DeleteUser(i64),
}

pub fn button(text: &str, cmd: Command) -> InlineKeyboardButton {
   InlineKeyboardButton::callback(text, cmd.to_string())
}

pub async fn update(bot: Bot, q: CallbackQuery, dialogue: MyDialogue, ctx: Ctx, state: State) -> HandlerResult {
   let chat_id = ChatId::from(q.from.id);
   let query_id = q.id.clone();

   let cmd = q.data.as_deref().and_then(|s| s.parse::<Command>().ok());
   let notice = match cmd {
      Some(cmd) => execute(&bot, chat_id, &dialogue, &ctx, state, cmd).await?,
      None => {
         log::info!("callback::update unknown data {:?}", q.data);
         Some(String::from("Unknown command, perhaps the message is too old"))
      }
   };

   // Stop the spinner on the button
   let mut answer = bot.answer_callback_query(query_id);
   if let Some(text) = notice {
      answer = answer.text(text);
   }
   answer.await?;
   Ok(())
}

// Popup text if any
async fn execute(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx, state: State, cmd: Command) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
   // Buttons of other screens end any form in progress
   if let State::Form(_) = state {
      dialogue.update(StartState { restarted: false }).await?;
   }

   match cmd {
      Command::Feed => navigation::feed(bot, chat_id, ctx).await?,
      Command::Kitchen(kitchen_id) => navigation::kitchen(bot, chat_id, ctx, kitchen_id).await?,
      Command::MealPlan(kitchen_id, plan_id) => navigation::meal_plan(bot, chat_id, ctx, kitchen_id, plan_id).await?,
      Command::AddToCart(kitchen_id, item_id) => return navigation::add_to_cart(bot, chat_id, ctx, kitchen_id, item_id).await,
      Command::Cart => basket::view(bot, chat_id, ctx).await?,
      Command::IncAmount(kitchen_id, item_id) => return basket::inc(bot, chat_id, ctx, kitchen_id, item_id).await,
      Command::DecAmount(kitchen_id, item_id) => return basket::dec(bot, chat_id, ctx, kitchen_id, item_id).await,
      Command::Remove(kitchen_id, item_id) => return basket::remove(bot, chat_id, ctx, kitchen_id, item_id).await,
      Command::Review => basket::review(bot, chat_id, dialogue, ctx).await?,
      Command::PlaceOrders => return basket::place_orders(bot, chat_id, dialogue, ctx).await,
      Command::NewMenuItem(kitchen_id) => caterer::new_menu_item(bot, chat_id, dialogue, ctx, kitchen_id).await?,
      Command::NewMealPlan(kitchen_id) => caterer::new_meal_plan(bot, chat_id, dialogue, ctx, kitchen_id).await?,
      Command::DeleteMenuItem(kitchen_id, item_id) => return caterer::delete_menu_item(bot, chat_id, ctx, kitchen_id, item_id).await,
      Command::DeleteMealPlan(kitchen_id, plan_id) => return caterer::delete_meal_plan(bot, chat_id, ctx, kitchen_id, plan_id).await,
      Command::DriverTab(status) => driver::enter(bot, chat_id, ctx, status).await?,
      Command::Claim(order_id) => return driver::claim(bot, chat_id, ctx, order_id).await,
      Command::Complete(order_id) => return driver::complete(bot, chat_id, ctx, order_id).await,
      Command::ApproveDriver(uid) => return admin::approve_driver(bot, chat_id, ctx, uid).await,
      Command::ApproveKitchen(kitchen_id) => return admin::approve_kitchen(bot, chat_id, ctx, kitchen_id).await,
      Command::DeleteUser(uid) => return admin::delete_user(bot, chat_id, ctx, uid).await,
   }
   Ok(None)
}
