/* ===============================================================================
HomeKitchen ordering bot.
Cart screen and checkout. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use teloxide::{prelude::*, types::InlineKeyboardMarkup, };

use crate::states::*;
use crate::cart::*;
use crate::orders::*;
use crate::checkout::{self, CheckoutOutcome, CheckoutPhase, InFlightGuard, PLACING, };
use crate::environment as env;
use crate::callback::{self as cb, button, };
use crate::general;
use crate::navigation;

type NoticeResult = Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

const EMPTY: &str = "Your cart is empty.";

// ============================================================================
// [Cart]
// ============================================================================

pub fn cart_desc(cart: &Cart) -> String {
   if cart.is_empty() {
      return String::from(EMPTY);
   }

   let info = Orders::from(cart).cart_info();
   let init = format!("<b>Cart</b>: {} pos., {} pcs. from {} kitchen(s)", cart.lines().len(), info.items_num, info.orders_num);
   let res = cart.lines().iter()
   .enumerate()
   .fold(init, |acc, (i, line)| {
      format!("{}\n\n{}. {} × {} = {}\n<i>{}</i>",
         acc,
         i + 1,
         escape(&line.name),
         line.quantity,
         env::price_with_unit(line.cost()),
         escape(&line.kitchen_name),
      )
   });

   format!("{}\n\nTotal: <b>{}</b>", res, env::price_with_unit(info.total_cost))
}

// Buttons are numbered like the lines in the text
fn cart_markup(cart: &Cart) -> InlineKeyboardMarkup {
   let mut rows: Vec<_> = cart.lines().iter()
   .enumerate()
   .map(|(i, line)| {
      let (kitchen_id, item_id) = (line.kitchen_id, line.item_id);
      vec![
         button(&format!("{}. −", i + 1), cb::Command::DecAmount(kitchen_id, item_id)),
         button(&format!("{}. +", i + 1), cb::Command::IncAmount(kitchen_id, item_id)),
         button(&format!("{}. ✕", i + 1), cb::Command::Remove(kitchen_id, item_id)),
      ]
   })
   .collect();

   if !cart.is_empty() {
      rows.push(vec![button("Checkout", cb::Command::Review)]);
   }
   rows.push(vec![button("Kitchens", cb::Command::Feed)]);
   InlineKeyboardMarkup::new(rows)
}

pub async fn view(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> HandlerResult {
   let cart = ctx.session(chat_id).cart().await?;
   send_html(bot, chat_id, cart_desc(&cart), Some(cart_markup(&cart))).await
}

// Change the cart and show it again
async fn change(bot: &Bot, chat_id: ChatId, ctx: &Ctx, f: impl FnOnce(&mut Cart) -> Result<(), String>) -> NoticeResult {
   let session = ctx.session(chat_id);
   let mut cart = session.cart().await?;
   if let Err(err) = f(&mut cart) {
      log::info!("basket::change for {}: {}", chat_id, err);
      return Ok(Some(String::from("This line is no longer in the cart")));
   }

   session.save_cart(&cart).await?;
   send_html(bot, chat_id, cart_desc(&cart), Some(cart_markup(&cart))).await?;
   Ok(None)
}

pub async fn inc(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64, item_id: i64) -> NoticeResult {
   change(bot, chat_id, ctx, |cart| cart.increment(kitchen_id, item_id)).await
}

pub async fn dec(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64, item_id: i64) -> NoticeResult {
   change(bot, chat_id, ctx, |cart| cart.decrement(kitchen_id, item_id)).await
}

pub async fn remove(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64, item_id: i64) -> NoticeResult {
   change(bot, chat_id, ctx, |cart| cart.remove(kitchen_id, item_id).map(|_| ())).await
}

// ============================================================================
// [Checkout]
// ============================================================================

pub fn review_desc(orders: &Orders, address: Option<&str>) -> String {
   let address = match address {
      Some(a) => escape(a),
      None => String::from("No address on file"),
   };
   let init = format!("<b>Checkout</b>\nDelivery address: {}", address);

   if orders.is_empty() {
      return format!("{}\n\n{}", init, EMPTY);
   }

   let res = orders.groups()
   .fold(init, |acc, group| {
      let items = group.lines.iter()
      .fold(String::default(), |acc, line| {
         format!("{}\n{} × {}", acc, escape(&line.name), line.quantity)
      });

      format!("{}\n\n<b>{}</b>{}\nSubtotal: {}",
         acc,
         escape(&group.kitchen_name),
         items,
         env::price_with_unit(group.subtotal),
      )
   });

   format!("{}\n\nTotal: <b>{}</b>", res, env::price_with_unit(orders.grand_total()))
}

// Placing is possible only with something to order and nothing on the way
pub fn review_markup(orders: &Orders, submitting: bool) -> InlineKeyboardMarkup {
   let mut rows = Vec::new();
   if !orders.is_empty() && !submitting {
      rows.push(vec![button("Place orders", cb::Command::PlaceOrders)]);
   }
   rows.push(vec![
      button("🛒 Cart", cb::Command::Cart),
      button("Kitchens", cb::Command::Feed),
   ]);
   InlineKeyboardMarkup::new(rows)
}

pub async fn review(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx) -> HandlerResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(()),
   };

   // Address is only informational
   let me = ctx.api.me(&token).await;
   if let Err(err) = &me {
      log::info!("basket::review no address for {}: {}", chat_id, err);
   }
   let address = me.as_ref().ok().and_then(|me| me.first_address());

   let cart = session.cart().await?;
   let orders = Orders::from(&cart);
   let submitting = ctx.in_flight.is_submitting(chat_id.0);
   let phase = if submitting { CheckoutPhase::Submitting } else { CheckoutPhase::Idle };
   let mut text = review_desc(&orders, address);
   if submitting {
      text = format!("{}\n\n<i>{}</i>", text, PLACING);
   }

   dialogue.update(CheckoutState { phase }).await?;
   send_html(bot, chat_id, text, Some(review_markup(&orders, submitting))).await
}

pub async fn place_orders(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx) -> NoticeResult {
   // Ignore taps while the orders are being placed, from whatever screen they come
   let guard = match ctx.in_flight.begin(chat_id.0) {
      Ok(guard) => guard,
      Err(text) => return Ok(Some(text.to_string())),
   };

   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(None),
   };

   if session.cart().await?.is_empty() {
      return Ok(Some(String::from(EMPTY)));
   }

   dialogue.update(CheckoutState { phase: CheckoutPhase::Submitting }).await?;

   // Wait for the kitchens outside of the update handler so that the chat stays responsive
   let (bot, dialogue, ctx) = (bot.clone(), dialogue.clone(), ctx.clone());
   tokio::spawn(async move {
      let res = submit(&bot, chat_id, &dialogue, &ctx, &token, guard).await;
      if let Err(err) = res {
         general::log_event(chat_id, &format!("basket::submit: {}", err)).await;
         if let Err(err) = bot.send_message(chat_id, "Unable to place orders, please check /cart and try again").await {
            log::error!("basket::submit message for {}: {}", chat_id, err);
         }

         // Allow to try again
         if let Err(err) = dialogue.update(CheckoutState { phase: CheckoutPhase::Idle }).await {
            log::error!("basket::submit dialogue for {}: {}", chat_id, err);
         }
      }
   });

   Ok(Some(String::from(PLACING)))
}

async fn submit(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx, token: &str, guard: InFlightGuard) -> HandlerResult {
   let session = ctx.session(chat_id);
   let now = env::current_date_time();
   let window = env::delivery_window();

   let outcome = checkout::checkout(&session, &ctx.api, token, now, window).await;

   // Kitchens have answered, the next tap is a new attempt
   drop(guard);
   let outcome = outcome?;
   if let CheckoutOutcome::Failed(failure) = &outcome {
      if failure.is_unauthorized() {
         session.sign_out().await?;
      }
   }

   match CheckoutPhase::finish(&outcome) {
      CheckoutPhase::Success => {
         dialogue.update(StartState { restarted: false }).await?;
         let eta = checkout::eta(now, window);
         general::log_event(chat_id, &format!("orders placed, ETA {}", eta)).await;

         let text = format!("Orders placed! Expected at about {}", eta);
         bot.send_message(chat_id, text).await?;
         navigation::feed(bot, chat_id, ctx).await
      }
      CheckoutPhase::Failed(reason) => {
         // Cart is untouched, the user may try again
         dialogue.update(CheckoutState { phase: CheckoutPhase::Idle }).await?;
         let markup = InlineKeyboardMarkup::new(vec![vec![
            button("Try again", cb::Command::PlaceOrders),
            button("🛒 Cart", cb::Command::Cart),
         ]]);
         send_html(bot, chat_id, escape(&reason), Some(markup)).await
      }
      CheckoutPhase::Idle | CheckoutPhase::Submitting => {
         dialogue.update(StartState { restarted: false }).await?;
         bot.send_message(chat_id, EMPTY).await?;
         Ok(())
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use teloxide::types::InlineKeyboardButtonKind;

   fn line(item_id: i64, kitchen_id: i64, unit_price: u64, quantity: u32) -> CartLine {
      CartLine {
         item_id,
         kitchen_id,
         kitchen_name: format!("Kitchen {}", kitchen_id),
         unit_price,
         quantity,
         name: format!("Item {}", item_id),
         image: String::default(),
      }
   }

   #[test]
   fn empty_cart_screen() {
      assert_eq!(cart_desc(&Cart::default()), EMPTY);

      let text = review_desc(&Orders::default(), None);
      assert!(text.contains("No address on file"));
      assert!(text.ends_with(EMPTY));
   }

   #[test]
   fn review_by_kitchens() {
      let cart = Cart::from(vec![line(1, 1, 1000, 2), line(2, 2, 500, 1)]);
      let text = review_desc(&Orders::from(&cart), Some("Elm st. 5"));

      assert!(text.contains("Delivery address: Elm st. 5"));
      assert!(text.contains("<b>Kitchen 1</b>\nItem 1 × 2\nSubtotal: $20.00"));
      assert!(text.contains("<b>Kitchen 2</b>\nItem 2 × 1\nSubtotal: $5.00"));
      assert!(text.ends_with("Total: <b>$25.00</b>"));
   }

   fn callbacks(markup: &InlineKeyboardMarkup) -> Vec<String> {
      markup.inline_keyboard.iter()
      .flatten()
      .filter_map(|b| match &b.kind {
         InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
         _ => None,
      })
      .collect()
   }

   #[test]
   fn nothing_to_place_without_lines() {
      let pay = cb::Command::PlaceOrders.to_string();
      assert!(!callbacks(&review_markup(&Orders::default(), false)).contains(&pay));

      let cart = Cart::from(vec![line(1, 1, 1000, 1)]);
      assert!(callbacks(&review_markup(&Orders::from(&cart), false)).contains(&pay));

      // Not again while the orders are on the way
      assert!(!callbacks(&review_markup(&Orders::from(&cart), true)).contains(&pay));
   }

   #[test]
   fn cart_buttons_address_lines_by_item() {
      let cart = Cart::from(vec![line(1, 1, 1000, 1), line(7, 3, 500, 2)]);
      let markup = cart_markup(&cart);

      let row = &markup.inline_keyboard[1];
      assert_eq!(row.iter().map(|b| b.text.as_str()).collect::<Vec<_>>(), vec!["2. −", "2. +", "2. ✕"]);
      assert!(callbacks(&markup).contains(&String::from("del3:7")));
   }

   #[test]
   fn cart_lines_with_costs() {
      let cart = Cart::from(vec![line(1, 1, 250, 3)]);
      let text = cart_desc(&cart);
      assert!(text.contains("1. Item 1 × 3 = $7.50"));
      assert!(text.ends_with("Total: <b>$7.50</b>"));
   }
}
