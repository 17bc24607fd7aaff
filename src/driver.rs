/* ===============================================================================
HomeKitchen ordering bot.
Driver dashboard. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use teloxide::{prelude::*, types::InlineKeyboardMarkup, };

use crate::states::*;
use crate::models::*;
use crate::environment as env;
use crate::callback::{self as cb, button, };
use crate::navigation;

type NoticeResult = Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

const TABS: [OrderStatus; 3] = [OrderStatus::Claimed, OrderStatus::Pending, OrderStatus::Completed];

fn tab_name(status: OrderStatus) -> &'static str {
   match status {
      OrderStatus::Claimed => "Active",
      OrderStatus::Pending => "Unclaimed",
      OrderStatus::Completed => "Delivered",
   }
}

fn empty_tab(status: OrderStatus) -> &'static str {
   match status {
      OrderStatus::Claimed => "No active orders",
      OrderStatus::Pending => "No unclaimed orders",
      OrderStatus::Completed => "No delivered orders",
   }
}

pub fn orders_desc(status: OrderStatus, orders: &[DriverOrder]) -> String {
   let init = format!("<b>{} orders</b>", tab_name(status));
   if orders.is_empty() {
      return format!("{}\n{}", init, empty_tab(status));
   }

   orders.iter()
   .fold(init, |acc, o| {
      format!("{}\n\nOrder #{} from kitchen {}\nTotal: {} | ETA: {}\nStatus: {}",
         acc,
         o.order_id,
         o.kitchen_id.map(|id| id.to_string()).unwrap_or_else(|| String::from("—")),
         env::price_with_unit(o.total_cents()),
         o.eta_desc(),
         o.status,
      )
   })
}

fn orders_markup(status: OrderStatus, orders: &[DriverOrder]) -> InlineKeyboardMarkup {
   // Actions depend on the tab
   let mut rows: Vec<_> = orders.iter()
   .filter_map(|o| match status {
      OrderStatus::Pending => Some(vec![button(&format!("Claim #{}", o.order_id), cb::Command::Claim(o.order_id))]),
      OrderStatus::Claimed => Some(vec![button(&format!("Delivered #{}", o.order_id), cb::Command::Complete(o.order_id))]),
      OrderStatus::Completed => None,
   })
   .collect();

   // Other tabs
   let tabs = TABS.iter()
   .filter(|s| **s != status)
   .map(|s| button(tab_name(*s), cb::Command::DriverTab(*s)))
   .collect();
   rows.push(tabs);
   InlineKeyboardMarkup::new(rows)
}

// Dashboard only for drivers, others go to the feed
async fn driver_token(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(None),
   };

   let me = match ctx.api.me(&token).await {
      Ok(me) => me,
      Err(err) => {
         report(bot, chat_id, &session, err, "Unable to check your role").await?;
         return Ok(None);
      }
   };

   match me.role() {
      Role::Driver => Ok(Some(token)),
      Role::Customer | Role::Owner | Role::Admin => {
         navigation::feed(bot, chat_id, ctx).await?;
         Ok(None)
      }
   }
}

pub async fn enter(bot: &Bot, chat_id: ChatId, ctx: &Ctx, status: OrderStatus) -> HandlerResult {
   let token = match driver_token(bot, chat_id, ctx).await? {
      Some(token) => token,
      None => return Ok(()),
   };
   show(bot, chat_id, ctx, &token, status).await
}

async fn show(bot: &Bot, chat_id: ChatId, ctx: &Ctx, token: &str, status: OrderStatus) -> HandlerResult {
   let orders = match ctx.api.driver_orders(token, status).await {
      Ok(orders) => orders,
      Err(err) => return report(bot, chat_id, &ctx.session(chat_id), err, "Unable to load orders").await,
   };

   send_html(bot, chat_id, orders_desc(status, &orders), Some(orders_markup(status, &orders))).await
}

pub async fn claim(bot: &Bot, chat_id: ChatId, ctx: &Ctx, order_id: i64) -> NoticeResult {
   let token = match driver_token(bot, chat_id, ctx).await? {
      Some(token) => token,
      None => return Ok(None),
   };

   if let Err(err) = ctx.api.claim_order(&token, order_id).await {
      report(bot, chat_id, &ctx.session(chat_id), err, "Unable to claim the order").await?;
      return Ok(None);
   }

   show(bot, chat_id, ctx, &token, OrderStatus::Claimed).await?;
   Ok(Some(format!("Order #{} claimed", order_id)))
}

pub async fn complete(bot: &Bot, chat_id: ChatId, ctx: &Ctx, order_id: i64) -> NoticeResult {
   let token = match driver_token(bot, chat_id, ctx).await? {
      Some(token) => token,
      None => return Ok(None),
   };

   if let Err(err) = ctx.api.complete_order(&token, order_id).await {
      report(bot, chat_id, &ctx.session(chat_id), err, "Unable to complete the order").await?;
      return Ok(None);
   }

   show(bot, chat_id, ctx, &token, OrderStatus::Completed).await?;
   Ok(Some(format!("Order #{} delivered", order_id)))
}

#[cfg(test)]
mod tests {
   use super::*;

   fn order(order_id: i64, status: OrderStatus) -> DriverOrder {
      serde_json::from_value(serde_json::json!({
         "OrderID": order_id, "TotalPrice": "18.5", "KitchenID": 2,
         "ETA": "12:30:00", "Status": status
      })).unwrap()
   }

   #[test]
   fn empty_tabs() {
      assert!(orders_desc(OrderStatus::Claimed, &[]).ends_with("No active orders"));
      assert!(orders_desc(OrderStatus::Pending, &[]).ends_with("No unclaimed orders"));
      assert!(orders_desc(OrderStatus::Completed, &[]).ends_with("No delivered orders"));
   }

   #[test]
   fn order_line() {
      let text = orders_desc(OrderStatus::Pending, &[order(31, OrderStatus::Pending)]);
      assert!(text.contains("Order #31 from kitchen 2"));
      assert!(text.contains("Total: $18.50 | ETA: 12:30:00"));
      assert!(text.contains("Status: Pending"));
   }
}
