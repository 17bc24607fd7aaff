/* ===============================================================================
HomeKitchen ordering bot.
Kitchens feed and kitchen page. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use teloxide::{prelude::*, types::{InlineKeyboardButton, InlineKeyboardMarkup, }, };

use crate::states::*;
use crate::models::*;
use crate::environment as env;
use crate::callback::{self as cb, button, };
use crate::cart::CartLine;

type NoticeResult = Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

// ============================================================================
// [Feed]
// ============================================================================

pub fn feed_desc(kitchens: &[Kitchen]) -> String {
   if kitchens.is_empty() {
      return String::from("There are no kitchens yet");
   }

   kitchens.iter()
   .fold(String::from("<b>Kitchens</b>"), |acc, k| {
      format!("{}\n\n<b>{}</b>\n{}\nRating: {} | Status: {}",
         acc,
         escape(&k.name),
         escape(&k.address),
         k.rating_desc(),
         escape(k.status_desc()),
      )
   })
}

pub async fn feed(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> HandlerResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(()),
   };

   let kitchens = match ctx.api.kitchens(&token).await {
      Ok(kitchens) => kitchens,
      Err(err) => return report(bot, chat_id, &session, err, "Unable to load kitchens").await,
   };

   // One button per kitchen
   let mut rows: Vec<Vec<InlineKeyboardButton>> = kitchens.iter()
   .map(|k| vec![button(&k.name, cb::Command::Kitchen(k.id))])
   .collect();
   rows.push(vec![button("🛒 Cart", cb::Command::Cart)]);

   send_html(bot, chat_id, feed_desc(&kitchens), Some(InlineKeyboardMarkup::new(rows))).await
}

// ============================================================================
// [Kitchen]
// ============================================================================

// Who is looking at the kitchen page
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Visitor {
   Owner, // owner of this kitchen
   Customer,
   Other,
}

impl Visitor {
   pub fn new(me: Option<&Me>, kitchen: &Kitchen) -> Self {
      match me {
         Some(me) => match me.role() {
            Role::Owner if me.uid == kitchen.owner_uid => Self::Owner,
            Role::Customer => Self::Customer,
            Role::Owner | Role::Driver | Role::Admin => Self::Other,
         },
         None => Self::Other,
      }
   }
}

pub fn kitchen_desc(kitchen: &Kitchen, items: &[MenuItem], plans: &[MealPlan], visitor: Visitor) -> String {
   let mut res = format!("<b>{}</b>\n{}\nRating: {} | Status: {}",
      escape(&kitchen.name),
      escape(&kitchen.address),
      kitchen.rating_desc(),
      escape(kitchen.status_desc()),
   );

   if let Some(logo) = &kitchen.logo {
      res.push_str(&format!("\n<a href=\"{}\">Logo</a>", escape(logo)));
   }

   res.push_str("\n\n<b>Menu</b>");
   if items.is_empty() {
      res.push_str("\nNo dishes yet");
   }
   for item in items {
      // Owners need numbers for meal plans
      let id = if visitor == Visitor::Owner { format!("#{} ", item.id) } else { String::default() };
      res.push_str(&format!("\n{}{} — {}", id, escape(&item.name), env::price_with_unit(item.price)));
      if !item.description.is_empty() {
         res.push_str(&format!("\n<i>{}</i>", escape(&item.description)));
      }
   }

   res.push_str("\n\n<b>Meal plans</b>");
   if plans.is_empty() {
      res.push_str("\nNo meal plans yet");
   }
   for plan in plans {
      res.push_str(&format!("\n{} — {}", escape(&plan.name), env::price_with_unit(plan.total_price)));
   }

   res
}

fn kitchen_markup(kitchen: &Kitchen, items: &[MenuItem], plans: &[MealPlan], visitor: Visitor) -> InlineKeyboardMarkup {
   let mut rows = Vec::new();
   match visitor {
      Visitor::Owner => {
         for item in items {
            rows.push(vec![button(&format!("✕ {}", item.name), cb::Command::DeleteMenuItem(kitchen.id, item.id))]);
         }
         for plan in plans {
            rows.push(vec![button(&format!("✕ {}", plan.name), cb::Command::DeleteMealPlan(kitchen.id, plan.id))]);
         }
         rows.push(vec![
            button("Add dish", cb::Command::NewMenuItem(kitchen.id)),
            button("Add meal plan", cb::Command::NewMealPlan(kitchen.id)),
         ]);
      }
      Visitor::Customer => {
         for item in items {
            rows.push(vec![button(&format!("+ {}", item.name), cb::Command::AddToCart(kitchen.id, item.id))]);
         }
         for plan in plans {
            rows.push(vec![button(&plan.name, cb::Command::MealPlan(kitchen.id, plan.id))]);
         }
      }
      Visitor::Other => {
         for plan in plans {
            rows.push(vec![button(&plan.name, cb::Command::MealPlan(kitchen.id, plan.id))]);
         }
      }
   }

   rows.push(vec![
      button("Kitchens", cb::Command::Feed),
      button("🛒 Cart", cb::Command::Cart),
   ]);
   InlineKeyboardMarkup::new(rows)
}

pub async fn kitchen(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64) -> HandlerResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(()),
   };

   let (me, kitchen) = tokio::join!(ctx.api.me(&token), ctx.api.kitchen(&token, kitchen_id));
   let kitchen = match kitchen {
      Ok(kitchen) => kitchen,
      Err(err) => return report(bot, chat_id, &session, err, "Unable to load the kitchen").await,
   };
   let visitor = Visitor::new(me.as_ref().ok(), &kitchen);

   let (items, plans) = tokio::join!(
      ctx.api.menu_items(&token, kitchen_id),
      ctx.api.meal_plans(&token, kitchen_id)
   );
   let (items, plans) = match (items, plans) {
      (Ok(items), Ok(plans)) => (items, plans),
      (Err(err), _) | (_, Err(err)) => return report(bot, chat_id, &session, err, "Unable to load the menu").await,
   };

   let text = kitchen_desc(&kitchen, &items, &plans, visitor);
   let markup = kitchen_markup(&kitchen, &items, &plans, visitor);
   send_html(bot, chat_id, text, Some(markup)).await
}

pub async fn meal_plan(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64, plan_id: i64) -> HandlerResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(()),
   };

   let items = match ctx.api.meal_plan_items(&token, kitchen_id, plan_id).await {
      Ok(items) => items,
      Err(err) => return report(bot, chat_id, &session, err, "Unable to load the meal plan").await,
   };

   let text = if items.is_empty() {
      String::from("This meal plan has no dishes")
   } else {
      items.iter()
      .fold(String::from("<b>Dishes of the plan</b>"), |acc, item| {
         format!("{}\n{} — {}", acc, escape(&item.name), env::price_with_unit(item.price))
      })
   };

   let markup = InlineKeyboardMarkup::new(vec![vec![
      button("Back", cb::Command::Kitchen(kitchen_id)),
   ]]);
   send_html(bot, chat_id, text, Some(markup)).await
}

pub async fn add_to_cart(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64, item_id: i64) -> NoticeResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(None),
   };

   let (kitchen, items) = tokio::join!(
      ctx.api.kitchen(&token, kitchen_id),
      ctx.api.menu_items(&token, kitchen_id)
   );
   let (kitchen, items) = match (kitchen, items) {
      (Ok(kitchen), Ok(items)) => (kitchen, items),
      (Err(err), _) | (_, Err(err)) => {
         report(bot, chat_id, &session, err, "Unable to add to cart").await?;
         return Ok(None);
      }
   };

   let item = match items.iter().find(|i| i.id == item_id) {
      Some(item) => item,
      None => return Ok(Some(String::from("This dish is no longer available"))),
   };

   let mut cart = session.cart().await?;
   cart.add(CartLine::new(&kitchen, item));
   session.save_cart(&cart).await?;

   Ok(Some(format!("{} added to cart", item.name)))
}

#[cfg(test)]
mod tests {
   use super::*;

   fn kitchen() -> Kitchen {
      Kitchen {
         id: 2,
         owner_uid: 10,
         name: String::from("Nonna <3"),
         address: String::from("Via Roma 1"),
         average_rating: Some(4.5),
         verified_by: None,
         approval_status: Some(String::from("approved")),
         logo: None,
      }
   }

   fn me(uid: i64, role: Role) -> Me {
      serde_json::from_value(serde_json::json!({"UID": uid, "Role": role})).unwrap()
   }

   #[test]
   fn only_own_kitchen_is_managed() {
      let k = kitchen();
      assert_eq!(Visitor::new(Some(&me(10, Role::Owner)), &k), Visitor::Owner);
      assert_eq!(Visitor::new(Some(&me(11, Role::Owner)), &k), Visitor::Other);
      assert_eq!(Visitor::new(Some(&me(10, Role::Customer)), &k), Visitor::Customer);
      assert_eq!(Visitor::new(None, &k), Visitor::Other);
   }

   #[test]
   fn page_of_kitchen() {
      let items = vec![MenuItem {
         id: 7,
         name: String::from("Lasagna"),
         description: String::from("With ragu"),
         price: 1250,
         image: String::default(),
      }];

      let text = kitchen_desc(&kitchen(), &items, &[], Visitor::Owner);
      assert!(text.contains("<b>Nonna &lt;3</b>"));
      assert!(text.contains("Rating: 4.5"));
      assert!(text.contains("#7 Lasagna — $12.50"));
      assert!(text.contains("No meal plans yet"));

      let text = kitchen_desc(&kitchen(), &items, &[], Visitor::Customer);
      assert!(text.contains("\nLasagna — $12.50"));
   }

   #[test]
   fn empty_feed() {
      assert_eq!(feed_desc(&[]), "There are no kitchens yet");
      assert!(feed_desc(&[kitchen()]).contains("Status: approved"));
   }
}
