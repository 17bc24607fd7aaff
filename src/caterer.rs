/* ===============================================================================
HomeKitchen ordering bot.
Kitchen owner: kitchen, menu items and meal plans. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use teloxide::prelude::*;

use crate::states::*;
use crate::models::*;
use crate::form::{self, Field, FormKind, FormState, parse_ids, parse_price, };
use crate::general;
use crate::navigation;

type NoticeResult = Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

// Only owners manage kitchens
async fn is_owner(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
   let session = ctx.session(chat_id);
   match session.role().await? {
      Some(Role::Owner) => Ok(true),
      Some(Role::Customer) | Some(Role::Driver) | Some(Role::Admin) | None => {
         bot.send_message(chat_id, "This is for kitchen owners, please /login with an owner account").await?;
         Ok(false)
      }
   }
}

fn some_text(s: &str) -> Option<String> {
   if s.is_empty() { None } else { Some(s.to_string()) }
}

pub fn kitchen_request(form: &FormState) -> NewKitchen {
   NewKitchen::pending(
      form.value(Field::KitchenName).to_string(),
      form.value(Field::KitchenAddress).to_string(),
      some_text(form.value(Field::Logo)),
   )
}

pub fn menu_item_request(form: &FormState) -> Result<NewMenuItem, String> {
   let price = parse_price(form.value(Field::Price))
   .ok_or_else(|| format!("menu_item_request: wrong price {}", form.value(Field::Price)))?;

   Ok(NewMenuItem {
      name: form.value(Field::ItemName).to_string(),
      description: form.value(Field::Description).to_string(),
      price,
      image: form.value(Field::Image).to_string(),
      items: Vec::new(),
   })
}

pub fn meal_plan_request(form: &FormState) -> Result<NewMealPlan, String> {
   let total_price = parse_price(form.value(Field::TotalPrice))
   .ok_or_else(|| format!("meal_plan_request: wrong price {}", form.value(Field::TotalPrice)))?;

   Ok(NewMealPlan {
      name: form.value(Field::PlanName).to_string(),
      total_price,
      image: form.value(Field::Image).to_string(),
      items: parse_ids(form.value(Field::ItemIds))
         .into_iter()
         .map(|item_id| PlanItem { item_id })
         .collect(),
   })
}

// ============================================================================
// [Kitchen]
// ============================================================================

pub async fn new_kitchen(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx) -> HandlerResult {
   if is_owner(bot, chat_id, ctx).await? {
      form::enter(bot, chat_id, dialogue, FormKind::NewKitchen).await?;
   }
   Ok(())
}

pub async fn create_kitchen(bot: &Bot, chat_id: ChatId, ctx: &Ctx, form: &FormState) -> HandlerResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(()),
   };

   let kitchen = kitchen_request(form);
   if let Err(err) = ctx.api.create_kitchen(&token, &kitchen).await {
      return report(bot, chat_id, &session, err, "Unable to create the kitchen").await;
   }
   general::log_event(chat_id, &format!("new kitchen {}", kitchen.name)).await;

   bot.send_message(chat_id, "Kitchen created, it will be visible after approval").await?;
   navigation::feed(bot, chat_id, ctx).await
}

// ============================================================================
// [Menu items]
// ============================================================================

pub async fn new_menu_item(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx, kitchen_id: i64) -> HandlerResult {
   if is_owner(bot, chat_id, ctx).await? {
      form::enter(bot, chat_id, dialogue, FormKind::NewMenuItem(kitchen_id)).await?;
   }
   Ok(())
}

pub async fn create_menu_item(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64, form: &FormState) -> HandlerResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(()),
   };

   let item = menu_item_request(form)?;
   if let Err(err) = ctx.api.create_menu_item(&token, kitchen_id, &item).await {
      return report(bot, chat_id, &session, err, "Unable to add the dish").await;
   }

   bot.send_message(chat_id, format!("{} added to the menu", item.name)).await?;
   navigation::kitchen(bot, chat_id, ctx, kitchen_id).await
}

pub async fn delete_menu_item(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64, item_id: i64) -> NoticeResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(None),
   };

   if let Err(err) = ctx.api.delete_menu_item(&token, kitchen_id, item_id).await {
      report(bot, chat_id, &session, err, "Unable to delete the dish").await?;
      return Ok(None);
   }

   navigation::kitchen(bot, chat_id, ctx, kitchen_id).await?;
   Ok(Some(String::from("Dish deleted")))
}

// ============================================================================
// [Meal plans]
// ============================================================================

pub async fn new_meal_plan(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx, kitchen_id: i64) -> HandlerResult {
   if is_owner(bot, chat_id, ctx).await? {
      form::enter(bot, chat_id, dialogue, FormKind::NewMealPlan(kitchen_id)).await?;
   }
   Ok(())
}

pub async fn create_meal_plan(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64, form: &FormState) -> HandlerResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(()),
   };

   let plan = meal_plan_request(form)?;
   if let Err(err) = ctx.api.create_meal_plan(&token, kitchen_id, &plan).await {
      return report(bot, chat_id, &session, err, "Unable to add the meal plan").await;
   }

   bot.send_message(chat_id, format!("Meal plan {} added", plan.name)).await?;
   navigation::kitchen(bot, chat_id, ctx, kitchen_id).await
}

pub async fn delete_meal_plan(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64, plan_id: i64) -> NoticeResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(None),
   };

   if let Err(err) = ctx.api.delete_meal_plan(&token, kitchen_id, plan_id).await {
      report(bot, chat_id, &session, err, "Unable to delete the meal plan").await?;
      return Ok(None);
   }

   navigation::kitchen(bot, chat_id, ctx, kitchen_id).await?;
   Ok(Some(String::from("Meal plan deleted")))
}

#[cfg(test)]
mod tests {
   use super::*;

   fn fill(kind: FormKind, answers: &[&str]) -> FormState {
      let mut form = FormState::new(kind);
      for a in answers {
         form.accept(a).unwrap();
      }
      form
   }

   #[test]
   fn kitchen_is_pending() {
      let form = fill(FormKind::NewKitchen, &["Mama's", "Elm st. 5", "-"]);
      let json = serde_json::to_value(kitchen_request(&form)).unwrap();
      assert_eq!(json, serde_json::json!({
         "Name": "Mama's",
         "Address": "Elm st. 5",
         "AverageRating": null,
         "VerifiedBy": null,
         "ApprovalStatus": "pending",
         "Logo": null
      }));
   }

   #[test]
   fn menu_item_without_plan_items() {
      let form = fill(FormKind::NewMenuItem(2), &["Soup", "Hot and sour", "4.50", "http://img/s.png"]);
      let json = serde_json::to_value(menu_item_request(&form).unwrap()).unwrap();
      assert_eq!(json["Price"], serde_json::json!(4.5));
      assert_eq!(json["Items"], serde_json::json!([]));
      assert_eq!(json["Image"], "http://img/s.png");
   }

   #[test]
   fn meal_plan_lists_items() {
      let form = fill(FormKind::NewMealPlan(2), &["Week", "40", "-", "4,5"]);
      let json = serde_json::to_value(meal_plan_request(&form).unwrap()).unwrap();
      assert_eq!(json["TotalPrice"], serde_json::json!(40.0));
      assert_eq!(json["Items"], serde_json::json!([{"ItemID": 4}, {"ItemID": 5}]));
   }
}
