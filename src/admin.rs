/* ===============================================================================
HomeKitchen ordering bot.
Admin dashboard. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use teloxide::{prelude::*, types::InlineKeyboardMarkup, };

use crate::states::*;
use crate::models::*;
use crate::callback::{self as cb, button, };
use crate::general;
use crate::navigation;

type NoticeResult = Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

pub fn dashboard_desc(drivers: &[PendingDriver], kitchens: &[PendingKitchen], users: &[UserSummary]) -> String {
   let mut res = String::from("<b>Pending drivers</b>");
   if drivers.is_empty() {
      res.push_str("\nNone");
   }
   for d in drivers {
      res.push_str(&format!("\nDriver {}", d.driver_uid));
   }

   res.push_str("\n\n<b>Pending kitchens</b>");
   if kitchens.is_empty() {
      res.push_str("\nNone");
   }
   for k in kitchens {
      res.push_str(&format!("\n#{} {}", k.kitchen_id, escape(&k.name)));
   }

   res.push_str("\n\n<b>Users</b>");
   for u in users {
      let name = format!("{} {}",
         u.first_name.as_deref().unwrap_or_default(),
         u.last_name.as_deref().unwrap_or_default(),
      );
      let role = u.role.map(|r| r.to_string()).unwrap_or_else(|| String::from("—"));
      res.push_str(&format!("\n#{} {} ({})", u.uid, escape(name.trim()), role));
   }

   res
}

fn dashboard_markup(drivers: &[PendingDriver], kitchens: &[PendingKitchen], users: &[UserSummary]) -> InlineKeyboardMarkup {
   let mut rows = Vec::new();
   for d in drivers {
      rows.push(vec![button(&format!("Approve driver {}", d.driver_uid), cb::Command::ApproveDriver(d.driver_uid))]);
   }
   for k in kitchens {
      rows.push(vec![button(&format!("Approve {}", k.name), cb::Command::ApproveKitchen(k.kitchen_id))]);
   }

   // Admins are not deleted from here
   for u in users.iter().filter(|u| u.role != Some(Role::Admin)) {
      rows.push(vec![button(&format!("Delete user #{}", u.uid), cb::Command::DeleteUser(u.uid))]);
   }
   InlineKeyboardMarkup::new(rows)
}

// Dashboard only for admins, others go to the feed
async fn admin_token(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
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
      Role::Admin => Ok(Some(token)),
      Role::Customer | Role::Owner | Role::Driver => {
         navigation::feed(bot, chat_id, ctx).await?;
         Ok(None)
      }
   }
}

pub async fn enter(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> HandlerResult {
   let token = match admin_token(bot, chat_id, ctx).await? {
      Some(token) => token,
      None => return Ok(()),
   };
   show(bot, chat_id, ctx, &token).await
}

async fn show(bot: &Bot, chat_id: ChatId, ctx: &Ctx, token: &str) -> HandlerResult {
   let (drivers, kitchens, users) = tokio::join!(
      ctx.api.pending_drivers(token),
      ctx.api.pending_kitchens(token),
      ctx.api.all_users(token)
   );

   let (drivers, kitchens, users) = match (drivers, kitchens, users) {
      (Ok(d), Ok(k), Ok(u)) => (d, k, u),
      (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
         return report(bot, chat_id, &ctx.session(chat_id), err, "Unable to load the dashboard").await;
      }
   };

   let text = dashboard_desc(&drivers, &kitchens, &users);
   let markup = dashboard_markup(&drivers, &kitchens, &users);
   send_html(bot, chat_id, text, Some(markup)).await
}

// Run the action and reload the dashboard
async fn act(bot: &Bot, chat_id: ChatId, ctx: &Ctx, done: String, action: Action) -> NoticeResult {
   let token = match admin_token(bot, chat_id, ctx).await? {
      Some(token) => token,
      None => return Ok(None),
   };

   if let Err(err) = action.run(ctx, &token).await {
      report(bot, chat_id, &ctx.session(chat_id), err, "Action failed").await?;
      return Ok(None);
   }
   general::log_event(chat_id, &done).await;

   show(bot, chat_id, ctx, &token).await?;
   Ok(Some(done))
}

enum Action {
   ApproveDriver(i64),
   ApproveKitchen(i64),
   DeleteUser(i64),
}

impl Action {
   async fn run(&self, ctx: &Ctx, token: &str) -> Result<(), crate::api::ApiError> {
      match *self {
         Action::ApproveDriver(uid) => ctx.api.verify_driver(token, uid).await,
         Action::ApproveKitchen(kitchen_id) => ctx.api.approve_kitchen(token, kitchen_id).await,
         Action::DeleteUser(uid) => ctx.api.delete_user(token, uid).await,
      }
   }
}

pub async fn approve_driver(bot: &Bot, chat_id: ChatId, ctx: &Ctx, uid: i64) -> NoticeResult {
   act(bot, chat_id, ctx, format!("Driver {} approved", uid), Action::ApproveDriver(uid)).await
}

pub async fn approve_kitchen(bot: &Bot, chat_id: ChatId, ctx: &Ctx, kitchen_id: i64) -> NoticeResult {
   act(bot, chat_id, ctx, format!("Kitchen {} approved", kitchen_id), Action::ApproveKitchen(kitchen_id)).await
}

pub async fn delete_user(bot: &Bot, chat_id: ChatId, ctx: &Ctx, uid: i64) -> NoticeResult {
   act(bot, chat_id, ctx, format!("User {} deleted", uid), Action::DeleteUser(uid)).await
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn empty_dashboard() {
      let text = dashboard_desc(&[], &[], &[]);
      assert!(text.starts_with("<b>Pending drivers</b>\nNone"));
      assert!(text.contains("<b>Pending kitchens</b>\nNone"));
   }

   #[test]
   fn users_with_roles() {
      let users: Vec<UserSummary> = serde_json::from_value(serde_json::json!([
         {"UID": 1, "FirstName": "Ann", "LastName": "Lee", "Role": "admin"},
         {"UID": 2, "FirstName": "Bob", "LastName": null, "Role": null}
      ])).unwrap();

      let text = dashboard_desc(&[], &[], &users);
      assert!(text.contains("#1 Ann Lee (admin)"));
      assert!(text.contains("#2 Bob (—)"));
   }
}
