/* ===============================================================================
HomeKitchen ordering bot.
Account of the current user. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use teloxide::prelude::*;

use crate::states::*;
use crate::models::*;

pub fn account_desc(me: &Me) -> String {
   let role = me.role();
   let mut res = format!("<b>{}</b>\nPhone: {}\nRole: {}",
      escape(&me.full_name()),
      escape(me.phone_no.as_deref().unwrap_or("—")),
      role,
   );

   match role {
      Role::Customer => {
         if me.addresses.is_empty() {
            res.push_str("\nNo address on file");
         } else {
            res.push_str("\nAddresses:");
            for a in &me.addresses {
               res.push_str(&format!("\n • {}", escape(a)));
            }
         }
      }
      Role::Owner => {
         let kitchens: Vec<Kitchen> = me.home_kitchens.iter()
         .filter_map(|row| Kitchen::from_row(row).ok())
         .collect();
         if kitchens.is_empty() {
            res.push_str("\nNo kitchens yet, /newkitchen to register one");
         } else {
            res.push_str("\nKitchens:");
            for k in kitchens {
               res.push_str(&format!("\n • {} ({})", escape(&k.name), escape(k.status_desc())));
            }
         }
      }
      Role::Driver | Role::Admin => {}
   }

   res
}

pub async fn account(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> HandlerResult {
   let session = ctx.session(chat_id);
   let token = match require_token(bot, chat_id, &session).await? {
      Some(token) => token,
      None => return Ok(()),
   };

   match ctx.api.me(&token).await {
      Ok(me) => send_html(bot, chat_id, account_desc(&me), None).await,
      Err(err) => report(bot, chat_id, &session, err, "Unable to load the account").await,
   }
}
