/* ===============================================================================
HomeKitchen ordering bot.
Login, signup and logout. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use teloxide::prelude::*;

use crate::states::*;
use crate::api::ApiError;
use crate::models::*;
use crate::form::{self, Field, FormKind, FormState};
use crate::general;

pub async fn login(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx, form: &FormState) -> HandlerResult {
   let email = form.value(Field::Email);
   let password = form.value(Field::Password);
   let session = ctx.session(chat_id);

   let token = match ctx.api.login(email, password).await {
      Ok(token) => token,
      Err(ApiError::Unauthorized) => {
         bot.send_message(chat_id, "Wrong email or password, /login to try again").await?;
         return Ok(());
      }
      Err(err) => return report(bot, chat_id, &session, err, "Login failed.").await,
   };

   // Role decides the first screen
   let me = match ctx.api.me(&token.access_token).await {
      Ok(me) => me,
      Err(err) => return report(bot, chat_id, &session, err, "Login failed.").await,
   };
   let role = me.role();
   session.sign_in(&token.access_token, role).await?;
   general::log_event(chat_id, &format!("logged in as {} {}", role, me.uid)).await;

   let text = format!("Hello, {}!", me.full_name());
   bot.send_message(chat_id, text).await?;

   // Owners without a kitchen start with creating it
   if role == Role::Owner && me.home_kitchens.is_empty() {
      return form::enter(bot, chat_id, dialogue, FormKind::NewKitchen).await;
   }

   general::land(bot, chat_id, ctx, role).await
}

pub fn signup_request(form: &FormState) -> Result<SignupRequest, String> {
   let role = form.value(Field::Role)
   .parse::<Role>()
   .map_err(|err| format!("signup_request role: {}", err))?;

   Ok(SignupRequest {
      first_name: form.value(Field::FirstName).to_string(),
      last_name: form.value(Field::LastName).to_string(),
      email: form.value(Field::Email).to_string(),
      phone_no: form.value(Field::Phone).to_string(),
      password: form.value(Field::Password).to_string(),
      role,
      address: form.value(Field::Address).to_string(),
   })
}

pub async fn signup(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx, form: &FormState) -> HandlerResult {
   let request = signup_request(form)?;
   let session = ctx.session(chat_id);

   if let Err(err) = ctx.api.signup(&request).await {
      let text = format!("{}\n/signup to try again", err.reason("Signup failed."));
      bot.send_message(chat_id, text).await?;
      return Ok(());
   }
   general::log_event(chat_id, &format!("signed up as {}", request.role)).await;

   match request.role {
      Role::Owner => {
         // Log in at once and continue with the kitchen
         let token = match ctx.api.login(&request.email, &request.password).await {
            Ok(token) => token,
            Err(err) => return report(bot, chat_id, &session, err, "Login failed.").await,
         };
         session.sign_in(&token.access_token, Role::Owner).await?;

         bot.send_message(chat_id, "Account created! Now tell us about your kitchen.").await?;
         form::enter(bot, chat_id, dialogue, FormKind::NewKitchen).await
      }
      Role::Customer | Role::Driver | Role::Admin => {
         bot.send_message(chat_id, "Account created! Please /login").await?;
         Ok(())
      }
   }
}

pub async fn logout(bot: &Bot, chat_id: ChatId, ctx: &Ctx) -> HandlerResult {
   ctx.session(chat_id).sign_out().await?;
   bot.send_message(chat_id, "You are logged out. Your cart is kept for the next time.").await?;
   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn signup_body_of_driver() {
      let mut form = FormState::new(FormKind::Signup);
      for a in ["driver", "Bob", "Stone", "bob@mail.io", "5550100", "pw", "pw"] {
         form.accept(a).unwrap();
      }

      let request = signup_request(&form).unwrap();
      let json = serde_json::to_value(&request).unwrap();
      assert_eq!(json, serde_json::json!({
         "FirstName": "Bob",
         "LastName": "Stone",
         "Email": "bob@mail.io",
         "PhoneNo": "5550100",
         "Password": "pw",
         "Role": "driver",
         "Address": ""
      }));
   }
}
