/* ===============================================================================
HomeKitchen ordering bot.
Multi-step text input forms. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use teloxide::{prelude::*, types::ParseMode, };
use regex::Regex;
use lazy_static::lazy_static;

use crate::states::*;
use crate::models::*;
use crate::registration;
use crate::caterer;

// What the form collects
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FormKind {
   Login,
   Signup,
   NewKitchen,
   NewMenuItem(i64), // kitchen id
   NewMealPlan(i64), // kitchen id
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Field {
   Email,
   Password,
   ConfirmPassword,
   Role,
   FirstName,
   LastName,
   Phone,
   Address,
   KitchenName,
   KitchenAddress,
   Logo,
   ItemName,
   Description,
   Price,
   Image,
   PlanName,
   TotalPrice,
   ItemIds,
}

// Value to skip optional fields
pub const SKIP: &str = "-";

impl Field {
   pub fn prompt(&self) -> &'static str {
      match self {
         Field::Email => "Email:",
         Field::Password => "Password (the message will be deleted):",
         Field::ConfirmPassword => "Repeat the password:",
         Field::Role => "Who are you: customer, owner or driver?",
         Field::FirstName => "First name:",
         Field::LastName => "Last name:",
         Field::Phone => "Phone number:",
         Field::Address => "Delivery address:",
         Field::KitchenName => "Name of your kitchen:",
         Field::KitchenAddress => "Address of the kitchen:",
         Field::Logo => "Link to the logo, or - to skip:",
         Field::ItemName => "Name of the dish:",
         Field::Description => "Description:",
         Field::Price => "Price, for example 7.50:",
         Field::Image => "Link to the picture, or - to skip:",
         Field::PlanName => "Name of the meal plan:",
         Field::TotalPrice => "Total price of the plan:",
         Field::ItemIds => "Numbers of the dishes in the plan, separated by commas:",
      }
   }

   pub fn is_secret(&self) -> bool {
      matches!(self, Field::Password | Field::ConfirmPassword)
   }

   // Normalized answer or a hint what is wrong
   pub fn validate(&self, input: &str) -> Result<String, String> {
      lazy_static! {
         static ref EMAIL_REGEX : Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
         static ref PHONE_REGEX : Regex = Regex::new(r"^\+?[0-9][0-9 ()-]{4,}$").unwrap();
      }

      let s = input.trim();
      match self {
         Field::Email => {
            if EMAIL_REGEX.is_match(s) { Ok(s.to_lowercase()) }
            else { Err(String::from("This does not look like an email address")) }
         }
         Field::Password | Field::ConfirmPassword => {
            if input.is_empty() { Err(String::from("Password must not be empty")) }
            else { Ok(input.to_string()) }
         }
         Field::Role => match s.parse::<Role>() {
            Ok(Role::Admin) | Err(_) => Err(String::from("Please answer customer, owner or driver")),
            Ok(role) => Ok(role.to_string()),
         },
         Field::Phone => {
            if PHONE_REGEX.is_match(s) { Ok(s.to_string()) }
            else { Err(String::from("This does not look like a phone number")) }
         }
         Field::Logo | Field::Image => {
            if s == SKIP { Ok(String::default()) }
            else { Ok(s.to_string()) }
         }
         Field::Price | Field::TotalPrice => match parse_price(s) {
            Some(_) => Ok(s.to_string()),
            None => Err(String::from("Please enter a positive number like 7.50")),
         },
         Field::ItemIds => {
            let ids = parse_ids(s);
            if ids.is_empty() { Err(String::from("Please enter at least one dish number")) }
            else { Ok(ids.iter().map(i64::to_string).collect::<Vec<String>>().join(",")) }
         }
         _ => {
            if s.is_empty() { Err(String::from("Please enter a value")) }
            else { Ok(s.to_string()) }
         }
      }
   }
}

pub fn parse_price(s: &str) -> Option<f64> {
   let res = s.trim().trim_start_matches('$').parse::<f64>().ok()?;
   if res.is_finite() && res > 0.0 { Some(res) } else { None }
}

pub fn parse_ids(s: &str) -> Vec<i64> {
   s.split(|c: char| c == ',' || c.is_whitespace())
   .filter_map(|p| p.parse().ok())
   .collect()
}

#[derive(Clone, Debug)]
pub struct FormState {
   pub kind: FormKind,
   pub answers: Vec<String>,
}

impl FormState {
   pub fn new(kind: FormKind) -> Self {
      Self { kind, answers: Vec::new() }
   }

   // Fields may depend on earlier answers
   pub fn fields(&self) -> Vec<Field> {
      match self.kind {
         FormKind::Login => vec![Field::Email, Field::Password],
         FormKind::Signup => {
            let mut res = vec![Field::Role, Field::FirstName, Field::LastName, Field::Email,
               Field::Phone, Field::Password, Field::ConfirmPassword];
            let is_customer = self.answers.first()
            .map(|r| r == Role::Customer.as_ref())
            .unwrap_or(true);
            if is_customer {
               res.push(Field::Address);
            }
            res
         }
         FormKind::NewKitchen => vec![Field::KitchenName, Field::KitchenAddress, Field::Logo],
         FormKind::NewMenuItem(_) => vec![Field::ItemName, Field::Description, Field::Price, Field::Image],
         FormKind::NewMealPlan(_) => vec![Field::PlanName, Field::TotalPrice, Field::Image, Field::ItemIds],
      }
   }

   pub fn current(&self) -> Option<Field> {
      self.fields().get(self.answers.len()).copied()
   }

   pub fn value(&self, field: Field) -> &str {
      self.fields()
      .iter()
      .position(|f| *f == field)
      .and_then(|i| self.answers.get(i))
      .map(|s| s.as_str())
      .unwrap_or_default()
   }

   // Takes the answer for the current field, returns a hint if it needs asking again
   pub fn accept(&mut self, input: &str) -> Result<(), String> {
      let field = match self.current() {
         Some(field) => field,
         None => return Ok(()),
      };

      let value = field.validate(input)?;
      if field == Field::ConfirmPassword && value != self.value(Field::Password) {
         // Ask for the password again
         self.answers.pop();
         return Err(String::from("Passwords do not match"));
      }

      self.answers.push(value);
      Ok(())
   }

   pub fn title(&self) -> &'static str {
      match self.kind {
         FormKind::Login => "Log in",
         FormKind::Signup => "Sign up",
         FormKind::NewKitchen => "New kitchen",
         FormKind::NewMenuItem(_) => "New dish",
         FormKind::NewMealPlan(_) => "New meal plan",
      }
   }
}

// Show the form and ask the first question
pub async fn enter(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, kind: FormKind) -> HandlerResult {
   let form = FormState::new(kind);
   let text = format!("<b>{}</b>\n/cancel to stop\n\n{}", form.title(), form.current().map(|f| f.prompt()).unwrap_or_default());
   bot.send_message(chat_id, text)
   .parse_mode(ParseMode::Html)
   .await?;

   dialogue.update(form).await?;
   Ok(())
}

pub async fn update(bot: Bot, msg: Message, dialogue: MyDialogue, ctx: Ctx, mut form: FormState) -> HandlerResult {
   let chat_id = msg.chat.id;
   let input = match msg.text() {
      Some(text) => text.to_string(),
      None => {
         bot.send_message(chat_id, "Text message, please!").await?;
         return Ok(());
      }
   };

   // Passwords should not stay in the history
   if form.current().map(|f| f.is_secret()).unwrap_or_default() {
      if let Err(err) = bot.delete_message(chat_id, msg.id).await {
         log::info!("form::update delete_message: {}", err);
      }
   }

   if let Err(hint) = form.accept(&input) {
      let prompt = form.current().map(|f| f.prompt()).unwrap_or_default();
      bot.send_message(chat_id, format!("{}\n{}", hint, prompt)).await?;
      dialogue.update(form).await?;
      return Ok(());
   }

   match form.current() {
      Some(field) => {
         bot.send_message(chat_id, field.prompt()).await?;
         dialogue.update(form).await?;
         Ok(())
      }
      None => {
         // All collected
         dialogue.update(StartState { restarted: false }).await?;
         submit(&bot, chat_id, &dialogue, &ctx, form).await
      }
   }
}

async fn submit(bot: &Bot, chat_id: ChatId, dialogue: &MyDialogue, ctx: &Ctx, form: FormState) -> HandlerResult {
   match form.kind {
      FormKind::Login => registration::login(bot, chat_id, dialogue, ctx, &form).await,
      FormKind::Signup => registration::signup(bot, chat_id, dialogue, ctx, &form).await,
      FormKind::NewKitchen => caterer::create_kitchen(bot, chat_id, ctx, &form).await,
      FormKind::NewMenuItem(kitchen_id) => caterer::create_menu_item(bot, chat_id, ctx, kitchen_id, &form).await,
      FormKind::NewMealPlan(kitchen_id) => caterer::create_meal_plan(bot, chat_id, ctx, kitchen_id, &form).await,
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn fill(kind: FormKind, answers: &[&str]) -> Result<FormState, String> {
      let mut form = FormState::new(kind);
      for a in answers {
         form.accept(a)?;
      }
      Ok(form)
   }

   #[test]
   fn login_collects_email_and_password() {
      let form = fill(FormKind::Login, &[" Ann@Example.com ", "secret"]).unwrap();
      assert_eq!(form.current(), None);
      assert_eq!(form.value(Field::Email), "ann@example.com");
      assert_eq!(form.value(Field::Password), "secret");
   }

   #[test]
   fn wrong_email_is_asked_again() {
      let mut form = FormState::new(FormKind::Login);
      assert!(form.accept("ann.example.com").is_err());
      assert_eq!(form.current(), Some(Field::Email));
   }

   #[test]
   fn address_only_for_customers() {
      let customer = fill(FormKind::Signup, &["Customer"]).unwrap();
      assert_eq!(customer.fields().last(), Some(&Field::Address));

      let driver = fill(FormKind::Signup, &["driver"]).unwrap();
      assert_eq!(driver.fields().last(), Some(&Field::ConfirmPassword));

      assert!(fill(FormKind::Signup, &["admin"]).is_err());
   }

   #[test]
   fn password_mismatch_asks_password_again() {
      let mut form = fill(FormKind::Signup, &["owner", "Bob", "Stone", "bob@mail.io", "+1 555 0100", "one"]).unwrap();
      assert_eq!(form.current(), Some(Field::ConfirmPassword));

      assert_eq!(form.accept("two"), Err(String::from("Passwords do not match")));
      assert_eq!(form.current(), Some(Field::Password));

      form.accept("two").unwrap();
      form.accept("two").unwrap();
      assert_eq!(form.current(), None);
      assert_eq!(form.value(Field::Password), "two");
      assert_eq!(form.value(Field::Address), "");
   }

   #[test]
   fn optional_picture_is_skipped() {
      let form = fill(FormKind::NewMenuItem(3), &["Soup", "Hot", "4.5", SKIP]).unwrap();
      assert_eq!(form.value(Field::Image), "");
      assert_eq!(parse_price(form.value(Field::Price)), Some(4.5));
   }

   #[test]
   fn plan_items_are_normalized() {
      let form = fill(FormKind::NewMealPlan(3), &["Week", "$40", "-", "4, 5 x 6"]).unwrap();
      assert_eq!(form.value(Field::ItemIds), "4,5,6");
      assert!(fill(FormKind::NewMealPlan(3), &["Week", "0", "-", "4"]).is_err());
      assert!(fill(FormKind::NewMealPlan(3), &["Week", "40", "-", "none"]).is_err());
   }
}
