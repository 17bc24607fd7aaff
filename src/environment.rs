/* ===============================================================================
HomeKitchen ordering bot.
Global vars, service chat. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use chrono::{Duration, FixedOffset, NaiveDateTime, Offset, Utc,};
use once_cell::sync::{OnceCell};
use smart_default::SmartDefault;
use std::{env, str::FromStr, };
use teloxide::{
   prelude::*, types::{ChatId, MessageId,},
};

// Settings
pub static VARS: OnceCell<Vars> = OnceCell::new();

// Service chat, optional
static CHAT: OnceCell<ServiceChat> = OnceCell::new();

// For send info to service chat
#[derive(Clone)]
struct ServiceChat {
   chat_id: ChatId,
   bot: Bot,
}

impl ServiceChat {
   async fn send(&self, text: &str) -> Option<MessageId> {
      let res = self.bot
      .send_message(self.chat_id, text)
      .disable_notification(true)
      .await;

      match res {
         Ok(m) => Some(m.id),
         Err(err) => {
            log::info!("Error log({}): {}", text, err);
            None
         }
      }
   }
}

// Send message to service chat without notification
pub async fn log(text: &str) -> Option<MessageId> {
   match CHAT.get() {
      Some(chat) => chat.send(text).await,
      None => None,
   }
}

// Enviroment variables
#[derive(Clone, Debug, SmartDefault)]
pub struct Vars {
   // Base url of the remote API, without trailing slash
   #[default(String::from("http://localhost:8000"))]
   pub api_url: String,

   // Optional PostgreSQL for sessions
   pub database_url: Option<String>,

   // Webhook host and port, polling if absent
   pub host: Option<String>,
   pub port: Option<u16>,

   // Service chat
   pub log_group_id: Option<i64>,

   // Time zone, UTC
   #[default(Utc.fix())]
   pub time_zone: FixedOffset,

   // Minutes from checkout to estimated arrival
   #[default(30)]
   pub delivery_window: i64,

   // Price prefix
   #[default(String::from("$"))]
   pub price_unit: String,
}

impl Vars {
   pub fn from_env() -> Self {
      let mut res = Self::default();

      if let Ok(s) = env::var("API_URL") {
         res.api_url = s.trim_end_matches('/').to_string();
      } else {
         log::info!("There is no environment variable API_URL, using {}", res.api_url);
      }

      res.database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
      res.host = env::var("HOST").ok().filter(|s| !s.is_empty());
      res.port = parse_var("PORT");
      res.log_group_id = parse_var("LOG_GROUP_ID");

      if let Some(hours) = parse_var::<i32>("TIME_ZONE") {
         match time_zone(hours) {
            Some(tz) => res.time_zone = tz,
            None => log::warn!("TIME_ZONE {} is out of range, UTC used", hours),
         }
      }

      if let Some(minutes) = parse_var::<i64>("DELIVERY_WINDOW") {
         if is_delivery_window(minutes) {
            res.delivery_window = minutes;
         } else {
            log::warn!("DELIVERY_WINDOW must be from 0 to {} minutes, got {}, {} used", MAX_DELIVERY_WINDOW, minutes, res.delivery_window);
         }
      }

      if let Ok(s) = env::var("PRICE_UNIT") {
         res.price_unit = s;
      }

      res
   }
}

// A day at most
const MAX_DELIVERY_WINDOW: i64 = 24 * 60;

// Offset from hours east of UTC, None if there is no such zone
fn time_zone(hours: i32) -> Option<FixedOffset> {
   if !(-23..=23).contains(&hours) {
      return None;
   }
   FixedOffset::east_opt(hours * 3600)
}

fn is_delivery_window(minutes: i64) -> bool {
   (0..=MAX_DELIVERY_WINDOW).contains(&minutes)
}

// Value of the variable if it is set and parsed
fn parse_var<T: FromStr>(name: &str) -> Option<T> {
   let s = env::var(name).ok()?;
   if s.is_empty() {
      return None;
   }

   match s.parse::<T>() {
      Ok(v) => Some(v),
      Err(_) => {
         log::warn!("Something wrong with {}: '{}'", name, s);
         None
      }
   }
}

// Settings loaded at start or defaults
pub fn vars() -> &'static Vars {
   VARS.get_or_init(Vars::default)
}

// Remember the service chat if configured
pub fn set_service_chat(bot: Bot) {
   match vars().log_group_id {
      Some(id) => {
         let chat = ServiceChat { chat_id: ChatId(id), bot };
         if CHAT.set(chat).is_err() {
            log::info!("Service chat already set");
         }
      }
      None => log::info!("There is no environment variable LOG_GROUP_ID, no service chat"),
   }
}

// Current local time
pub fn current_date_time() -> NaiveDateTime {
   Utc::now().with_timezone(&vars().time_zone).naive_local()
}

pub fn delivery_window() -> Duration {
   Duration::minutes(vars().delivery_window)
}

// String with info about time zone
pub fn time_zone_info() -> String {
   let our_timezone = vars().time_zone.local_minus_utc() / 3600;
   if our_timezone >= 0 {
      format!("UTC+{}", our_timezone)
   } else {
      format!("UTC{}", our_timezone)
   }
}

// Price in cents as text with units, "$12.50"
pub fn price_with_unit(cents: u64) -> String {
   format!("{}{}", vars().price_unit, format_cents(cents))
}

pub fn format_cents(cents: u64) -> String {
   format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn cents_are_shown_with_two_decimals() {
      assert_eq!(format_cents(0), "0.00");
      assert_eq!(format_cents(5), "0.05");
      assert_eq!(format_cents(2500), "25.00");
      assert_eq!(format_cents(123456), "1234.56");
   }

   #[test]
   fn defaults_without_environment() {
      let vars = Vars::default();
      assert_eq!(vars.delivery_window, 30);
      assert_eq!(vars.price_unit, "$");
      assert_eq!(vars.time_zone.local_minus_utc(), 0);
      assert!(vars.database_url.is_none());
   }

   #[test]
   fn absurd_time_zone_is_rejected() {
      assert_eq!(time_zone(3).map(|tz| tz.local_minus_utc()), Some(3 * 3600));
      assert_eq!(time_zone(-11).map(|tz| tz.local_minus_utc()), Some(-11 * 3600));
      assert!(time_zone(24).is_none());
      assert!(time_zone(i32::MAX).is_none());
      assert!(time_zone(i32::MIN).is_none());
   }

   #[test]
   fn delivery_window_is_limited() {
      assert!(is_delivery_window(0));
      assert!(is_delivery_window(30));
      assert!(is_delivery_window(MAX_DELIVERY_WINDOW));
      assert!(!is_delivery_window(-1));
      assert!(!is_delivery_window(i64::MAX));
   }
}
