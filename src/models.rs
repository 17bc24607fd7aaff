/* ===============================================================================
HomeKitchen ordering bot.
Records of the remote API. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString, };

// Who is signed in, decides what the user can see and do
#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
   Customer,
   Owner,
   Driver,
   Admin,
}

// Delivery status of a placed order, capitalized as the API expects
#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, Display, EnumString, Serialize, Deserialize)]
pub enum OrderStatus {
   Pending,
   Claimed,
   Completed,
}

// Current user, GET /me/
#[derive(Clone, Debug, Deserialize)]
pub struct Me {
   #[serde(rename = "UID")]
   pub uid: i64,
   #[serde(rename = "FirstName", default)]
   pub first_name: Option<String>,
   #[serde(rename = "LastName", default)]
   pub last_name: Option<String>,
   #[serde(rename = "PhoneNo", default)]
   pub phone_no: Option<String>,
   #[serde(rename = "Role", default)]
   pub role: Option<Role>,
   #[serde(rename = "Addresses", default)]
   pub addresses: Vec<String>,
   #[serde(rename = "HomeKitchens", default)]
   pub home_kitchens: Vec<Vec<Value>>,
}

impl Me {
   // Users without a role record are treated as customers
   pub fn role(&self) -> Role {
      self.role.unwrap_or(Role::Customer)
   }

   pub fn full_name(&self) -> String {
      let first = self.first_name.as_deref().unwrap_or_default();
      let last = self.last_name.as_deref().unwrap_or_default();
      format!("{} {}", first, last).trim().to_string()
   }

   // Address for delivery prefill
   pub fn first_address(&self) -> Option<&str> {
      self.addresses.first()
      .map(|s| s.as_str())
      .filter(|s| !s.is_empty())
   }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Token {
   pub access_token: String,
   #[serde(default)]
   pub token_type: String,
}

// ============================================================================
// [Rows]
// ============================================================================
// Kitchens, menu items and meal plans come as arrays of columns

pub type Row = Vec<Value>;

fn cell(row: &[Value], idx: usize) -> &Value {
   row.get(idx).unwrap_or(&Value::Null)
}

fn int(row: &[Value], idx: usize, what: &str) -> Result<i64, String> {
   let v = cell(row, idx);
   v.as_i64()
   .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
   .ok_or_else(|| format!("{}: column {} is not an integer: {}", what, idx, v))
}

fn opt_int(row: &[Value], idx: usize) -> Option<i64> {
   int(row, idx, "").ok()
}

fn text(row: &[Value], idx: usize) -> String {
   opt_text(row, idx).unwrap_or_default()
}

fn opt_text(row: &[Value], idx: usize) -> Option<String> {
   match cell(row, idx) {
      Value::String(s) => Some(s.clone()),
      Value::Null => None,
      v => Some(v.to_string()),
   }
}

// Prices may be numbers or decimal strings
pub fn number(v: &Value) -> Option<f64> {
   match v {
      Value::Number(n) => n.as_f64(),
      Value::String(s) => s.trim().parse().ok(),
      _ => None,
   }
}

pub fn price_to_cents(price: f64) -> u64 {
   if price.is_finite() && price > 0.0 {
      (price * 100.0).round() as u64
   } else {
      0
   }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Kitchen {
   pub id: i64,
   pub owner_uid: i64,
   pub name: String,
   pub address: String,
   pub average_rating: Option<f64>,
   pub verified_by: Option<i64>,
   pub approval_status: Option<String>,
   pub logo: Option<String>,
}

impl Kitchen {
   pub fn from_row(row: &[Value]) -> Result<Self, String> {
      Ok(Self {
         id: int(row, 0, "kitchen")?,
         owner_uid: int(row, 1, "kitchen")?,
         name: text(row, 2),
         address: text(row, 3),
         average_rating: number(cell(row, 4)),
         verified_by: opt_int(row, 5),
         approval_status: opt_text(row, 6).filter(|s| !s.is_empty()),
         logo: opt_text(row, 7).filter(|s| !s.is_empty()),
      })
   }

   pub fn rating_desc(&self) -> String {
      match self.average_rating {
         Some(r) => format!("{:.1}", r),
         None => String::from("—"),
      }
   }

   pub fn status_desc(&self) -> &str {
      self.approval_status.as_deref().unwrap_or("—")
   }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MenuItem {
   pub id: i64,
   pub name: String,
   pub description: String,
   pub price: u64, // cents
   pub image: String,
}

impl MenuItem {
   pub fn from_row(row: &[Value]) -> Result<Self, String> {
      let price = number(cell(row, 3))
      .ok_or_else(|| format!("menu item: no price in {:?}", row))?;

      Ok(Self {
         id: int(row, 0, "menu item")?,
         name: text(row, 1),
         description: text(row, 2),
         price: price_to_cents(price),
         image: text(row, 5),
      })
   }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MealPlan {
   pub id: i64,
   pub name: String,
   pub total_price: u64, // cents
   pub image: String,
}

impl MealPlan {
   pub fn from_row(row: &[Value]) -> Result<Self, String> {
      let price = number(cell(row, 2)).unwrap_or_default();
      Ok(Self {
         id: int(row, 0, "meal plan")?,
         name: text(row, 1),
         total_price: price_to_cents(price),
         image: text(row, 3),
      })
   }
}

// ============================================================================
// [Driver and admin]
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
pub struct DriverOrder {
   #[serde(rename = "OrderID")]
   pub order_id: i64,
   #[serde(rename = "TotalPrice", default)]
   pub total_price: Value,
   #[serde(rename = "CustomerUID", default)]
   pub customer_uid: Option<i64>,
   #[serde(rename = "KitchenID", default)]
   pub kitchen_id: Option<i64>,
   #[serde(rename = "DriverUID", default)]
   pub driver_uid: Option<i64>,
   #[serde(rename = "ETA", default)]
   pub eta: Value,
   #[serde(rename = "Status")]
   pub status: OrderStatus,
}

impl DriverOrder {
   pub fn total_cents(&self) -> u64 {
      number(&self.total_price).map(price_to_cents).unwrap_or_default()
   }

   // Time of day may come as text or as seconds since midnight
   pub fn eta_desc(&self) -> String {
      match &self.eta {
         Value::String(s) if !s.is_empty() => s.clone(),
         Value::Number(n) => {
            let secs = n.as_f64().unwrap_or_default() as i64;
            format!("{:02}:{:02}:{:02}", secs / 3600 % 24, secs / 60 % 60, secs % 60)
         }
         _ => String::from("Not set"),
      }
   }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PendingDriver {
   #[serde(rename = "DriverUID")]
   pub driver_uid: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PendingKitchen {
   #[serde(rename = "KitchenID")]
   pub kitchen_id: i64,
   #[serde(rename = "Name", default)]
   pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UserSummary {
   #[serde(rename = "UID")]
   pub uid: i64,
   #[serde(rename = "FirstName", default)]
   pub first_name: Option<String>,
   #[serde(rename = "LastName", default)]
   pub last_name: Option<String>,
   #[serde(rename = "Role", default)]
   pub role: Option<Role>,
}

// ============================================================================
// [Requests]
// ============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct SignupRequest {
   #[serde(rename = "FirstName")]
   pub first_name: String,
   #[serde(rename = "LastName")]
   pub last_name: String,
   #[serde(rename = "Email")]
   pub email: String,
   #[serde(rename = "PhoneNo")]
   pub phone_no: String,
   #[serde(rename = "Password")]
   pub password: String,
   #[serde(rename = "Role")]
   pub role: Role,
   #[serde(rename = "Address")]
   pub address: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewKitchen {
   #[serde(rename = "Name")]
   pub name: String,
   #[serde(rename = "Address")]
   pub address: String,
   #[serde(rename = "AverageRating")]
   pub average_rating: Option<f64>,
   #[serde(rename = "VerifiedBy")]
   pub verified_by: Option<i64>,
   #[serde(rename = "ApprovalStatus")]
   pub approval_status: String,
   #[serde(rename = "Logo")]
   pub logo: Option<String>,
}

impl NewKitchen {
   pub fn pending(name: String, address: String, logo: Option<String>) -> Self {
      Self {
         name,
         address,
         average_rating: None,
         verified_by: None,
         approval_status: String::from("pending"),
         logo,
      }
   }
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct PlanItem {
   #[serde(rename = "ItemID")]
   pub item_id: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewMenuItem {
   #[serde(rename = "Name")]
   pub name: String,
   #[serde(rename = "Description")]
   pub description: String,
   #[serde(rename = "Price")]
   pub price: f64,
   #[serde(rename = "Image")]
   pub image: String,
   #[serde(rename = "Items")]
   pub items: Vec<PlanItem>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewMealPlan {
   #[serde(rename = "Name")]
   pub name: String,
   #[serde(rename = "TotalPrice")]
   pub total_price: f64,
   #[serde(rename = "Image")]
   pub image: String,
   #[serde(rename = "Items")]
   pub items: Vec<PlanItem>,
}

// Answer of POST /order/
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderPlaced {
   #[serde(default)]
   pub message: Option<String>,
   #[serde(rename = "OrderID", default)]
   pub order_id: Option<i64>,
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   #[test]
   fn role_parses_from_api_text() {
      assert_eq!("driver".parse::<Role>().unwrap(), Role::Driver);
      assert_eq!("Owner".parse::<Role>().unwrap(), Role::Owner);
      assert!("chef".parse::<Role>().is_err());
      assert_eq!(Role::Admin.as_ref(), "admin");
   }

   #[test]
   fn me_without_role_is_customer() {
      let me: Me = serde_json::from_value(json!({
         "UID": 7, "FirstName": "Ann", "LastName": "Lee", "PhoneNo": null, "Role": null
      })).unwrap();
      assert_eq!(me.role(), Role::Customer);
      assert_eq!(me.full_name(), "Ann Lee");
      assert_eq!(me.first_address(), None);
   }

   #[test]
   fn kitchen_row_with_nulls() {
      let row = json!([3, 11, "Mama's", "Elm st. 5", null, null, "pending", null]);
      let k = Kitchen::from_row(row.as_array().unwrap()).unwrap();
      assert_eq!(k.id, 3);
      assert_eq!(k.owner_uid, 11);
      assert_eq!(k.rating_desc(), "—");
      assert_eq!(k.status_desc(), "pending");
      assert!(k.logo.is_none());
   }

   #[test]
   fn menu_item_price_as_decimal_string() {
      let row = json!([21, "Dumplings", "Twelve pieces", "7.35", 3, "http://img/d.png"]);
      let item = MenuItem::from_row(row.as_array().unwrap()).unwrap();
      assert_eq!(item.price, 735);
      assert_eq!(item.image, "http://img/d.png");
   }

   #[test]
   fn row_without_id_is_rejected() {
      let row = json!(["x", "Dumplings"]);
      assert!(MenuItem::from_row(row.as_array().unwrap()).is_err());
   }

   #[test]
   fn negative_price_is_clamped() {
      assert_eq!(price_to_cents(-3.0), 0);
      assert_eq!(price_to_cents(f64::NAN), 0);
      assert_eq!(price_to_cents(0.1 + 0.2), 30);
   }

   #[test]
   fn eta_as_seconds_is_time_of_day() {
      let order: DriverOrder = serde_json::from_value(json!({
         "OrderID": 1, "TotalPrice": 25, "CustomerUID": 2, "KitchenID": 3,
         "DriverUID": null, "ETA": 45000.0, "Status": "Pending"
      })).unwrap();
      assert_eq!(order.eta_desc(), "12:30:00");
      assert_eq!(order.total_cents(), 2500);
      assert_eq!(order.status, OrderStatus::Pending);
   }
}
