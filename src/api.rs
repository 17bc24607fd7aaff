/* ===============================================================================
HomeKitchen ordering bot.
Remote API client. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response, StatusCode, };
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::checkout::OrderRequest;
use crate::models::*;

#[derive(Debug, Error)]
pub enum ApiError {
   #[error("Your session has expired, please /login again")]
   Unauthorized,
   #[error("{}", describe(.status, .detail))]
   Rejected {
      status: StatusCode,
      detail: Option<String>,
   },
   #[error("Network error: {0}")]
   Transport(#[from] reqwest::Error),
   #[error("Unexpected answer from server: {0}")]
   Decode(String),
}

fn describe(status: &StatusCode, detail: &Option<String>) -> String {
   match detail {
      Some(detail) => detail.clone(),
      None => format!("Request failed with status {}", status),
   }
}

impl ApiError {
   pub fn is_not_found(&self) -> bool {
      matches!(self, Self::Rejected { status, .. } if *status == StatusCode::NOT_FOUND)
   }

   // Message from the server if there is one, else the given text
   pub fn reason(&self, fallback: &str) -> String {
      match self {
         Self::Rejected { detail: Some(detail), .. } => detail.clone(),
         Self::Unauthorized => self.to_string(),
         _ => fallback.to_string(),
      }
   }
}

// Text of the "detail" field of an error answer. Validation errors come as a list.
pub fn detail_of(body: &str) -> Option<String> {
   let json: Value = serde_json::from_str(body).ok()?;
   let res = match json.get("detail")? {
      Value::String(s) => s.clone(),
      Value::Array(list) => list.iter()
         .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            v => v.get("msg").and_then(|m| m.as_str()).map(String::from),
         })
         .collect::<Vec<String>>()
         .join("; "),
      Value::Null => String::default(),
      v => v.to_string(),
   };

   if res.is_empty() { None } else { Some(res) }
}

// Missing lists are reported by the server as 404
fn or_empty<T>(res: Result<Vec<T>, ApiError>) -> Result<Vec<T>, ApiError> {
   match res {
      Err(e) if e.is_not_found() => Ok(Vec::new()),
      res => res,
   }
}

#[derive(Clone)]
pub struct Api {
   client: Client,
   base: String,
}

impl Api {
   pub fn new(base: &str) -> Self {
      Self {
         client: Client::new(),
         base: base.trim_end_matches('/').to_string(),
      }
   }

   fn url(&self, path: &str) -> String {
      format!("{}{}", self.base, path)
   }

   fn get(&self, token: &str, path: &str) -> RequestBuilder {
      self.client.get(self.url(path)).bearer_auth(token)
   }

   fn post(&self, token: &str, path: &str) -> RequestBuilder {
      self.client.post(self.url(path)).bearer_auth(token)
   }

   async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
      let res = req.send().await?;
      let status = res.status();
      if status.is_success() {
         return Ok(res);
      }

      if status == StatusCode::UNAUTHORIZED {
         return Err(ApiError::Unauthorized);
      }

      let body = res.text().await.unwrap_or_default();
      log::info!("api answer {}: {}", status, body);
      Err(ApiError::Rejected { status, detail: detail_of(&body) })
   }

   async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
      let text = self.send(req).await?.text().await?;
      serde_json::from_str(&text)
      .map_err(|err| ApiError::Decode(format!("{}: {}", err, text)))
   }

   async fn rows<T>(&self, req: RequestBuilder, decode: fn(&[Value]) -> Result<T, String>) -> Result<Vec<T>, ApiError> {
      let rows: Vec<Row> = self.fetch(req).await?;
      rows.iter()
      .map(|row| decode(row).map_err(ApiError::Decode))
      .collect()
   }

   async fn execute(&self, req: RequestBuilder) -> Result<(), ApiError> {
      self.send(req).await?;
      Ok(())
   }

   // ============================================================================
   // [Account]
   // ============================================================================

   pub async fn health(&self) -> Result<String, ApiError> {
      let res = self.send(self.client.get(self.url("/"))).await?;
      let text = res.text().await?;

      // The server answers with a JSON string
      let text = serde_json::from_str::<String>(&text).unwrap_or(text);
      Ok(text)
   }

   pub async fn signup(&self, request: &SignupRequest) -> Result<(), ApiError> {
      let req = self.client.post(self.url("/auth/")).json(request);
      self.execute(req).await
   }

   pub async fn login(&self, email: &str, password: &str) -> Result<Token, ApiError> {
      let req = self.client
      .post(self.url("/auth/token"))
      .form(&[("username", email), ("password", password)]);
      self.fetch(req).await
   }

   pub async fn me(&self, token: &str) -> Result<Me, ApiError> {
      self.fetch(self.get(token, "/me/")).await
   }

   // ============================================================================
   // [Kitchens]
   // ============================================================================

   pub async fn kitchens(&self, token: &str) -> Result<Vec<Kitchen>, ApiError> {
      self.rows(self.get(token, "/homekitchens/"), Kitchen::from_row).await
   }

   pub async fn kitchen(&self, token: &str, kitchen_id: i64) -> Result<Kitchen, ApiError> {
      self.kitchens(token)
      .await?
      .into_iter()
      .find(|k| k.id == kitchen_id)
      .ok_or(ApiError::Rejected {
         status: StatusCode::NOT_FOUND,
         detail: Some(String::from("Kitchen not found")),
      })
   }

   pub async fn create_kitchen(&self, token: &str, kitchen: &NewKitchen) -> Result<(), ApiError> {
      self.execute(self.post(token, "/homekitchens/").json(kitchen)).await
   }

   pub async fn menu_items(&self, token: &str, kitchen_id: i64) -> Result<Vec<MenuItem>, ApiError> {
      let path = format!("/homekitchens/{}/menuitems", kitchen_id);
      or_empty(self.rows(self.get(token, &path), MenuItem::from_row).await)
   }

   pub async fn meal_plans(&self, token: &str, kitchen_id: i64) -> Result<Vec<MealPlan>, ApiError> {
      let path = format!("/homekitchens/{}/mealplans", kitchen_id);
      or_empty(self.rows(self.get(token, &path), MealPlan::from_row).await)
   }

   pub async fn meal_plan_items(&self, token: &str, kitchen_id: i64, plan_id: i64) -> Result<Vec<MenuItem>, ApiError> {
      let path = format!("/homekitchens/{}/{}/items", kitchen_id, plan_id);
      or_empty(self.rows(self.get(token, &path), MenuItem::from_row).await)
   }

   pub async fn create_menu_item(&self, token: &str, kitchen_id: i64, item: &NewMenuItem) -> Result<(), ApiError> {
      let path = format!("/homekitchens/{}/menuitems", kitchen_id);
      self.execute(self.post(token, &path).json(item)).await
   }

   pub async fn delete_menu_item(&self, token: &str, kitchen_id: i64, item_id: i64) -> Result<(), ApiError> {
      let url = self.url(&format!("/homekitchens/{}/menuitems/{}", kitchen_id, item_id));
      self.execute(self.client.delete(url).bearer_auth(token)).await
   }

   pub async fn create_meal_plan(&self, token: &str, kitchen_id: i64, plan: &NewMealPlan) -> Result<(), ApiError> {
      let path = format!("/homekitchens/{}/mealplans", kitchen_id);
      self.execute(self.post(token, &path).json(plan)).await
   }

   pub async fn delete_meal_plan(&self, token: &str, kitchen_id: i64, plan_id: i64) -> Result<(), ApiError> {
      let url = self.url(&format!("/homekitchens/{}/mealplans/{}", kitchen_id, plan_id));
      self.execute(self.client.delete(url).bearer_auth(token)).await
   }

   // ============================================================================
   // [Orders]
   // ============================================================================

   pub async fn place_order(&self, token: &str, order: &OrderRequest) -> Result<OrderPlaced, ApiError> {
      let res = self.send(self.post(token, "/order/").json(order)).await?;
      let text = res.text().await?;

      // Only the status matters, the body is informational
      Ok(serde_json::from_str(&text).unwrap_or_default())
   }

   pub async fn driver_orders(&self, token: &str, status: OrderStatus) -> Result<Vec<DriverOrder>, ApiError> {
      let req = self.get(token, "/driver/orders").query(&[("status", status.as_ref())]);
      self.fetch(req).await
   }

   pub async fn claim_order(&self, token: &str, order_id: i64) -> Result<(), ApiError> {
      let path = format!("/driver/orders/{}/claim", order_id);
      self.execute(self.post(token, &path)).await
   }

   pub async fn complete_order(&self, token: &str, order_id: i64) -> Result<(), ApiError> {
      let path = format!("/driver/orders/{}/complete", order_id);
      self.execute(self.post(token, &path)).await
   }

   // ============================================================================
   // [Admin]
   // ============================================================================

   pub async fn pending_drivers(&self, token: &str) -> Result<Vec<PendingDriver>, ApiError> {
      self.fetch(self.get(token, "/admin/pending-drivers")).await
   }

   pub async fn pending_kitchens(&self, token: &str) -> Result<Vec<PendingKitchen>, ApiError> {
      self.fetch(self.get(token, "/admin/pending-kitchens")).await
   }

   pub async fn all_users(&self, token: &str) -> Result<Vec<UserSummary>, ApiError> {
      self.fetch(self.get(token, "/admin/all-users")).await
   }

   pub async fn verify_driver(&self, token: &str, driver_id: i64) -> Result<(), ApiError> {
      let url = self.url(&format!("/admin/verify-driver/{}", driver_id));
      self.execute(self.client.put(url).bearer_auth(token)).await
   }

   pub async fn approve_kitchen(&self, token: &str, kitchen_id: i64) -> Result<(), ApiError> {
      let url = self.url(&format!("/admin/approve-kitchen/{}", kitchen_id));
      self.execute(self.client.put(url).bearer_auth(token)).await
   }

   pub async fn delete_user(&self, token: &str, uid: i64) -> Result<(), ApiError> {
      let url = self.url(&format!("/admin/delete-user/{}", uid));
      self.execute(self.client.delete(url).bearer_auth(token)).await
   }
}

// Where per-kitchen orders go, the API or a fake in tests
pub trait OrderSink: Send + Sync {
   fn create_order<'a>(&'a self, token: &'a str, order: &'a OrderRequest) -> BoxFuture<'a, Result<OrderPlaced, ApiError>>;
}

impl OrderSink for Api {
   fn create_order<'a>(&'a self, token: &'a str, order: &'a OrderRequest) -> BoxFuture<'a, Result<OrderPlaced, ApiError>> {
      Box::pin(self.place_order(token, order))
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn detail_as_text() {
      let body = r#"{"detail": "Kitchen closed"}"#;
      assert_eq!(detail_of(body).as_deref(), Some("Kitchen closed"));
   }

   #[test]
   fn detail_as_validation_list() {
      let body = r#"{"detail": [
         {"loc": ["body", "ETA"], "msg": "field required", "type": "value_error.missing"},
         {"loc": ["body", "Items"], "msg": "value is not a valid list", "type": "type_error.list"}
      ]}"#;
      assert_eq!(detail_of(body).as_deref(), Some("field required; value is not a valid list"));
   }

   #[test]
   fn no_detail() {
      assert_eq!(detail_of("Internal Server Error"), None);
      assert_eq!(detail_of(r#"{"message": "x"}"#), None);
      assert_eq!(detail_of(r#"{"detail": ""}"#), None);
   }

   #[test]
   fn reason_prefers_server_text() {
      let err = ApiError::Rejected {
         status: StatusCode::BAD_REQUEST,
         detail: Some(String::from("Only customers can place orders")),
      };
      assert_eq!(err.reason("Order to kitchen 2 failed"), "Only customers can place orders");

      let err = ApiError::Rejected { status: StatusCode::BAD_GATEWAY, detail: None };
      assert_eq!(err.reason("Order to kitchen 2 failed"), "Order to kitchen 2 failed");
      assert_eq!(err.to_string(), "Request failed with status 502 Bad Gateway");

      let err = ApiError::Decode(String::from("eof"));
      assert_eq!(err.reason("Login failed."), "Login failed.");
   }

   #[test]
   fn not_found_lists_become_empty() {
      let res: Result<Vec<i64>, ApiError> = Err(ApiError::Rejected {
         status: StatusCode::NOT_FOUND,
         detail: Some(String::from("No meal plans found for this kitchen")),
      });
      assert_eq!(or_empty(res).unwrap(), Vec::<i64>::new());

      let res: Result<Vec<i64>, ApiError> = Err(ApiError::Unauthorized);
      assert!(or_empty(res).is_err());
   }

   #[test]
   fn base_url_without_trailing_slash() {
      let api = Api::new("http://localhost:8000/");
      assert_eq!(api.url("/me/"), "http://localhost:8000/me/");
   }
}
