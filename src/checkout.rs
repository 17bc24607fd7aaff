/* ===============================================================================
HomeKitchen ordering bot.
Placing one order per kitchen. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use std::{collections::HashSet, sync::{Arc, Mutex}, };
use chrono::{Duration, NaiveDateTime};
use futures::future::join_all;
use serde::Serialize;

use crate::api::{ApiError, OrderSink};
use crate::cart::Cart;
use crate::orders::*;
use crate::session::Session;

pub const PLACING: &str = "Placing orders…";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderLine {
   #[serde(rename = "ItemID")]
   pub item_id: i64,
   #[serde(rename = "Quantity")]
   pub quantity: u32,
}

// Body of POST /order/
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderRequest {
   #[serde(rename = "KitchenID")]
   pub kitchen_id: i64,
   #[serde(rename = "Items")]
   pub items: Vec<OrderLine>,
   #[serde(rename = "ETA")]
   pub eta: String,
   #[serde(rename = "TotalPrice")]
   pub total_price: u64, // whole units
}

impl OrderRequest {
   pub fn new(group: &KitchenGroup, eta: &str) -> Self {
      Self {
         kitchen_id: group.kitchen_id,
         items: group.items
            .iter()
            .map(|i| OrderLine { item_id: i.item_id, quantity: i.quantity })
            .collect(),
         eta: eta.to_string(),
         total_price: (group.subtotal + 50) / 100,
      }
   }
}

// Time of day when the orders should arrive
pub fn eta(now: NaiveDateTime, window: Duration) -> String {
   (now + window).format("%H:%M:%S").to_string()
}

// Same ETA for every group of the attempt
pub fn build_requests(orders: &Orders, eta: &str) -> Vec<OrderRequest> {
   orders.groups()
   .map(|g| OrderRequest::new(g, eta))
   .collect()
}

#[derive(Debug)]
pub struct OrderFailure {
   pub kitchen_id: i64,
   pub error: ApiError,
}

impl OrderFailure {
   pub fn reason(&self) -> String {
      self.error.reason(&format!("Order to kitchen {} failed", self.kitchen_id))
   }

   pub fn is_unauthorized(&self) -> bool {
      matches!(self.error, ApiError::Unauthorized)
   }
}

// Sends all requests at once and waits for every answer. Orders accepted before
// a failure stay placed, there is no way to cancel them.
pub async fn place_orders(sink: &dyn OrderSink, token: &str, requests: &[OrderRequest]) -> Result<usize, OrderFailure> {
   let answers = join_all(
      requests.iter().map(|r| sink.create_order(token, r))
   ).await;

   let mut first_failure = None;
   let mut placed = 0;
   for (request, answer) in requests.iter().zip(answers) {
      match answer {
         Ok(placed_order) => {
            placed += 1;
            log::info!("Order {:?} placed to kitchen {}", placed_order.order_id, request.kitchen_id);
         }
         Err(error) => {
            log::info!("Order to kitchen {} failed: {}", request.kitchen_id, error);
            if first_failure.is_none() {
               first_failure = Some(OrderFailure { kitchen_id: request.kitchen_id, error });
            }
         }
      }
   }

   match first_failure {
      Some(failure) => Err(failure),
      None => Ok(placed),
   }
}

#[derive(Debug)]
pub enum CheckoutOutcome {
   Empty,
   Placed(usize),
   Failed(OrderFailure),
}

// Cart becomes empty only when every kitchen accepted its order
pub async fn checkout(session: &Session, sink: &dyn OrderSink, token: &str, now: NaiveDateTime, window: Duration) -> Result<CheckoutOutcome, String> {
   let cart = session.cart().await?;
   let orders = Orders::from(&cart);
   if orders.is_empty() {
      return Ok(CheckoutOutcome::Empty);
   }

   let eta = eta(now, window);
   let requests = build_requests(&orders, &eta);
   match place_orders(sink, token, &requests).await {
      Ok(placed) => {
         // Orders are on the server already, a stale cart must not turn it into a failure
         if let Err(err) = session.clear_cart().await {
            log::error!("checkout clear_cart: {}", err);
            if let Err(err) = session.save_cart(&Cart::default()).await {
               log::error!("checkout save_cart: {}", err);
            }
         }
         Ok(CheckoutOutcome::Placed(placed))
      }
      Err(failure) => Ok(CheckoutOutcome::Failed(failure)),
   }
}

// Progress of the "Place orders" action
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CheckoutPhase {
   #[default]
   Idle,
   Submitting,
   Success,
   Failed(String),
}

impl CheckoutPhase {
   pub fn finish(outcome: &CheckoutOutcome) -> Self {
      match outcome {
         CheckoutOutcome::Empty => Self::Idle,
         CheckoutOutcome::Placed(_) => Self::Success,
         CheckoutOutcome::Failed(failure) => Self::Failed(failure.reason()),
      }
   }
}

// Users whose orders are being placed right now. Lives outside the dialogue
// so that screens switched meanwhile cannot reset it.
#[derive(Clone, Default)]
pub struct InFlight {
   users: Arc<Mutex<HashSet<i64>>>,
}

impl InFlight {
   // Repeated taps while submitting are refused
   pub fn begin(&self, user_id: i64) -> Result<InFlightGuard, &'static str> {
      let mut users = self.users
      .lock()
      .map_err(|_| PLACING)?;

      if users.insert(user_id) {
         Ok(InFlightGuard { users: self.users.clone(), user_id })
      } else {
         Err(PLACING)
      }
   }

   pub fn is_submitting(&self, user_id: i64) -> bool {
      self.users
      .lock()
      .map(|users| users.contains(&user_id))
      .unwrap_or(true)
   }
}

// Releases the user when the attempt ends, whatever the outcome
pub struct InFlightGuard {
   users: Arc<Mutex<HashSet<i64>>>,
   user_id: i64,
}

impl Drop for InFlightGuard {
   fn drop(&mut self) {
      match self.users.lock() {
         Ok(mut users) => {
            users.remove(&self.user_id);
         }
         Err(err) => log::error!("InFlightGuard::drop for {}: {}", self.user_id, err),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use std::{collections::HashMap, sync::atomic::{AtomicUsize, Ordering}, };
   use chrono::NaiveDate;
   use futures::future::BoxFuture;
   use reqwest::StatusCode;

   use crate::cart::*;
   use crate::models::OrderPlaced;
   use crate::session::{MemStore, SessionStore};

   // Answers by kitchen id, remembers what was sent
   #[derive(Default)]
   struct FakeKitchens {
      rejected: HashMap<i64, Option<String>>,
      sent: Mutex<Vec<OrderRequest>>,
   }

   impl FakeKitchens {
      fn rejecting(kitchen_id: i64, detail: Option<&str>) -> Self {
         let mut rejected = HashMap::new();
         rejected.insert(kitchen_id, detail.map(String::from));
         Self { rejected, ..Default::default() }
      }

      fn sent(&self) -> Vec<OrderRequest> {
         self.sent.lock().unwrap().clone()
      }
   }

   impl OrderSink for FakeKitchens {
      fn create_order<'a>(&'a self, _token: &'a str, order: &'a OrderRequest) -> BoxFuture<'a, Result<OrderPlaced, ApiError>> {
         self.sent.lock().unwrap().push(order.clone());
         let res = match self.rejected.get(&order.kitchen_id) {
            Some(detail) => Err(ApiError::Rejected {
               status: StatusCode::BAD_REQUEST,
               detail: detail.clone(),
            }),
            None => Ok(OrderPlaced { message: None, order_id: Some(order.kitchen_id * 100) }),
         };
         Box::pin(async move { res })
      }
   }

   fn line(item_id: i64, kitchen_id: i64, unit_price: u64, quantity: u32) -> CartLine {
      CartLine {
         item_id,
         kitchen_id,
         kitchen_name: format!("Kitchen {}", kitchen_id),
         unit_price,
         quantity,
         name: format!("Item {}", item_id),
         image: String::default(),
      }
   }

   fn noon() -> NaiveDateTime {
      NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(12, 0, 0).unwrap()
   }

   async fn session_with(lines: Vec<CartLine>) -> Session {
      let session = Session::new(Arc::new(MemStore::default()), 42);
      session.save_cart(&Cart::from(lines)).await.unwrap();
      session
   }

   #[test]
   fn eta_wraps_midnight() {
      let late = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(23, 45, 10).unwrap();
      assert_eq!(eta(late, Duration::minutes(30)), "00:15:10");
      assert_eq!(eta(noon(), Duration::minutes(30)), "12:30:00");
   }

   #[test]
   fn request_per_group() {
      let orders = Orders::new(&[line(1, 1, 1000, 2), line(3, 1, 250, 1), line(2, 2, 499, 1)]);
      let requests = build_requests(&orders, "12:30:00");

      assert_eq!(requests.len(), 2);
      assert_eq!(requests[0].kitchen_id, 1);
      assert_eq!(requests[0].items, vec![
         OrderLine { item_id: 1, quantity: 2 },
         OrderLine { item_id: 3, quantity: 1 },
      ]);
      assert_eq!(requests[0].total_price, 23);
      assert_eq!(requests[1].total_price, 5);
      assert!(requests.iter().all(|r| r.eta == "12:30:00"));
   }

   #[test]
   fn request_json_names() {
      let orders = Orders::new(&[line(8, 4, 1000, 1)]);
      let json = serde_json::to_value(&build_requests(&orders, "10:00:00")[0]).unwrap();
      assert_eq!(json, serde_json::json!({
         "KitchenID": 4,
         "Items": [{"ItemID": 8, "Quantity": 1}],
         "ETA": "10:00:00",
         "TotalPrice": 10
      }));
   }

   #[tokio::test]
   async fn one_kitchen_rejects() {
      let lines = vec![line(1, 1, 1000, 2), line(2, 2, 500, 1)];
      let session = session_with(lines.clone()).await;
      let sink = FakeKitchens::rejecting(2, Some("Kitchen closed"));

      let outcome = checkout(&session, &sink, "t", noon(), Duration::minutes(30)).await.unwrap();
      match &outcome {
         CheckoutOutcome::Failed(failure) => {
            assert_eq!(failure.kitchen_id, 2);
            assert_eq!(failure.reason(), "Kitchen closed");
         }
         other => panic!("unexpected {:?}", other),
      }
      assert_eq!(CheckoutPhase::finish(&outcome), CheckoutPhase::Failed(String::from("Kitchen closed")));

      // Both orders were sent, the cart is untouched
      assert_eq!(sink.sent().len(), 2);
      assert_eq!(session.cart().await.unwrap().lines(), &lines[..]);
   }

   #[tokio::test]
   async fn rejection_without_detail() {
      let session = session_with(vec![line(1, 3, 1000, 1)]).await;
      let sink = FakeKitchens::rejecting(3, None);

      match checkout(&session, &sink, "t", noon(), Duration::minutes(30)).await.unwrap() {
         CheckoutOutcome::Failed(failure) => assert_eq!(failure.reason(), "Order to kitchen 3 failed"),
         other => panic!("unexpected {:?}", other),
      }
   }

   #[tokio::test]
   async fn first_failure_in_kitchen_order() {
      let mut rejected = HashMap::new();
      rejected.insert(2, Some(String::from("Out of rice")));
      rejected.insert(5, Some(String::from("Kitchen closed")));
      let sink = FakeKitchens { rejected, ..Default::default() };

      let orders = Orders::new(&[line(1, 5, 100, 1), line(2, 2, 100, 1), line(3, 1, 100, 1)]);
      let failure = place_orders(&sink, "t", &build_requests(&orders, "12:00:00")).await.unwrap_err();
      assert_eq!(failure.reason(), "Out of rice");
   }

   #[tokio::test]
   async fn all_kitchens_accept() {
      let session = session_with(vec![line(1, 1, 1000, 2), line(2, 2, 500, 1), line(3, 2, 100, 4)]).await;
      let sink = FakeKitchens::default();

      let outcome = checkout(&session, &sink, "t", noon(), Duration::minutes(30)).await.unwrap();
      assert!(matches!(outcome, CheckoutOutcome::Placed(2)));
      assert_eq!(CheckoutPhase::finish(&outcome), CheckoutPhase::Success);
      assert!(session.cart().await.unwrap().is_empty());

      let sent = sink.sent();
      assert_eq!(sent.len(), 2);
      assert!(sent.iter().all(|r| r.eta == "12:30:00"));
   }

   #[tokio::test]
   async fn empty_cart_sends_nothing() {
      let session = session_with(Vec::new()).await;
      let sink = FakeKitchens::default();

      let outcome = checkout(&session, &sink, "t", noon(), Duration::minutes(30)).await.unwrap();
      assert!(matches!(outcome, CheckoutOutcome::Empty));
      assert!(sink.sent().is_empty());
   }

   #[test]
   fn second_tap_while_submitting() {
      let in_flight = InFlight::default();
      let guard = in_flight.begin(42).unwrap();
      assert!(in_flight.is_submitting(42));

      // Whatever screen the user went to, the attempt is still running
      assert_eq!(in_flight.begin(42).err(), Some(PLACING));
      assert!(in_flight.begin(7).is_ok());

      // The attempt ended, a retry is possible
      drop(guard);
      assert!(!in_flight.is_submitting(42));
      assert!(in_flight.begin(42).is_ok());
   }

   #[test]
   fn clones_share_attempts() {
      let in_flight = InFlight::default();
      let other = in_flight.clone();
      let _guard = in_flight.begin(1).unwrap();
      assert_eq!(other.begin(1).err(), Some(PLACING));
   }

   // Session storage that cannot delete anything
   #[derive(Default)]
   struct NoRemove {
      inner: MemStore,
   }

   impl SessionStore for NoRemove {
      fn get<'a>(&'a self, user_id: i64, key: &'a str) -> BoxFuture<'a, Result<Option<String>, String>> {
         self.inner.get(user_id, key)
      }

      fn set<'a>(&'a self, user_id: i64, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), String>> {
         self.inner.set(user_id, key, value)
      }

      fn remove<'a>(&'a self, _user_id: i64, _key: &'a str) -> BoxFuture<'a, Result<(), String>> {
         Box::pin(async { Err(String::from("db down")) })
      }
   }

   #[tokio::test]
   async fn placed_even_if_cart_removal_fails() {
      let session = Session::new(Arc::new(NoRemove::default()), 42);
      session.save_cart(&Cart::from(vec![line(1, 1, 1000, 1), line(2, 2, 500, 1)])).await.unwrap();
      let sink = FakeKitchens::default();

      let outcome = checkout(&session, &sink, "t", noon(), Duration::minutes(30)).await.unwrap();
      assert!(matches!(outcome, CheckoutOutcome::Placed(2)));
      assert_eq!(sink.sent().len(), 2);

      // Emptied by overwriting, so a retry has nothing to send again
      assert!(session.cart().await.unwrap().is_empty());
   }

   // Kitchens that answer after a delay, (delay in ms, accepted)
   #[derive(Default)]
   struct SlowKitchens {
      answers: HashMap<i64, (u64, bool)>,
      started: AtomicUsize,
      finished: AtomicUsize,
      started_at_first_answer: Mutex<Option<usize>>,
   }

   impl SlowKitchens {
      fn new(answers: &[(i64, u64, bool)]) -> Self {
         let answers = answers.iter()
         .map(|&(kitchen_id, delay, accepted)| (kitchen_id, (delay, accepted)))
         .collect();
         Self { answers, ..Default::default() }
      }
   }

   impl OrderSink for SlowKitchens {
      fn create_order<'a>(&'a self, _token: &'a str, order: &'a OrderRequest) -> BoxFuture<'a, Result<OrderPlaced, ApiError>> {
         Box::pin(async move {
            let (delay, accepted) = self.answers.get(&order.kitchen_id).copied().unwrap_or((0, true));
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;

            self.started_at_first_answer
            .lock()
            .unwrap()
            .get_or_insert(self.started.load(Ordering::SeqCst));
            self.finished.fetch_add(1, Ordering::SeqCst);

            if accepted {
               Ok(OrderPlaced { message: None, order_id: Some(order.kitchen_id) })
            } else {
               Err(ApiError::Rejected { status: StatusCode::CONFLICT, detail: Some(String::from("Kitchen closed")) })
            }
         })
      }
   }

   #[tokio::test]
   async fn kitchens_are_asked_at_once() {
      let sink = SlowKitchens::new(&[(1, 30, true), (2, 10, true), (3, 20, true)]);
      let orders = Orders::new(&[line(1, 1, 100, 1), line(2, 2, 100, 1), line(3, 3, 100, 1)]);

      let placed = place_orders(&sink, "t", &build_requests(&orders, "12:00:00")).await.unwrap();
      assert_eq!(placed, 3);

      // Every request was on its way before the first answer came
      assert_eq!(*sink.started_at_first_answer.lock().unwrap(), Some(3));
      assert_eq!(sink.finished.load(Ordering::SeqCst), 3);
   }

   #[tokio::test]
   async fn fast_failure_waits_for_slow_kitchens() {
      let sink = SlowKitchens::new(&[(1, 5, false), (2, 50, true)]);
      let orders = Orders::new(&[line(1, 1, 100, 1), line(2, 2, 100, 1)]);

      let failure = place_orders(&sink, "t", &build_requests(&orders, "12:00:00")).await.unwrap_err();
      assert_eq!(failure.kitchen_id, 1);
      assert_eq!(failure.reason(), "Kitchen closed");

      // The slow order was not abandoned
      assert_eq!(sink.finished.load(Ordering::SeqCst), 2);
   }
}
