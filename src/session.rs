/* ===============================================================================
HomeKitchen ordering bot.
Per-user session storage. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use std::{collections::HashMap, sync::{Arc, Mutex}, };
use futures::future::BoxFuture;

use crate::cart::*;
use crate::models::Role;

// Keys of the stored values
const TOKEN: &str = "access_token";
const ROLE: &str = "role";
const CART: &str = "cart";

// Key-value store scoped by telegram user, survives restarts when backed by db
pub trait SessionStore: Send + Sync {
   fn get<'a>(&'a self, user_id: i64, key: &'a str) -> BoxFuture<'a, Result<Option<String>, String>>;
   fn set<'a>(&'a self, user_id: i64, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), String>>;
   fn remove<'a>(&'a self, user_id: i64, key: &'a str) -> BoxFuture<'a, Result<(), String>>;
}

// Process memory, used without DATABASE_URL and in tests
#[derive(Default)]
pub struct MemStore {
   values: Mutex<HashMap<(i64, String), String>>,
}

impl MemStore {
   fn with_values<T>(&self, f: impl FnOnce(&mut HashMap<(i64, String), String>) -> T) -> Result<T, String> {
      let mut values = self.values
      .lock()
      .map_err(|err| format!("MemStore lock: {}", err))?;
      Ok(f(&mut values))
   }
}

impl SessionStore for MemStore {
   fn get<'a>(&'a self, user_id: i64, key: &'a str) -> BoxFuture<'a, Result<Option<String>, String>> {
      let res = self.with_values(|v| v.get(&(user_id, key.to_string())).cloned());
      Box::pin(async move { res })
   }

   fn set<'a>(&'a self, user_id: i64, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), String>> {
      let res = self.with_values(|v| {
         v.insert((user_id, key.to_string()), value.to_string());
      });
      Box::pin(async move { res })
   }

   fn remove<'a>(&'a self, user_id: i64, key: &'a str) -> BoxFuture<'a, Result<(), String>> {
      let res = self.with_values(|v| {
         v.remove(&(user_id, key.to_string()));
      });
      Box::pin(async move { res })
   }
}

// Typed access to the values of one user
#[derive(Clone)]
pub struct Session {
   store: Arc<dyn SessionStore>,
   user_id: i64,
}

impl Session {
   pub fn new(store: Arc<dyn SessionStore>, user_id: i64) -> Self {
      Self { store, user_id }
   }

   pub async fn token(&self) -> Result<Option<String>, String> {
      let res = self.store.get(self.user_id, TOKEN).await?;
      Ok(res.filter(|t| !t.is_empty()))
   }

   pub async fn sign_in(&self, token: &str, role: Role) -> Result<(), String> {
      self.store.set(self.user_id, TOKEN, token).await?;
      self.store.set(self.user_id, ROLE, role.as_ref()).await
   }

   // The cart stays for the next login
   pub async fn sign_out(&self) -> Result<(), String> {
      self.store.remove(self.user_id, TOKEN).await?;
      self.store.remove(self.user_id, ROLE).await
   }

   pub async fn role(&self) -> Result<Option<Role>, String> {
      let res = self.store.get(self.user_id, ROLE).await?;
      Ok(res.and_then(|s| s.parse().ok()))
   }

   // Unreadable cart is treated as empty
   pub async fn cart(&self) -> Result<Cart, String> {
      let res = match self.store.get(self.user_id, CART).await? {
         Some(s) => Cart::from_json(&s).unwrap_or_else(|err| {
            log::warn!("Session::cart for {}: {}", self.user_id, err);
            Cart::default()
         }),
         None => Cart::default(),
      };
      Ok(res)
   }

   pub async fn save_cart(&self, cart: &Cart) -> Result<(), String> {
      let json = cart.to_json()?;
      self.store.set(self.user_id, CART, &json).await
   }

   pub async fn clear_cart(&self) -> Result<(), String> {
      self.store.remove(self.user_id, CART).await
   }
}
