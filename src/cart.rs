/* ===============================================================================
HomeKitchen ordering bot.
Cart lines and their mutations. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use serde::{Deserialize, Serialize};

use crate::models::{Kitchen, MenuItem};

// One purchasable item in the customer's selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
   pub item_id: i64,
   pub kitchen_id: i64,
   pub kitchen_name: String,
   pub unit_price: u64, // cents
   pub quantity: u32, // at least 1
   pub name: String,
   #[serde(default)]
   pub image: String,
}

impl CartLine {
   pub fn new(kitchen: &Kitchen, item: &MenuItem) -> Self {
      Self {
         item_id: item.id,
         kitchen_id: kitchen.id,
         kitchen_name: kitchen.name.clone(),
         unit_price: item.price,
         quantity: 1,
         name: item.name.clone(),
         image: item.image.clone(),
      }
   }

   pub fn cost(&self) -> u64 {
      self.unit_price * self.quantity as u64
   }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
   lines: Vec<CartLine>,
}

impl Cart {
   pub fn from_json(s: &str) -> Result<Self, String> {
      let mut res: Self = serde_json::from_str(s)
      .map_err(|err| format!("Cart::from_json: {}", err))?;

      // Repair what could not be produced by the bot itself
      res.lines.retain(|line| line.quantity > 0);
      Ok(res)
   }

   pub fn to_json(&self) -> Result<String, String> {
      serde_json::to_string(self)
      .map_err(|err| format!("Cart::to_json: {}", err))
   }

   pub fn lines(&self) -> &[CartLine] {
      &self.lines
   }

   pub fn is_empty(&self) -> bool {
      self.lines.is_empty()
   }

   // Same item from the same kitchen increases quantity
   pub fn add(&mut self, line: CartLine) {
      let existing = self.lines
      .iter_mut()
      .find(|l| l.item_id == line.item_id && l.kitchen_id == line.kitchen_id);

      match existing {
         Some(l) => l.quantity += line.quantity.max(1),
         None => self.lines.push(CartLine { quantity: line.quantity.max(1), ..line }),
      }
   }

   // Lines are addressed by kitchen and item, buttons of old messages stay valid
   pub fn increment(&mut self, kitchen_id: i64, item_id: i64) -> Result<(), String> {
      let line = self.line_mut(kitchen_id, item_id)?;
      line.quantity += 1;
      Ok(())
   }

   // Never below one, use remove for that
   pub fn decrement(&mut self, kitchen_id: i64, item_id: i64) -> Result<(), String> {
      let line = self.line_mut(kitchen_id, item_id)?;
      if line.quantity > 1 {
         line.quantity -= 1;
      }
      Ok(())
   }

   pub fn remove(&mut self, kitchen_id: i64, item_id: i64) -> Result<CartLine, String> {
      match self.position(kitchen_id, item_id) {
         Some(index) => Ok(self.lines.remove(index)),
         None => Err(format!("Cart::remove: no item {} of kitchen {}", item_id, kitchen_id)),
      }
   }

   pub fn total(&self) -> u64 {
      self.lines.iter().map(CartLine::cost).sum()
   }

   fn position(&self, kitchen_id: i64, item_id: i64) -> Option<usize> {
      self.lines
      .iter()
      .position(|l| l.kitchen_id == kitchen_id && l.item_id == item_id)
   }

   fn line_mut(&mut self, kitchen_id: i64, item_id: i64) -> Result<&mut CartLine, String> {
      self.lines
      .iter_mut()
      .find(|l| l.kitchen_id == kitchen_id && l.item_id == item_id)
      .ok_or_else(|| format!("Cart: no item {} of kitchen {}", item_id, kitchen_id))
   }
}

impl From<Vec<CartLine>> for Cart {
   fn from(lines: Vec<CartLine>) -> Self {
      Self { lines }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

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

   #[test]
   fn adding_same_item_merges() {
      let mut cart = Cart::default();
      cart.add(line(1, 1, 500, 1));
      cart.add(line(2, 1, 300, 1));
      cart.add(line(1, 1, 500, 1));

      assert_eq!(cart.lines().len(), 2);
      assert_eq!(cart.lines()[0].quantity, 2);
      assert_eq!(cart.total(), 1300);
   }

   #[test]
   fn same_item_of_other_kitchen_is_separate() {
      let mut cart = Cart::default();
      cart.add(line(1, 1, 500, 1));
      cart.add(line(1, 2, 500, 1));
      assert_eq!(cart.lines().len(), 2);
   }

   #[test]
   fn decrement_stops_at_one() {
      let mut cart = Cart::from(vec![line(1, 1, 500, 2)]);
      cart.decrement(1, 1).unwrap();
      cart.decrement(1, 1).unwrap();
      assert_eq!(cart.lines()[0].quantity, 1);

      cart.increment(1, 1).unwrap();
      assert_eq!(cart.lines()[0].quantity, 2);
   }

   #[test]
   fn missing_line_is_error() {
      let mut cart = Cart::from(vec![line(1, 1, 500, 1)]);
      assert!(cart.increment(2, 1).is_err());
      assert!(cart.decrement(1, 5).is_err());
      assert!(cart.remove(1, 2).is_err());
      assert_eq!(cart.remove(1, 1).unwrap().item_id, 1);
      assert!(cart.is_empty());
   }

   #[test]
   fn removal_from_old_message_hits_the_right_line() {
      // Both taps come from the same cart message, the first one shifts the lines
      let mut cart = Cart::from(vec![line(1, 1, 500, 1), line(2, 1, 300, 1), line(3, 2, 700, 1)]);
      cart.remove(1, 1).unwrap();
      assert_eq!(cart.remove(2, 3).unwrap().name, "Item 3");

      assert_eq!(cart.lines().len(), 1);
      assert_eq!(cart.lines()[0].item_id, 2);

      // Repeated tap on the removed line changes nothing
      assert!(cart.remove(1, 1).is_err());
      assert_eq!(cart.lines().len(), 1);
   }

   #[test]
   fn stored_as_plain_list() {
      let cart = Cart::from(vec![line(4, 2, 250, 3)]);
      let json = cart.to_json().unwrap();
      assert!(json.starts_with('['));
      assert_eq!(Cart::from_json(&json).unwrap(), cart);
   }

   #[test]
   fn zero_quantity_lines_are_dropped_on_load() {
      let json = r#"[{"item_id":1,"kitchen_id":1,"kitchen_name":"K","unit_price":100,"quantity":0,"name":"X"}]"#;
      assert!(Cart::from_json(json).unwrap().is_empty());
   }
}
