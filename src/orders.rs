/* ===============================================================================
HomeKitchen ordering bot.
Cart lines grouped by kitchens for forming orders. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use std::collections::BTreeMap;

use crate::cart::*;

// Item of an order, duplicates of the cart stay separate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderItem {
   pub item_id: i64,
   pub quantity: u32,
}

// Part of the cart from one kitchen
#[derive(Clone, Debug, PartialEq)]
pub struct KitchenGroup {
   pub kitchen_id: i64,
   pub kitchen_name: String,
   pub items: Vec<OrderItem>,
   pub lines: Vec<CartLine>,
   pub subtotal: u64, // cents
}

impl KitchenGroup {
   fn new(line: &CartLine) -> Self {
      Self {
         kitchen_id: line.kitchen_id,
         kitchen_name: line.kitchen_name.clone(),
         items: Vec::new(),
         lines: Vec::new(),
         subtotal: 0,
      }
   }

   fn push(&mut self, line: &CartLine) {
      self.items.push(OrderItem { item_id: line.item_id, quantity: line.quantity });
      self.subtotal += line.cost();
      self.lines.push(line.clone());
   }
}

pub struct CartInfo {
   pub orders_num: usize,
   pub items_num: usize,
   pub total_cost: u64,
}

// Groups ordered by kitchen id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Orders {
   pub data: BTreeMap<i64, KitchenGroup>,
}

impl Orders {
   pub fn new(lines: &[CartLine]) -> Self {
      let mut data = BTreeMap::new();
      for line in lines {
         data.entry(line.kitchen_id)
         .or_insert_with(|| KitchenGroup::new(line))
         .push(line);
      }
      Self { data }
   }

   pub fn is_empty(&self) -> bool {
      self.data.is_empty()
   }

   pub fn groups(&self) -> impl Iterator<Item = &KitchenGroup> {
      self.data.values()
   }

   pub fn grand_total(&self) -> u64 {
      self.groups().map(|g| g.subtotal).sum()
   }

   pub fn cart_info(&self) -> CartInfo {
      let mut res = CartInfo {
         orders_num: 0,
         items_num: 0,
         total_cost: 0
      };

      for group in self.groups() {
         res.orders_num += 1;
         res.items_num += group.items.iter().map(|i| i.quantity as usize).sum::<usize>();
         res.total_cost += group.subtotal;
      };

      res
   }
}

impl From<&Cart> for Orders {
   fn from(cart: &Cart) -> Self {
      Self::new(cart.lines())
   }
}
