// Small SELECT builder for the listing queries that have
// optional filters. Values never go in there, only "?"
// placeholders, params are bound by the caller in the same
// order as the where clauses.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Order {
  Asc,
  Desc
}

impl Order {
  // Anything that isn't "asc" is descending, newest
  // first is what everyone wants.
  pub fn from_query(value: Option<&str>) -> Self {
    match value {
      Some(o) if o.eq_ignore_ascii_case("asc") => Order::Asc,
      _ => Order::Desc
    }
  }
}

pub struct OrderBy {
  pub order: Order,
  pub field: String
}

impl OrderBy {
  pub fn new(order: Order, field: &str) -> Self {
    OrderBy {
      order,
      field: field.to_string()
    }
  }
}

// Builder pattern. The "q_" in front of field names is
// just because "where" is a reserved keyword in Rust.
pub struct Query {
  q_fields: Vec<String>,
  q_from: String,
  q_where: Vec<String>,
  q_order: Option<OrderBy>,
  limit: Option<usize>,
  offset: Option<usize>
}

impl Query {

  pub fn select(fields: &[&str], from: &str) -> Self {
    Query {
      q_fields: fields.iter().map(|f| f.to_string()).collect(),
      q_from: from.to_string(),
      q_where: Vec::new(),
      q_order: None,
      limit: None,
      offset: None
    }
  }

  // Clauses are always glued with AND.
  pub fn and_where(mut self, clause: &str) -> Self {
    self.q_where.push(clause.to_string());
    self
  }

  pub fn order(mut self, order: OrderBy) -> Self {
    self.q_order = Some(order);
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn offset(mut self, offset: usize) -> Self {
    self.offset = Some(offset);
    self
  }

  fn where_str(&self) -> String {
    if self.q_where.is_empty() {
      String::new()
    } else {
      format!("WHERE {} ", self.q_where.join(" AND "))
    }
  }

  // Same FROM and WHERE, used to count the total amount of
  // rows for pagination.
  pub fn to_count_string(&self) -> String {
    format!("SELECT count(*) FROM {} {}", self.q_from, self.where_str())
  }

}

impl fmt::Display for Query {

  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "SELECT {} FROM {} {}",
      self.q_fields.join(","),
      self.q_from,
      self.where_str()
    )?;
    if let Some(order) = &self.q_order {
      write!(
        f,
        "ORDER BY {} {} ",
        order.field,
        match order.order {
          Order::Asc => "ASC",
          Order::Desc => "DESC"
        }
      )?;
    }
    // SQLite doesn't allow OFFSET without LIMIT.
    if let Some(lim) = self.limit {
      write!(f, "LIMIT {} ", lim)?;
      if let Some(off) = self.offset {
        write!(f, "OFFSET {} ", off)?;
      }
    }
    Ok(())
  }

}
