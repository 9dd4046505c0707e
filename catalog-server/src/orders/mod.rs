//! Order subsystem
//!
//! Order rows themselves are plain CRUD (`db::repository::order`); the
//! interesting part is the bounded-retry unique number generator.

pub mod order_number;
