//! Order Lifecycle Engine
//!
//! Owns the order state machine and every compound mutation that touches
//! orders: creation (items + stock decrement + history), status changes
//! (status + history), cancellation (status + cancellation row + stock
//! restoration + history) and the periodic expiry sweep. Each compound
//! mutation is one transaction on the write pool, so all of it commits or
//! none of it does.

mod expiry;
mod lifecycle;
mod returns;

pub use expiry::{AUTO_CANCEL_REASON, PENDING_PAYMENT_GRACE_HOURS, SweepReport};
pub use lifecycle::{
    CreateOrderInput, CreatedOrder, FLAT_SHIPPING_COST, FREE_SHIPPING_THRESHOLD, OrderDetail,
    OrderFilter, OrderItemDetail, OrderLineInput, OrderSummary, StatusChange, shipping_cost,
};
pub use returns::{ReturnRecord, ReturnRequestInput};

use crate::db::DbService;

/// Order lifecycle service
#[derive(Clone, Debug)]
pub struct OrderService {
    db: DbService,
}

impl OrderService {
    pub fn new(db: DbService) -> Self {
        Self { db }
    }

    pub(crate) fn db(&self) -> &DbService {
        &self.db
    }
}
