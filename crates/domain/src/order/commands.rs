//! Order commands.

use common::ProductId;

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLineRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Command to place a new order.
///
/// Lines are reserved in the given order; the same product may appear more
/// than once.
#[derive(Debug, Clone, Default)]
pub struct CreateOrder {
    pub lines: Vec<OrderLineRequest>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command.
    pub fn new(lines: Vec<OrderLineRequest>) -> Self {
        Self { lines }
    }

    /// Adds a line.
    pub fn line(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.lines.push(OrderLineRequest::new(product_id, quantity));
        self
    }
}
