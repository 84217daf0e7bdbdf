//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::ProductId;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DomainEvent {
    Payment(PaymentEvent),
    Inventory(InventoryEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum PaymentEvent {
    Requested { request_id: Uuid, total: Decimal },
    Confirmed { request_id: Uuid },
    Rejected { request_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum InventoryEvent {
    StockDecremented { product_id: ProductId, quantity: u32, remaining: i32 },
    SaleCompleted { total: Decimal },
}
