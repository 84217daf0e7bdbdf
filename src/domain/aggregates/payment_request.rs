//! Payment Request Aggregate
//!
//! A client's intent to buy the contents of their cart. Lives only in memory
//! and moves from `Pending` to `Confirmed` or `Rejected` exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::{render_lines, CartItem};
use crate::domain::events::{DomainEvent, PaymentEvent};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
pub struct PaymentRequest {
    id: Uuid,
    lines: Vec<CartItem>,
    total: Money,
    created_at: DateTime<Utc>,
    status: PaymentStatus,
    customer: Option<CustomerInfo>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Confirmed, Rejected }

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::Pending => write!(f, "pending"), Self::Confirmed => write!(f, "confirmed"), Self::Rejected => write!(f, "rejected") }
    }
}

/// Contact details a client leaves with a payment request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl std::fmt::Display for CustomerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = |v: &Option<String>| v.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or("N/A").to_string();
        write!(f, "Name: {}\nEmail: {}\nPhone: {}", field(&self.name), field(&self.email), field(&self.phone))
    }
}

impl PaymentRequest {
    pub fn create(lines: Vec<CartItem>, total: Money, customer: Option<CustomerInfo>) -> Self {
        let id = Uuid::new_v4();
        let mut request = Self {
            id, lines, total: total.clone(), created_at: Utc::now(),
            status: PaymentStatus::Pending, customer, events: vec![],
        };
        request.raise_event(DomainEvent::Payment(PaymentEvent::Requested { request_id: id, total: total.amount() }));
        request
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn lines(&self) -> &[CartItem] { &self.lines }
    pub fn total(&self) -> &Money { &self.total }
    pub fn status(&self) -> PaymentStatus { self.status }
    pub fn is_processed(&self) -> bool { self.status != PaymentStatus::Pending }

    pub fn ensure_pending(&self) -> Result<(), PaymentError> {
        if self.is_processed() { return Err(PaymentError::AlreadyProcessed(self.status)); }
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), PaymentError> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Confirmed;
        self.raise_event(DomainEvent::Payment(PaymentEvent::Confirmed { request_id: self.id }));
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), PaymentError> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Rejected;
        self.raise_event(DomainEvent::Payment(PaymentEvent::Rejected { request_id: self.id }));
        Ok(())
    }

    pub fn short_id(&self) -> String { self.id.to_string().chars().take(8).collect() }

    pub fn summary(&self) -> String {
        let mut out = format!("PAYMENT REQUEST #{}\n{}\n\n", self.short_id(), self.created_at.format("%d/%m/%Y %H:%M"));
        out.push_str(&render_lines(&self.lines));
        out.push_str(&format!("TOTAL: {}\n", self.total));
        match &self.customer {
            Some(c) => out.push_str(&format!("Customer: {c}")),
            None => out.push_str("Customer: Not specified"),
        }
        out
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    #[error("This request has already been processed ({0})")]
    AlreadyProcessed(PaymentStatus),
}
