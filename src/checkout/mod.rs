//! Checkout conversation: collects contact and delivery data step by step and turns the
//! cart into an order once the payment screenshot arrives.
//!
//! Without pickup-point lookup: name → phone → pickup address → comment → payment proof.
//! With lookup: name → city (→ city choice → street → pickup point) → comment → payment proof.

mod machine;
mod step;
mod store;

pub use machine::{Checkout, CheckoutReply};
pub use step::{CheckoutStep, Contact};
pub use store::DraftStore;
