use crate::delivery::{CityCandidate, PickupPoint};
use crate::storage::orders::{Order, OrderDraft};

/// Customer contact and delivery data gathered before the comment step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub phone: Option<String>,
    /// City, or the typed pickup address when the lookup is off
    pub city: String,
    pub pickup_label: Option<String>,
    pub pickup_id: Option<String>,
    pub geo_id: Option<i64>,
}

impl Contact {
    /// Contact of a previous order, if it holds everything the active path needs
    pub fn from_previous_order(order: &Order, lookup_enabled: bool) -> Option<Self> {
        let name = order.customer_name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let city = order.city_country.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let phone = order
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        if !lookup_enabled && phone.is_none() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            phone,
            city: city.to_string(),
            pickup_label: order.delivery_pickup_address.clone(),
            pickup_id: order.delivery_pickup_id.clone(),
            geo_id: order.delivery_geo_id,
        })
    }

    pub fn into_order_draft(self, comment: String, payment_proof_url: String) -> OrderDraft {
        OrderDraft {
            customer_name: self.name,
            phone: self.phone,
            city: self.city,
            comment,
            pickup_label: self.pickup_label,
            pickup_id: self.pickup_id,
            geo_id: self.geo_id,
            payment_proof_url: Some(payment_proof_url),
        }
    }
}

/// Where the user is in the checkout conversation; each step holds only what is known so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStep {
    Name,
    Phone {
        name: String,
    },
    PickupAddress {
        name: String,
        phone: String,
    },
    City {
        name: String,
    },
    CityChoice {
        name: String,
        typed: String,
        candidates: Vec<CityCandidate>,
    },
    Street {
        name: String,
        city: String,
        geo_id: i64,
    },
    StreetChoice {
        name: String,
        city: String,
        geo_id: i64,
        points: Vec<PickupPoint>,
    },
    Comment {
        contact: Contact,
    },
    PaymentProof {
        contact: Contact,
        comment: String,
    },
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Name => "name",
            CheckoutStep::Phone { .. } => "phone",
            CheckoutStep::PickupAddress { .. } => "pvz_address",
            CheckoutStep::City { .. } => "city",
            CheckoutStep::CityChoice { .. } => "city_choice",
            CheckoutStep::Street { .. } => "street",
            CheckoutStep::StreetChoice { .. } => "street_choice",
            CheckoutStep::Comment { .. } => "comment",
            CheckoutStep::PaymentProof { .. } => "payment_proof",
        }
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, CheckoutStep::Comment { .. } | CheckoutStep::PaymentProof { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::OrderStatus;
    use rust_decimal::Decimal;

    fn order(name: Option<&str>, phone: Option<&str>, city: Option<&str>) -> Order {
        Order {
            id: 1,
            user_id: 1,
            telegram_id: 1,
            status: OrderStatus::New,
            customer_name: name.map(String::from),
            phone: phone.map(String::from),
            city_country: city.map(String::from),
            comment: None,
            total_amount: Decimal::ZERO,
            payment_proof_url: None,
            payment_confirmed: false,
            payment_confirmed_at: None,
            delivery_geo_id: None,
            delivery_pickup_id: None,
            delivery_pickup_address: city.map(String::from),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_reuse_requires_phone_only_without_lookup() {
        let no_phone = order(Some("Ivan"), None, Some("Moscow"));
        assert!(Contact::from_previous_order(&no_phone, false).is_none());
        assert!(Contact::from_previous_order(&no_phone, true).is_some());

        let full = order(Some("Ivan"), Some("+79990000000"), Some("Moscow, Tverskaya 1"));
        let contact = Contact::from_previous_order(&full, false).unwrap();
        assert_eq!(contact.city, "Moscow, Tverskaya 1");
        assert_eq!(contact.pickup_label.as_deref(), Some("Moscow, Tverskaya 1"));

        assert!(Contact::from_previous_order(&order(Some(" "), Some("1"), Some("x")), true).is_none());
    }

    #[test]
    fn test_only_late_steps_cancel() {
        assert!(!CheckoutStep::Name.can_cancel());
        assert!(CheckoutStep::Comment {
            contact: Contact::default()
        }
        .can_cancel());
        assert_eq!(CheckoutStep::Name.as_str(), "name");
    }
}
