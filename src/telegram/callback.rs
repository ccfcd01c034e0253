//! Inline keyboard payloads.
//!
//! Telegram limits callback data to 64 bytes, so every action is a short
//! colon-separated token list: `add:12:3:m`, `co:city:keep`, `cart:rm:40`.

use std::str::FromStr;

use crate::core::types::Gender;

/// Telegram's hard limit for `callback_data`
pub const MAX_CALLBACK_BYTES: usize = 64;

const NONE: &str = "_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    Shop,
    Product(i64),
    /// Add-to-cart attempt; missing parts are asked for by the shop flow
    Add {
        product_id: i64,
        variant_id: Option<i64>,
        gender: Option<Gender>,
    },
    Cart,
    RemoveLine(i64),
    ClearCart,
    StartCheckout,
    /// Index into the offered cities, `None` keeps the typed text
    ChooseCity(Option<usize>),
    /// Index into the offered pickup points, `None` skips the pickup point
    ChoosePickup(Option<usize>),
    NoComment,
    CancelCheckout,
    Promos,
    Promo(i64),
    Orders,
    About,
    Stats,
    ToggleConsent,
    Noop,
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::MainMenu => "menu".to_string(),
            CallbackAction::Shop => "shop".to_string(),
            CallbackAction::Product(id) => format!("p:{}", id),
            CallbackAction::Add {
                product_id,
                variant_id,
                gender,
            } => format!(
                "add:{}:{}:{}",
                product_id,
                variant_id.map(|v| v.to_string()).unwrap_or_else(|| NONE.to_string()),
                gender.map(|g| g.as_str()).unwrap_or(NONE)
            ),
            CallbackAction::Cart => "cart".to_string(),
            CallbackAction::RemoveLine(id) => format!("cart:rm:{}", id),
            CallbackAction::ClearCart => "cart:clear".to_string(),
            CallbackAction::StartCheckout => "co:start".to_string(),
            CallbackAction::ChooseCity(choice) => format!("co:city:{}", index_token(*choice, "keep")),
            CallbackAction::ChoosePickup(choice) => format!("co:pvz:{}", index_token(*choice, "skip")),
            CallbackAction::NoComment => "co:nocomment".to_string(),
            CallbackAction::CancelCheckout => "co:cancel".to_string(),
            CallbackAction::Promos => "promos".to_string(),
            CallbackAction::Promo(id) => format!("promo:{}", id),
            CallbackAction::Orders => "orders".to_string(),
            CallbackAction::About => "about".to_string(),
            CallbackAction::Stats => "stats".to_string(),
            CallbackAction::ToggleConsent => "consent".to_string(),
            CallbackAction::Noop => "noop".to_string(),
        }
    }

    /// Parses callback data; unknown or malformed payloads yield `None`
    pub fn parse(data: &str) -> Option<Self> {
        let parts: Vec<&str> = data.split(':').collect();
        let action = match parts.as_slice() {
            ["menu"] => CallbackAction::MainMenu,
            ["shop"] => CallbackAction::Shop,
            ["p", id] => CallbackAction::Product(id.parse().ok()?),
            ["add", product, variant, gender] => CallbackAction::Add {
                product_id: product.parse().ok()?,
                variant_id: optional(variant)?,
                gender: optional(gender)?,
            },
            ["cart"] => CallbackAction::Cart,
            ["cart", "rm", id] => CallbackAction::RemoveLine(id.parse().ok()?),
            ["cart", "clear"] => CallbackAction::ClearCart,
            ["co", "start"] => CallbackAction::StartCheckout,
            ["co", "city", "keep"] => CallbackAction::ChooseCity(None),
            ["co", "city", idx] => CallbackAction::ChooseCity(Some(idx.parse().ok()?)),
            ["co", "pvz", "skip"] => CallbackAction::ChoosePickup(None),
            ["co", "pvz", idx] => CallbackAction::ChoosePickup(Some(idx.parse().ok()?)),
            ["co", "nocomment"] => CallbackAction::NoComment,
            ["co", "cancel"] => CallbackAction::CancelCheckout,
            ["promos"] => CallbackAction::Promos,
            ["promo", id] => CallbackAction::Promo(id.parse().ok()?),
            ["orders"] => CallbackAction::Orders,
            ["about"] => CallbackAction::About,
            ["stats"] => CallbackAction::Stats,
            ["consent"] => CallbackAction::ToggleConsent,
            ["noop"] => CallbackAction::Noop,
            _ => return None,
        };
        Some(action)
    }
}

fn index_token(choice: Option<usize>, none: &str) -> String {
    choice.map(|idx| idx.to_string()).unwrap_or_else(|| none.to_string())
}

/// `_` is an explicit "absent"; anything else must parse. Outer `None` means malformed.
fn optional<T: FromStr>(raw: &str) -> Option<Option<T>> {
    if raw == NONE {
        Some(None)
    } else {
        raw.parse().ok().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_formats() {
        assert_eq!(CallbackAction::Product(7).encode(), "p:7");
        assert_eq!(
            CallbackAction::Add {
                product_id: 3,
                variant_id: None,
                gender: Some(Gender::Female)
            }
            .encode(),
            "add:3:_:f"
        );
        assert_eq!(CallbackAction::ChooseCity(None).encode(), "co:city:keep");
        assert_eq!(CallbackAction::ChoosePickup(Some(2)).encode(), "co:pvz:2");
        assert_eq!(CallbackAction::RemoveLine(40).encode(), "cart:rm:40");
    }

    #[test]
    fn test_parse_known_payloads() {
        assert_eq!(CallbackAction::parse("menu"), Some(CallbackAction::MainMenu));
        assert_eq!(
            CallbackAction::parse("add:12:5:_"),
            Some(CallbackAction::Add {
                product_id: 12,
                variant_id: Some(5),
                gender: None
            })
        );
        assert_eq!(CallbackAction::parse("co:pvz:skip"), Some(CallbackAction::ChoosePickup(None)));
        assert_eq!(CallbackAction::parse("co:city:4"), Some(CallbackAction::ChooseCity(Some(4))));
        assert_eq!(CallbackAction::parse("cart:clear"), Some(CallbackAction::ClearCart));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("p:abc"), None);
        assert_eq!(CallbackAction::parse("add:1:_:x"), None);
        assert_eq!(CallbackAction::parse("co:city:-1"), None);
        assert_eq!(CallbackAction::parse("mode:video_quality"), None);
    }

    #[test]
    fn test_every_action_fits_telegram_limit() {
        let actions = [
            CallbackAction::Add {
                product_id: i64::MAX,
                variant_id: Some(i64::MAX),
                gender: Some(Gender::Male),
            },
            CallbackAction::RemoveLine(i64::MAX),
            CallbackAction::ChoosePickup(Some(usize::MAX)),
            CallbackAction::Promo(i64::MAX),
            CallbackAction::ToggleConsent,
        ];
        for action in actions {
            let data = action.encode();
            assert!(data.len() <= MAX_CALLBACK_BYTES, "{} is too long", data);
            assert_eq!(CallbackAction::parse(&data), Some(action));
        }
    }
}
