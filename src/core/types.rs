use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::core::config;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    #[default]
    New,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            OrderStatus::New => "🆕",
            OrderStatus::Processing => "⏳",
            OrderStatus::Completed => "✅",
            OrderStatus::Cancelled => "❌",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

impl rusqlite::types::FromSql for OrderStatus {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let s = value.as_str()?;
        OrderStatus::from_str(s).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(std::io::Error::other(e))))
    }
}

impl rusqlite::types::ToSql for OrderStatus {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::Borrowed(rusqlite::types::ValueRef::Text(
            self.as_str().as_bytes(),
        )))
    }
}

/// Garment cut chosen for products that require it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "m",
            Gender::Female => "f",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(Gender::Male),
            "f" => Ok(Gender::Female),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }
}

impl rusqlite::types::FromSql for Gender {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let s = value.as_str()?;
        Gender::from_str(s).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(std::io::Error::other(e))))
    }
}

impl rusqlite::types::ToSql for Gender {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::Borrowed(rusqlite::types::ValueRef::Text(
            self.as_str().as_bytes(),
        )))
    }
}

/// Formats an amount: whole numbers without a fraction, otherwise two decimals
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    if rounded.fract().is_zero() {
        rounded.trunc().to_string()
    } else {
        format!("{:.2}", rounded)
    }
}

/// Formats an amount with a currency code, e.g. `1500 RUB`
pub fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{} {}", format_amount(amount), currency)
}

/// Formats a cart or order total, always labelled with the display currency
pub fn format_total(amount: Decimal) -> String {
    format_money(amount, config::payment::DISPLAY_CURRENCY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trip_names() {
        for status in [
            OrderStatus::New,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::from_str("shipped").is_err());
        assert_eq!(OrderStatus::default(), OrderStatus::New);
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_str("m").unwrap(), Gender::Male);
        assert_eq!(Gender::from_str("f").unwrap(), Gender::Female);
        assert!(Gender::from_str("x").is_err());
        assert_eq!(Gender::Female.to_string(), "f");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(1500, 0)), "1500");
        assert_eq!(format_amount(Decimal::new(150050, 2)), "1500.50");
        assert_eq!(format_amount(Decimal::new(1500000, 3)), "1500");
        assert_eq!(format_total(Decimal::new(990, 0)), "990 RUB");
    }
}
