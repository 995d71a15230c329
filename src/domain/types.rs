//! Shared types for barcode decoding and pricing

use serde::{Deserialize, Deserializer, Serialize};

/// Newtype wrapper for catalog product IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ProductId(pub i64);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unit in which the encoded weight digits are expressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    G,
    Kg,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::G => "g",
            WeightUnit::Kg => "kg",
        }
    }
}

impl std::fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WeightUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "g" => Ok(WeightUnit::G),
            "kg" => Ok(WeightUnit::Kg),
            other => Err(format!("unknown weight unit: {other}")),
        }
    }
}

/// Catalog product, reduced to the fields resolution and pricing read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub barcode: Option<String>,
    pub unit: String,
    /// Price per declared unit (per gram, per 100 g, per portion, ...)
    #[serde(deserialize_with = "deserialize_price")]
    pub price: f64,
    #[serde(default, deserialize_with = "deserialize_optional_price")]
    pub price_per_kg: Option<f64>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

/// Money amount that may arrive as a JSON number or as a decimal string ("12.50")
#[derive(Debug, Clone, Copy)]
struct Price(f64);

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct PriceVisitor;

        impl<'de> Visitor<'de> for PriceVisitor {
            type Value = Price;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number or a decimal string")
            }

            fn visit_f64<E>(self, value: f64) -> Result<Price, E>
            where
                E: de::Error,
            {
                Ok(Price(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Price, E>
            where
                E: de::Error,
            {
                Ok(Price(value as f64))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Price, E>
            where
                E: de::Error,
            {
                Ok(Price(value as f64))
            }

            fn visit_str<E>(self, value: &str) -> Result<Price, E>
            where
                E: de::Error,
            {
                // f64 parsing also accepts "NaN" and "inf"
                match value.trim().parse::<f64>() {
                    Ok(parsed) if parsed.is_finite() => Ok(Price(parsed)),
                    _ => Err(E::invalid_value(de::Unexpected::Str(value), &self)),
                }
            }
        }

        deserializer.deserialize_any(PriceVisitor)
    }
}

fn deserialize_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Price::deserialize(deserializer).map(|p| p.0)
}

fn deserialize_optional_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Price>::deserialize(deserializer)?.map(|p| p.0))
}
