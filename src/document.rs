use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Exclusive upper bound for generated ids, so they fit a signed int8 column.
pub const ID_MODULUS: u64 = i64::MAX as u64;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProductMetadata {
    pub product_name: String,
    pub features: Vec<String>,
    pub price_info: String,
    pub reviews: Vec<String>,
    pub competitors: Vec<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProductDocument {
    pub content: String,
    pub metadata: ProductMetadata,
}

impl ProductDocument {
    pub fn build(product: &str, search_text: &str) -> Self {
        Self::build_at(product, search_text, Local::now())
    }

    /// Only the product name and timestamp are filled in; the rest stay empty.
    pub fn build_at(product: &str, search_text: &str, at: DateTime<Local>) -> Self {
        Self {
            content: format!("Product information for {product}: {search_text}"),
            metadata: ProductMetadata {
                product_name: product.to_string(),
                timestamp: format_timestamp(at),
                ..Default::default()
            },
        }
    }
}

/// Microseconds are printed only when non-zero.
fn format_timestamp(at: DateTime<Local>) -> String {
    if at.timestamp_subsec_micros() == 0 {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// Best-effort unique key for a stored document.
pub fn numeric_id(query: &str) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    numeric_id_at(query, nanos)
}

pub fn numeric_id_at(query: &str, nanos: u128) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(nanos.to_string().as_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head) % ID_MODULUS
}
