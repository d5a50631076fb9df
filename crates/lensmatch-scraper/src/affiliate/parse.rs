//! Affiliate search response → best quote.
//!
//! The partner API has shipped several response shapes. Each lookup below is
//! an ordered list of strategies; the first one that yields a usable value
//! wins, and running out of strategies means absence.

use lensmatch_core::PriceQuote;
use serde_json::Value;

/// Top-level keys that may hold the product list.
const LIST_KEYS: [&str; 2] = ["products", "productInfoList"];

/// Keys that may wrap a product's details. The product object itself is
/// the fallback when none is present.
const INFO_KEYS: [&str; 2] = ["productBaseInfoV1", "productInfo"];

/// Price lookups, relative to the product details, tried in order.
const PRICE_PATHS: &[&[&str]] = &[
    &["sellingPrice", "amount"],
    &["sellingPrice", "finalPrice"],
    &["sellingPrice", "sellingPrice"],
    &["sellingPrice"],
    &["pricing", "amount"],
    &["pricing", "finalPrice"],
    &["pricing", "sellingPrice"],
    &["pricing"],
    &["amount"],
    &["finalPrice"],
    &["flipkartSpecialPrice", "amount"],
    &["flipkartSellingPrice", "amount"],
];

#[derive(Debug, Clone, Copy)]
enum Scope {
    Info,
    Product,
}

/// URL lookups tried in order.
const URL_FIELDS: [(Scope, &str); 4] = [
    (Scope::Info, "productUrl"),
    (Scope::Product, "productUrl"),
    (Scope::Info, "url"),
    (Scope::Product, "url"),
];

/// Returns the first present, non-empty product list.
#[must_use]
pub fn product_list(body: &Value) -> Option<&Vec<Value>> {
    LIST_KEYS
        .iter()
        .filter_map(|key| body.get(key).and_then(Value::as_array))
        .find(|list| !list.is_empty())
}

fn product_info(product: &Value) -> &Value {
    INFO_KEYS
        .iter()
        .find_map(|key| product.get(key).filter(|v| v.is_object()))
        .unwrap_or(product)
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(key))
}

/// Coerces a JSON price to whole rupees.
///
/// Numbers are truncated. Strings drop every non-digit and keep the whole
/// part, so `"₹30,800.00"` is `30800` and `"Rs. 1,299"` is `1299`.
/// Anything else is `None`.
#[must_use]
pub fn coerce_price(value: &Value) -> Option<i64> {
    let price = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_f64))?,
        Value::String(s) => {
            // Keeps the paise separator long enough to drop the fraction.
            // Stripping every non-digit would read "30,800.00" as 3080000.
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            let whole = cleaned
                .trim_start_matches('.')
                .split('.')
                .next()
                .unwrap_or_default();
            whole.parse::<i64>().ok()?
        }
        _ => return None,
    };
    (price > 0).then_some(price)
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_f64(value: f64) -> Option<i64> {
    // i64::MAX is not exactly representable; stay below 2^63.
    if value.is_finite() && value >= 0.0 && value < 9.2e18 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

/// Price of one product, trying every strategy in [`PRICE_PATHS`].
#[must_use]
pub fn product_price(product: &Value) -> Option<i64> {
    let info = product_info(product);
    PRICE_PATHS
        .iter()
        .filter_map(|path| lookup(info, path))
        .find_map(coerce_price)
}

/// Listing URL of one product, trying every strategy in [`URL_FIELDS`].
#[must_use]
pub fn product_url(product: &Value) -> Option<String> {
    let info = product_info(product);
    URL_FIELDS.iter().find_map(|(scope, field)| {
        let root = match scope {
            Scope::Info => info,
            Scope::Product => product,
        };
        root.get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
    })
}

/// Picks the cheapest product with a positive price and a non-empty URL.
///
/// Ties keep the earlier product.
#[must_use]
pub fn parse_search_response(body: &Value) -> Option<PriceQuote> {
    product_list(body)?
        .iter()
        .filter_map(|product| PriceQuote::new(product_price(product)?, product_url(product)?))
        .fold(None, |best: Option<PriceQuote>, quote| match best {
            Some(b) if b.price <= quote.price => Some(b),
            _ => Some(quote),
        })
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
