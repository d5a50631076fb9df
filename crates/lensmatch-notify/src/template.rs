//! Price-alert email rendering.

use lensmatch_core::Platform;
use uuid::Uuid;

use crate::error::NotifyError;

/// Everything a price-alert email needs. All fields are required; see
/// [`PriceAlertEmail::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceAlertEmail {
    pub to: String,
    pub lens_name: String,
    pub price: i64,
    pub platform: Platform,
    pub buy_url: String,
    pub unsubscribe_url: String,
}

impl PriceAlertEmail {
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingField`] naming the first blank field, or
    /// `price` when it is not positive.
    pub fn validate(&self) -> Result<(), NotifyError> {
        let required = [
            ("to", &self.to),
            ("lens_name", &self.lens_name),
            ("buy_url", &self.buy_url),
            ("unsubscribe_url", &self.unsubscribe_url),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(NotifyError::MissingField(*name));
        }
        if self.price <= 0 {
            return Err(NotifyError::MissingField("price"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Personalised unsubscribe link for a subscription token.
#[must_use]
pub fn unsubscribe_url(public_base_url: &str, token: Uuid) -> String {
    format!(
        "{}/api/alerts/unsubscribe?token={token}",
        public_base_url.trim_end_matches('/')
    )
}

/// Formats whole rupees with Indian digit grouping: `104999` → `"1,04,999"`.
#[must_use]
pub fn format_inr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let sign = if amount < 0 { "-" } else { "" };

    if digits.len() <= 3 {
        return format!("{sign}{digits}");
    }

    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{sign}{},{last_three}", groups.join(","))
}

/// Minimal HTML escaping for text and attribute values.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders subject and HTML body.
///
/// # Errors
///
/// Returns [`NotifyError::MissingField`] if the email fails validation.
pub fn render_price_alert(email: &PriceAlertEmail) -> Result<RenderedEmail, NotifyError> {
    email.validate()?;

    let price = format_inr(email.price);
    let subject = format!("Price Alert: {} now at ₹{price}", email.lens_name);

    let lens = escape_html(&email.lens_name);
    let platform = email.platform.display_name();
    let buy_url = escape_html(&email.buy_url);
    let unsubscribe = escape_html(&email.unsubscribe_url);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Price Alert - LensMatch India</title>
</head>
<body style="font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background: #f5f5f5; margin: 0; padding: 20px;">
  <div style="max-width: 600px; margin: 0 auto; background: white; border-radius: 8px; overflow: hidden;">
    <div style="background: #667eea; color: white; padding: 30px 20px; text-align: center;">
      <h1 style="margin: 0; font-size: 24px;">LensMatch India</h1>
      <p>Your Price Alert</p>
    </div>
    <div style="padding: 30px 20px;">
      <h2>Great news!</h2>
      <p>The price for <strong>{lens}</strong> has dropped to your target!</p>
      <div style="background: #f9f9f9; border-left: 4px solid #667eea; padding: 20px; margin: 20px 0;">
        <h2 style="margin: 0 0 10px 0; font-size: 18px;">{lens}</h2>
        <div style="font-size: 32px; font-weight: bold; color: #667eea;">₹{price}</div>
        <div style="color: #666; font-size: 14px;">Available on {platform}</div>
      </div>
      <a href="{buy_url}" style="display: inline-block; background: #667eea; color: white; padding: 12px 30px; text-decoration: none; border-radius: 4px; font-weight: bold;">View on {platform}</a>
      <p style="margin-top: 30px; color: #666; font-size: 13px;">
        You're receiving this email because you subscribed to price alerts on LensMatch India.
        <a href="{unsubscribe}" style="color: #667eea;">Unsubscribe from this lens</a>
      </p>
    </div>
  </div>
</body>
</html>
"#
    );

    Ok(RenderedEmail { subject, html })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> PriceAlertEmail {
        PriceAlertEmail {
            to: "buyer@example.com".to_string(),
            lens_name: "Nikon 50mm f/1.8G".to_string(),
            price: 29_999,
            platform: Platform::Flipkart,
            buy_url: "https://flipkart.com/nikon-50mm?a=1&b=2".to_string(),
            unsubscribe_url: "http://localhost:3001/api/alerts/unsubscribe?token=abc".to_string(),
        }
    }

    #[test]
    fn format_inr_uses_indian_grouping() {
        assert_eq!(format_inr(0), "0");
        assert_eq!(format_inr(999), "999");
        assert_eq!(format_inr(1_000), "1,000");
        assert_eq!(format_inr(29_999), "29,999");
        assert_eq!(format_inr(104_999), "1,04,999");
        assert_eq!(format_inr(12_345_678), "1,23,45,678");
        assert_eq!(format_inr(-1_500), "-1,500");
    }

    #[test]
    fn subject_carries_lens_and_grouped_price() {
        let rendered = render_price_alert(&email()).unwrap();
        assert_eq!(rendered.subject, "Price Alert: Nikon 50mm f/1.8G now at ₹29,999");
    }

    #[test]
    fn body_escapes_urls_and_names_platform() {
        let rendered = render_price_alert(&email()).unwrap();
        assert!(rendered
            .html
            .contains(r#"href="https://flipkart.com/nikon-50mm?a=1&amp;b=2""#));
        assert!(rendered.html.contains("View on Flipkart"));
        assert!(rendered.html.contains("unsubscribe?token=abc"));
    }

    #[test]
    fn lens_name_is_escaped_in_body() {
        let mut e = email();
        e.lens_name = "<script>alert(1)</script>".to_string();
        let rendered = render_price_alert(&e).unwrap();
        assert!(!rendered.html.contains("<script>"));
        assert!(rendered.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn blank_buy_url_is_missing_field() {
        let mut e = email();
        e.buy_url = "  ".to_string();
        assert!(matches!(
            render_price_alert(&e),
            Err(NotifyError::MissingField("buy_url"))
        ));
    }

    #[test]
    fn zero_price_is_missing_field() {
        let mut e = email();
        e.price = 0;
        assert!(matches!(e.validate(), Err(NotifyError::MissingField("price"))));
    }

    #[test]
    fn unsubscribe_url_trims_trailing_slash() {
        let token = Uuid::nil();
        assert_eq!(
            unsubscribe_url("https://api.lensmatch.in/", token),
            "https://api.lensmatch.in/api/alerts/unsubscribe?token=00000000-0000-0000-0000-000000000000"
        );
    }
}
