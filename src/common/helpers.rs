// Helper functions for safe logging and serialization

use serde::{Deserialize, Deserializer};

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            format!("{}***@{}", &parts[0][..1.min(parts[0].len())], parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Deserializer for fields where "absent" and "explicitly null" mean
/// different things. Combined with `#[serde(default)]`:
/// missing field -> None, `null` -> Some(None), value -> Some(Some(v)).
///
/// Survey updates need this: a PUT with `"expirationDate": null` clears the
/// expiration (and the cached expired flag), while a PUT without the field
/// leaves it alone.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "double_option")]
        expiration_date: Option<Option<DateTime<Utc>>>,
    }

    #[test]
    fn test_safe_email_log_masks_local_part() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("ab"), "***@***.***");
        assert_eq!(safe_email_log("no-at-sign"), "***@***.***");
    }

    #[test]
    fn test_double_option_distinguishes_missing_from_null() {
        let missing: Payload = serde_json::from_str("{}").unwrap();
        assert!(missing.expiration_date.is_none());

        let null: Payload = serde_json::from_str(r#"{"expiration_date": null}"#).unwrap();
        assert_eq!(null.expiration_date, Some(None));

        let set: Payload =
            serde_json::from_str(r#"{"expiration_date": "2026-01-01T00:00:00Z"}"#).unwrap();
        assert!(matches!(set.expiration_date, Some(Some(_))));
    }
}
