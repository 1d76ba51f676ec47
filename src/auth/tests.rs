//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - JWT token issuance and validation
//! - Token lifecycle (7 day validity window)
//! - Credential validation

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::auth::handlers::{issue_token, validate_token};
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    const SECRET: &str = "test_secret_key";

    fn token_with_exp(exp: i64) -> String {
        let claims = models::Claims {
            sub: "U_TESTID".to_string(),
            exp: exp as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("Failed to encode token")
    }

    #[test]
    fn test_issue_and_validate_round_trip() {
        let token = issue_token("U_K7NP3X", SECRET).expect("Failed to issue token");
        let claims = validate_token(&token, SECRET).expect("Failed to validate token");
        assert_eq!(claims.sub, "U_K7NP3X");
    }

    #[test]
    fn test_token_accepted_within_validity_window() {
        // A token expiring 6 days from now must still validate; issuance at
        // time T means acceptance at T+6 days.
        let exp = (Utc::now() + Duration::days(6)).timestamp();
        let token = token_with_exp(exp);
        assert!(validate_token(&token, SECRET).is_ok());
    }

    #[test]
    fn test_token_rejected_after_expiry() {
        // Issued 8 days ago with 7-day validity: expiry elapsed a day ago
        let exp = (Utc::now() - Duration::days(1)).timestamp();
        let token = token_with_exp(exp);
        assert!(validate_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_validation_fails_with_wrong_secret() {
        let token = issue_token("U_K7NP3X", SECRET).expect("Failed to issue token");
        let result = validate_token(&token, "wrong_secret_key");
        assert!(
            result.is_err(),
            "Token validation should fail with wrong secret"
        );
    }

    #[test]
    fn test_validation_fails_for_malformed_token() {
        assert!(validate_token("not-a-jwt", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_claims_structure() {
        let claims = models::Claims {
            sub: "U_TESTID".to_string(),
            exp: 1234567890,
        };
        assert_eq!(claims.sub, "U_TESTID");
        assert_eq!(claims.exp, 1234567890);
    }

    #[test]
    fn test_user_summary_omits_password_hash() {
        let user = models::User {
            id: "U_TESTID".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            created_at: Some("2026-01-01".to_string()),
        };
        let summary = models::UserSummary::from(&user);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert!(json.get("password_hash").is_none());
    }
}
