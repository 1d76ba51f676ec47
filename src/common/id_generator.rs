// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., S_K7NP3X for surveys)
//!
//! Benefits:
//! - No ambiguous characters (excludes I, L, O, U)
//! - Case-insensitive
//! - ~1 billion combinations per entity type (32^6)
//! - Easy to read, type, and communicate verbally

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User account (U_)
    User,
    /// Survey (S_)
    Survey,
    /// Survey response (R_)
    Response,
    /// Question embedded in a survey (Q_)
    Question,
    /// Realtime connection (N_) - N for Network connection
    Connection,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Survey => "S",
            EntityPrefix::Response => "R",
            EntityPrefix::Question => "Q",
            EntityPrefix::Connection => "N",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// # Returns
/// A string in format "PREFIX_XXXXXX" (e.g., "S_K7NP3X")
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

/// Check whether an incoming ID is a well-formed identifier for the given
/// entity type. Malformed IDs are rejected before any database lookup so
/// that garbage input surfaces as a client error rather than a not-found.
pub fn is_well_formed_id(prefix: EntityPrefix, id: &str) -> bool {
    let Some(rest) = id.strip_prefix(prefix.as_str()) else {
        return false;
    };
    let Some(body) = rest.strip_prefix('_') else {
        return false;
    };
    body.len() == 6
        && body
            .bytes()
            .all(|b| CROCKFORD_ALPHABET.contains(&b.to_ascii_uppercase()))
}

// ============================================================================
// Convenience functions for each entity type
// ============================================================================

/// Generate a User ID (U_XXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate a Survey ID (S_XXXXXX)
pub fn generate_survey_id() -> String {
    generate_id(EntityPrefix::Survey)
}

/// Generate a Response ID (R_XXXXXX)
pub fn generate_response_id() -> String {
    generate_id(EntityPrefix::Response)
}

/// Generate a Question ID (Q_XXXXXX)
pub fn generate_question_id() -> String {
    generate_id(EntityPrefix::Question)
}

/// Generate a Connection ID (N_XXXXXX)
pub fn generate_connection_id() -> String {
    generate_id(EntityPrefix::Connection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_well_formed() {
        for _ in 0..50 {
            let id = generate_survey_id();
            assert!(id.starts_with("S_"));
            assert_eq!(id.len(), 8);
            assert!(is_well_formed_id(EntityPrefix::Survey, &id));
        }
    }

    #[test]
    fn test_malformed_ids_are_rejected() {
        assert!(!is_well_formed_id(EntityPrefix::Survey, ""));
        assert!(!is_well_formed_id(EntityPrefix::Survey, "S_"));
        assert!(!is_well_formed_id(EntityPrefix::Survey, "S_ABC"));
        assert!(!is_well_formed_id(EntityPrefix::Survey, "S_ABCDEFG"));
        // I, L, O, U are not in the Crockford alphabet
        assert!(!is_well_formed_id(EntityPrefix::Survey, "S_ILOU00"));
        // Wrong prefix
        assert!(!is_well_formed_id(EntityPrefix::Survey, "R_K7NP3X"));
        // Mongo-style hex ids from an old client
        assert!(!is_well_formed_id(
            EntityPrefix::Survey,
            "64b7f0c2a1d3e4f5a6b7c8d9"
        ));
    }

    #[test]
    fn test_well_formed_check_is_case_insensitive() {
        assert!(is_well_formed_id(EntityPrefix::Survey, "S_k7np3x"));
    }
}
