use crate::token::claims::{self, ClaimSet};

pub const ADMIN_ROLE: &str = "ROLE_ADMIN";

// Backends disagree on where roles live. The first of these that holds a
// non-empty list is the only one consulted.
const ROLE_CLAIMS: [&str; 4] = ["authorities", "roles", "scope", "scp"];

/// Whether `token` grants admin access, judged from its unverified claims.
///
/// Absent, empty and undecodable tokens are never elevated.
pub fn is_elevated<'a>(token: impl Into<Option<&'a str>>) -> bool {
    token
        .into()
        .filter(|t| !t.is_empty())
        .and_then(claims::decode)
        .is_some_and(|claims| claims_are_elevated(&claims))
}

pub fn claims_are_elevated(claims: &ClaimSet) -> bool {
    ROLE_CLAIMS
        .iter()
        .filter_map(|name| claims.list(name))
        .find(|values| !values.is_empty())
        .is_some_and(|values| values.iter().any(|v| v.as_str() == Some(ADMIN_ROLE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::mint;
    use serde_json::json;

    #[test]
    fn test_not_elevated_without_token() {
        assert!(!is_elevated(None::<&str>));
        assert!(!is_elevated(""));
        assert!(!is_elevated("not-a-jwt"));
    }

    #[test]
    fn test_authorities() {
        assert!(is_elevated(mint(json!({ "authorities": ["ROLE_ADMIN"] })).as_str()));
        assert!(!is_elevated(mint(json!({ "authorities": ["ROLE_USER"] })).as_str()));
    }

    #[test]
    fn test_roles_and_scope_fallback() {
        assert!(is_elevated(mint(json!({ "roles": ["ROLE_ADMIN"] })).as_str()));
        assert!(is_elevated(mint(json!({ "scope": ["ROLE_ADMIN"] })).as_str()));
        assert!(is_elevated(mint(json!({ "scp": ["ROLE_ADMIN"] })).as_str()));
    }

    #[test]
    fn test_first_non_empty_list_wins() {
        // authorities is present and non-empty, so roles is never looked at
        let token = mint(json!({
            "authorities": ["ROLE_USER"],
            "roles": ["ROLE_ADMIN"]
        }));
        assert!(!is_elevated(token.as_str()));

        // an empty list falls through to the next claim
        let token = mint(json!({
            "authorities": [],
            "roles": ["ROLE_ADMIN"]
        }));
        assert!(is_elevated(token.as_str()));

        let token = mint(json!({
            "roles": ["ROLE_USER"],
            "scope": ["ROLE_ADMIN"]
        }));
        assert!(!is_elevated(token.as_str()));
    }

    #[test]
    fn test_non_list_claims_are_skipped() {
        let token = mint(json!({
            "authorities": "ROLE_USER",
            "roles": ["ROLE_ADMIN"]
        }));
        assert!(is_elevated(token.as_str()));

        let token = mint(json!({ "scope": "ROLE_ADMIN" }));
        assert!(!is_elevated(token.as_str()));
    }

    #[test]
    fn test_no_role_claims() {
        assert!(!is_elevated(mint(json!({ "sub": "alice" })).as_str()));
        assert!(!claims_are_elevated(&ClaimSet::default()));
    }
}
