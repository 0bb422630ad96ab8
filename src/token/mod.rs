pub mod claims;
pub mod role;
pub mod store;

/// Signs `claims` into a compact HS256 JWT with a throwaway secret.
#[cfg(test)]
pub(crate) fn mint(claims: serde_json::Value) -> String {
    use jsonwebtoken::{EncodingKey, Header};

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}
