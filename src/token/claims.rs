use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

// JWT segments are unpadded; accept padded input as well.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims carried in the payload segment of a bearer token.
///
/// These are read without any signature check. Nothing here is proof that
/// the backend issued the token; the client only relies on transport
/// integrity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    pub fn authorities(&self) -> Vec<&str> {
        self.strings("authorities")
    }

    pub fn roles(&self) -> Vec<&str> {
        self.strings("roles")
    }

    pub fn scope(&self) -> Vec<&str> {
        self.strings("scope")
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("iat")
    }

    /// Expiry as stated by the token. The client never enforces it.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("exp")
    }

    /// The claim as a JSON array, or `None` if absent or not an array.
    pub(crate) fn list(&self, name: &str) -> Option<&Vec<Value>> {
        self.0.get(name).and_then(Value::as_array)
    }

    fn strings(&self, name: &str) -> Vec<&str> {
        self.list(name)
            .map(|values| values.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        let value = self.0.get(name)?;
        let secs = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))?;

        DateTime::from_timestamp(secs, 0)
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Reads the claim set out of a `header.payload.signature` token.
///
/// Returns `None` for anything that is not three dot-separated segments with
/// a base64 (URL-safe or standard alphabet) JSON object in the middle.
pub fn decode(token: &str) -> Option<ClaimSet> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let payload = payload.replace('-', "+").replace('_', "/");
    let bytes = PAYLOAD_ENGINE.decode(payload).ok()?;

    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(map) => Some(ClaimSet(map)),
        _ => None,
    }
}
