//! Domain records decoded from API responses.
//!
//! # Design
//! Decoding walks `serde_json::Value` by hand instead of deriving
//! `Deserialize`: every record keeps the raw payload it was built from
//! (the API grows fields faster than this crate models them), and a
//! decode failure names the exact missing or mistyped field. The two
//! free-text account fields tolerate absence and wrong types; everything
//! else is required and fails fast. Free text also gets typographic
//! punctuation folded to plain apostrophes, matching what the service
//! historically emitted for curly quotes.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ApiError;

/// Decode strategy for one element of an API response.
///
/// [`Paginator`](crate::Paginator) and [`Items`](crate::Items) are
/// generic over this, so every listing endpoint shares one fetch path.
pub trait FromJson: Sized {
    fn from_json(value: Value) -> Result<Self, ApiError>;
}

/// A member account.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub screen_name: String,
    pub url: Option<String>,
    pub profile_image_url: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub followers_count: u64,
    pub friends_count: u64,
    pub statuses_count: u64,
    pub created_at: String,
    pub protected: bool,
    pub utc_offset: Option<i64>,
    raw: Value,
}

impl User {
    /// The decoded JSON object this record was built from, envelope
    /// removed, including any fields the struct does not model.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl FromJson for User {
    fn from_json(value: Value) -> Result<Self, ApiError> {
        let value = unwrap_user_envelope(value);
        let map = match value.as_object() {
            Some(map) => map,
            None => return Err(ApiError::NotAnObject { entity: "user" }),
        };
        let id = req_u64(map, "user", "id")?;
        let name = req_string(map, "user", "name")?;
        let screen_name = req_string(map, "user", "screen_name")?;
        let url = req_nullable_string(map, "user", "url")?;
        let profile_image_url = req_nullable_string(map, "user", "profile_image_url")?;
        let description = free_text(map, "description");
        let location = free_text(map, "location");
        let followers_count = req_u64(map, "user", "followers_count")?;
        let friends_count = req_u64(map, "user", "friends_count")?;
        let statuses_count = req_u64(map, "user", "statuses_count")?;
        let created_at = req_string(map, "user", "created_at")?;
        let protected = req_bool(map, "user", "protected")?;
        let utc_offset = req_nullable_i64(map, "user", "utc_offset")?;
        Ok(User {
            id,
            name,
            screen_name,
            url,
            profile_image_url,
            description,
            location,
            followers_count,
            friends_count,
            statuses_count,
            created_at,
            protected,
            utc_offset,
            raw: value,
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}: {}", self.screen_name, self.name)
    }
}

/// One posted status.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub id: u64,
    pub user: User,
    pub text: String,
    pub created_at: String,
    pub source: String,
    pub truncated: bool,
    pub favorited: bool,
    pub in_reply_to_status_id: Option<u64>,
    pub in_reply_to_user_id: Option<u64>,
    pub in_reply_to_screen_name: Option<String>,
    raw: Value,
}

impl Status {
    /// The full decoded JSON object, author included.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl FromJson for Status {
    fn from_json(value: Value) -> Result<Self, ApiError> {
        let map = match value.as_object() {
            Some(map) => map,
            None => return Err(ApiError::NotAnObject { entity: "status" }),
        };
        let user = User::from_json(required(map, "status", "user")?.clone())?;
        let id = req_u64(map, "status", "id")?;
        let text = fold_status_punctuation(&req_string(map, "status", "text")?);
        let created_at = req_string(map, "status", "created_at")?;
        let source = req_string(map, "status", "source")?;
        let truncated = req_bool(map, "status", "truncated")?;
        let favorited = req_bool(map, "status", "favorited")?;
        let in_reply_to_status_id = req_nullable_u64(map, "status", "in_reply_to_status_id")?;
        let in_reply_to_user_id = req_nullable_u64(map, "status", "in_reply_to_user_id")?;
        let in_reply_to_screen_name =
            req_nullable_string(map, "status", "in_reply_to_screen_name")?;
        Ok(Status {
            id,
            user,
            text,
            created_at,
            source,
            truncated,
            favorited,
            in_reply_to_status_id,
            in_reply_to_user_id,
            in_reply_to_screen_name,
            raw: value,
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}: {}", self.user.screen_name, self.text)
    }
}

/// A private message between two accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectMessage {
    pub id: u64,
    pub sender: User,
    pub recipient: User,
    /// Kept exactly as received; direct messages get no punctuation
    /// folding.
    pub text: String,
    pub created_at: String,
    raw: Value,
}

impl DirectMessage {
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl FromJson for DirectMessage {
    fn from_json(value: Value) -> Result<Self, ApiError> {
        let map = match value.as_object() {
            Some(map) => map,
            None => return Err(ApiError::NotAnObject { entity: "direct message" }),
        };
        let sender = User::from_json(required(map, "direct message", "sender")?.clone())?;
        let recipient = User::from_json(required(map, "direct message", "recipient")?.clone())?;
        let id = req_u64(map, "direct message", "id")?;
        let text = req_string(map, "direct message", "text")?;
        let created_at = req_string(map, "direct message", "created_at")?;
        Ok(DirectMessage {
            id,
            sender,
            recipient,
            text,
            created_at,
            raw: value,
        })
    }
}

impl fmt::Display for DirectMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender.screen_name, self.text)
    }
}

/// Some endpoints wrap the account object one level deeper, as
/// `{"user": {...}}`. Both shapes decode to the same record.
fn unwrap_user_envelope(value: Value) -> Value {
    let mut value = value;
    let inner = match &mut value {
        Value::Object(map) if map.get("user").is_some_and(Value::is_object) => map.remove("user"),
        _ => None,
    };
    inner.unwrap_or(value)
}

/// Fold the right single quotation mark the service emits for
/// apostrophes back into U+0027.
fn fold_apostrophes(text: &str) -> String {
    text.replace('\u{2019}', "'")
}

/// Status bodies additionally fold the left double quotation mark.
fn fold_status_punctuation(text: &str) -> String {
    fold_apostrophes(text).replace('\u{201c}', "'")
}

fn required<'a>(
    map: &'a Map<String, Value>,
    entity: &'static str,
    field: &'static str,
) -> Result<&'a Value, ApiError> {
    map.get(field).ok_or(ApiError::MissingField { entity, field })
}

fn req_u64(map: &Map<String, Value>, entity: &'static str, field: &'static str) -> Result<u64, ApiError> {
    required(map, entity, field)?
        .as_u64()
        .ok_or(ApiError::InvalidField { entity, field })
}

fn req_bool(map: &Map<String, Value>, entity: &'static str, field: &'static str) -> Result<bool, ApiError> {
    required(map, entity, field)?
        .as_bool()
        .ok_or(ApiError::InvalidField { entity, field })
}

fn req_string(
    map: &Map<String, Value>,
    entity: &'static str,
    field: &'static str,
) -> Result<String, ApiError> {
    required(map, entity, field)?
        .as_str()
        .map(str::to_owned)
        .ok_or(ApiError::InvalidField { entity, field })
}

fn req_nullable_string(
    map: &Map<String, Value>,
    entity: &'static str,
    field: &'static str,
) -> Result<Option<String>, ApiError> {
    match required(map, entity, field)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(ApiError::InvalidField { entity, field }),
    }
}

fn req_nullable_u64(
    map: &Map<String, Value>,
    entity: &'static str,
    field: &'static str,
) -> Result<Option<u64>, ApiError> {
    let value = required(map, entity, field)?;
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_u64()
        .map(Some)
        .ok_or(ApiError::InvalidField { entity, field })
}

fn req_nullable_i64(
    map: &Map<String, Value>,
    entity: &'static str,
    field: &'static str,
) -> Result<Option<i64>, ApiError> {
    let value = required(map, entity, field)?;
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_i64()
        .map(Some)
        .ok_or(ApiError::InvalidField { entity, field })
}

/// Free-text account field: absent, null and non-string values all decode
/// to `None`; strings get their punctuation folded.
fn free_text(map: &Map<String, Value>, field: &str) -> Option<String> {
    map.get(field)
        .and_then(Value::as_str)
        .map(fold_apostrophes)
}
