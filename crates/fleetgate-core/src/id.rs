//! ID generation utilities.

use uuid::Uuid;

/// Generate a new session identifier.
///
/// Session IDs are UUID v4 (128 bits of randomness). They are never reused:
/// a freed identifier stays retired for the life of the identifier space, so
/// an in-flight message can never land on a recycled session.
pub fn session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a short random ID (8 characters), used for log correlation.
pub fn short_id() -> String {
    let bytes: [u8; 4] = rand::random();
    hex::encode(bytes)
}
