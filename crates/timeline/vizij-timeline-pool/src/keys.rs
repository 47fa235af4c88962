//! Cache-key derivation for the keyed cache.
//!
//! Keys come from a 32-bit rolling hash (`h = h * 31 + unit`) over the UTF-16
//! code units of a target's serialized form, rendered in base 36. Distinct
//! targets can collide; colliding targets share one cached timeline.

use serde::Serialize;

const MAX_KEY_LEN: usize = 20;
const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Signed 32-bit rolling hash with wrap-around.
pub fn rolling_hash(s: &str) -> i32 {
    s.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32)
    })
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Key for an already serialized target representation.
pub fn key_for_str(serialized: &str) -> String {
    // Widen before abs so i32::MIN stays positive.
    let magnitude = (rolling_hash(serialized) as i64).unsigned_abs();
    let mut key = to_base36(magnitude);
    key.truncate(MAX_KEY_LEN);
    key
}

/// Key for any serializable target, via its JSON form.
pub fn key_for_target<T: Serialize + ?Sized>(target: &T) -> Result<String, serde_json::Error> {
    let serialized = serde_json::to_string(target)?;
    Ok(key_for_str(&serialized))
}
