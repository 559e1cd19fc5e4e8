//! # Text Encodings
//!
//! Pure, total encode/decode helpers over well-formed input: hex and base64
//! for key and signature export, and a strict fixed-width base58 variant for
//! the QR wire format.
//!
//! ## Why fixed-width base58?
//!
//! Base58 output length is not constant for fixed-length input: leading zero
//! bytes encode as leading `'1'` characters, and small values need fewer
//! digits. The QR frame parser slices fields by character count, so every
//! fixed-length binary field is pinned to its worst-case width by padding
//! with `'1'` on the left. Decoding strips the implied leading zeros back
//! off. Both sides must agree on these widths bit-for-bit.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{Error, Result};

/// Encode bytes as lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string, failing on invalid characters or odd length
pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    hex::decode(text).map_err(|e| Error::Encoding(format!("Invalid hex: {}", e)))
}

/// Encode bytes as standard base64
pub fn to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode a standard base64 string
pub fn from_base64(text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text)
        .map_err(|e| Error::Encoding(format!("Invalid base64: {}", e)))
}

/// Encode bytes as base58 (variable width)
pub fn to_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode a base58 string
pub fn from_base58(text: &str) -> Result<Vec<u8>> {
    bs58::decode(text)
        .into_vec()
        .map_err(|e| Error::Encoding(format!("Invalid base58: {}", e)))
}

/// Encode bytes as base58 pinned to exactly `width` characters.
///
/// `width` must be at least the worst-case base58 length for `bytes.len()`
/// bytes (`ceil(len * log(256) / log(58))`), otherwise encoding fails.
pub fn to_base58_fixed(bytes: &[u8], width: usize) -> Result<String> {
    let encoded = bs58::encode(bytes).into_string();
    if encoded.len() > width {
        return Err(Error::Encoding(format!(
            "Value needs {} base58 chars, field is {} wide",
            encoded.len(),
            width
        )));
    }
    // '1' is the base58 zero digit; left-padding encodes leading zero bytes,
    // which decode_fixed strips back off.
    let mut out = String::with_capacity(width);
    for _ in 0..width - encoded.len() {
        out.push('1');
    }
    out.push_str(&encoded);
    Ok(out)
}

/// Decode a fixed-width base58 field back to exactly `len` bytes.
///
/// Inverse of [`to_base58_fixed`]: strips the leading zero bytes introduced
/// by padding, then re-pads the value to `len` bytes so short values (those
/// with genuine leading zeros) round-trip.
pub fn from_base58_fixed(text: &str, len: usize) -> Result<Vec<u8>> {
    let decoded = from_base58(text)?;
    if decoded.len() > len {
        // Strip pad zeros; anything non-zero in the excess is malformed.
        let (excess, value) = decoded.split_at(decoded.len() - len);
        if excess.iter().any(|&b| b != 0) {
            return Err(Error::Encoding(format!(
                "Field decodes to {} bytes, expected {}",
                decoded.len(),
                len
            )));
        }
        return Ok(value.to_vec());
    }
    let mut out = vec![0u8; len - decoded.len()];
    out.extend_from_slice(&decoded);
    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let data = vec![0x00, 0xAB, 0xFF, 0x42];
        assert_eq!(from_hex(&to_hex(&data)).unwrap(), data);
    }

    #[test]
    fn test_hex_rejects_garbage() {
        assert!(from_hex("zz").is_err());
        assert!(from_hex("abc").is_err()); // odd length
    }

    #[test]
    fn test_base64_roundtrip() {
        let data = b"kestrel".to_vec();
        assert_eq!(from_base64(&to_base64(&data)).unwrap(), data);
    }

    #[test]
    fn test_base64_rejects_garbage() {
        assert!(from_base64("not base64!!").is_err());
    }

    #[test]
    fn test_base58_fixed_roundtrip() {
        let data = [7u8; 13];
        let encoded = to_base58_fixed(&data, 18).unwrap();
        assert_eq!(encoded.len(), 18);
        assert_eq!(from_base58_fixed(&encoded, 13).unwrap(), data);
    }

    #[test]
    fn test_base58_fixed_leading_zeros() {
        // Leading zero bytes shrink the natural encoding; the fixed width
        // must still round-trip them exactly.
        let mut data = [0u8; 13];
        data[11] = 0x01;
        data[12] = 0xFF;
        let encoded = to_base58_fixed(&data, 18).unwrap();
        assert_eq!(encoded.len(), 18);
        assert_eq!(from_base58_fixed(&encoded, 13).unwrap(), data);
    }

    #[test]
    fn test_base58_fixed_all_zero() {
        let data = [0u8; 13];
        let encoded = to_base58_fixed(&data, 18).unwrap();
        assert_eq!(encoded, "1".repeat(18));
        assert_eq!(from_base58_fixed(&encoded, 13).unwrap(), data);
    }

    #[test]
    fn test_base58_fixed_width_too_small() {
        let data = [0xFFu8; 13];
        assert!(to_base58_fixed(&data, 10).is_err());
    }

    #[test]
    fn test_base58_fixed_rejects_oversized_value() {
        // 65 bytes of 0xFF encodes to 89 chars; decoding it as a 13-byte
        // field must fail rather than truncate.
        let encoded = to_base58_fixed(&[0xFFu8; 65], 89).unwrap();
        assert!(from_base58_fixed(&encoded, 13).is_err());
    }

    #[test]
    fn test_signature_width_worst_case() {
        // The QR signature field is 89 chars wide; the worst 65-byte value
        // must fit exactly.
        let encoded = to_base58_fixed(&[0xFFu8; 65], 89).unwrap();
        assert_eq!(encoded.len(), 89);
        assert_eq!(from_base58_fixed(&encoded, 65).unwrap(), [0xFFu8; 65]);
    }
}
