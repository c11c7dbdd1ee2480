//! Text encoding of private keys.
//!
//! The service receives and returns private keys as text; the codec turns
//! that text into raw [`KeyMaterial`] and back. `decode(encode(k)) == k` for
//! every valid key, and malformed input is always
//! [`KeystoreError::InvalidFormat`].

use nestr_core::SecretString;
use zeroize::Zeroizing;

use crate::error::{KeystoreError, Result};
use crate::types::KeyMaterial;

/// Converts between the wire encoding of a private key and its raw bytes.
pub trait KeyCodec: Send + Sync {
    /// Parse an encoded private key.
    fn decode(&self, encoded: &str) -> Result<KeyMaterial>;

    /// Encode raw key material for return to a caller.
    fn encode(&self, material: &KeyMaterial) -> Result<SecretString>;
}

/// secp256k1 secret keys as 64 hex digits.
///
/// Decoding tolerates surrounding whitespace, a `0x` prefix, and uppercase
/// digits; encoding always emits bare lowercase hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1HexCodec;

const SECRET_KEY_LEN: usize = 32;

impl KeyCodec for Secp256k1HexCodec {
    fn decode(&self, encoded: &str) -> Result<KeyMaterial> {
        let trimmed = encoded.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != SECRET_KEY_LEN * 2 {
            return Err(KeystoreError::InvalidFormat(format!(
                "private key must be {} hex digits, got {}",
                SECRET_KEY_LEN * 2,
                digits.len()
            )));
        }

        let bytes = Zeroizing::new(
            hex::decode(digits)
                .map_err(|e| KeystoreError::InvalidFormat(format!("private key is not hex: {e}")))?,
        );
        validate_scalar(&bytes)?;

        Ok(KeyMaterial::from(bytes))
    }

    fn encode(&self, material: &KeyMaterial) -> Result<SecretString> {
        if material.len() != SECRET_KEY_LEN {
            return Err(KeystoreError::InvalidFormat(format!(
                "key material is {} bytes, expected {SECRET_KEY_LEN}",
                material.len()
            )));
        }
        Ok(SecretString::new(hex::encode(material.expose())))
    }
}

/// Reject zero and values at or above the curve order.
fn validate_scalar(bytes: &[u8]) -> Result<()> {
    k256::SecretKey::from_slice(bytes)
        .map(|_| ())
        .map_err(|_| KeystoreError::InvalidFormat("not a valid secp256k1 secret key".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    /// secp256k1 group order n.
    const CURVE_ORDER_HEX: &str = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";

    #[test]
    fn test_round_trip() {
        let codec = Secp256k1HexCodec;
        let material = codec.decode(KEY_HEX).unwrap();
        assert_eq!(material.len(), 32);

        let encoded = codec.encode(&material).unwrap();
        assert_eq!(encoded.expose_secret(), KEY_HEX);
        assert_eq!(codec.decode(encoded.expose_secret()).unwrap(), material);
    }

    #[test]
    fn test_decode_normalizes_input() {
        let codec = Secp256k1HexCodec;
        let expected = codec.decode(KEY_HEX).unwrap();

        let prefixed = format!("  0x{}\n", KEY_HEX.to_uppercase());
        assert_eq!(codec.decode(&prefixed).unwrap(), expected);
        assert_eq!(
            codec
                .encode(&codec.decode(&prefixed).unwrap())
                .unwrap()
                .expose_secret(),
            KEY_HEX
        );
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let codec = Secp256k1HexCodec;
        assert!(matches!(
            codec.decode(&KEY_HEX[..62]),
            Err(KeystoreError::InvalidFormat(_))
        ));
        assert!(matches!(codec.decode(""), Err(KeystoreError::InvalidFormat(_))));
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        let codec = Secp256k1HexCodec;
        let bad = format!("zz{}", &KEY_HEX[2..]);
        assert!(matches!(codec.decode(&bad), Err(KeystoreError::InvalidFormat(_))));
    }

    #[test]
    fn test_decode_rejects_out_of_range_scalars() {
        let codec = Secp256k1HexCodec;
        assert!(matches!(
            codec.decode(&"0".repeat(64)),
            Err(KeystoreError::InvalidFormat(_))
        ));
        assert!(matches!(
            codec.decode(CURVE_ORDER_HEX),
            Err(KeystoreError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_encode_rejects_wrong_length() {
        let codec = Secp256k1HexCodec;
        let result = codec.encode(&KeyMaterial::new(vec![1u8; 16]));
        assert!(matches!(result, Err(KeystoreError::InvalidFormat(_))));
    }
}
