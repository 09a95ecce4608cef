//! Encoding helpers for the JSON RPC substrate.

/// Serializes byte arrays as standard base64 strings.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Blob {
///     #[serde(with = "b64")]
///     bytes: Vec<u8>,
/// }
/// ```
pub mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Blob {
        #[serde(with = "super::b64")]
        bytes: Vec<u8>,
    }

    #[test]
    fn bytes_travel_as_base64() {
        let json = serde_json::to_string(&Blob { bytes: b"Victoria1".to_vec() }).unwrap();
        assert_eq!(json, r#"{"bytes":"VmljdG9yaWEx"}"#);
        assert_eq!(serde_json::from_str::<Blob>(&json).unwrap().bytes, b"Victoria1");
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(serde_json::from_str::<Blob>(r#"{"bytes":"not base64!"}"#).is_err());
    }
}
