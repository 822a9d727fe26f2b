//! JSON encoding of records on the ledger boundary.

use thiserror::Error;

use crate::record::Record;

/// Failure to encode or decode a record.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stored value is empty.
    #[error("empty record encoding")]
    Empty,

    /// The stored bytes are not a well-formed record.
    #[error("malformed record encoding: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The record could not be serialized.
    #[error("record serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Encode a record as JSON bytes.
pub fn encode(record: &Record) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(record).map_err(CodecError::Serialize)
}

/// Decode JSON bytes into a record.
///
/// Fails on anything that is not a JSON object carrying every required field.
pub fn decode(bytes: &[u8]) -> Result<Record, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    serde_json::from_slice(bytes).map_err(CodecError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_declared_field_names() {
        let record = Record::new("John", "2018", "CBSE", "99").with_rollno("290319087");
        let json: serde_json::Value = serde_json::from_slice(&encode(&record).unwrap()).unwrap();
        assert_eq!(json["name"], "John");
        assert_eq!(json["year"], "2018");
        assert_eq!(json["board"], "CBSE");
        assert_eq!(json["mark"], "99");
        assert_eq!(json["rollno"], "290319087");
    }

    #[test]
    fn decodes_legacy_field_layout() {
        let legacy = br#"{"make":"Tan","model":"2018","colour":"CBSE","owner":"85","rollno":"2903914087"}"#;
        let record = decode(legacy).unwrap();
        assert_eq!(
            record,
            Record::new("Tan", "2018", "CBSE", "85").with_rollno("2903914087")
        );
    }

    #[test]
    fn decodes_record_without_rollno() {
        let record = decode(br#"{"name":"jane","year":"2017","board":"ICSE","mark":"92"}"#).unwrap();
        assert!(record.rollno.is_none());
    }

    #[test]
    fn malformed_input_is_an_error_not_a_blank_record() {
        assert!(matches!(decode(b"not json"), Err(CodecError::Malformed(_))));
        assert!(matches!(decode(b"[1, 2]"), Err(CodecError::Malformed(_))));
        assert!(matches!(decode(b"{}"), Err(CodecError::Malformed(_))));
        assert!(matches!(
            decode(br#"{"name":"x","year":"y","board":"z"}"#),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            decode(br#"{"name":1,"year":"y","board":"z","mark":"m"}"#),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(decode(b""), Err(CodecError::Empty)));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            name in ".*",
            year in ".*",
            board in ".*",
            mark in ".*",
            rollno in proptest::option::of(".*"),
        ) {
            let record = Record { name, year, board, mark, rollno };
            let bytes = encode(&record).unwrap();
            prop_assert_eq!(decode(&bytes).unwrap(), record);
        }
    }
}
