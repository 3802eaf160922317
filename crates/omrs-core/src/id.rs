// UUID handling for OpenMRS identifiers.
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("Invalid UUID format: {0}")]
    InvalidUuid(String),
}

/// Parses an OpenMRS uuid column value.
///
/// OpenMRS stores uuids as 36/38-char strings; hyphenated and simple forms are
/// both accepted.
pub fn validate_uuid(value: &str) -> Result<Uuid, IdError> {
    Uuid::parse_str(value.trim()).map_err(|_| IdError::InvalidUuid(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("3f1c2a4e-0c7b-4d7e-9a51-2d1f4a6b8c90").is_ok());
        assert!(validate_uuid("3f1c2a4e0c7b4d7e9a512d1f4a6b8c90").is_ok());
        assert_eq!(
            validate_uuid("not-a-uuid"),
            Err(IdError::InvalidUuid("not-a-uuid".into()))
        );
        assert!(validate_uuid("").is_err());
    }
}
