//! Object path grammar shared by the service and its clients.
//!
//! Alias paths are a pure function of the alias, so a client and the service
//! computing the path for `default` always arrive at the same bytes.

use crate::crypto::token::IDENTIFIER_BYTES;
use crate::error::{Result, ServiceError};

pub const ALIAS_PREFIX: &str = "/org/freedesktop/secrets/aliases/";
pub const COLLECTION_PREFIX: &str = "/org/freedesktop/secrets/collection/";
pub const SESSION_PREFIX: &str = "/org/freedesktop/secrets/session/";

/// Returned in place of a prompt when no user confirmation is needed.
pub const NO_PROMPT: &str = "/";

/// Length of a hex identifier in a path element.
pub const IDENTIFIER_LEN: usize = IDENTIFIER_BYTES * 2;

/// Checks that an alias is a usable object path element.
pub fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() {
        return Err(ServiceError::Validation("Alias cannot be empty".to_string()));
    }
    if !alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ServiceError::Validation(format!(
            "Alias '{}' may only contain ASCII letters, digits and underscores",
            alias
        )));
    }
    Ok(())
}

pub fn alias_path(alias: &str) -> String {
    format!("{}{}", ALIAS_PREFIX, alias)
}

pub fn collection_path(id: &str) -> String {
    format!("{}{}", COLLECTION_PREFIX, id)
}

pub fn session_path(serial: &str) -> String {
    format!("{}{}", SESSION_PREFIX, serial)
}

/// `<collectionPath>/<itemID>`; always `collection.len() + 1 + IDENTIFIER_LEN` long.
pub fn item_path(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, id)
}

fn is_identifier(s: &str) -> bool {
    s.len() == IDENTIFIER_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Extracts the serial number from a session object path.
pub fn parse_session_path(path: &str) -> Result<&str> {
    path.strip_prefix(SESSION_PREFIX)
        .filter(|serial| is_identifier(serial))
        .ok_or_else(|| ServiceError::Validation(format!("Not a session path: {}", path)))
}

/// Splits an item path into its collection path and item identifier.
pub fn split_item_path(path: &str) -> Result<(&str, &str)> {
    let invalid = || ServiceError::Validation(format!("Not an item path: {}", path));
    let (collection, id) = path.rsplit_once('/').ok_or_else(invalid)?;
    if !is_identifier(id) || !is_collection_path(collection) {
        return Err(invalid());
    }
    Ok((collection, id))
}

/// True for `/aliases/<alias>` and `/collection/<id>` paths.
pub fn is_collection_path(path: &str) -> bool {
    if let Some(alias) = path.strip_prefix(ALIAS_PREFIX) {
        return validate_alias(alias).is_ok();
    }
    path.strip_prefix(COLLECTION_PREFIX)
        .is_some_and(is_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn default_alias_path() {
        assert_eq!(alias_path("default"), "/org/freedesktop/secrets/aliases/default");
    }

    #[test]
    fn item_path_length_is_fixed() {
        let collection = alias_path("default");
        let item = item_path(&collection, ID);
        assert_eq!(&item[..41], "/org/freedesktop/secrets/aliases/default/");
        assert_eq!(item.len(), 73);
        assert_eq!(item.len(), collection.len() + 1 + IDENTIFIER_LEN);
    }

    #[test]
    fn splits_item_paths() {
        let item = item_path(&collection_path(ID), ID);
        let (collection, id) = split_item_path(&item).unwrap();
        assert_eq!(collection, collection_path(ID));
        assert_eq!(id, ID);

        assert!(split_item_path("/org/freedesktop/secrets/aliases/default").is_err());
        assert!(split_item_path("/org/freedesktop/secrets/aliases/default/short").is_err());
        assert!(split_item_path(&format!("/tmp/{}", ID)).is_err());
    }

    #[test]
    fn parses_session_paths() {
        assert_eq!(parse_session_path(&session_path(ID)).unwrap(), ID);
        assert!(parse_session_path("/").is_err());
        assert!(parse_session_path(&session_path("nothex")).is_err());
    }

    #[test]
    fn alias_syntax() {
        assert!(validate_alias("default").is_ok());
        assert!(validate_alias("login_2").is_ok());
        assert!(validate_alias("").is_err());
        assert!(validate_alias("a/b").is_err());
        assert!(validate_alias("with-dash").is_err());
    }
}
