use fieldsafe_core::errors::Result;
use fieldsafe_core::workflow::MediaRef;
use log::warn;

pub(crate) fn enum_to_db<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.trim_matches('"').to_string())
}

pub(crate) fn enum_from_db<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(&format!("\"{}\"", value))?)
}

pub(crate) fn quote_identifier(value: &str) -> String {
    format!("`{}`", value.replace('`', "``"))
}

pub(crate) fn encode_media(media: &[MediaRef]) -> Result<String> {
    Ok(serde_json::to_string(media)?)
}

/// Unreadable media blobs decode to an empty list.
pub(crate) fn decode_media(owner: &str, raw: Option<&str>) -> Vec<MediaRef> {
    match raw {
        None => Vec::new(),
        Some(raw) if raw.trim().is_empty() => Vec::new(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|err| {
            warn!("[OfflineSync] Unreadable media on {}: {}", owner, err);
            Vec::new()
        }),
    }
}
