use fieldsafe_core::reference::{ReferenceItem, ReferenceKind};

use crate::context::MobileContext;

/// Lookup list for a picker. Served from the mirror when offline.
pub async fn fetch_reference(
    context: &MobileContext,
    kind: ReferenceKind,
) -> Result<Vec<ReferenceItem>, String> {
    context
        .reference_service()
        .fetch_reference(kind)
        .await
        .map_err(|e| e.to_string())
}
