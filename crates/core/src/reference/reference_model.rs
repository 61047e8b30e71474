use serde::{Deserialize, Serialize};

/// The six read-only lookup tables mirrored from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Project,
    Department,
    Supervisor,
    Category,
    Subcategory,
    Location,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 6] = [
        ReferenceKind::Project,
        ReferenceKind::Department,
        ReferenceKind::Supervisor,
        ReferenceKind::Category,
        ReferenceKind::Subcategory,
        ReferenceKind::Location,
    ];

    /// Local mirror table, which is also the remote resource name.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Department => "departments",
            Self::Supervisor => "supervisors",
            Self::Category => "categories",
            Self::Subcategory => "subcategories",
            Self::Location => "locations",
        }
    }
}

/// A name/id pair. `parent_id` links a subcategory to its category and a
/// location to its project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
