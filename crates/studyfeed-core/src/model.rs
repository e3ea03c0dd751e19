//! Search query and result types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Optional narrowing applied on top of the free-text query
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Subject area (e.g. "biology")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Course code or identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,

    /// Material type (e.g. "notes", "exam")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,

    /// Tags, order preserved as given
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl SearchFilters {
    /// True when no filter narrows the query
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.course.is_none()
            && self.material_type.is_none()
            && self.tags.is_empty()
    }
}

/// Immutable search query value.
///
/// Two queries are the same session if and only if they compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search string
    pub text: String,

    /// Optional filters
    #[serde(default)]
    pub filters: SearchFilters,
}

impl SearchQuery {
    /// Create a query with no filters
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: SearchFilters::default(),
        }
    }

    /// Replace the filters
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Discriminant of a [`ResultItem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Primary,
    Folder,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Primary => "primary",
            ItemKind::Folder => "folder",
        }
    }
}

/// A searchable material (document-like resource)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryItem {
    /// Identifier, unique among primary items only
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Any further display fields sent by the upstream
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A folder grouping materials, paginated independently upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderItem {
    /// Identifier, unique among folder items only
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the search feed.
///
/// Encoded on the wire as an object tagged with `"kind": "primary" | "folder"`.
/// Ids are scoped to their kind: a primary item and a folder item may share
/// an id value without being the same entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultItem {
    Primary(PrimaryItem),
    Folder(FolderItem),
}

impl ResultItem {
    /// Build a primary item with only the required fields
    pub fn primary(id: impl Into<String>, title: impl Into<String>) -> Self {
        ResultItem::Primary(PrimaryItem {
            id: id.into(),
            title: title.into(),
            description: None,
            thumbnail_url: None,
            extra: Map::new(),
        })
    }

    /// Build a folder item with only the required fields
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        ResultItem::Folder(FolderItem {
            id: id.into(),
            name: name.into(),
            item_count: None,
            extra: Map::new(),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            ResultItem::Primary(item) => &item.id,
            ResultItem::Folder(item) => &item.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ResultItem::Primary(_) => ItemKind::Primary,
            ResultItem::Folder(_) => ItemKind::Folder,
        }
    }

    /// Human readable label (title or folder name)
    pub fn label(&self) -> &str {
        match self {
            ResultItem::Primary(item) => &item.title,
            ResultItem::Folder(item) => &item.name,
        }
    }

    pub fn as_primary(&self) -> Option<&PrimaryItem> {
        match self {
            ResultItem::Primary(item) => Some(item),
            ResultItem::Folder(_) => None,
        }
    }
}

/// One page of merged results as returned by the upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    /// Folder and primary items in upstream order
    pub items: Vec<ResultItem>,

    /// 1-based page number
    pub page: u32,

    pub total_pages: u32,

    /// Total hits reported for the primary collection
    pub total: u64,

    /// Whether the primary collection has more pages
    pub has_more: bool,

    /// Whether the upstream answered with its costlier search path
    pub used_advanced_search: bool,

    /// `Some(false)` once the folder collection is drained, `None` when
    /// folders were not queried for this page
    pub folder_has_more: Option<bool>,
}

impl ResultPage {
    /// Number of primary items on this page
    pub fn primary_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.kind() == ItemKind::Primary)
            .count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parameters of a single upstream search call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub query: SearchQuery,

    /// 1-based page to fetch
    pub page: u32,

    /// Requested page size
    pub limit: usize,

    /// Primary ids the upstream must skip; `None` rather than an empty list
    pub exclude_ids: Option<Vec<String>>,

    /// Whether folder items should be included in the response
    pub include_folders: bool,

    /// Passthrough flag asking the upstream to record the query in history
    pub save_history: bool,
}
