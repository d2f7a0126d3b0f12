//! Portal items and the source of their content.

mod client;

pub use client::{PortalClient, parse_response};

use crate::error::Result;
use crate::esri::{FeatureSet, TableRows};
use serde::Deserialize;

/// Item metadata returned by `/sharing/rest/content/items/<id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub type_keywords: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Layer,
    Table,
}

/// Marker keyword that flags an item as a standalone table.
pub const TABLE_KEYWORD: &str = "Table";

pub fn classify_item(item: &PortalItem) -> ItemKind {
    if item.type_keywords.iter().any(|k| k == TABLE_KEYWORD) {
        ItemKind::Table
    } else {
        ItemKind::Layer
    }
}

/// Remote content consumed by a backup run.
pub trait ContentSource {
    /// Fetch item metadata by id.
    fn item(&self, id: &str) -> Result<PortalItem>;
    /// All features of sub-layer `layer`, every page concatenated.
    fn query_features(&self, item: &PortalItem, layer: u32) -> Result<FeatureSet>;
    /// All rows of sub-layer `layer`.
    fn query_rows(&self, item: &PortalItem, layer: u32) -> Result<TableRows>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_keyword_must_match_exactly() -> serde_json::Result<()> {
        let table: PortalItem = serde_json::from_str(
            r#"{"id": "a", "title": "inspections", "typeKeywords": ["ArcGIS Server", "Table"]}"#,
        )?;
        assert_eq!(classify_item(&table), ItemKind::Table);

        let layer: PortalItem = serde_json::from_str(
            r#"{"id": "b", "typeKeywords": ["Data", "Service", "Tables", "table"]}"#,
        )?;
        assert_eq!(classify_item(&layer), ItemKind::Layer);
        Ok(())
    }

    #[test]
    fn missing_keywords_classify_as_layer() -> serde_json::Result<()> {
        let item: PortalItem = serde_json::from_str(r#"{"id": "c", "url": "https://x/0"}"#)?;
        assert!(item.type_keywords.is_empty());
        assert_eq!(classify_item(&item), ItemKind::Layer);
        Ok(())
    }
}
