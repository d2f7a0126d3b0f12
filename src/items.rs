//! The fixed list of items backed up on every run.

/// One remote item to back up, written under `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceItem {
    pub name: &'static str,
    pub item_id: &'static str,
    /// Sub-layer index within the item's service.
    pub layer: u32,
}

impl SourceItem {
    pub const fn new(name: &'static str, item_id: &'static str, layer: u32) -> Self {
        Self {
            name,
            item_id,
            layer,
        }
    }
}

pub static ITEMS: &[SourceItem] = &[
    SourceItem::new("parks_master", "e891be88e3ea4e58824b76e1db80b126", 0),
    SourceItem::new("park_access_points", "97ad22f4c1d74db7b6b64c3c0c95e3b0", 0),
    SourceItem::new("park_analysis_tiers", "da7ab59d8303415b91d520f417d83537", 0),
    SourceItem::new("greenway_trails_master", "d1e1f46354954d94b8600042533e27dc", 0),
    SourceItem::new("greenways_master", "7b01cd380dc34f6bbc64e8215c95015e", 0),
];
