//! The in-memory catalog index.
//!
//! `Catalog` owns the user's clothing items and keeps two indices next to
//! them: insertion order (the order the UI lists items in, and the order the
//! outfit fallback picks from) and a category index for grouped queries.

use crate::types::{ClothingItem, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered, id-keyed collection of [`ClothingItem`]s.
///
/// Serializes as a plain JSON array of items, which is the storage format
/// for the guest catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ClothingItem>", into = "Vec<ClothingItem>")]
pub struct Catalog {
    /// Item ids in insertion order
    order: Vec<ItemId>,
    items: HashMap<ItemId, ClothingItem>,
    /// Item ids grouped by lowercased category
    category_index: HashMap<String, Vec<ItemId>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, replacing any item with the same id.
    ///
    /// A replaced item keeps its position in the ordering. Returns the
    /// previous version, if there was one.
    pub fn insert(&mut self, item: ClothingItem) -> Option<ClothingItem> {
        let id = item.id.clone();
        let category = category_key(&item.category);
        let previous = self.items.insert(id.clone(), item);

        match &previous {
            Some(old) => {
                let old_category = category_key(&old.category);
                if old_category != category {
                    self.unindex_category(&old_category, &id);
                    self.category_index.entry(category).or_default().push(id);
                }
            }
            None => {
                self.order.push(id.clone());
                self.category_index.entry(category).or_default().push(id);
            }
        }
        previous
    }

    /// Remove an item by id, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<ClothingItem> {
        let removed = self.items.remove(id)?;
        self.order.retain(|existing| existing != id);
        self.unindex_category(&category_key(&removed.category), id);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&ClothingItem> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ClothingItem> + '_ {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Item ids in insertion order.
    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    /// Items in a category (case-insensitive), in insertion order.
    pub fn by_category(&self, category: &str) -> Vec<&ClothingItem> {
        self.category_index
            .get(&category_key(category))
            .map(|ids| ids.iter().filter_map(|id| self.items.get(id)).collect())
            .unwrap_or_default()
    }

    /// Split `ids` into the items we still have and the ids we don't.
    ///
    /// Suggestions are generated against a snapshot, so by the time they are
    /// acted on some of their ids may be stale.
    pub fn resolve<'a>(&self, ids: &'a [ItemId]) -> (Vec<&ClothingItem>, Vec<&'a ItemId>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for id in ids {
            match self.items.get(id) {
                Some(item) => found.push(item),
                None => missing.push(id),
            }
        }
        (found, missing)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Owned copies of all items, in order.
    pub fn to_vec(&self) -> Vec<ClothingItem> {
        self.iter().cloned().collect()
    }

    fn unindex_category(&mut self, category: &str, id: &str) {
        if let Some(ids) = self.category_index.get_mut(category) {
            ids.retain(|existing| existing != id);
            if ids.is_empty() {
                self.category_index.remove(category);
            }
        }
    }
}

fn category_key(category: &str) -> String {
    category.trim().to_lowercase()
}

impl From<Vec<ClothingItem>> for Catalog {
    fn from(items: Vec<ClothingItem>) -> Self {
        let mut catalog = Catalog::new();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }
}

impl From<Catalog> for Vec<ClothingItem> {
    fn from(mut catalog: Catalog) -> Self {
        catalog
            .order
            .iter()
            .filter_map(|id| catalog.items.remove(id))
            .collect()
    }
}

impl FromIterator<ClothingItem> for Catalog {
    fn from_iter<I: IntoIterator<Item = ClothingItem>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for item in iter {
            catalog.insert(item);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImagePayload, ItemClassification};

    fn item(id: &str, category: &str, sub_category: &str) -> ClothingItem {
        ClothingItem::with_id(
            id,
            ImagePayload::from_bytes("image/png", &[0]),
            ItemClassification {
                category: category.to_string(),
                sub_category: sub_category.to_string(),
                ..ItemClassification::unknown()
            },
        )
    }

    #[test]
    fn test_insert_preserves_order_and_replaces() {
        let mut catalog = Catalog::new();
        catalog.insert(item("a", "top", "t-shirt"));
        catalog.insert(item("b", "bottom", "jeans"));
        let previous = catalog.insert(item("a", "outerwear", "denim jacket"));

        assert_eq!(previous.unwrap().sub_category, "t-shirt");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(catalog.get("a").unwrap().sub_category, "denim jacket");
        assert!(catalog.by_category("top").is_empty());
        assert_eq!(catalog.by_category("Outerwear").len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut catalog: Catalog =
            vec![item("a", "top", "t-shirt"), item("b", "top", "polo")].into();
        assert!(catalog.remove("a").is_some());
        assert!(catalog.remove("a").is_none());
        assert_eq!(catalog.ids(), &["b".to_string()]);
        assert_eq!(catalog.by_category("top").len(), 1);
    }

    #[test]
    fn test_resolve_splits_stale_ids() {
        let catalog: Catalog = vec![item("a", "top", "t-shirt")].into();
        let ids = vec!["a".to_string(), "gone".to_string()];
        let (found, missing) = catalog.resolve(&ids);
        assert_eq!(found.len(), 1);
        assert_eq!(missing, vec![&"gone".to_string()]);
    }

    #[test]
    fn test_serializes_as_array() {
        let catalog: Catalog =
            vec![item("a", "top", "t-shirt"), item("b", "bottom", "jeans")].into();
        let json = serde_json::to_value(&catalog).unwrap();
        assert!(json.is_array());
        assert_eq!(json[1]["subCategory"], "jeans");

        let back: Catalog = serde_json::from_value(json).unwrap();
        assert_eq!(back, catalog);
    }
}
