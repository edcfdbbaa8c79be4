//! The in-memory closet view and the mutations applied to it.

use std::sync::Arc;

use closet_model::{
    Catalog, ClothingItem, Inspiration, InspirationId, ItemId, PreferencesPatch, UserPreferences,
};
use parking_lot::RwLock;

/// Everything the active identity has stored, mirrored in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClosetView {
    pub catalog: Catalog,
    pub inspirations: Vec<Inspiration>,
    pub preferences: UserPreferences,
}

/// The view shared between the sync layer and its subscription task.
///
/// Locks are only ever held for short, non-awaiting sections.
pub type SharedView = Arc<RwLock<ClosetView>>;

/// One optimistic change to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddItem(ClothingItem),
    RemoveItem(ItemId),
    SaveInspiration(Inspiration),
    RemoveInspiration(InspirationId),
    UpdatePreferences(PreferencesPatch),
}

impl Mutation {
    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::AddItem(_) => "add_item",
            Mutation::RemoveItem(_) => "remove_item",
            Mutation::SaveInspiration(_) => "save_inspiration",
            Mutation::RemoveInspiration(_) => "remove_inspiration",
            Mutation::UpdatePreferences(_) => "update_preferences",
        }
    }
}

impl ClosetView {
    pub fn shared(self) -> SharedView {
        Arc::new(RwLock::new(self))
    }

    /// Apply `mutation` in place.
    pub fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::AddItem(item) => {
                self.catalog.insert(item.clone());
            }
            Mutation::RemoveItem(id) => {
                self.catalog.remove(id);
            }
            Mutation::SaveInspiration(inspiration) => self.upsert_inspiration(inspiration.clone()),
            Mutation::RemoveInspiration(id) => self.inspirations.retain(|i| &i.id != id),
            Mutation::UpdatePreferences(patch) => self.preferences.merge(patch),
        }
    }

    /// Replace the inspiration with the same id, or append it.
    pub fn upsert_inspiration(&mut self, inspiration: Inspiration) {
        match self.inspirations.iter_mut().find(|i| i.id == inspiration.id) {
            Some(existing) => *existing = inspiration,
            None => self.inspirations.push(inspiration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closet_model::{Gender, ImagePayload, ItemClassification};

    fn item(id: &str) -> ClothingItem {
        ClothingItem::with_id(
            id,
            ImagePayload::from_bytes("image/png", &[1]),
            ItemClassification::unknown(),
        )
    }

    #[test]
    fn test_apply_item_mutations() {
        let mut view = ClosetView::default();
        view.apply(&Mutation::AddItem(item("a")));
        view.apply(&Mutation::AddItem(item("b")));
        view.apply(&Mutation::RemoveItem("a".to_string()));

        assert_eq!(view.catalog.ids(), &["b".to_string()]);
    }

    #[test]
    fn test_save_inspiration_twice_replaces() {
        let mut view = ClosetView::default();
        let mut inspiration = Inspiration::new("first", vec![item("a")]);
        view.apply(&Mutation::SaveInspiration(inspiration.clone()));

        inspiration.description = "edited".to_string();
        view.apply(&Mutation::SaveInspiration(inspiration.clone()));

        assert_eq!(view.inspirations.len(), 1);
        assert_eq!(view.inspirations[0].description, "edited");

        view.apply(&Mutation::RemoveInspiration(inspiration.id.clone()));
        assert!(view.inspirations.is_empty());
    }

    #[test]
    fn test_update_preferences_merges() {
        let mut view = ClosetView::default();
        view.preferences.occasions = vec!["work".to_string()];

        view.apply(&Mutation::UpdatePreferences(PreferencesPatch {
            gender: Some(Gender::Other),
            ..PreferencesPatch::default()
        }));

        assert_eq!(view.preferences.gender, Some(Gender::Other));
        assert_eq!(view.preferences.occasions, vec!["work"]);
    }
}
