//! Style registry for deduplication

use super::Style;
use ahash::{AHashMap, AHashSet};

/// Style reference held by cells, rows and columns
pub type StyleId = u32;

/// Id of the default style; always present
pub const DEFAULT_STYLE_ID: StyleId = 0;

/// Deterministic serialized name for a style id
///
/// `Default` for id 0, `s{20+id}` otherwise.
pub fn style_name(id: StyleId) -> String {
    if id == DEFAULT_STYLE_ID {
        "Default".to_string()
    } else {
        format!("s{}", 20 + id)
    }
}

/// Registry of the distinct styles used by one document
///
/// Reports stamp the same few styles onto thousands of cells; the registry
/// stores each structurally distinct style once and hands out ids.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    /// All unique styles (index 0 is default)
    styles: Vec<Style>,
    /// Reverse lookup keyed by the full style
    index_map: AHashMap<Style, StyleId>,
}

impl StyleRegistry {
    /// Create a new registry with the default style at id 0
    pub fn new() -> Self {
        let mut registry = Self {
            styles: Vec::with_capacity(32),
            index_map: AHashMap::with_capacity(32),
        };
        registry.push(Style::default());
        registry
    }

    fn push(&mut self, style: Style) -> StyleId {
        let id = self.styles.len() as StyleId;
        self.index_map.insert(style.clone(), id);
        self.styles.push(style);
        id
    }

    /// Get or create a style, returning its id
    pub fn find_or_create(&mut self, style: Style) -> StyleId {
        if let Some(&id) = self.index_map.get(&style) {
            return id;
        }
        self.push(style)
    }

    /// Look up a style without inserting it
    pub fn find(&self, style: &Style) -> Option<StyleId> {
        self.index_map.get(style).copied()
    }

    /// Get a style by id
    pub fn get(&self, id: StyleId) -> Option<&Style> {
        self.styles.get(id as usize)
    }

    /// Get a style by id, falling back to the default style
    pub fn style_or_default(&self, id: StyleId) -> &Style {
        self.styles
            .get(id as usize)
            .unwrap_or(&self.styles[DEFAULT_STYLE_ID as usize])
    }

    /// Get the default style (id 0)
    pub fn default_style(&self) -> &Style {
        &self.styles[DEFAULT_STYLE_ID as usize]
    }

    /// Get the number of styles, default included
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Check if the registry holds only the default style
    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    /// Iterate over all styles with their ids
    pub fn iter(&self) -> impl Iterator<Item = (StyleId, &Style)> {
        self.styles.iter().enumerate().map(|(i, s)| (i as StyleId, s))
    }

    /// Keep only the styles in `used` (plus the default), compacting ids
    ///
    /// Returns the old → new id map. Ids missing from the map were dropped.
    pub fn retain(&mut self, used: &AHashSet<StyleId>) -> AHashMap<StyleId, StyleId> {
        let old = std::mem::take(&mut self.styles);
        self.index_map.clear();

        let mut remap = AHashMap::with_capacity(used.len() + 1);
        for (old_id, style) in old.into_iter().enumerate() {
            let old_id = old_id as StyleId;
            if old_id == DEFAULT_STYLE_ID || used.contains(&old_id) {
                let new_id = self.push(style);
                remap.insert(old_id, new_id);
            }
        }
        remap
    }

    /// Clear all styles except default
    pub fn clear(&mut self) {
        let default = self.styles[DEFAULT_STYLE_ID as usize].clone();
        self.styles.clear();
        self.index_map.clear();
        self.push(default);
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{BorderEdge, BorderStyle, Color, FillStyle};

    #[test]
    fn test_default_style() {
        let registry = StyleRegistry::new();
        assert_eq!(registry.len(), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.get(0), Some(&Style::default()));
        assert_eq!(registry.find(&Style::default()), Some(0));
    }

    #[test]
    fn test_deduplication() {
        let mut registry = StyleRegistry::new();

        let bold = Style::new().bold(true);
        let id1 = registry.find_or_create(bold.clone());
        let id2 = registry.find_or_create(bold);
        assert_eq!(id1, id2);
        assert_eq!(registry.len(), 2);

        let filled = Style::new().fill_color(Color::YELLOW);
        let id3 = registry.find_or_create(filled);
        assert_ne!(id1, id3);
        assert_eq!(registry.len(), 3);

        let boxed = Style::new().border(BorderStyle::all(BorderEdge::thin()));
        let id4 = registry.find_or_create(boxed.clone());
        assert_eq!(registry.find(&boxed), Some(id4));
        assert_eq!(registry.get(id3).map(|s| &s.fill), Some(&FillStyle::solid(Color::YELLOW)));
    }

    #[test]
    fn test_names() {
        assert_eq!(style_name(0), "Default");
        assert_eq!(style_name(1), "s21");
        assert_eq!(style_name(7), "s27");
    }

    #[test]
    fn test_retain_compacts_and_remaps() {
        let mut registry = StyleRegistry::new();
        let a = registry.find_or_create(Style::new().bold(true));
        let b = registry.find_or_create(Style::new().italic(true));
        let c = registry.find_or_create(Style::new().font_size(14.0));

        let used: AHashSet<StyleId> = [c].into_iter().collect();
        let remap = registry.retain(&used);

        assert_eq!(registry.len(), 2);
        assert_eq!(remap.get(&0), Some(&0));
        assert_eq!(remap.get(&c), Some(&1));
        assert!(!remap.contains_key(&a));
        assert!(!remap.contains_key(&b));
        assert_eq!(registry.get(1).map(|s| s.font.size), Some(14.0));
        // reinserting a dropped style allocates a fresh id
        assert_eq!(registry.find_or_create(Style::new().bold(true)), 2);
    }
}
