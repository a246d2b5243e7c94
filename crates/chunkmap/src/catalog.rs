use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::animation::{Animation, Keyframe};
use crate::error::TileMapError;
use crate::TileId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Null, zero, `false` and empty text, lists or maps are falsy; everything
    /// else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Integer(value) => *value != 0,
            Self::Float(value) => *value != 0.0,
            Self::Text(value) => !value.is_empty(),
            Self::List(values) => !values.is_empty(),
            Self::Map(values) => !values.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<String, PropertyValue>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.0.insert(name.into(), value);
    }

    /// Absent properties count as false.
    pub fn is_truthy(&self, name: &str) -> bool {
        self.get(name).is_some_and(PropertyValue::is_truthy)
    }

    pub fn all_truthy<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|name| self.is_truthy(name.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One entry of a tile-properties document: free-form properties plus an
/// optional `"animation"` keyframe list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Vec<Keyframe>>,
    #[serde(flatten)]
    pub properties: PropertyBag,
}

/// Static per-tile-id properties and the shared animation table.
#[derive(Debug, Clone, Default)]
pub struct TileCatalog {
    properties: HashMap<TileId, PropertyBag>,
    animations: BTreeMap<TileId, Animation>,
    empty: PropertyBag,
}

impl TileCatalog {
    pub fn new(
        definitions: impl IntoIterator<Item = (TileId, TileDefinition)>,
    ) -> Result<Self, TileMapError> {
        let mut properties = HashMap::new();
        let mut animations = BTreeMap::new();
        for (tile_id, definition) in definitions {
            if let Some(keyframes) = definition.animation {
                animations.insert(tile_id, Animation::new(tile_id, keyframes)?);
            }
            properties.insert(tile_id, definition.properties);
        }
        Ok(Self {
            properties,
            animations,
            empty: PropertyBag::new(),
        })
    }

    /// Unknown ids resolve to an empty bag.
    pub fn properties_of(&self, tile_id: TileId) -> &PropertyBag {
        self.properties.get(&tile_id).unwrap_or(&self.empty)
    }

    pub fn contains(&self, tile_id: TileId) -> bool {
        self.properties.contains_key(&tile_id)
    }

    pub fn animation_of(&self, tile_id: TileId) -> Option<&Animation> {
        self.animations.get(&tile_id)
    }

    pub fn is_animated(&self, tile_id: TileId) -> bool {
        self.animations.contains_key(&tile_id)
    }

    pub fn has_animations(&self) -> bool {
        !self.animations.is_empty()
    }

    pub fn animated_tile_ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.animations.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Advances every animation by one tick and returns the ids whose
    /// keyframe changed.
    pub fn advance_animations(&mut self) -> Vec<TileId> {
        self.animations
            .values_mut()
            .filter_map(|animation| animation.advance().then_some(animation.tile_id()))
            .collect()
    }

    /// Replaces every definition. Animations surviving the reload are reset
    /// in place; new ones start at frame 0. On error nothing changes.
    pub fn reload(
        &mut self,
        definitions: impl IntoIterator<Item = (TileId, TileDefinition)>,
    ) -> Result<(), TileMapError> {
        let mut properties = HashMap::new();
        let mut animations = BTreeMap::new();
        for (tile_id, definition) in definitions {
            if let Some(keyframes) = definition.animation {
                let animation = match self.animations.get(&tile_id) {
                    Some(existing) => {
                        let mut animation = existing.clone();
                        animation.reset(keyframes)?;
                        animation
                    }
                    None => Animation::new(tile_id, keyframes)?,
                };
                animations.insert(tile_id, animation);
            }
            properties.insert(tile_id, definition.properties);
        }
        self.properties = properties;
        self.animations = animations;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureRef;
    use serde_json::json;

    fn definitions(value: serde_json::Value) -> Vec<(TileId, TileDefinition)> {
        let raw: BTreeMap<String, TileDefinition> =
            serde_json::from_value(value).expect("definitions");
        raw.into_iter()
            .map(|(key, def)| (key.parse::<TileId>().expect("tile id"), def))
            .collect()
    }

    #[test]
    fn truthiness_follows_value_kind() {
        assert!(PropertyValue::Bool(true).is_truthy());
        assert!(!PropertyValue::Integer(0).is_truthy());
        assert!(PropertyValue::Float(0.5).is_truthy());
        assert!(!PropertyValue::Text(String::new()).is_truthy());
        assert!(PropertyValue::Text("yes".to_string()).is_truthy());
        assert!(!PropertyValue::Null.is_truthy());
        assert!(!PropertyValue::List(Vec::new()).is_truthy());
        assert!(PropertyValue::List(vec![PropertyValue::Null]).is_truthy());
        assert!(!PropertyValue::Map(BTreeMap::new()).is_truthy());
    }

    #[test]
    fn null_list_and_map_values_load_alongside_flags() {
        let catalog = TileCatalog::new(definitions(json!({
            "0": {
                "solid": true,
                "note": null,
                "tags": ["lava", "hot"],
                "drops": [],
                "meta": {"author": "ana", "rev": 2},
                "extra": {},
            },
        })))
        .expect("catalog");
        let bag = catalog.properties_of(0);
        assert_eq!(bag.len(), 6);
        assert!(bag.all_truthy(&["solid", "tags", "meta"]));
        for falsy in ["note", "drops", "extra"] {
            assert!(!bag.is_truthy(falsy), "property={falsy}");
        }
        assert_eq!(
            bag.get("tags"),
            Some(&PropertyValue::List(vec![
                PropertyValue::Text("lava".to_string()),
                PropertyValue::Text("hot".to_string()),
            ]))
        );
    }

    #[test]
    fn definition_splits_animation_from_properties() {
        let definition: TileDefinition = serde_json::from_value(json!({
            "solid": true,
            "damage": 3,
            "animation": [{"frames": 4, "texture": 7}, {"frames": 2, "texture": "lava_b"}],
        }))
        .expect("definition");
        let keyframes = definition.animation.expect("animation");
        assert_eq!(keyframes.len(), 2);
        assert_eq!(keyframes[1].texture, TextureRef::Name("lava_b".to_string()));
        assert_eq!(definition.properties.len(), 2);
        assert_eq!(
            definition.properties.get("damage"),
            Some(&PropertyValue::Integer(3))
        );
    }

    #[test]
    fn unknown_tiles_and_properties_are_absent_not_errors() {
        let catalog = TileCatalog::new(definitions(json!({"0": {"solid": true}}))).expect("catalog");
        assert!(catalog.properties_of(42).is_empty());
        assert!(!catalog.properties_of(0).is_truthy("ladder"));
        assert!(catalog.properties_of(0).all_truthy(&["solid"]));
        assert!(catalog.animation_of(0).is_none());
    }

    #[test]
    fn empty_animation_fails_catalog_construction() {
        let error = TileCatalog::new(definitions(json!({"3": {"animation": []}})))
            .expect_err("empty animation");
        assert!(matches!(
            error,
            TileMapError::InvalidAnimationSpec { tile_id: 3, .. }
        ));
    }

    #[test]
    fn advance_reports_changed_tile_ids() {
        let mut catalog = TileCatalog::new(definitions(json!({
            "1": {"animation": [{"frames": 1, "texture": 1}, {"frames": 1, "texture": 2}]},
            "2": {"animation": [{"frames": 2, "texture": 2}, {"frames": 2, "texture": 3}]},
        })))
        .expect("catalog");
        assert_eq!(catalog.advance_animations(), vec![1]);
        assert_eq!(catalog.advance_animations(), vec![1, 2]);
        assert_eq!(
            catalog.animation_of(2).expect("anim").current_texture_ref(),
            &TextureRef::Id(3)
        );
    }

    #[test]
    fn reload_resets_animations_and_replaces_properties() {
        let mut catalog = TileCatalog::new(definitions(json!({
            "1": {"solid": true, "animation": [{"frames": 1, "texture": 1}, {"frames": 1, "texture": 2}]},
        })))
        .expect("catalog");
        catalog.advance_animations();
        catalog
            .reload(definitions(json!({
                "1": {"animation": [{"frames": 3, "texture": 5}, {"frames": 1, "texture": 6}]},
                "4": {"ladder": true},
            })))
            .expect("reload");
        let animation = catalog.animation_of(1).expect("anim");
        assert_eq!(animation.keyframe_index(), 0);
        assert_eq!(animation.current_texture_ref(), &TextureRef::Id(5));
        assert!(!catalog.properties_of(1).is_truthy("solid"));
        assert!(catalog.properties_of(4).is_truthy("ladder"));
    }

    #[test]
    fn failed_reload_leaves_catalog_untouched() {
        let mut catalog =
            TileCatalog::new(definitions(json!({"1": {"solid": true}}))).expect("catalog");
        assert!(catalog
            .reload(definitions(json!({"2": {"animation": []}})))
            .is_err());
        assert!(catalog.properties_of(1).is_truthy("solid"));
        assert!(!catalog.contains(2));
    }
}
