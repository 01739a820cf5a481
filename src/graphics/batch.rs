//! Draw batches
//!
//! A batch owns the drawables of one render layer. Drawables are created
//! inside a batch and stay there; widgets keep the returned id.

use super::model::Model;
use super::sprite::Sprite;

/// Handle to a drawable within its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawableId(usize);

impl DrawableId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Anything a batch can draw
#[derive(Debug, Clone)]
pub enum Drawable {
    Sprite(Sprite),
    Model(Model),
}

/// Ordered collection of drawables, drawn in insertion order
#[derive(Debug, Clone, Default)]
pub struct Batch {
    items: Vec<Drawable>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sprite(&mut self, sprite: Sprite) -> DrawableId {
        self.push(Drawable::Sprite(sprite))
    }

    pub fn add_model(&mut self, model: Model) -> DrawableId {
        self.push(Drawable::Model(model))
    }

    fn push(&mut self, drawable: Drawable) -> DrawableId {
        self.items.push(drawable);
        DrawableId(self.items.len() - 1)
    }

    pub fn get(&self, id: DrawableId) -> Option<&Drawable> {
        self.items.get(id.0)
    }

    pub fn sprite(&self, id: DrawableId) -> Option<&Sprite> {
        match self.items.get(id.0) {
            Some(Drawable::Sprite(sprite)) => Some(sprite),
            _ => None,
        }
    }

    pub fn sprite_mut(&mut self, id: DrawableId) -> Option<&mut Sprite> {
        match self.items.get_mut(id.0) {
            Some(Drawable::Sprite(sprite)) => Some(sprite),
            _ => None,
        }
    }

    pub fn model(&self, id: DrawableId) -> Option<&Model> {
        match self.items.get(id.0) {
            Some(Drawable::Model(model)) => Some(model),
            _ => None,
        }
    }

    pub fn model_mut(&mut self, id: DrawableId) -> Option<&mut Model> {
        match self.items.get_mut(id.0) {
            Some(Drawable::Model(model)) => Some(model),
            _ => None,
        }
    }

    /// Drawables with their ids, in draw order
    pub fn iter(&self) -> impl Iterator<Item = (DrawableId, &Drawable)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, drawable)| (DrawableId(index), drawable))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::model::Mesh;
    use crate::pipeline::VideoFrame;
    use std::sync::Arc;

    #[test]
    fn test_typed_lookup() {
        let mut batch = Batch::new();
        let frame = Arc::new(VideoFrame::new(vec![0; 12], 2, 2).unwrap());
        let sprite = batch.add_sprite(Sprite::new(0.0, 0.0, frame));
        let model = batch.add_model(Model::new(Arc::new(Mesh::waypoint_marker(1.0, 1.0))));

        assert_eq!(batch.len(), 2);
        assert!(batch.sprite(sprite).is_some());
        assert!(batch.model(sprite).is_none());
        assert!(batch.model_mut(model).is_some());
        assert!(batch.sprite_mut(model).is_none());

        let ids: Vec<_> = batch.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![sprite, model]);
    }
}
