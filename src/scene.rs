// Scene graph for the hero viewport

use std::sync::Arc;

use crate::asset::LoadedModel;
use crate::lights::Light;
use crate::math::{Aabb, Transform};

/// A model inserted into the scene, plus any lights parented to it.
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub model: Arc<LoadedModel>,
    /// Lights positioned in the model's local space.
    pub attached_lights: Vec<Light>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Light(Light),
    Model(ModelNode),
}

/// Represents an object within the 3D scene.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
}

impl SceneObject {
    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            kind: NodeKind::Light(light),
        }
    }

    pub fn model(name: impl Into<String>, transform: Transform, node: ModelNode) -> Self {
        Self {
            name: name.into(),
            transform,
            kind: NodeKind::Model(node),
        }
    }

    pub fn as_model(&self) -> Option<&ModelNode> {
        match &self.kind {
            NodeKind::Model(node) => Some(node),
            NodeKind::Light(_) => None,
        }
    }

    /// Bounds of a model node after its transform, `None` for lights.
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.as_model()
            .map(|node| node.model.bounds.transformed(&self.transform.matrix()))
    }
}

/// Represents the entire 3D scene.
#[derive(Debug, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
}

impl Scene {
    /// Creates a new, empty scene.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Adds an object to the scene.
    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Gets a mutable reference to an object by name.
    pub fn get_object_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|obj| obj.name == name)
    }

    /// Gets an immutable reference to an object by name.
    pub fn get_object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|obj| obj.name == name)
    }

    pub fn models(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects
            .iter()
            .filter(|obj| matches!(obj.kind, NodeKind::Model(_)))
    }

    pub fn model_count(&self) -> usize {
        self.models().count()
    }

    /// Every light in world space, including ones parented to models.
    pub fn world_lights(&self) -> Vec<Light> {
        let mut lights = Vec::new();
        for obj in &self.objects {
            match &obj.kind {
                NodeKind::Light(light) => lights.push(*light),
                NodeKind::Model(node) => {
                    let matrix = obj.transform.matrix();
                    lights.extend(node.attached_lights.iter().map(|light| match *light {
                        Light::Point {
                            color,
                            intensity,
                            position,
                            range,
                        } => Light::Point {
                            color,
                            intensity,
                            position: matrix.transform_point3(position),
                            range,
                        },
                        other => other,
                    }));
                }
            }
        }
        lights
    }
}
