use std::sync::Arc;

use crate::geometry::{DifferentialGeometry, Geometry};
use crate::light::AreaLight;
use crate::linalg::{Ray, Transform};
use crate::material::Material;

// ─── Scene graph node ───────────────────────────────────────────────────────

/// A scene-graph element: at most one geometry, material, and area light,
/// plus a transform (with its cached inverse) and child nodes. Nodes hold
/// shared handles; the underlying objects live in the scene caches.
pub struct Node {
    children: Vec<Node>,
    geometry: Option<Arc<dyn Geometry>>,
    material: Option<Arc<dyn Material>>,
    area_light: Option<Arc<AreaLight>>,
    transform: Transform,
    inv_transform: Transform,
    name: String,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("children", &self.children.len())
            .field("has_geometry", &self.geometry.is_some())
            .finish_non_exhaustive()
    }
}

impl Node {
    pub fn new(
        geometry: Option<Arc<dyn Geometry>>,
        material: Option<Arc<dyn Material>>,
        transform: Transform,
        name: impl Into<String>,
    ) -> Self {
        Self {
            children: Vec::new(),
            geometry,
            material,
            area_light: None,
            inv_transform: transform.inverse(),
            transform,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> Option<&Arc<dyn Geometry>> {
        self.geometry.as_ref()
    }

    pub fn material(&self) -> Option<&Arc<dyn Material>> {
        self.material.as_ref()
    }

    pub fn area_light(&self) -> Option<&Arc<AreaLight>> {
        self.area_light.as_ref()
    }

    pub fn set_area_light(&mut self, light: Arc<AreaLight>) {
        self.area_light = Some(light);
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Recursive world-space intersection dispatch.
    ///
    /// The incoming ray is transformed once into this node's local space and
    /// handed to the attached geometry and to every child (whose transforms
    /// are relative to this node). On a hit, the record is transformed back
    /// into the parent frame and the *parent-frame* ray's `t_max` is updated;
    /// since transforms never rescale the ray parameter, the final `t_max`
    /// measures distance along the original world-space ray.
    pub fn intersect<'a>(&'a self, ray: &mut Ray, dg: &mut DifferentialGeometry<'a>) -> bool {
        let mut node_ray = self.inv_transform.apply_ray(ray);
        let mut hit = false;
        if let Some(geom) = &self.geometry {
            if geom.intersect(&mut node_ray, dg) {
                dg.node = Some(self);
                hit = true;
            }
        }
        for child in &self.children {
            if child.intersect(&mut node_ray, dg) {
                hit = true;
            }
        }
        if hit {
            self.transform.apply_diff_geom(dg);
            ray.t_max = node_ray.t_max;
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Sphere;
    use crate::linalg::{Point, Vector};

    #[test]
    fn transformed_sphere_hit_in_world_space() {
        let mut root = Node::new(None, None, Transform::IDENTITY, "root");
        root.add_child(Node::new(
            Some(Arc::new(Sphere::new(1.0))),
            None,
            Transform::translate(Vector::new(0.0, 0.0, 10.0)),
            "ball",
        ));
        let mut ray = Ray::new(Point::origin(), Vector::new(0.0, 0.0, 1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(root.intersect(&mut ray, &mut dg));
        assert!((ray.t_max - 9.0).abs() < 1e-4);
        // The record came back in world space
        assert!((dg.point - Point::new(0.0, 0.0, 9.0)).length() < 1e-4);
        assert!((dg.normal.dot_vector(Vector::new(0.0, 0.0, -1.0)) - 1.0).abs() < 1e-4);
        assert_eq!(dg.node.unwrap().name(), "ball");
    }

    #[test]
    fn scaled_node_preserves_world_t() {
        // A sphere scaled by 3: the world hit distance must still satisfy
        // dg.point == ray.at(ray.t_max)
        let mut root = Node::new(None, None, Transform::IDENTITY, "root");
        root.add_child(Node::new(
            Some(Arc::new(Sphere::new(1.0))),
            None,
            Transform::translate(Vector::new(0.0, 0.0, 10.0)) * Transform::scale(3.0, 3.0, 3.0),
            "big",
        ));
        let mut ray = Ray::new(Point::origin(), Vector::new(0.0, 0.0, 1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(root.intersect(&mut ray, &mut dg));
        assert!((ray.t_max - 7.0).abs() < 1e-3);
        assert!((dg.point - ray.at(ray.t_max)).length() < 1e-3);
    }

    #[test]
    fn nested_transforms_compose() {
        let inner = Node::new(
            Some(Arc::new(Sphere::new(1.0))),
            None,
            Transform::translate(Vector::new(2.0, 0.0, 0.0)),
            "inner",
        );
        let mut middle = Node::new(None, None, Transform::rotate_y(90.0), "middle");
        middle.add_child(inner);
        let mut root = Node::new(None, None, Transform::IDENTITY, "root");
        root.add_child(middle);
        // rotate_y(90°) maps the child's +x offset onto the z axis; the
        // composed world position is where the ray must find it
        let world_center = Transform::rotate_y(90.0).apply_point(Point::new(2.0, 0.0, 0.0));
        let dir = (world_center - Point::origin()).normalized();
        let mut ray = Ray::new(Point::origin(), dir);
        let mut dg = DifferentialGeometry::default();
        assert!(root.intersect(&mut ray, &mut dg));
        assert!((ray.t_max - 1.0).abs() < 1e-3);
        assert!((dg.point - ray.at(ray.t_max)).length() < 1e-3);
    }

    #[test]
    fn closest_of_multiple_children_wins() {
        let mut root = Node::new(None, None, Transform::IDENTITY, "root");
        for (name, z) in [("far", 20.0f32), ("near", 5.0), ("mid", 12.0)] {
            root.add_child(Node::new(
                Some(Arc::new(Sphere::new(1.0))),
                None,
                Transform::translate(Vector::new(0.0, 0.0, z)),
                name,
            ));
        }
        let mut ray = Ray::new(Point::origin(), Vector::new(0.0, 0.0, 1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(root.intersect(&mut ray, &mut dg));
        assert!((ray.t_max - 4.0).abs() < 1e-4);
        assert_eq!(dg.node.unwrap().name(), "near");
    }
}
