//! Mesh-level acceleration correctness: the triangle mesh's internal BVH
//! must agree exactly with brute-force triangle iteration.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use lumen::geometry::{DifferentialGeometry, Geometry, TriMesh};
use lumen::linalg::{Normal, Point, Ray, Vector};

/// A soup of random small triangles scattered in a cube.
fn random_mesh(n_triangles: usize, seed: u64) -> (TriMesh, Vec<[Point; 3]>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut vertices = Vec::with_capacity(n_triangles * 3);
    let mut indices = Vec::with_capacity(n_triangles * 3);
    let mut raw = Vec::with_capacity(n_triangles);
    for i in 0..n_triangles {
        let center = Point::new(
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
        );
        let mut tri = [Point::origin(); 3];
        for v in tri.iter_mut() {
            *v = center
                + Vector::new(
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..0.5),
                );
            vertices.push(*v);
        }
        raw.push(tri);
        indices.extend([3 * i as u32, 3 * i as u32 + 1, 3 * i as u32 + 2]);
    }
    (
        TriMesh::new(vertices, Vec::new(), Vec::new(), indices),
        raw,
    )
}

/// Möller-Trumbore reference intersection, independent of the library's
/// triangle code paths.
fn brute_force_hit(tris: &[[Point; 3]], ray: &Ray) -> Option<f32> {
    let mut best: Option<f32> = None;
    for tri in tris {
        let e1 = tri[1] - tri[0];
        let e2 = tri[2] - tri[0];
        let s1 = ray.d.cross(e2);
        let denom = s1.dot(e1);
        if denom == 0.0 {
            continue;
        }
        let inv = 1.0 / denom;
        let d = ray.o - tri[0];
        let b1 = d.dot(s1) * inv;
        if !(0.0..=1.0).contains(&b1) {
            continue;
        }
        let s2 = d.cross(e1);
        let b2 = ray.d.dot(s2) * inv;
        if b2 < 0.0 || b1 + b2 > 1.0 {
            continue;
        }
        let t = e2.dot(s2) * inv;
        if t < ray.t_min || t > ray.t_max {
            continue;
        }
        best = Some(best.map_or(t, |b: f32| b.min(t)));
    }
    best
}

#[test]
fn mesh_bvh_matches_brute_force_over_random_rays() {
    let (mesh, tris) = random_mesh(500, 1234);
    assert_eq!(mesh.triangle_count(), 500);
    let mut rng = SmallRng::seed_from_u64(4321);
    let mut hits = 0;
    for _ in 0..1000 {
        let o = Point::new(
            rng.gen_range(-8.0..8.0),
            rng.gen_range(-8.0..8.0),
            rng.gen_range(-8.0..8.0),
        );
        let d = Vector::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if d.length_squared() < 1e-4 {
            continue;
        }
        let ray = Ray::new(o, d);
        let expected = brute_force_hit(&tris, &ray);
        let mut r = ray;
        let mut dg = DifferentialGeometry::default();
        let hit = mesh.intersect(&mut r, &mut dg);
        assert_eq!(hit, expected.is_some(), "hit disagreement for ray at {o}");
        if let Some(t) = expected {
            hits += 1;
            assert!(
                (r.t_max - t).abs() < 1e-4,
                "closest-hit t {} vs brute force {t}",
                r.t_max
            );
        }
    }
    assert!(hits > 50, "test scene too sparse to be meaningful ({hits} hits)");
}

#[test]
fn mesh_hits_carry_interpolated_normals() {
    // A single triangle with vertex normals tilted toward +x on one corner:
    // hits near that corner must lean toward it
    let mesh = TriMesh::new(
        vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        ],
        Vec::new(),
        vec![
            Normal::new(0.0, 0.0, 1.0),
            Normal::new(0.707, 0.0, 0.707),
            Normal::new(0.0, 0.0, 1.0),
        ],
        vec![0, 1, 2],
    );
    let mut near_a = Ray::new(Point::new(0.1, 0.1, 5.0), Vector::new(0.0, 0.0, -1.0));
    let mut dg = DifferentialGeometry::default();
    assert!(mesh.intersect(&mut near_a, &mut dg));
    let tilt_at_a = dg.normal.x;
    let mut near_b = Ray::new(Point::new(1.8, 0.1, 5.0), Vector::new(0.0, 0.0, -1.0));
    assert!(mesh.intersect(&mut near_b, &mut dg));
    assert!(
        dg.normal.x > tilt_at_a,
        "shading normal does not interpolate toward the tilted vertex"
    );
    // The geometric normal stays the face normal regardless
    assert!((dg.geom_normal.z.abs() - 1.0).abs() < 1e-5);
}
