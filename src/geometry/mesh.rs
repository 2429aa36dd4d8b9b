use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use super::{classify_hit_side, BBox, DifferentialGeometry, Geometry};
use crate::accel::{Bvh, SplitMethod};
use crate::linalg::{coordinate_system, Normal, Point, Ray, Vector};
use crate::monte_carlo::Distribution1D;

// ─── Mesh storage ───────────────────────────────────────────────────────────

/// The vertex arrays a mesh's triangles index into. Shared between the mesh
/// and every triangle so refinement hands out cheap references.
pub struct TriMeshData {
    pub vertices: Vec<Point>,
    pub texcoords: Vec<Point>,
    pub normals: Vec<Normal>,
    pub indices: Vec<u32>,
}

// ─── Triangle ───────────────────────────────────────────────────────────────

/// One triangle of a mesh: three vertex indices plus a handle on the shared
/// vertex data.
pub struct Triangle {
    a: u32,
    b: u32,
    c: u32,
    mesh: Arc<TriMeshData>,
}

impl Triangle {
    pub fn new(a: u32, b: u32, c: u32, mesh: Arc<TriMeshData>) -> Self {
        Self { a, b, c, mesh }
    }

    #[inline]
    fn positions(&self) -> (Point, Point, Point) {
        (
            self.mesh.vertices[self.a as usize],
            self.mesh.vertices[self.b as usize],
            self.mesh.vertices[self.c as usize],
        )
    }
}

impl Geometry for Triangle {
    /// Möller-Trumbore intersection, rejecting degenerate triangles via the
    /// zero-determinant test rather than an epsilon so valid thin triangles
    /// still hit.
    fn intersect(&self, ray: &mut Ray, dg: &mut DifferentialGeometry<'_>) -> bool {
        let (pa, pb, pc) = self.positions();
        let e1 = pb - pa;
        let e2 = pc - pa;
        let s1 = ray.d.cross(e2);
        let denom = s1.dot(e1);
        if denom == 0.0 {
            return false;
        }
        let inv = 1.0 / denom;
        let d = ray.o - pa;
        let b1 = d.dot(s1) * inv;
        if !(0.0..=1.0).contains(&b1) {
            return false;
        }
        let s2 = d.cross(e1);
        let b2 = ray.d.dot(s2) * inv;
        if b2 < 0.0 || b1 + b2 > 1.0 {
            return false;
        }
        let t = e2.dot(s2) * inv;
        if t < ray.t_min || t > ray.t_max {
            return false;
        }
        ray.t_max = t;
        dg.point = ray.at(t);
        dg.geom_normal = Normal::from(e1.cross(e2).normalized());
        let b0 = 1.0 - b1 - b2;

        // Shading normal interpolates the vertex normals when present
        dg.normal = if self.mesh.normals.is_empty() {
            dg.geom_normal
        } else {
            let (na, nb, nc) = (
                self.mesh.normals[self.a as usize],
                self.mesh.normals[self.b as usize],
                self.mesh.normals[self.c as usize],
            );
            (na * b0 + nb * b1 + nc * b2).normalized()
        };
        dg.hit_side = classify_hit_side(ray.d, dg.geom_normal);

        // Texture parameterization and its position derivatives: solve
        // dp = dp_du * du + dp_dv * dv against the uv edge deltas
        let (ta, tb, tc) = if self.mesh.texcoords.is_empty() {
            (
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(1.0, 1.0, 0.0),
            )
        } else {
            (
                self.mesh.texcoords[self.a as usize],
                self.mesh.texcoords[self.b as usize],
                self.mesh.texcoords[self.c as usize],
            )
        };
        dg.u = b0 * ta.x + b1 * tb.x + b2 * tc.x;
        dg.v = b0 * ta.y + b1 * tb.y + b2 * tc.y;
        let du1 = tb.x - ta.x;
        let dv1 = tb.y - ta.y;
        let du2 = tc.x - ta.x;
        let dv2 = tc.y - ta.y;
        let det = du1 * dv2 - dv1 * du2;
        if det == 0.0 {
            let (t1, t2) = coordinate_system(Vector::from(dg.geom_normal));
            dg.dp_du = t1;
            dg.dp_dv = t2;
        } else {
            let inv_det = 1.0 / det;
            dg.dp_du = (e1 * dv2 - e2 * dv1) * inv_det;
            dg.dp_dv = (e2 * du1 - e1 * du2) * inv_det;
        }
        // Triangles are flat; the shading normal varies only through
        // interpolation, which the integrators ignore for dn
        dg.dn_du = Normal::default();
        dg.dn_dv = Normal::default();
        true
    }

    fn object_bound(&self) -> BBox {
        let (pa, pb, pc) = self.positions();
        BBox::new(pa, pb).union_point(pc)
    }

    fn refine(self: Arc<Self>, prims: &mut Vec<Arc<dyn Geometry>>) {
        prims.push(self);
    }

    fn surface_area(&self) -> f32 {
        let (pa, pb, pc) = self.positions();
        0.5 * (pb - pa).cross(pc - pa).length()
    }

    fn sample(&self, u: [f32; 2]) -> (Point, Normal) {
        // Uniform barycentric sampling
        let su = u[0].sqrt();
        let b0 = 1.0 - su;
        let b1 = u[1] * su;
        let (pa, pb, pc) = self.positions();
        let p = Point::from(
            Vector::from(pa) * b0 + Vector::from(pb) * b1 + Vector::from(pc) * (1.0 - b0 - b1),
        );
        let n = Normal::from((pb - pa).cross(pc - pa).normalized());
        (p, n)
    }
}

// ─── TriMesh ────────────────────────────────────────────────────────────────

/// A triangle mesh with its own internal BVH, so a scene-level traversal
/// that reaches the mesh descends a second acceleration level instead of
/// testing every face.
pub struct TriMesh {
    data: Arc<TriMeshData>,
    tris: Vec<Arc<Triangle>>,
    bvh: Bvh,
    bounds: BBox,
    total_area: f32,
    area_distribution: Distribution1D,
}

impl TriMesh {
    pub fn new(
        vertices: Vec<Point>,
        texcoords: Vec<Point>,
        normals: Vec<Normal>,
        indices: Vec<u32>,
    ) -> Self {
        let mut bounds = BBox::empty();
        for v in &vertices {
            bounds = bounds.union_point(*v);
        }
        let data = Arc::new(TriMeshData {
            vertices,
            texcoords,
            normals,
            indices,
        });
        let tris: Vec<Arc<Triangle>> = data
            .indices
            .chunks_exact(3)
            .map(|idx| Arc::new(Triangle::new(idx[0], idx[1], idx[2], Arc::clone(&data))))
            .collect();
        let areas: Vec<f32> = tris.iter().map(|t| t.surface_area()).collect();
        let total_area = areas.iter().sum();
        let bvh = Bvh::new(
            tris.iter()
                .map(|t| Arc::clone(t) as Arc<dyn Geometry>)
                .collect(),
            SplitMethod::Sah,
            128,
        );
        Self {
            data,
            tris,
            bvh,
            bounds,
            total_area,
            area_distribution: Distribution1D::new(areas),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.tris.len()
    }

    pub fn data(&self) -> &TriMeshData {
        &self.data
    }
}

impl Geometry for TriMesh {
    fn intersect(&self, ray: &mut Ray, dg: &mut DifferentialGeometry<'_>) -> bool {
        self.bvh.intersect(ray, dg)
    }

    fn object_bound(&self) -> BBox {
        self.bounds
    }

    fn refine(self: Arc<Self>, prims: &mut Vec<Arc<dyn Geometry>>) {
        prims.extend(
            self.tris
                .iter()
                .map(|t| Arc::clone(t) as Arc<dyn Geometry>),
        );
    }

    fn surface_area(&self) -> f32 {
        self.total_area
    }

    fn sample(&self, u: [f32; 2]) -> (Point, Normal) {
        // Pick a triangle proportionally to its area, then sample it
        let (idx, _) = self.area_distribution.sample_discrete(u[0]);
        self.tris[idx].sample(u)
    }
}

// ─── Binary mesh I/O ────────────────────────────────────────────────────────

/// Loads a mesh from the binary `.bobj` cache format:
///
/// ```text
/// u32 n_vertices
/// u32 n_triangles
/// f32 positions[3 * n_vertices]
/// f32 texcoords[3 * n_vertices]
/// f32 normals[3 * n_vertices]
/// i32 indices[3 * n_triangles]
/// ```
///
/// Byte order is host-native; the format is a single-machine cache, not an
/// interchange format.
pub fn load_bobj(path: &Path) -> io::Result<TriMesh> {
    let mut file = File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;

    let mut cursor = 0usize;
    let read_u32 = |buf: &[u8], cursor: &mut usize| -> io::Result<u32> {
        let bytes: [u8; 4] = buf
            .get(*cursor..*cursor + 4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "truncated bobj file"))?;
        *cursor += 4;
        Ok(u32::from_ne_bytes(bytes))
    };
    let n_vertices = read_u32(&buf, &mut cursor)? as usize;
    let n_triangles = read_u32(&buf, &mut cursor)? as usize;

    let expected = 8 + 4 * (9 * n_vertices + 3 * n_triangles);
    if buf.len() < expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("bobj file holds {} bytes, header requires {expected}", buf.len()),
        ));
    }

    let read_f32_triples = |n: usize, cursor: &mut usize| -> Vec<[f32; 3]> {
        (0..n)
            .map(|_| {
                let mut t = [0.0f32; 3];
                for v in t.iter_mut() {
                    *v = f32::from_ne_bytes(buf[*cursor..*cursor + 4].try_into().unwrap());
                    *cursor += 4;
                }
                t
            })
            .collect()
    };
    let vertices: Vec<Point> = read_f32_triples(n_vertices, &mut cursor)
        .into_iter()
        .map(|t| Point::new(t[0], t[1], t[2]))
        .collect();
    let texcoords: Vec<Point> = read_f32_triples(n_vertices, &mut cursor)
        .into_iter()
        .map(|t| Point::new(t[0], t[1], t[2]))
        .collect();
    let normals: Vec<Normal> = read_f32_triples(n_vertices, &mut cursor)
        .into_iter()
        .map(|t| Normal::new(t[0], t[1], t[2]))
        .collect();
    let indices: Vec<u32> = (0..3 * n_triangles)
        .map(|_| {
            let v = i32::from_ne_bytes(buf[cursor..cursor + 4].try_into().unwrap());
            cursor += 4;
            v as u32
        })
        .collect();

    Ok(TriMesh::new(vertices, texcoords, normals, indices))
}

/// Writes the `.bobj` binary cache for a mesh; the mesh preprocessor's core.
pub fn save_bobj(path: &Path, mesh: &TriMesh) -> io::Result<()> {
    let data = mesh.data();
    let mut file = io::BufWriter::new(File::create(path)?);
    file.write_all(&(data.vertices.len() as u32).to_ne_bytes())?;
    file.write_all(&((data.indices.len() / 3) as u32).to_ne_bytes())?;
    for p in &data.vertices {
        for i in 0..3 {
            file.write_all(&p[i].to_ne_bytes())?;
        }
    }
    for i in 0..data.vertices.len() {
        let t = data.texcoords.get(i).copied().unwrap_or(Point::origin());
        for k in 0..3 {
            file.write_all(&t[k].to_ne_bytes())?;
        }
    }
    for i in 0..data.vertices.len() {
        let n = data.normals.get(i).copied().unwrap_or(Normal::new(0.0, 0.0, 1.0));
        for k in 0..3 {
            file.write_all(&n[k].to_ne_bytes())?;
        }
    }
    for idx in &data.indices {
        file.write_all(&(*idx as i32).to_ne_bytes())?;
    }
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> TriMesh {
        // Two triangles forming the unit square in the z = 0 plane
        TriMesh::new(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(1.0, 1.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(1.0, 1.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            vec![
                Normal::new(0.0, 0.0, 1.0),
                Normal::new(0.0, 0.0, 1.0),
                Normal::new(0.0, 0.0, 1.0),
                Normal::new(0.0, 0.0, 1.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn triangle_barycentric_hit() {
        let mesh = quad_mesh();
        let mut ray = Ray::new(Point::new(0.25, 0.25, 5.0), Vector::new(0.0, 0.0, -1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(mesh.intersect(&mut ray, &mut dg));
        assert!((ray.t_max - 5.0).abs() < 1e-4);
        assert!((dg.u - 0.25).abs() < 1e-4);
        assert!((dg.v - 0.25).abs() < 1e-4);
        assert!((dg.normal.z.abs() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn edge_and_outside_rejection() {
        let mesh = quad_mesh();
        let mut dg = DifferentialGeometry::default();
        let mut outside = Ray::new(Point::new(1.5, 0.5, 5.0), Vector::new(0.0, 0.0, -1.0));
        assert!(!mesh.intersect(&mut outside, &mut dg));
        // A ray in the plane of the mesh has zero determinant
        let mut parallel = Ray::new(Point::new(-1.0, 0.5, 0.0), Vector::new(1.0, 0.0, 0.0));
        assert!(!mesh.intersect(&mut parallel, &mut dg));
    }

    #[test]
    fn mesh_area_and_sampling() {
        let mesh = quad_mesh();
        assert!((mesh.surface_area() - 1.0).abs() < 1e-5);
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..50 {
            let (p, n) = mesh.sample([rng.gen(), rng.gen()]);
            assert!(p.z.abs() < 1e-6);
            assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y));
            assert!((n.z.abs() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn bobj_round_trip() {
        let mesh = quad_mesh();
        let dir = std::env::temp_dir();
        let path = dir.join("lumen_test_round_trip.bobj");
        save_bobj(&path, &mesh).unwrap();
        let loaded = load_bobj(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.triangle_count(), 2);
        assert_eq!(loaded.data().vertices, mesh.data().vertices);
        assert_eq!(loaded.data().indices, mesh.data().indices);
        let mut ray = Ray::new(Point::new(0.5, 0.5, 3.0), Vector::new(0.0, 0.0, -1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(loaded.intersect(&mut ray, &mut dg));
    }
}
