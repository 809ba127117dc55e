//! Indexed triangle meshes with their own BVH.
//!
//! A mesh is a single scene object: the scene BVH sees one box, and the
//! mesh's internal BVH narrows a ray down to candidate triangles.

use std::path::Path;

use crate::scene::{SceneError, SceneResult};
use crate::triangle::{intersect_triangle, triangle_bbox};
use crate::{Bvh, Hitpoint, Hittable, Ray};
use lumen_math::{Aabb, DVec2, DVec3};

/// How normals are reported at a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shading {
    /// One normal per triangle
    #[default]
    Flat,
    /// Averaged vertex normals interpolated with barycentrics
    Smooth,
}

/// An indexed triangle mesh.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    vertices: Vec<DVec3>,
    triangles: Vec<[usize; 3]>,
    uvs: Option<Vec<DVec2>>,
    shading: Shading,
    face_normals: Vec<DVec3>,
    /// Empty for flat shading
    vertex_normals: Vec<DVec3>,
    triangle_bboxes: Vec<Aabb>,
    bbox: Aabb,
    bvh: Bvh,
}

impl TriangleMesh {
    /// Build a mesh and its BVH.
    ///
    /// Fails if there are no triangles or an index is out of range.
    pub fn new(
        vertices: Vec<DVec3>,
        triangles: Vec<[usize; 3]>,
        shading: Shading,
    ) -> SceneResult<Self> {
        if triangles.is_empty() {
            return Err(SceneError::EmptyMesh);
        }
        if let Some(&index) = triangles.iter().flatten().find(|&&i| i >= vertices.len()) {
            return Err(SceneError::InvalidIndex {
                index,
                vertex_count: vertices.len(),
            });
        }

        let mut mesh = Self {
            vertices,
            triangles,
            uvs: None,
            shading,
            face_normals: Vec::new(),
            vertex_normals: Vec::new(),
            triangle_bboxes: Vec::new(),
            bbox: Aabb::EMPTY,
            bvh: Bvh::new(),
        };
        mesh.compute_normals();
        mesh.compute_bboxes();
        mesh.construct();
        Ok(mesh)
    }

    /// Attach per-vertex texture coordinates. Ignored unless one per vertex.
    pub fn with_uvs(mut self, uvs: Vec<DVec2>) -> Self {
        if uvs.len() == self.vertices.len() {
            self.uvs = Some(uvs);
        } else {
            log::warn!(
                "Ignoring {} texture coordinates for a mesh with {} vertices",
                uvs.len(),
                self.vertices.len()
            );
        }
        self
    }

    /// Load every model of an OBJ file as a separate mesh (triangulated).
    pub fn from_obj(path: impl AsRef<Path>, shading: Shading) -> SceneResult<Vec<TriangleMesh>> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )?;

        let mut meshes = Vec::with_capacity(models.len());
        for model in &models {
            let mesh = &model.mesh;
            if mesh.indices.is_empty() {
                log::warn!("Skipping model '{}' without faces", model.name);
                continue;
            }

            let vertices = mesh
                .positions
                .chunks_exact(3)
                .map(|p| DVec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2])))
                .collect();
            let triangles = mesh
                .indices
                .chunks_exact(3)
                .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
                .collect();

            let mut triangle_mesh = TriangleMesh::new(vertices, triangles, shading)?;
            if !mesh.texcoords.is_empty() {
                let uvs = mesh
                    .texcoords
                    .chunks_exact(2)
                    .map(|t| DVec2::new(f64::from(t[0]), f64::from(t[1])))
                    .collect();
                triangle_mesh = triangle_mesh.with_uvs(uvs);
            }

            log::debug!(
                "Loaded model '{}': {} triangles, {} vertices",
                model.name,
                triangle_mesh.triangle_count(),
                triangle_mesh.vertex_count()
            );
            meshes.push(triangle_mesh);
        }

        if meshes.is_empty() {
            return Err(SceneError::EmptyMesh);
        }

        log::info!("Loaded {} meshes from {}", meshes.len(), path.display());
        Ok(meshes)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn shading(&self) -> Shading {
        self.shading
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    fn corners(&self, triangle: usize) -> (DVec3, DVec3, DVec3) {
        let [i0, i1, i2] = self.triangles[triangle];
        (self.vertices[i0], self.vertices[i1], self.vertices[i2])
    }

    fn compute_normals(&mut self) {
        self.face_normals = (0..self.triangles.len())
            .map(|i| {
                let (v0, v1, v2) = self.corners(i);
                (v1 - v0).cross(v2 - v0).normalize_or_zero()
            })
            .collect();

        self.vertex_normals.clear();
        if self.shading == Shading::Smooth {
            let mut normals = vec![DVec3::ZERO; self.vertices.len()];
            for (tri, face) in self.triangles.iter().zip(&self.face_normals) {
                for &i in tri {
                    normals[i] += *face;
                }
            }
            for normal in &mut normals {
                // Default up normal for vertices only touched by degenerate faces
                *normal = normal.try_normalize().unwrap_or(DVec3::Y);
            }
            self.vertex_normals = normals;
        }
    }

    fn compute_bboxes(&mut self) {
        self.triangle_bboxes = (0..self.triangles.len())
            .map(|i| {
                let (v0, v1, v2) = self.corners(i);
                triangle_bbox(v0, v1, v2)
            })
            .collect();
        self.bbox = self
            .triangle_bboxes
            .iter()
            .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, b));
    }

    fn construct(&mut self) {
        let items: Vec<(usize, Aabb)> = self.triangle_bboxes.iter().copied().enumerate().collect();
        self.bvh.construct(&items);
    }

    fn shading_normal(&self, triangle: usize, beta: f64, gamma: f64) -> DVec3 {
        match self.shading {
            Shading::Flat => self.face_normals[triangle],
            Shading::Smooth => {
                let [i0, i1, i2] = self.triangles[triangle];
                let n = self.vertex_normals[i0] * (1.0 - beta - gamma)
                    + self.vertex_normals[i1] * beta
                    + self.vertex_normals[i2] * gamma;
                n.try_normalize().unwrap_or(self.face_normals[triangle])
            }
        }
    }

    fn surface_uv(&self, triangle: usize, beta: f64, gamma: f64) -> (f64, f64) {
        match &self.uvs {
            Some(uvs) => {
                let [i0, i1, i2] = self.triangles[triangle];
                let uv = uvs[i0] * (1.0 - beta - gamma) + uvs[i1] * beta + uvs[i2] * gamma;
                (uv.x, uv.y)
            }
            None => (beta, gamma),
        }
    }

    /// Uniformly scale about the origin. Vertices, boxes and BVH nodes move together.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.vertices {
            *v *= factor;
        }
        for b in &mut self.triangle_bboxes {
            *b = b.scale(factor);
        }
        self.bbox = self.bbox.scale(factor);
        self.bvh.scale(factor);
        if factor < 0.0 {
            // Point reflection keeps the winding but turns the surface inside out
            for n in self.face_normals.iter_mut().chain(&mut self.vertex_normals) {
                *n = -*n;
            }
        }
    }

    /// Move the mesh by `offset`. Vertices, boxes and BVH nodes move together.
    pub fn translate(&mut self, offset: DVec3) {
        for v in &mut self.vertices {
            *v += offset;
        }
        for b in &mut self.triangle_bboxes {
            *b = b.translate(offset);
        }
        self.bbox = self.bbox.translate(offset);
        self.bvh.translate(offset);
    }

    /// Scale to `width` along x, then rest the mesh on y = 0 centered on the y axis.
    pub fn fit_to_width(&mut self, width: f64) {
        let extent = self.bbox.extent().x;
        if extent > 0.0 {
            self.scale(width / extent);
        }
        let center = self.bbox.center();
        self.translate(DVec3::new(-center.x, -self.bbox.min().y, -center.z));
    }
}

impl Hittable for TriangleMesh {
    fn hit(&self, ray: &Ray) -> Option<Hitpoint> {
        let mut nearest: Option<(f64, usize, f64, f64)> = None;

        self.bvh.for_each_candidate(ray, |triangle| {
            let (v0, v1, v2) = self.corners(triangle);
            if let Some((t, beta, gamma)) = intersect_triangle(ray, v0, v1, v2) {
                if nearest.map_or(true, |(best, ..)| t < best) {
                    nearest = Some((t, triangle, beta, gamma));
                }
            }
        });

        let (t, triangle, beta, gamma) = nearest?;
        let (u, v) = self.surface_uv(triangle, beta, gamma);
        Some(Hitpoint::at(ray, t, self.shading_normal(triangle, beta, gamma)).with_uv(u, v))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Unit square in the XZ plane at y = 0, two triangles facing +Y.
    fn quad(shading: Shading) -> TriangleMesh {
        TriangleMesh::new(
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(0.0, 0.0, 1.0),
                DVec3::new(1.0, 0.0, 1.0),
                DVec3::new(1.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            shading,
        )
        .expect("valid mesh")
    }

    /// Grid of `n` x `n` quads, enough triangles for a multi-level BVH.
    fn grid(n: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for z in 0..=n {
            for x in 0..=n {
                vertices.push(DVec3::new(x as f64, 0.0, z as f64));
            }
        }
        let row = n + 1;
        let mut triangles = Vec::new();
        for z in 0..n {
            for x in 0..n {
                let i = z * row + x;
                triangles.push([i, i + row, i + row + 1]);
                triangles.push([i, i + row + 1, i + 1]);
            }
        }
        TriangleMesh::new(vertices, triangles, Shading::Flat).expect("valid grid")
    }

    #[test]
    fn test_mesh_rejects_bad_input() {
        assert!(matches!(
            TriangleMesh::new(vec![DVec3::ZERO], vec![], Shading::Flat),
            Err(SceneError::EmptyMesh)
        ));
        assert!(matches!(
            TriangleMesh::new(vec![DVec3::ZERO; 3], vec![[0, 1, 3]], Shading::Flat),
            Err(SceneError::InvalidIndex { index: 3, vertex_count: 3 })
        ));
    }

    #[test]
    fn test_mesh_hit_flat() {
        let mesh = quad(Shading::Flat);
        let ray = Ray::new(DVec3::new(0.25, 2.0, 0.75), -DVec3::Y);

        let hit = mesh.hit(&ray).expect("should hit");
        assert!((hit.distance - 2.0).abs() < 1e-9);
        assert!((hit.normal - DVec3::Y).length() < 1e-9);

        let ray = Ray::new(DVec3::new(2.0, 2.0, 0.5), -DVec3::Y);
        assert!(mesh.hit(&ray).is_none());
    }

    #[test]
    fn test_mesh_smooth_normals() {
        // Tent: two faces meeting at a ridge along z
        let mesh = TriangleMesh::new(
            vec![
                DVec3::new(-1.0, 0.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
                DVec3::new(0.0, 1.0, 1.0),
                DVec3::new(1.0, 0.0, 0.0),
            ],
            vec![[0, 2, 1], [3, 1, 2]],
            Shading::Smooth,
        )
        .expect("valid mesh");

        // Near the ridge the interpolated normal points almost straight up
        let ray = Ray::new(DVec3::new(-0.01, 5.0, 0.5), -DVec3::Y);
        let hit = mesh.hit(&ray).expect("should hit");
        assert!(hit.normal.y > 0.95, "normal {:?}", hit.normal);

        let flat = TriangleMesh::new(
            mesh.vertices.clone(),
            mesh.triangles.clone(),
            Shading::Flat,
        )
        .expect("valid mesh");
        let hit = flat.hit(&ray).expect("should hit");
        assert!(hit.normal.y < 0.8);
    }

    #[test]
    fn test_mesh_nearest_of_overlapping() {
        let mut mesh_vertices = quad(Shading::Flat).vertices;
        let lifted: Vec<DVec3> = mesh_vertices.iter().map(|v| *v + DVec3::Y).collect();
        mesh_vertices.extend(lifted);
        let mesh = TriangleMesh::new(
            mesh_vertices,
            vec![[0, 1, 2], [0, 2, 3], [4, 5, 6], [4, 6, 7]],
            Shading::Flat,
        )
        .expect("valid mesh");

        let ray = Ray::new(DVec3::new(0.5, 5.0, 0.5), -DVec3::Y);
        let hit = mesh.hit(&ray).expect("should hit");
        assert!((hit.position.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mesh_transform_moves_bvh() {
        let mut mesh = grid(8);
        assert!(mesh.bvh().node_count() > 1);

        mesh.scale(2.0);
        mesh.translate(DVec3::new(100.0, 3.0, 0.0));

        // Every cell center of the moved grid is found through the BVH
        for z in 0..8 {
            for x in 0..8 {
                let target = DVec3::new(100.0 + 2.0 * x as f64 + 1.0, 3.0, 2.0 * z as f64 + 0.7);
                let ray = Ray::new(target + DVec3::Y * 4.0, -DVec3::Y);
                let hit = mesh.hit(&ray).expect("moved grid should be hit");
                assert!((hit.distance - 4.0).abs() < 1e-9);
            }
        }

        // Nothing left at the old place
        let ray = Ray::new(DVec3::new(0.5, 4.0, 0.5), -DVec3::Y);
        assert!(mesh.hit(&ray).is_none());
        assert!((mesh.bounding_box().min().x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_negative_scale_keeps_normals_outward() {
        for shading in [Shading::Flat, Shading::Smooth] {
            // Facing +Y, away from the origin
            let mut mesh = quad(shading);
            mesh.translate(DVec3::Y);
            mesh.scale(-1.0);

            // Now at y = -1 and should face -Y, still away from the origin
            let ray = Ray::new(DVec3::new(-0.5, -5.0, -0.3), DVec3::Y);
            let hit = mesh.hit(&ray).expect("reflected quad should be hit");
            assert!((hit.distance - 4.0).abs() < 1e-9);
            assert!((hit.normal + DVec3::Y).length() < 1e-9, "{shading:?}: {:?}", hit.normal);
        }
    }

    #[test]
    fn test_fit_to_width() {
        let mut mesh = grid(4);
        mesh.translate(DVec3::new(10.0, -7.0, 3.0));
        mesh.fit_to_width(2.0);

        let bbox = mesh.bounding_box();
        assert!((bbox.extent().x - 2.0).abs() < 1e-3);
        assert!(bbox.min().y.abs() < 1e-12);
        assert!(bbox.center().x.abs() < 1e-9);
        assert!(bbox.center().z.abs() < 1e-9);
    }

    #[test]
    fn test_mesh_uvs() {
        let mesh = quad(Shading::Flat).with_uvs(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 0.0),
        ]);
        let ray = Ray::new(DVec3::new(0.9, 1.0, 0.1), -DVec3::Y);
        let hit = mesh.hit(&ray).expect("should hit");
        assert!((hit.u - 0.9).abs() < 1e-9);
        assert!((hit.v - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_from_obj() {
        let mut file = tempfile::Builder::new()
            .suffix(".obj")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "o square\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n"
        )
        .expect("write obj");

        let meshes = TriangleMesh::from_obj(file.path(), Shading::Smooth).expect("load obj");
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].triangle_count(), 2);
        assert_eq!(meshes[0].vertex_count(), 4);

        let ray = Ray::new(DVec3::new(0.5, 0.5, 3.0), -DVec3::Z);
        let hit = meshes[0].hit(&ray).expect("should hit the square");
        assert!((hit.distance - 3.0).abs() < 1e-6);

        assert!(matches!(
            TriangleMesh::from_obj("/nonexistent/model.obj", Shading::Flat),
            Err(SceneError::Obj(_))
        ));
    }
}
