//! Mesh geometry and triangulation
//!
//! Source faces may have any number of corners; the target engine only draws
//! triangles. [`Geometry::triangulate`] turns every polygon into triangles by
//! ear clipping in the polygon's dominant plane, falling back to a fan when
//! the polygon is too degenerate to clip.
//!
//! Geometry lives in a [`GeometryPool`] owned by the scene graph. A mesh node
//! only holds the key, and the pool releases each entry exactly once.

use serde::{Deserialize, Serialize};

use crate::foundation::collections::{GeometryKey, HandleMap};
use crate::foundation::math::Vec3;
use crate::source::PolygonMesh;

/// Logical vertex attributes mapped to shader attribute names
///
/// An empty name means the attribute is not bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VertexFormat {
    /// Attribute receiving vertex positions
    pub position: String,
    /// Attribute receiving vertex normals
    pub normal: String,
    /// Attribute receiving texture coordinates
    pub texcoord: String,
}

impl Default for VertexFormat {
    fn default() -> Self {
        Self {
            position: "a_position".to_string(),
            normal: String::new(),
            texcoord: String::new(),
        }
    }
}

/// Fully triangulated mesh data
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    face_normals: Vec<Vec3>,
}

impl Geometry {
    /// Triangulate a polygon mesh
    ///
    /// Faces with fewer than three corners are dropped. Returns an error
    /// message when a face references a vertex that does not exist.
    pub fn triangulate(mesh: &PolygonMesh) -> Result<Self, String> {
        let vertex_count = mesh.vertices.len();
        let mut triangles = Vec::with_capacity(mesh.faces.len() * 2);
        let mut face_normals = Vec::with_capacity(mesh.faces.len());

        for (face_index, face) in mesh.faces.iter().enumerate() {
            if let Some(bad) = face.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(format!(
                    "face {face_index} references vertex {bad} but the mesh has {vertex_count} vertices"
                ));
            }
            if face.len() < 3 {
                log::trace!("Dropping degenerate face {} with {} corners", face_index, face.len());
                continue;
            }

            let normal = newell_normal(&mesh.vertices, face);
            let first = triangles.len();
            triangulate_polygon(&mesh.vertices, face, &normal, &mut triangles);
            face_normals.extend(std::iter::repeat(normal).take(triangles.len() - first));
        }

        let normals = if mesh.normals.len() == vertex_count {
            mesh.normals.clone()
        } else {
            accumulate_vertex_normals(vertex_count, &triangles, &face_normals)
        };

        Ok(Self {
            positions: mesh.vertices.clone(),
            normals,
            triangles,
            face_normals,
        })
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether the mesh has nothing to draw
    pub fn is_malformed(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Triangles as vertex index triples
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Positions flattened as `x, y, z` triples in vertex order
    pub fn vertex_buffer(&self) -> Vec<f32> {
        flatten(&self.positions)
    }

    /// Vertex normals flattened as `x, y, z` triples in vertex order
    pub fn normal_buffer(&self) -> Vec<f32> {
        flatten(&self.normals)
    }

    /// One index per triangle corner
    pub fn index_buffer(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// One normal per triangle
    pub fn face_normals(&self) -> &[Vec3] {
        &self.face_normals
    }
}

fn flatten(vectors: &[Vec3]) -> Vec<f32> {
    vectors.iter().flat_map(|v| [v.x, v.y, v.z]).collect()
}

fn newell_normal(vertices: &[Vec3], face: &[u32]) -> Vec3 {
    let mut normal = Vec3::zeros();
    for (i, &index) in face.iter().enumerate() {
        let current = vertices[index as usize];
        let next = vertices[face[(i + 1) % face.len()] as usize];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
}

fn accumulate_vertex_normals(vertex_count: usize, triangles: &[[u32; 3]], face_normals: &[Vec3]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::zeros(); vertex_count];
    for (triangle, normal) in triangles.iter().zip(face_normals) {
        for &corner in triangle {
            normals[corner as usize] += normal;
        }
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros))
        .collect()
}

/// Project onto the plane most perpendicular to `normal`
///
/// The coordinate pairs are cyclic so a polygon wound counter-clockwise
/// around a positive dominant axis stays counter-clockwise in 2D.
fn project(point: &Vec3, dominant: usize) -> (f32, f32) {
    match dominant {
        0 => (point.y, point.z),
        1 => (point.z, point.x),
        _ => (point.x, point.y),
    }
}

fn cross_2d(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn point_in_triangle(p: (f32, f32), a: (f32, f32), b: (f32, f32), c: (f32, f32), winding: f32) -> bool {
    cross_2d(a, b, p) * winding > 0.0 && cross_2d(b, c, p) * winding > 0.0 && cross_2d(c, a, p) * winding > 0.0
}

fn triangulate_polygon(vertices: &[Vec3], face: &[u32], normal: &Vec3, out: &mut Vec<[u32; 3]>) {
    if face.len() == 3 {
        out.push([face[0], face[1], face[2]]);
        return;
    }

    let dominant = normal.iamax();
    let winding = normal[dominant].signum();
    if normal[dominant] == 0.0 {
        fan(face, out);
        return;
    }

    let points: Vec<(f32, f32)> = face.iter().map(|&i| project(&vertices[i as usize], dominant)).collect();
    let mut remaining: Vec<usize> = (0..face.len()).collect();

    while remaining.len() > 3 {
        let n = remaining.len();
        let ear = (0..n).map(|offset| (offset + 1) % n).find(|&i| {
            let (prev, cur, next) = (remaining[(i + n - 1) % n], remaining[i], remaining[(i + 1) % n]);
            if cross_2d(points[prev], points[cur], points[next]) * winding <= 0.0 {
                return false;
            }
            remaining
                .iter()
                .filter(|&&k| k != prev && k != cur && k != next)
                .all(|&k| !point_in_triangle(points[k], points[prev], points[cur], points[next], winding))
        });

        match ear {
            Some(i) => {
                let (prev, cur, next) = (remaining[(i + n - 1) % n], remaining[i], remaining[(i + 1) % n]);
                out.push([face[prev], face[cur], face[next]]);
                remaining.remove(i);
            }
            None => {
                // Self-intersecting or collinear leftovers
                let rest: Vec<u32> = remaining.iter().map(|&k| face[k]).collect();
                fan(&rest, out);
                return;
            }
        }
    }

    out.push([face[remaining[0]], face[remaining[1]], face[remaining[2]]]);
}

fn fan(face: &[u32], out: &mut Vec<[u32; 3]>) {
    for i in 1..face.len() - 1 {
        out.push([face[0], face[i], face[i + 1]]);
    }
}

/// Owner of every native geometry handle of one scene graph
#[derive(Debug, Default)]
pub struct GeometryPool {
    meshes: HandleMap<GeometryKey, Geometry>,
    released: usize,
}

impl GeometryPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `geometry` and hand out its key
    pub fn allocate(&mut self, geometry: Geometry) -> GeometryKey {
        self.meshes.insert(geometry)
    }

    /// Geometry behind `key`, if still live
    pub fn get(&self, key: GeometryKey) -> Option<&Geometry> {
        self.meshes.get(key)
    }

    /// Free the geometry behind `key`
    ///
    /// Returns `false` when the key was already released.
    pub fn release(&mut self, key: GeometryKey) -> bool {
        if self.meshes.remove(key).is_some() {
            self.released += 1;
            true
        } else {
            false
        }
    }

    /// Handles not yet released
    pub fn live_count(&self) -> usize {
        self.meshes.len()
    }

    /// Handles released so far
    pub const fn released_count(&self) -> usize {
        self.released
    }
}

/// Mesh payload of a node
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Key of the owned geometry in the graph's pool
    pub geometry: GeometryKey,
    /// Custom vertex shader source
    pub vertex_shader: Option<String>,
    /// Custom fragment shader source
    pub fragment_shader: Option<String>,
    /// Attribute binding of this mesh
    pub vertex_format: VertexFormat,
}

impl MeshData {
    /// Mesh using default shaders
    pub fn new(geometry: GeometryKey, vertex_format: VertexFormat) -> Self {
        Self {
            geometry,
            vertex_shader: None,
            fragment_shader: None,
            vertex_format,
        }
    }

    /// Custom shader pair, when both stages were supplied
    pub fn custom_shaders(&self) -> Option<(&str, &str)> {
        match (&self.vertex_shader, &self.fragment_shader) {
            (Some(vertex), Some(fragment)) => Some((vertex.as_str(), fragment.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_triangulates_into_two_triangles() {
        let geometry = Geometry::triangulate(&PolygonMesh::plane(2.0)).unwrap();

        assert_eq!(geometry.triangle_count(), 2);
        assert_eq!(geometry.index_buffer().len(), 6);
        assert_eq!(geometry.index_buffer(), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_cube_triangulates_into_twelve_triangles() {
        let geometry = Geometry::triangulate(&PolygonMesh::cube(2.0)).unwrap();

        assert_eq!(geometry.triangle_count(), 12);
        assert_eq!(geometry.vertex_buffer().len(), 24);
        assert!(geometry.index_buffer().iter().all(|&i| i < 8));
    }

    #[test]
    fn test_concave_polygon_is_ear_clipped() {
        // Arrow shape; a fan from vertex 0 would produce a triangle outside the polygon
        let mesh = PolygonMesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 1.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        );
        let geometry = Geometry::triangulate(&mesh).unwrap();

        assert_eq!(geometry.triangle_count(), 2);
        for triangle in geometry.triangles() {
            let [a, b, c] = triangle.map(|i| mesh.vertices[i as usize]);
            let area_z = (b - a).cross(&(c - a)).z;
            assert!(area_z > 0.0, "triangle {triangle:?} is inverted");
        }
    }

    #[test]
    fn test_clockwise_polygon_keeps_its_winding() {
        let mut mesh = PolygonMesh::plane(1.0);
        mesh.faces = vec![vec![3, 2, 1, 0]];
        let geometry = Geometry::triangulate(&mesh).unwrap();

        assert_eq!(geometry.triangle_count(), 2);
        assert!(geometry.face_normals().iter().all(|n| n.z < 0.0));
    }

    #[test]
    fn test_mesh_without_faces_is_malformed() {
        let mesh = PolygonMesh::new(vec![Vec3::zeros(), Vec3::x()], vec![vec![0, 1]]);
        let geometry = Geometry::triangulate(&mesh).unwrap();

        assert!(geometry.is_malformed());
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mesh = PolygonMesh::new(vec![Vec3::zeros()], vec![vec![0, 1, 2]]);
        assert!(Geometry::triangulate(&mesh).is_err());
    }

    #[test]
    fn test_missing_normals_are_averaged_from_faces() {
        let geometry = Geometry::triangulate(&PolygonMesh::plane(1.0)).unwrap();
        let normals = geometry.normal_buffer();

        assert_eq!(normals.len(), 12);
        for chunk in normals.chunks(3) {
            assert_eq!(chunk, &[0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_pool_releases_once() {
        let mut pool = GeometryPool::new();
        let key = pool.allocate(Geometry::triangulate(&PolygonMesh::plane(1.0)).unwrap());

        assert_eq!(pool.live_count(), 1);
        assert!(pool.release(key));
        assert!(!pool.release(key));
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.released_count(), 1);
    }
}
