//! AVS UCD (`.ucd`) reader.
//!
//! # Supported format
//! - ASCII UCD with a `n_nodes n_cells n_node_data n_cell_data n_model_data`
//!   header; lines starting with `#` are comments.
//! - Node lines `id x y z`.
//! - Cell lines `id material type v...` with `type` one of `quad` or `hex`
//!   (cells, for 2D and 3D meshes respectively) and `line` or `quad`
//!   (boundary faces in 2D and 3D). The material column of a boundary face is
//!   its boundary id.
//!
//! # Limitations
//! - Node and cell data sections are ignored.
//! - Simplices, prisms and pyramids are rejected.

use std::io::Read;

use hashbrown::HashMap;

use crate::io::{BoundaryFace, MeshReader, assemble_imported};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::{BoundaryId, MaterialId};

/// Position in lexicographic order of each UCD quad vertex.
pub const UCD_QUAD_TO_LEXICOGRAPHIC: [usize; 4] = [0, 1, 3, 2];
/// Position in lexicographic order of each UCD hex vertex.
pub const UCD_HEX_TO_LEXICOGRAPHIC: [usize; 8] = [0, 1, 5, 4, 2, 3, 7, 6];

/// UCD reader.
#[derive(Debug, Default, Clone)]
pub struct UcdReader;

fn parse_err(message: impl Into<String>) -> MeshError {
    MeshError::MeshIoParse(message.into())
}

fn parse_field<T: std::str::FromStr>(raw: Option<&str>, what: &str) -> Result<T, MeshError> {
    let raw = raw.ok_or_else(|| parse_err(format!("missing {what}")))?;
    raw.parse::<T>()
        .map_err(|_| parse_err(format!("invalid {what}: {raw}")))
}

/// Places `ids` (in file order) at their lexicographic positions.
pub(crate) fn reorder<T: Copy + Default>(ids: &[T], to_lexicographic: &[usize]) -> Vec<T> {
    let mut out = vec![T::default(); ids.len()];
    for (i, &id) in ids.iter().enumerate() {
        out[to_lexicographic[i]] = id;
    }
    out
}

impl MeshReader for UcdReader {
    fn read<R: Read>(&self, mut reader: R, dimension: usize) -> Result<Mesh, MeshError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let mut lines = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        let header = lines.next().ok_or_else(|| parse_err("missing UCD header"))?;
        let mut fields = header.split_whitespace();
        let n_nodes: usize = parse_field(fields.next(), "node count")?;
        let n_cells: usize = parse_field(fields.next(), "cell count")?;

        let mut node_index: HashMap<u64, usize> = HashMap::with_capacity(n_nodes);
        let mut points: Vec<Vec<f64>> = Vec::with_capacity(n_nodes);
        for _ in 0..n_nodes {
            let line = lines
                .next()
                .ok_or_else(|| parse_err("unexpected end of node list"))?;
            let mut parts = line.split_whitespace();
            let id: u64 = parse_field(parts.next(), "node id")?;
            let mut point = Vec::with_capacity(3);
            for axis in ["x", "y", "z"] {
                point.push(parse_field::<f64>(parts.next(), &format!("{axis} coordinate"))?);
            }
            point.truncate(dimension);
            if node_index.insert(id, points.len()).is_some() {
                return Err(parse_err(format!("duplicate node id {id}")));
            }
            points.push(point);
        }

        let mut cells: Vec<(Vec<usize>, MaterialId)> = Vec::new();
        let mut faces: Vec<BoundaryFace> = Vec::new();
        for _ in 0..n_cells {
            let line = lines
                .next()
                .ok_or_else(|| parse_err("unexpected end of cell list"))?;
            let mut parts = line.split_whitespace();
            let _id: u64 = parse_field(parts.next(), "cell id")?;
            let tag: u64 = parse_field(parts.next(), "cell material")?;
            let kind = parts.next().ok_or_else(|| parse_err("missing cell type"))?;
            let vertices = parts
                .map(|raw| {
                    let id: u64 = parse_field(Some(raw), "cell vertex")?;
                    node_index
                        .get(&id)
                        .copied()
                        .ok_or_else(|| parse_err(format!("cell references unknown node {id}")))
                })
                .collect::<Result<Vec<_>, _>>()?;

            match (dimension, kind, vertices.len()) {
                (2, "quad", 4) => {
                    cells.push((reorder(&vertices, &UCD_QUAD_TO_LEXICOGRAPHIC), narrow(tag)?));
                }
                (3, "hex", 8) => {
                    cells.push((reorder(&vertices, &UCD_HEX_TO_LEXICOGRAPHIC), narrow(tag)?));
                }
                (2, "line", 2) | (3, "quad", 4) => faces.push(BoundaryFace {
                    vertices,
                    boundary_id: narrow::<BoundaryId>(tag)?,
                }),
                _ => {
                    return Err(parse_err(format!(
                        "unsupported UCD entry `{kind}` with {} vertices in {dimension}D",
                        vertices.len()
                    )));
                }
            }
        }

        assemble_imported(dimension, &points, &cells, &faces)
    }
}

fn narrow<T: TryFrom<u64>>(tag: u64) -> Result<T, MeshError> {
    T::try_from(tag).map_err(|_| parse_err(format!("tag {tag} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::point::CellId;
    use approx::assert_relative_eq;

    const TWO_QUADS: &str = "\
# two quads and a tagged edge
6 3 0 0 0
1 0.0 0.0 0.0
2 1.0 0.0 0.0
3 2.0 0.0 0.0
4 0.0 1.0 0.0
5 1.0 1.0 0.0
6 2.0 1.0 0.0
1 0 quad 1 2 5 4
2 2 quad 2 3 6 5
3 7 line 3 6
";

    #[test]
    fn reads_quads_and_boundary_lines() {
        let mesh = UcdReader.read(TWO_QUADS.as_bytes(), 2).unwrap();
        assert_eq!(mesh.n_cells(), 2);
        assert_eq!(mesh.n_vertices(), 6);
        assert_eq!(mesh.cell(CellId::new(1)).material(), 2);
        assert_relative_eq!(mesh.measure(CellId::new(0)), 1.0);
        // the right edge of the second quad
        assert_eq!(mesh.boundary_id(CellId::new(1), 1), 7);
        assert_eq!(mesh.boundary_id(CellId::new(0), 0), 0);
    }

    #[test]
    fn rejects_triangles_and_dangling_nodes() {
        let tri = "3 1 0 0 0\n1 0 0 0\n2 1 0 0\n3 0 1 0\n1 0 tri 1 2 3\n";
        assert!(matches!(
            UcdReader.read(tri.as_bytes(), 2),
            Err(MeshError::MeshIoParse(_))
        ));
        let dangling = "1 1 0 0 0\n1 0 0 0\n1 0 quad 1 2 3 4\n";
        assert!(UcdReader.read(dangling.as_bytes(), 2).is_err());
    }

    #[test]
    fn hex_vertex_order_is_lexicographic() {
        let mut text = String::from("8 1 0 0 0\n");
        // UCD order: y = 0 face first, then y = 1
        let ucd = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        for (i, p) in ucd.iter().enumerate() {
            text.push_str(&format!("{} {} {} {}\n", i + 1, p[0], p[1], p[2]));
        }
        text.push_str("1 4 hex 1 2 3 4 5 6 7 8\n");
        let mesh = UcdReader.read(text.as_bytes(), 3).unwrap();
        let c = CellId::new(0);
        for (local, &v) in mesh.cell(c).vertices().iter().enumerate() {
            let p = mesh.vertex(v);
            for axis in 0..3 {
                assert_eq!(p[axis], ((local >> axis) & 1) as f64);
            }
        }
        assert_relative_eq!(mesh.measure(c), 1.0, epsilon = 1e-12);
    }
}
