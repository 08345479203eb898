//! Abaqus input (`.inp`) reader for the subset used by stack meshes.
//!
//! Reads `*NODE` blocks (`id, x, y[, z]`) and `*ELEMENT` blocks
//! (`id, n1, n2, ...`). An `ELSET=Material<k>` parameter on the element
//! keyword line tags the block's cells with material `k`; without it the
//! material is 0. Element lines ending in a comma continue on the next line.
//! Every other keyword block is skipped.

use std::io::Read;

use hashbrown::HashMap;

use crate::io::ucd::reorder;
use crate::io::{MeshReader, assemble_imported};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::MaterialId;

/// Abaqus quads and hexes list a bottom ring counter-clockwise, then the top.
const ABAQUS_QUAD_TO_LEXICOGRAPHIC: [usize; 4] = [0, 1, 3, 2];
const ABAQUS_HEX_TO_LEXICOGRAPHIC: [usize; 8] = [0, 1, 3, 2, 4, 5, 7, 6];

/// Abaqus reader.
#[derive(Debug, Default, Clone)]
pub struct AbaqusReader;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Block {
    Node,
    Element(MaterialId),
    Skipped,
}

fn parse_err(message: impl Into<String>) -> MeshError {
    MeshError::MeshIoParse(message.into())
}

fn keyword_block(line: &str) -> Result<Block, MeshError> {
    let mut parts = line.split(',').map(str::trim);
    let keyword = parts.next().unwrap_or_default().to_ascii_uppercase();
    match keyword.as_str() {
        "*NODE" => Ok(Block::Node),
        "*ELEMENT" => {
            let mut material = 0;
            for param in parts {
                let Some((key, value)) = param.split_once('=') else {
                    continue;
                };
                if !key.trim().eq_ignore_ascii_case("ELSET") {
                    continue;
                }
                let value = value.trim();
                let digits = value
                    .get(..8)
                    .filter(|prefix| prefix.eq_ignore_ascii_case("material"))
                    .map(|_| &value[8..]);
                if let Some(digits) = digits {
                    material = digits.trim_start_matches('_').parse().map_err(|_| {
                        parse_err(format!("invalid material set name `{value}`"))
                    })?;
                }
            }
            Ok(Block::Element(material))
        }
        _ => Ok(Block::Skipped),
    }
}

fn numbers<T: std::str::FromStr>(line: &str, what: &str) -> Result<Vec<T>, MeshError> {
    line.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| parse_err(format!("invalid {what}: {s}")))
        })
        .collect()
}

impl MeshReader for AbaqusReader {
    fn read<R: Read>(&self, mut reader: R, dimension: usize) -> Result<Mesh, MeshError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;

        let corners = 1usize << dimension;
        let to_lexicographic: &[usize] = if dimension == 2 {
            &ABAQUS_QUAD_TO_LEXICOGRAPHIC
        } else {
            &ABAQUS_HEX_TO_LEXICOGRAPHIC
        };

        let mut node_index: HashMap<u64, usize> = HashMap::new();
        let mut points: Vec<Vec<f64>> = Vec::new();
        let mut cells: Vec<(Vec<usize>, MaterialId)> = Vec::new();
        let mut block = Block::Skipped;
        let mut pending = String::new();

        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("**") {
                continue;
            }
            if line.starts_with('*') {
                if !pending.is_empty() {
                    return Err(parse_err("element line continues into a keyword"));
                }
                block = keyword_block(line)?;
                continue;
            }
            match block {
                Block::Skipped => {}
                Block::Node => {
                    let values: Vec<f64> = numbers(line, "node entry")?;
                    if values.len() < dimension + 1 {
                        return Err(parse_err(format!("node line `{line}` has too few values")));
                    }
                    let id = values[0] as u64;
                    if node_index.insert(id, points.len()).is_some() {
                        return Err(parse_err(format!("duplicate node id {id}")));
                    }
                    points.push(values[1..=dimension].to_vec());
                }
                Block::Element(material) => {
                    pending.push_str(line);
                    if line.ends_with(',') {
                        continue;
                    }
                    let entry = std::mem::take(&mut pending);
                    let ids: Vec<u64> = numbers(&entry, "element entry")?;
                    if ids.len() != corners + 1 {
                        return Err(parse_err(format!(
                            "element `{entry}` has {} nodes, expected {corners}",
                            ids.len().saturating_sub(1)
                        )));
                    }
                    let vertices = ids[1..]
                        .iter()
                        .map(|id| {
                            node_index
                                .get(id)
                                .copied()
                                .ok_or_else(|| parse_err(format!("element references unknown node {id}")))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    cells.push((reorder(&vertices, to_lexicographic), material));
                }
            }
        }
        if !pending.is_empty() {
            return Err(parse_err("unterminated element line"));
        }

        assemble_imported(dimension, &points, &cells, &[])
    }
}
