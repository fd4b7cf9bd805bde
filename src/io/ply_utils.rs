// Copyright @yucwang 2026

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ply_rs_bw::parser::Parser;
use ply_rs_bw::ply::{DefaultElement, Property};

use crate::core::patch::Patch;
use crate::math::constants::{Float, Vector3f};
use crate::shapes::bilinear::BiLinear;
use crate::shapes::triangle::Triangle;

#[derive(Debug)]
pub enum PlyLoadError {
    Io(std::io::Error),
    Parse(String),
    MissingField(&'static str),
}

impl From<std::io::Error> for PlyLoadError {
    fn from(err: std::io::Error) -> Self {
        PlyLoadError::Io(err)
    }
}

impl fmt::Display for PlyLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlyLoadError::Io(err) => write!(f, "io error: {}", err),
            PlyLoadError::Parse(msg) => write!(f, "parse error: {}", msg),
            PlyLoadError::MissingField(name) => write!(f, "missing field: {}", name),
        }
    }
}

impl std::error::Error for PlyLoadError {}

fn scalar(element: &DefaultElement, key: &str) -> Option<Float> {
    match element.get(key)? {
        Property::Float(v) => Some(*v as Float),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as Float),
        Property::UInt(v) => Some(*v as Float),
        Property::Short(v) => Some(*v as Float),
        Property::UShort(v) => Some(*v as Float),
        Property::Char(v) => Some(*v as Float),
        Property::UChar(v) => Some(*v as Float),
        _ => None,
    }
}

fn index_list(element: &DefaultElement) -> Option<Vec<usize>> {
    let prop = element.get("vertex_indices").or_else(|| element.get("vertex_index"))?;
    let list = match prop {
        Property::ListInt(v) => v.iter().map(|&i| i as usize).collect(),
        Property::ListUInt(v) => v.iter().map(|&i| i as usize).collect(),
        Property::ListShort(v) => v.iter().map(|&i| i as usize).collect(),
        Property::ListUShort(v) => v.iter().map(|&i| i as usize).collect(),
        Property::ListChar(v) => v.iter().map(|&i| i as usize).collect(),
        Property::ListUChar(v) => v.iter().map(|&i| i as usize).collect(),
        _ => return None,
    };
    Some(list)
}

/// Triangles become Triangle patches, quads become BiLinear patches and
/// larger polygons are fan-triangulated. Corner normals come from the
/// `nx, ny, nz` vertex properties when present.
pub fn load_ply_from_reader<R: Read>(reader: &mut R) -> Result<Vec<Patch>, PlyLoadError> {
    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(reader).map_err(|e| PlyLoadError::Parse(e.to_string()))?;

    let vertex_elements = ply.payload.get("vertex").ok_or(PlyLoadError::MissingField("vertex"))?;
    let mut positions = Vec::with_capacity(vertex_elements.len());
    let mut normals = Vec::with_capacity(vertex_elements.len());
    for v in vertex_elements {
        let p = match (scalar(v, "x"), scalar(v, "y"), scalar(v, "z")) {
            (Some(x), Some(y), Some(z)) => Vector3f::new(x, y, z),
            _ => return Err(PlyLoadError::MissingField("x/y/z")),
        };
        positions.push(p);
        normals.push(match (scalar(v, "nx"), scalar(v, "ny"), scalar(v, "nz")) {
            (Some(x), Some(y), Some(z)) => Some(Vector3f::new(x, y, z)),
            _ => None,
        });
    }

    let faces = ply.payload.get("face").ok_or(PlyLoadError::MissingField("face"))?;
    let mut patches = Vec::with_capacity(faces.len());
    for face in faces {
        let idx = index_list(face).ok_or(PlyLoadError::MissingField("vertex_indices"))?;
        if let Some(&bad) = idx.iter().find(|&&i| i >= positions.len()) {
            return Err(PlyLoadError::Parse(format!("vertex index {} out of range", bad)));
        }

        let node_normals: Option<Vec<Vector3f>> = idx.iter().map(|&i| normals[i]).collect();
        match idx.len() {
            0..=2 => continue,
            4 => {
                let c = [positions[idx[0]], positions[idx[1]], positions[idx[2]], positions[idx[3]]];
                let quad = match node_normals {
                    Some(n) => BiLinear::from_nodes(c, [n[0], n[1], n[2], n[3]]),
                    None => BiLinear::from_corners(c),
                };
                patches.push(quad.into());
            }
            _ => {
                for k in 1..(idx.len() - 1) {
                    let corners = [idx[0], idx[k], idx[k + 1]];
                    let p = corners.map(|i| positions[i]);
                    let triangle = match &node_normals {
                        Some(n) => Triangle::from_nodes(p, [n[0], n[k], n[k + 1]]),
                        None => Triangle::new(p[0], p[1], p[2]),
                    };
                    patches.push(triangle.into());
                }
            }
        }
    }

    Ok(patches)
}

pub fn load_ply_patches<P: AsRef<Path>>(path: P) -> Result<Vec<Patch>, PlyLoadError> {
    let mut reader = BufReader::new(File::open(path)?);
    load_ply_from_reader(&mut reader)
}
