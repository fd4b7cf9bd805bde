// Copyright @yucwang 2026

use std::fs;
use std::path::Path;

use wavefront_obj::{obj, ParseError};
use std::fmt;

use crate::core::patch::Patch;
use crate::math::constants::Vector3f;
use crate::shapes::triangle::Triangle;

#[derive(Debug)]
pub enum ObjLoadError {
    Io(std::io::Error),
    Parse(ParseError),
}

impl From<std::io::Error> for ObjLoadError {
    fn from(err: std::io::Error) -> Self {
        ObjLoadError::Io(err)
    }
}

impl From<ParseError> for ObjLoadError {
    fn from(err: ParseError) -> Self {
        ObjLoadError::Parse(err)
    }
}

impl fmt::Display for ObjLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjLoadError::Io(err) => write!(f, "io error: {}", err),
            ObjLoadError::Parse(err) => write!(f, "parse error: {}", err),
        }
    }
}

impl std::error::Error for ObjLoadError {}

pub fn load_obj_from_str<S: AsRef<str>>(input: S) -> Result<obj::ObjSet, ParseError> {
    let triangulated = triangulate_faces(input.as_ref());
    obj::parse(triangulated)
}

/// One Triangle patch per face. Vertex normals are used when a face has
/// them on all three corners, the geometric normal otherwise.
pub fn patches_from_obj(obj_set: &obj::ObjSet) -> Vec<Patch> {
    let mut patches = Vec::new();
    for object in &obj_set.objects {
        let vertices: Vec<Vector3f> = object.vertices.iter()
            .map(|v| Vector3f::new(v.x, v.y, v.z))
            .collect();
        let normals: Vec<Vector3f> = object.normals.iter()
            .map(|n| Vector3f::new(n.x, n.y, n.z))
            .collect();

        for geom in &object.geometry {
            for shape in &geom.shapes {
                if let obj::Primitive::Triangle(a, b, c) = shape.primitive {
                    let p = [vertices[a.0], vertices[b.0], vertices[c.0]];
                    let n = [a.2, b.2, c.2].map(|i| i.and_then(|i| normals.get(i)).copied());
                    let triangle = match n {
                        [Some(n0), Some(n1), Some(n2)] => Triangle::from_nodes(p, [n0, n1, n2]),
                        _ => Triangle::new(p[0], p[1], p[2]),
                    };
                    patches.push(triangle.into());
                }
            }
        }
    }
    patches
}

pub fn load_obj_patches<P: AsRef<Path>>(path: P) -> Result<Vec<Patch>, ObjLoadError> {
    let data = fs::read_to_string(path)?;
    let obj_set = load_obj_from_str(data)?;
    Ok(patches_from_obj(&obj_set))
}

fn triangulate_faces(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    for line in input.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("f ") || trimmed.starts_with("f\t") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() > 4 {
                let base = parts[1];
                for i in 2..(parts.len() - 1) {
                    out.push_str("f ");
                    out.push_str(base);
                    out.push(' ');
                    out.push_str(parts[i]);
                    out.push(' ');
                    out.push_str(parts[i + 1]);
                    out.push('\n');
                }
                continue;
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
