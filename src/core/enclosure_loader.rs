// Copyright @yucwang 2026

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::config::ViewFactorConfig;
use crate::core::patch::Patch;
use crate::io::obj_utils::{load_obj_patches, ObjLoadError};
use crate::io::ply_utils::{load_ply_patches, PlyLoadError};
use crate::math::constants::{Float, Vector3f};
use crate::shapes::bilinear::BiLinear;
use crate::shapes::triangle::Triangle;

#[derive(Debug)]
pub enum EnclosureLoadError {
    Io(std::io::Error),
    Parse(String),
    MissingField(&'static str),
    Obj(ObjLoadError),
    Ply(PlyLoadError),
}

impl From<std::io::Error> for EnclosureLoadError {
    fn from(err: std::io::Error) -> Self {
        EnclosureLoadError::Io(err)
    }
}

impl From<ObjLoadError> for EnclosureLoadError {
    fn from(err: ObjLoadError) -> Self {
        EnclosureLoadError::Obj(err)
    }
}

impl From<PlyLoadError> for EnclosureLoadError {
    fn from(err: PlyLoadError) -> Self {
        EnclosureLoadError::Ply(err)
    }
}

impl fmt::Display for EnclosureLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnclosureLoadError::Io(err) => write!(f, "io error: {}", err),
            EnclosureLoadError::Parse(msg) => write!(f, "parse error: {}", msg),
            EnclosureLoadError::MissingField(name) => write!(f, "missing field: {}", name),
            EnclosureLoadError::Obj(err) => write!(f, "obj: {}", err),
            EnclosureLoadError::Ply(err) => write!(f, "ply: {}", err),
        }
    }
}

impl std::error::Error for EnclosureLoadError {}

pub struct EnclosureLoadResult {
    pub patches: Vec<Patch>,
    pub config: ViewFactorConfig,
}

pub fn load_enclosure<P: AsRef<Path>>(path: P) -> Result<EnclosureLoadResult, EnclosureLoadError> {
    let path = path.as_ref();
    let xml = fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let result = parse_enclosure(&xml, base_dir)?;
    log::info!("loaded {} patches from {}", result.patches.len(), path.display());
    Ok(result)
}

struct ShapeState {
    kind: String,
    filename: Option<String>,
    flip_normals: bool,
    scale: Vector3f,
    translate: Vector3f,
}

struct PatchState {
    kind: String,
    polynomial: bool,
    flip_normals: bool,
    points: Vec<Vector3f>,
    normals: Vec<Vector3f>,
    fields: HashMap<String, Vec<Float>>,
}

fn attributes(e: &BytesStart, defaults: &HashMap<String, String>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = resolve_value(&attr.unescape_value().unwrap_or_default(), defaults);
        out.insert(key, value);
    }
    out
}

pub fn parse_enclosure(xml: &str, base_dir: &Path) -> Result<EnclosureLoadResult, EnclosureLoadError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut defaults: HashMap<String, String> = HashMap::new();
    let mut config = ViewFactorConfig::default();
    let mut patches: Vec<Patch> = Vec::new();

    let mut shape: Option<ShapeState> = None;
    let mut patch: Option<PatchState> = None;
    let mut in_shape_transform = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let attrs = attributes(&e, &defaults);
                let name = attrs.get("name").cloned();
                let value = attrs.get("value").cloned();
                match e.name().as_ref() {
                    b"default" => {
                        if let (Some(k), Some(v)) = (name, value) {
                            defaults.insert(k, v);
                        }
                    }
                    b"shape" => {
                        let kind = attrs.get("type").cloned().ok_or(EnclosureLoadError::MissingField("type"))?;
                        shape = Some(ShapeState { kind, filename: None, flip_normals: false,
                                                  scale: Vector3f::new(1.0, 1.0, 1.0),
                                                  translate: Vector3f::zeros() });
                    }
                    b"patch" => {
                        let kind = attrs.get("type").cloned().ok_or(EnclosureLoadError::MissingField("type"))?;
                        patch = Some(PatchState {
                            kind,
                            polynomial: attrs.get("basis").map(|b| b == "polynomial").unwrap_or(false),
                            flip_normals: false,
                            points: Vec::new(),
                            normals: Vec::new(),
                            fields: HashMap::new(),
                        });
                    }
                    b"transform" => {
                        in_shape_transform = shape.is_some() && name.as_deref() == Some("to_world");
                    }
                    b"translate" => {
                        if let (Some(s), true) = (shape.as_mut(), in_shape_transform) {
                            let mut t = Vector3f::zeros();
                            for (axis, key) in ["x", "y", "z"].iter().enumerate() {
                                if let Some(v) = attrs.get(*key) {
                                    t[axis] = parse_float(v)?;
                                }
                            }
                            s.translate += t;
                        }
                    }
                    b"scale" => {
                        if let (Some(s), true) = (shape.as_mut(), in_shape_transform) {
                            let factor = if let Some(u) = attrs.get("value") {
                                let u = parse_float(u)?;
                                Vector3f::new(u, u, u)
                            } else {
                                let mut f = Vector3f::new(1.0, 1.0, 1.0);
                                for (axis, key) in ["x", "y", "z"].iter().enumerate() {
                                    if let Some(v) = attrs.get(*key) {
                                        f[axis] = parse_float(v)?;
                                    }
                                }
                                f
                            };
                            s.scale = s.scale.component_mul(&factor);
                            s.translate = s.translate.component_mul(&factor);
                        }
                    }
                    b"point" => {
                        if let Some(p) = patch.as_mut() {
                            p.points.push(parse_vec3(&value.ok_or(EnclosureLoadError::MissingField("value"))?)?);
                        }
                    }
                    b"normal" => {
                        if let Some(p) = patch.as_mut() {
                            p.normals.push(parse_vec3(&value.ok_or(EnclosureLoadError::MissingField("value"))?)?);
                        }
                    }
                    b"field" => {
                        if let (Some(p), Some(n), Some(v)) = (patch.as_mut(), name, value) {
                            p.fields.insert(n, parse_list(&v)?);
                        }
                    }
                    b"string" => {
                        if let (Some(s), Some("filename"), Some(v)) = (shape.as_mut(), name.as_deref(), value) {
                            s.filename = Some(v);
                        }
                    }
                    b"boolean" => {
                        if let (Some(n), Some(v)) = (name, value) {
                            let flag = parse_bool(&v)?;
                            match (n.as_str(), shape.as_mut(), patch.as_mut()) {
                                ("flip_normals", _, Some(p)) => p.flip_normals = flag,
                                ("flip_normals", Some(s), None) => s.flip_normals = flag,
                                ("progress", None, None) => config.progress = flag,
                                _ => {}
                            }
                        }
                    }
                    b"integer" => {
                        if let (Some(n), Some(v), true) = (name, value, shape.is_none() && patch.is_none()) {
                            match n.as_str() {
                                "nrays" => config.nrays = parse_usize(&v)?,
                                "seed" => config.seed = parse_usize(&v)? as u64,
                                "max_depth" => config.max_depth = parse_usize(&v)? as u32,
                                "min_refinement" => config.min_refinement = parse_usize(&v)? as u32,
                                "threads" => config.threads = parse_usize(&v)?,
                                "curved_tessellation" => config.curved_tessellation = parse_usize(&v)?,
                                _ => {}
                            }
                        }
                    }
                    b"float" => {
                        if let (Some(n), Some(v), true) = (name, value, shape.is_none() && patch.is_none()) {
                            match n.as_str() {
                                "factor_eps" => config.factor_eps = parse_float(&v)?,
                                "area_eps" => config.area_eps = parse_float(&v)?,
                                "negligible_factor" => config.negligible_factor = parse_float(&v)?,
                                "ray_trim" => config.ray_trim = parse_float(&v)?,
                                "time_budget" => {
                                    let secs = parse_float(&v)?;
                                    if !(secs >= 0.0 && secs.is_finite()) {
                                        return Err(EnclosureLoadError::Parse(format!("invalid time budget: {}", v)));
                                    }
                                    config.time_budget = Some(Duration::from_secs_f64(secs));
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"transform" => in_shape_transform = false,
                    b"shape" => {
                        if let Some(s) = shape.take() {
                            patches.extend(load_shape(&s, base_dir)?);
                        }
                    }
                    b"patch" => {
                        if let Some(p) = patch.take() {
                            patches.push(build_patch(&p)?);
                        }
                    }
                    _ => {}
                }
            }
            Err(e) => {
                return Err(EnclosureLoadError::Parse(e.to_string()));
            }
            _ => {}
        }

        buf.clear();
    }

    Ok(EnclosureLoadResult { patches, config })
}

fn load_shape(shape: &ShapeState, base_dir: &Path) -> Result<Vec<Patch>, EnclosureLoadError> {
    let filename = shape.filename.as_ref().ok_or(EnclosureLoadError::MissingField("filename"))?;
    let path = base_dir.join(filename);
    let mut patches = match shape.kind.as_str() {
        "obj" => load_obj_patches(&path)?,
        "ply" => load_ply_patches(&path)?,
        other => return Err(EnclosureLoadError::Parse(format!("unsupported shape: {}", other))),
    };
    for p in patches.iter_mut() {
        p.apply_transform(&shape.scale, &shape.translate);
        if shape.flip_normals {
            p.flip_normals();
        }
    }
    log::debug!("{}: {} patches", path.display(), patches.len());
    Ok(patches)
}

fn coefficients<const N: usize>(state: &PatchState) -> Result<[[Float; N]; 6], EnclosureLoadError> {
    let mut fields = [[0.0; N]; 6];
    for (slot, key) in ["x", "y", "z", "nx", "ny", "nz"].iter().enumerate() {
        let values = state.fields.get(*key).ok_or(EnclosureLoadError::MissingField("field"))?;
        if values.len() != N {
            return Err(EnclosureLoadError::Parse(
                format!("field {} needs {} coefficients, got {}", key, N, values.len())));
        }
        fields[slot].copy_from_slice(values);
    }
    Ok(fields)
}

fn corner_normals<const N: usize>(state: &PatchState) -> Result<Option<[Vector3f; N]>, EnclosureLoadError> {
    match state.normals.len() {
        0 => Ok(None),
        1 => Ok(Some([state.normals[0]; N])),
        n if n == N => {
            let mut out = [Vector3f::zeros(); N];
            out.copy_from_slice(&state.normals);
            Ok(Some(out))
        }
        n => Err(EnclosureLoadError::Parse(format!("expected 1 or {} normals, got {}", N, n))),
    }
}

fn build_patch(state: &PatchState) -> Result<Patch, EnclosureLoadError> {
    let mut patch: Patch = match (state.kind.as_str(), state.polynomial) {
        ("bilinear", true) => BiLinear::from_fields(coefficients::<4>(state)?).into(),
        ("triangle", true) => Triangle::from_fields(coefficients::<3>(state)?).into(),
        ("bilinear", false) => {
            if state.points.len() != 4 {
                return Err(EnclosureLoadError::Parse("bilinear patch needs 4 points".to_string()));
            }
            let c = [state.points[0], state.points[1], state.points[2], state.points[3]];
            match corner_normals::<4>(state)? {
                Some(n) => BiLinear::from_nodes(c, n).into(),
                None => BiLinear::from_corners(c).into(),
            }
        }
        ("triangle", false) => {
            if state.points.len() != 3 {
                return Err(EnclosureLoadError::Parse("triangle patch needs 3 points".to_string()));
            }
            let p = [state.points[0], state.points[1], state.points[2]];
            match corner_normals::<3>(state)? {
                Some(n) => Triangle::from_nodes(p, n).into(),
                None => Triangle::new(p[0], p[1], p[2]).into(),
            }
        }
        (other, _) => return Err(EnclosureLoadError::Parse(format!("unsupported patch: {}", other))),
    };
    if state.flip_normals {
        patch.flip_normals();
    }
    Ok(patch)
}

fn resolve_value(raw: &str, defaults: &HashMap<String, String>) -> String {
    let mut out = raw.to_string();
    for (k, v) in defaults {
        out = out.replace(&format!("${}", k), v);
    }
    out
}

fn parse_float(value: &str) -> Result<Float, EnclosureLoadError> {
    value.trim().parse::<Float>().map_err(|_| EnclosureLoadError::Parse(format!("invalid float: {}", value)))
}

fn parse_usize(value: &str) -> Result<usize, EnclosureLoadError> {
    value.trim().parse::<usize>().map_err(|_| EnclosureLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_bool(value: &str) -> Result<bool, EnclosureLoadError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(EnclosureLoadError::Parse(format!("invalid boolean: {}", value))),
    }
}

fn parse_list(value: &str) -> Result<Vec<Float>, EnclosureLoadError> {
    value.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).map(parse_float).collect()
}

fn parse_vec3(value: &str) -> Result<Vector3f, EnclosureLoadError> {
    let v = parse_list(value)?;
    if v.len() != 3 {
        return Err(EnclosureLoadError::Parse(format!("invalid vec3: {}", value)));
    }
    Ok(Vector3f::new(v[0], v[1], v[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::{ParametricSurface, PatchKind};

    const INLINE: &str = r#"
<enclosure>
    <default name="rays" value="48"/>
    <integer name="nrays" value="$rays"/>
    <float name="factor_eps" value="0.05"/>
    <float name="time_budget" value="2.5"/>
    <integer name="seed" value="7"/>
    <boolean name="progress" value="true"/>
    <patch type="bilinear">
        <point value="0, 0, 0"/>
        <point value="1, 0, 0"/>
        <point value="1, 1, 0"/>
        <point value="0, 1, 0"/>
    </patch>
    <patch type="triangle">
        <point value="0, 0, 1"/>
        <point value="0, 1, 1"/>
        <point value="1, 0, 1"/>
        <normal value="0, 0, -1"/>
        <boolean name="flip_normals" value="true"/>
    </patch>
    <patch type="triangle" basis="polynomial">
        <field name="x" value="0, 2, 0"/>
        <field name="y" value="0, 0, 2"/>
        <field name="z" value="3, 0, 0"/>
        <field name="nx" value="0, 0, 0"/>
        <field name="ny" value="0, 0, 0"/>
        <field name="nz" value="-1, 0, 0"/>
    </patch>
</enclosure>
"#;

    #[test]
    fn test_inline_patches_and_settings() {
        let result = parse_enclosure(INLINE, Path::new(".")).unwrap();
        let config = &result.config;
        assert_eq!(config.nrays, 48);
        assert_eq!(config.seed, 7);
        assert_eq!(config.factor_eps, 0.05);
        assert_eq!(config.time_budget, Some(Duration::from_millis(2500)));
        assert!(config.progress);

        let patches = &result.patches;
        assert_eq!(patches.len(), 3);
        assert_eq!(patches[0].kind(), PatchKind::BiLinear);
        assert!((patches[0].area() - 1.0).abs() < 1e-12);

        // The shared normal is flipped back to +z.
        let n = patches[1].centroid_normal().unwrap();
        assert!((n.z - 1.0).abs() < 1e-12);

        assert!((patches[2].area() - 2.0).abs() < 1e-12);
        assert!((patches[2].centroid().z - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_obj_shape_with_transform() {
        let dir = std::env::temp_dir().join(format!("vfactor-enclosure-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("quad.obj"), "v 0.0 0.0 0.0\nv 1.0 0.0 0.0\nv 1.0 1.0 0.0\nv 0.0 1.0 0.0\nf 1 2 3 4\n").unwrap();
        let xml = r#"
<enclosure>
    <shape type="obj">
        <string name="filename" value="quad.obj"/>
        <boolean name="flip_normals" value="true"/>
        <transform name="to_world">
            <scale value="2"/>
            <translate x="0" y="0" z="1"/>
        </transform>
    </shape>
</enclosure>
"#;
        let result = parse_enclosure(xml, &dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(result.patches.len(), 2);
        let area: Float = result.patches.iter().map(|p| p.area()).sum();
        assert!((area - 4.0).abs() < 1e-12);
        for p in &result.patches {
            assert!((p.centroid().z - 1.0).abs() < 1e-12);
            assert!(p.centroid_normal().unwrap().z < 0.0);
        }
    }

    #[test]
    fn test_bad_patch_is_rejected() {
        let xml = r#"<enclosure><patch type="bilinear"><point value="0,0,0"/></patch></enclosure>"#;
        assert!(matches!(parse_enclosure(xml, Path::new(".")), Err(EnclosureLoadError::Parse(_))));

        let xml = r#"<enclosure><shape type="stl"><string name="filename" value="a.stl"/></shape></enclosure>"#;
        assert!(matches!(parse_enclosure(xml, Path::new(".")), Err(EnclosureLoadError::Parse(_))));
    }
}
