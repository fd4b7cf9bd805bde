// Copyright @yucwang 2026

//! Sparse view-factor matrix files.
//!
//! The first line holds the number of source patches; every further line is
//! one directed link `i j F` with 0-based patch indices.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::error::{ Result, ViewFactorError };
use crate::core::link_table::LinkTable;
use crate::math::constants::Float;

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixFile {
    pub patches: usize,
    pub links: Vec<(usize, usize, Float)>,
}

impl MatrixFile {
    pub fn row_sums(&self) -> Vec<Float> {
        let mut sums = vec![0.0; self.patches];
        for &(i, _, f) in &self.links {
            sums[i] += f;
        }
        sums
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn write_links(path: &Path, table: &LinkTable) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", table.len())?;
    for (i, j, f) in table.links() {
        writeln!(out, "{} {} {:.12e}", i, j, f)?;
    }
    out.flush()?;
    out.get_ref().sync_all()
}

/// Writes `table` next to `path` first and renames it into place, so a
/// failed write never leaves a truncated matrix behind.
pub fn write_matrix<P: AsRef<Path>>(path: P, table: &LinkTable) -> Result<()> {
    let path = path.as_ref();
    let partial = partial_path(path);
    if let Err(err) = write_links(&partial, table).and_then(|_| fs::rename(&partial, path)) {
        let _ = fs::remove_file(&partial);
        return Err(err.into());
    }
    log::info!("wrote {} links for {} patches to {}", table.link_count(), table.len(), path.display());
    Ok(())
}

fn parse_field<T: std::str::FromStr>(token: Option<&str>, line: usize) -> Result<T> {
    token
        .and_then(|t| t.parse::<T>().ok())
        .ok_or_else(|| ViewFactorError::Parse(format!("line {}: malformed entry", line)))
}

pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<MatrixFile> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header = lines.next().ok_or_else(|| ViewFactorError::Parse("empty matrix file".to_string()))??;
    let patches: usize = parse_field(Some(header.trim()), 1)?;

    let mut links = Vec::new();
    for (n, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let i: usize = parse_field(tokens.next(), n + 2)?;
        let j: usize = parse_field(tokens.next(), n + 2)?;
        let f: Float = parse_field(tokens.next(), n + 2)?;
        if i >= patches || j >= patches {
            return Err(ViewFactorError::Parse(format!("line {}: index out of range", n + 2)));
        }
        links.push((i, j, f));
    }

    Ok(MatrixFile { patches, links })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vfactor-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_write_then_read() {
        let mut table = LinkTable::new(vec![1.0, 1.0, 2.0]);
        table.record(0, 1, 0.25);
        table.record(1, 0, 0.25);
        table.record(2, 2, 1.0 / 3.0);

        let path = scratch("matrix.dat");
        write_matrix(&path, &table).unwrap();
        assert!(!partial_path(&path).exists());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("3\n0 1 2.500000000000e-1\n"));

        let matrix = read_matrix(&path).unwrap();
        assert_eq!(matrix.patches, 3);
        assert_eq!(matrix.links.len(), 3);
        assert_eq!(matrix.links[2].0, 2);
        assert!((matrix.links[2].2 - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(matrix.row_sums()[0], 0.25);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let table = LinkTable::new(vec![1.0]);
        let path = scratch("missing-dir").join("matrix.dat");
        assert!(matches!(write_matrix(&path, &table), Err(ViewFactorError::Io(_))));
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let path = scratch("bad.dat");
        fs::write(&path, "2\n0 5 0.1\n").unwrap();
        assert!(matches!(read_matrix(&path), Err(ViewFactorError::Parse(_))));
        fs::remove_file(&path).unwrap();
    }
}
