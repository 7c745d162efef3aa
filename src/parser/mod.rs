//! Parser module — split, struct-literal, annotation, and state-machine
//! passes over `.api` sources.

pub mod annotation;
mod split;
mod state;
pub mod types;

pub use annotation::Dialect;

use crate::error::{Error, Result};
use crate::model::ApiSpec;
use crate::validate;
use std::fs;
use std::path::{Path, PathBuf};

/// Parse one `.api` source with the default dialect.
///
/// The returned specification has already passed validation and carries the
/// enriched summary/desc/jwt fields; on error no specification is returned.
pub fn parse_str(src: &str) -> Result<ApiSpec> {
    parse_str_with(src, &Dialect::default())
}

pub fn parse_str_with(src: &str, dialect: &Dialect) -> Result<ApiSpec> {
    let segments = split::split_source(src)?;
    let types = types::parse_types(&segments.types)?;
    let mut spec = state::assemble(segments.root, types, dialect)?;
    validate::finalize(&mut spec)?;
    Ok(spec)
}

/// Parse one `.api` file; errors carry the file path.
pub fn parse_file(path: &Path) -> Result<ApiSpec> {
    parse_file_with(path, &Dialect::default())
}

pub fn parse_file_with(path: &Path, dialect: &Dialect) -> Result<ApiSpec> {
    let src = fs::read_to_string(path).map_err(|e| Error::from(e).in_file(path))?;
    parse_str_with(&src, dialect).map_err(|e| e.in_file(path))
}

/// Directory mode: parse every `.api` file under `dir` (recursive, sorted
/// for determinism), then cross-check the aggregate for type and route
/// collisions across files.
pub fn parse_dir(dir: &Path) -> Result<Vec<(PathBuf, ApiSpec)>> {
    parse_dir_with(dir, &Dialect::default())
}

pub fn parse_dir_with(dir: &Path, dialect: &Dialect) -> Result<Vec<(PathBuf, ApiSpec)>> {
    let mut parsed = Vec::new();
    for path in discover_api_files(dir)? {
        let spec = parse_file_with(&path, dialect)?;
        parsed.push((path, spec));
    }
    validate::validate_aggregate(&parsed)?;
    Ok(parsed)
}

/// Recursively collect `.api` files under `dir`, sorted by path.
pub fn discover_api_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("api") {
            out.push(path);
        }
    }
    Ok(())
}
