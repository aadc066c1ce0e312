//! Input discovery: a path is either a single source file or a directory
//! whose matching files are taken in file-name order.

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::SourceUnit;

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

/// Every `*.{ext}` file named by `path`, sorted by file name.
pub fn discover(path: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        if !has_extension(path, ext) {
            return Err(anyhow!("{} is not a .{ext} file", path.display()));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("Listing {}", path.display()))? {
        let file = entry?.path();
        if file.is_file() && has_extension(&file, ext) {
            files.push(file);
        }
    }
    if files.is_empty() {
        return Err(anyhow!("no .{ext} files in {}", path.display()));
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn load_unit(path: &Path) -> Result<SourceUnit> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_string();
    println!("Loaded {} ({} bytes)", path.display(), source.len());
    Ok(SourceUnit {
        name,
        path: path.to_path_buf(),
        source,
    })
}

/// Discover and read every source named by `path`.
pub fn load_units(path: &Path, ext: &str) -> Result<Vec<SourceUnit>> {
    discover(path, ext)?.iter().map(|p| load_unit(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hack-loader-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_discover_sorts_and_filters() {
        let dir = scratch_dir("sort");
        for name in ["Sys.vm", "Main.vm", "notes.txt", "Array.vm"] {
            fs::write(dir.join(name), "").unwrap();
        }

        let names: Vec<String> = discover(&dir, "vm")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Array.vm", "Main.vm", "Sys.vm"]);

        assert!(discover(&dir, "jack").is_err());
        assert!(discover(&dir.join("notes.txt"), "vm").is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_unit_uses_file_stem() {
        let dir = scratch_dir("stem");
        let path = dir.join("Square.jack");
        fs::write(&path, "class Square {}").unwrap();

        let unit = load_unit(&path).unwrap();
        assert_eq!(unit.name, "Square");
        assert_eq!(unit.source, "class Square {}");
        fs::remove_dir_all(&dir).unwrap();
    }
}
