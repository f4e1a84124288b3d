use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{PipelineError, Result};

/// An IX Developer project held in memory: relative path to file contents.
///
/// Paths use `/` separators and are relative to the project root. When every entry of
/// a package lives under a single top-level folder, that folder is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectArchive {
    name: String,
    entries: BTreeMap<String, Vec<u8>>,
}

impl ProjectArchive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.entries
            .insert(path.replace('\\', "/"), contents.into());
        self
    }

    /// Read a zipped project. Entries that would escape the project root are rejected.
    pub fn from_zip_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes);
        let mut archive = ZipArchive::new(cursor).map_err(|err| {
            PipelineError::container("NEOPROJ", format!("failed to open zip: {err}"))
        })?;

        let mut entries = BTreeMap::new();
        for index in 0..archive.len() {
            let mut file = archive.by_index(index).map_err(|err| {
                PipelineError::container("NEOPROJ", format!("unreadable zip entry {index}: {err}"))
            })?;
            let path = check_entry_path(file.name())?;
            if file.is_dir() || path.is_empty() {
                continue;
            }
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            entries.insert(path, contents);
        }

        debug!("Read {} entries from project package {}", entries.len(), name);
        Ok(Self {
            name: name.to_string(),
            entries: strip_common_root(entries),
        })
    }

    /// Read an already extracted project folder.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(PipelineError::container(
                "NEOPROJ",
                format!("{} is not a directory", dir.display()),
            ));
        }
        let mut entries = BTreeMap::new();
        collect_dir(dir, "", &mut entries)?;
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self { name, entries })
    }

    /// Open a project from disk: `.zip` packages are read in memory, folders walked.
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Self::from_dir(path);
        }
        let bytes = fs::read(path).map_err(|err| {
            PipelineError::container("NEOPROJ", format!("cannot read {}: {err}", path.display()))
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Self::from_zip_bytes(name, &bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Files whose name ends with `extension` (case-insensitive), in path order.
    pub fn files_with_extension<'a>(
        &'a self,
        extension: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a [u8])> + 'a {
        let ext = extension.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(move |(path, _)| path.to_ascii_lowercase().ends_with(&ext))
            .map(|(path, bytes)| (path.as_str(), bytes.as_slice()))
    }

    /// First file whose name ends with one of `suffixes`, tried in order.
    pub fn find_by_suffix(&self, suffixes: &[&str]) -> Option<(&str, &[u8])> {
        suffixes.iter().find_map(|suffix| {
            let suffix = suffix.to_ascii_lowercase();
            self.entries
                .iter()
                .find(|(path, _)| file_name(path).to_ascii_lowercase().ends_with(&suffix))
                .map(|(path, bytes)| (path.as_str(), bytes.as_slice()))
        })
    }
}

/// Last path component
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// File name without its extension, used as the screen name of XAML files.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

/// Normalize a zip entry name and reject absolute, drive-letter or escaping paths.
fn check_entry_path(raw: &str) -> Result<String> {
    let name = raw.replace('\\', "/");
    let bytes = name.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if name.starts_with('/') || has_drive {
        return Err(PipelineError::UnsafeArchivePath(raw.to_string()));
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in name.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(PipelineError::UnsafeArchivePath(raw.to_string()));
                }
            }
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}

fn strip_common_root(entries: BTreeMap<String, Vec<u8>>) -> BTreeMap<String, Vec<u8>> {
    let mut roots = entries.keys().map(|p| p.split_once('/').map(|(root, _)| root));
    let common = match roots.next() {
        Some(Some(root)) => root.to_string(),
        _ => return entries,
    };
    if !roots.all(|r| r == Some(common.as_str())) {
        return entries;
    }

    let prefix_len = common.len() + 1;
    entries
        .into_iter()
        .map(|(path, bytes)| (path[prefix_len..].to_string(), bytes))
        .collect()
}

fn collect_dir(dir: &Path, prefix: &str, out: &mut BTreeMap<String, Vec<u8>>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if path.is_dir() {
            collect_dir(&path, &relative, out)?;
        } else {
            out.insert(relative, fs::read(&path)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_single_top_level_folder_becomes_root() {
        let bytes = zip_of(&[
            ("Plant/Screen1.xaml", "<Canvas/>"),
            ("Plant/RACK1.xaml", "<Canvas/>"),
        ]);
        let archive = ProjectArchive::from_zip_bytes("Plant.zip", &bytes).unwrap();
        assert_eq!(
            archive.paths().collect::<Vec<_>>(),
            vec!["RACK1.xaml", "Screen1.xaml"]
        );
    }

    #[test]
    fn test_mixed_roots_are_kept() {
        let bytes = zip_of(&[("a/x.xaml", ""), ("b.xaml", "")]);
        let archive = ProjectArchive::from_zip_bytes("p.zip", &bytes).unwrap();
        assert!(archive.get("a/x.xaml").is_some());
        assert!(archive.get("b.xaml").is_some());
    }

    #[test]
    fn test_escaping_entry_is_rejected() {
        let bytes = zip_of(&[("../evil.xaml", "")]);
        let err = ProjectArchive::from_zip_bytes("p.zip", &bytes).unwrap_err();
        assert!(matches!(err, PipelineError::UnsafeArchivePath(_)));
    }

    #[test]
    fn test_entry_path_checks() {
        assert!(check_entry_path("C:/Windows/x").is_err());
        assert!(check_entry_path("/etc/passwd").is_err());
        assert!(check_entry_path("a/../../b").is_err());
        assert_eq!(check_entry_path("a/./b/../c.xaml").unwrap(), "a/c.xaml");
        assert_eq!(check_entry_path("dir\\file.xaml").unwrap(), "dir/file.xaml");
    }

    #[test]
    fn test_garbage_is_a_container_error() {
        let err = ProjectArchive::from_zip_bytes("p.zip", b"not a zip").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_from_dir_walks_subfolders() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("Main.xaml"), "<Canvas/>").unwrap();
        fs::write(dir.path().join("sub/Other.xaml"), "<Canvas/>").unwrap();

        let archive = ProjectArchive::open(dir.path()).unwrap();
        assert_eq!(archive.files_with_extension(".XAML").count(), 2);
        assert!(archive.get("sub/Other.xaml").is_some());
    }

    #[test]
    fn test_find_by_suffix_and_stem() {
        let archive = ProjectArchive::new("p")
            .with_file("Exports/Plant_Tags Export.xlsx", "x")
            .with_file("RACK2.xaml", "y");
        let (path, _) = archive.find_by_suffix(&["_tags export.xlsx"]).unwrap();
        assert_eq!(path, "Exports/Plant_Tags Export.xlsx");
        assert_eq!(file_stem("Screens/RACK2.xaml"), "RACK2");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }
}
