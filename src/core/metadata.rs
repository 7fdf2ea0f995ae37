//! Metadata index
//!
//! Scans a directory of checked-out units and indexes every package name
//! (binary names and `Provides` aliases) to the unit that produces it.
//!
//! A unit without `debian/control` is not a build candidate and is left out.
//! A unit whose control file does not parse is kept aside as unparseable:
//! it takes no part in the dependency graph but is still built, last.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::control::{self, ControlFile};
use crate::error::{ControlError, MetadataError};

/// Location of the control file inside a unit
pub fn control_path(unit_dir: &Path) -> PathBuf {
    unit_dir.join("debian").join("control")
}

/// A unit whose control file exists but could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparseableUnit {
    /// Unit name
    pub name: String,
    /// Why parsing failed
    pub error: ControlError,
}

/// Index of parsed units and the packages they produce
#[derive(Debug, Default)]
pub struct MetadataIndex {
    /// Unit name -> parsed control file
    units: BTreeMap<String, ControlFile>,
    /// Package name (binary or provided) -> owning unit
    packages: BTreeMap<String, String>,
    /// Units with unparseable metadata, in discovery order
    unparseable: Vec<UnparseableUnit>,
}

impl MetadataIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `root`, treating each subdirectory as one unit
    ///
    /// Subdirectories are visited in file-name order so that the index, and
    /// the order of unparseable units, do not depend on the filesystem.
    pub fn scan(root: &Path) -> Result<Self, MetadataError> {
        if !root.is_dir() {
            return Err(MetadataError::Scan {
                path: root.to_path_buf(),
                error: "not a directory".to_string(),
            });
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| MetadataError::Scan {
                path: root.to_path_buf(),
                error: e.to_string(),
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let path = control_path(entry.path());
            if !path.is_file() {
                tracing::debug!("{name}: no debian/control, not a build candidate");
                continue;
            }

            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| ControlError::Unreadable {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })
                .and_then(|content| ControlFile::parse(&content, &path));
            entries.push((name, parsed));
        }

        Self::from_parsed(entries)
    }

    /// Build an index from already-parsed units, in the given order
    pub fn from_parsed<I>(entries: I) -> Result<Self, MetadataError>
    where
        I: IntoIterator<Item = (String, Result<ControlFile, ControlError>)>,
    {
        let mut index = Self::new();
        for (name, parsed) in entries {
            match parsed {
                Ok(ctrl) => index.insert(name, ctrl)?,
                Err(error) => {
                    tracing::warn!("{name}: unparseable control file, will be built last: {error}");
                    index.unparseable.push(UnparseableUnit { name, error });
                }
            }
        }
        Ok(index)
    }

    fn insert(&mut self, unit: String, ctrl: ControlFile) -> Result<(), MetadataError> {
        for bin in &ctrl.binaries {
            self.register(bin.package.trim(), &unit)?;

            let Some(provides) = bin.provides() else {
                continue;
            };
            match control::parse_relations(provides) {
                Ok(relations) => {
                    for name in control::all_names(&relations) {
                        self.register(name.trim(), &unit)?;
                    }
                }
                Err(e) => {
                    tracing::debug!("{unit}: ignoring Provides of {}: {e}", bin.package);
                }
            }
        }
        self.units.insert(unit, ctrl);
        Ok(())
    }

    fn register(&mut self, package: &str, unit: &str) -> Result<(), MetadataError> {
        match self.packages.get(package) {
            Some(owner) if owner != unit => Err(MetadataError::DuplicatePackage {
                package: package.to_string(),
                first: owner.clone(),
                second: unit.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.packages.insert(package.to_string(), unit.to_string());
                Ok(())
            }
        }
    }

    /// Parsed units, ordered by name
    pub fn units(&self) -> impl Iterator<Item = (&str, &ControlFile)> {
        self.units.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parsed control file of a unit
    pub fn control(&self, unit: &str) -> Option<&ControlFile> {
        self.units.get(unit)
    }

    /// Unit producing `package`, if it is part of the corpus
    pub fn owner(&self, package: &str) -> Option<&str> {
        self.packages.get(package).map(String::as_str)
    }

    /// Package name -> owning unit
    pub fn packages(&self) -> &BTreeMap<String, String> {
        &self.packages
    }

    /// Units with unparseable metadata, in discovery order
    pub fn unparseable(&self) -> &[UnparseableUnit] {
        &self.unparseable
    }

    /// Names of the unparseable units, in discovery order
    pub fn unparseable_names(&self) -> Vec<String> {
        self.unparseable.iter().map(|u| u.name.clone()).collect()
    }

    /// Number of parsed units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit parsed
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctrl(text: &str) -> Result<ControlFile, ControlError> {
        ControlFile::parse(text, Path::new("debian/control"))
    }

    fn write_unit(root: &Path, name: &str, control: &str) {
        let dir = root.join(name).join("debian");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("control"), control).unwrap();
    }

    #[test]
    fn test_binary_and_provides_names_are_indexed() {
        let index = MetadataIndex::from_parsed(vec![(
            "vyatta-cfg".to_string(),
            ctrl("Source: vyatta-cfg\n\nPackage: vyatta-cfg\nProvides: cfg-api ,  cfg-alias\n\nPackage: libcfg-dev\n"),
        )])
        .unwrap();

        assert_eq!(index.owner("vyatta-cfg"), Some("vyatta-cfg"));
        assert_eq!(index.owner("cfg-api"), Some("vyatta-cfg"));
        assert_eq!(index.owner("cfg-alias"), Some("vyatta-cfg"));
        assert_eq!(index.owner("libcfg-dev"), Some("vyatta-cfg"));
        assert_eq!(index.owner("unknown"), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_bad_provides_is_skipped_not_fatal() {
        let index = MetadataIndex::from_parsed(vec![(
            "a".to_string(),
            ctrl("Source: a\n\nPackage: a-bin\nProvides: Not Valid\n\nPackage: a-extra\nProvides: a-virtual\n"),
        )])
        .unwrap();

        assert_eq!(index.owner("a-bin"), Some("a"));
        assert_eq!(index.owner("a-extra"), Some("a"));
        assert_eq!(index.owner("a-virtual"), Some("a"));
        assert!(index.unparseable().is_empty());
    }

    #[test]
    fn test_provides_substvar_keeps_real_aliases() {
        let index = MetadataIndex::from_parsed(vec![(
            "b".to_string(),
            ctrl("Source: b\n\nPackage: b-bin\nProvides: ${perl:Provides}, foo-api\n"),
        )])
        .unwrap();

        assert_eq!(index.owner("foo-api"), Some("b"));
        assert_eq!(index.owner("${perl:Provides}"), None);
    }

    #[test]
    fn test_unparseable_units_keep_discovery_order() {
        let index = MetadataIndex::from_parsed(vec![
            ("zeta".to_string(), ctrl("garbage")),
            ("good".to_string(), ctrl("Source: good\n\nPackage: good\n")),
            ("alpha".to_string(), ctrl("Package: no-source\n")),
        ])
        .unwrap();

        assert_eq!(index.unparseable_names(), vec!["zeta", "alpha"]);
        assert!(index.control("zeta").is_none());
        assert!(index.control("good").is_some());
    }

    #[test]
    fn test_duplicate_ownership_is_rejected() {
        let result = MetadataIndex::from_parsed(vec![
            ("a".to_string(), ctrl("Source: a\n\nPackage: shared\n")),
            ("b".to_string(), ctrl("Source: b\n\nPackage: b\nProvides: shared\n")),
        ]);

        match result {
            Err(MetadataError::DuplicatePackage {
                package,
                first,
                second,
            }) => {
                assert_eq!(package, "shared");
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("expected DuplicatePackage, got {other:?}"),
        }
    }

    #[test]
    fn test_self_provided_name_is_not_a_duplicate() {
        let index = MetadataIndex::from_parsed(vec![(
            "a".to_string(),
            ctrl("Source: a\n\nPackage: a\nProvides: a\n"),
        )])
        .unwrap();
        assert_eq!(index.owner("a"), Some("a"));
    }

    #[test]
    fn test_scan_skips_units_without_control() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_unit(root, "b-unit", "Source: b-unit\n\nPackage: b-unit\n");
        write_unit(root, "a-unit", "Source: a-unit\nBuild-Depends: b-unit\n\nPackage: a-unit\n");
        write_unit(root, "broken", "Source broken\n");
        std::fs::create_dir_all(root.join("docs-only")).unwrap();
        std::fs::write(root.join("README"), "not a unit").unwrap();

        let index = MetadataIndex::scan(root).unwrap();
        let names: Vec<&str> = index.units().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a-unit", "b-unit"]);
        assert_eq!(index.unparseable_names(), vec!["broken"]);
    }

    #[test]
    fn test_scan_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = MetadataIndex::scan(&temp.path().join("nope"));
        assert!(matches!(result, Err(MetadataError::Scan { .. })));
    }
}
