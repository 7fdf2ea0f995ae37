//! Debian control file parsing
//!
//! Parses `debian/control` (deb822) into the structure the metadata index
//! consumes: the source paragraph's build-time relations and the binary
//! paragraphs with their `Provides` declarations.
//!
//! Relations are kept as data only. Version constraints, architecture
//! restrictions and build profiles are accepted but never evaluated.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ControlError, RelationError};

/// Fields of the source paragraph holding build-time relations
pub const BUILD_DEPENDS_FIELDS: [&str; 3] =
    ["build-depends", "build-depends-arch", "build-depends-indep"];

static POSSIBILITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[a-z0-9][a-z0-9+.\-]*)(?::(?P<arch>[a-z0-9\-]+))?\s*(?:\(\s*(?P<op><<|<=|>=|>>|=|<|>)\s*(?P<ver>[^()\s]+)\s*\))?\s*(?:\[[^\[\]]*\]\s*)?(?:<[^<>]*>\s*)*$",
    )
    .expect("Invalid possibility pattern")
});

static SUBSTVAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\{[^}]+\}$").expect("Invalid substvar pattern"));

/// Version constraint attached to a possibility, e.g. `(>= 1.2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    /// Relational operator (`<<`, `<=`, `=`, `>=`, `>>`)
    pub operator: String,
    /// Version string
    pub version: String,
}

/// One alternative inside a relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Possibility {
    /// Package name
    pub name: String,
    /// Architecture qualifier (`foo:any`)
    pub arch: Option<String>,
    /// Optional version constraint
    pub version: Option<VersionConstraint>,
    /// `${...}` substitution variable, filled in by debhelper at build time;
    /// `name` then holds the variable text
    pub substvar: bool,
}

impl Possibility {
    /// Whether this alternative names a concrete package
    pub fn is_package(&self) -> bool {
        !self.substvar
    }
}

impl fmt::Display for Possibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(arch) = &self.arch {
            write!(f, ":{arch}")?;
        }
        if let Some(v) = &self.version {
            write!(f, " ({} {})", v.operator, v.version)?;
        }
        Ok(())
    }
}

impl FromStr for Possibility {
    type Err = RelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if SUBSTVAR.is_match(text) {
            return Ok(Self {
                name: text.to_string(),
                arch: None,
                version: None,
                substvar: true,
            });
        }

        let caps = POSSIBILITY
            .captures(text)
            .ok_or_else(|| RelationError(text.to_string()))?;

        Ok(Self {
            name: caps["name"].to_string(),
            arch: caps.name("arch").map(|m| m.as_str().to_string()),
            version: match (caps.name("op"), caps.name("ver")) {
                (Some(op), Some(ver)) => Some(VersionConstraint {
                    operator: op.as_str().to_string(),
                    version: ver.as_str().to_string(),
                }),
                _ => None,
            },
            substvar: false,
        })
    }
}

/// An alternation of acceptable packages (`a | b | c`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Alternatives, in declaration order
    pub possibilities: Vec<Possibility>,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.possibilities.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

impl FromStr for Relation {
    type Err = RelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let possibilities = s
            .split('|')
            .map(str::parse)
            .collect::<Result<Vec<Possibility>, _>>()?;
        Ok(Self { possibilities })
    }
}

/// Parse a comma-separated relation field (`Build-Depends`, `Provides`, ...)
///
/// Empty entries (trailing commas, blank continuation lines) are skipped.
pub fn parse_relations(input: &str) -> Result<Vec<Relation>, RelationError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}

/// All package names mentioned by a list of relations, alternatives included
///
/// Substitution variables are not package names and are left out.
pub fn all_names(relations: &[Relation]) -> impl Iterator<Item = &str> {
    relations
        .iter()
        .flat_map(|rel| rel.possibilities.iter())
        .filter(|p| p.is_package())
        .map(|p| p.name.as_str())
}

/// The source paragraph of a control file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceParagraph {
    /// Source package name
    pub name: String,
    /// Build-time relations (`Build-Depends`, `-Arch` and `-Indep` combined)
    pub build_depends: Vec<Relation>,
    fields: BTreeMap<String, String>,
}

impl SourceParagraph {
    /// Raw value of a field (case-insensitive name)
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// A binary package paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryParagraph {
    /// Binary package name
    pub package: String,
    fields: BTreeMap<String, String>,
}

impl BinaryParagraph {
    /// Raw value of a field (case-insensitive name)
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Raw `Provides` declaration, if any
    pub fn provides(&self) -> Option<&str> {
        self.field("provides")
    }
}

/// A parsed `debian/control` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFile {
    /// Source paragraph
    pub source: SourceParagraph,
    /// Binary paragraphs, in file order
    pub binaries: Vec<BinaryParagraph>,
}

/// A raw deb822 paragraph: lowercase field name -> (value, line)
struct RawParagraph {
    line: usize,
    fields: BTreeMap<String, (String, usize)>,
}

impl RawParagraph {
    fn take_plain(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(k, (v, _))| (k.clone(), v.clone()))
            .collect()
    }
}

impl ControlFile {
    /// Parse control file contents; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> Result<Self, ControlError> {
        let path_str = path.display().to_string();
        let mut paragraphs = split_paragraphs(content, &path_str)?.into_iter();

        let source_raw = paragraphs.next().ok_or_else(|| ControlError::MissingSource {
            path: path_str.clone(),
        })?;
        let source = parse_source(&source_raw, &path_str)?;

        let binaries = paragraphs
            .map(|raw| {
                let (package, _) =
                    raw.fields
                        .get("package")
                        .ok_or_else(|| ControlError::MissingPackage {
                            path: path_str.clone(),
                            line: raw.line,
                        })?;
                Ok(BinaryParagraph {
                    package: package.trim().to_string(),
                    fields: raw.take_plain(),
                })
            })
            .collect::<Result<Vec<_>, ControlError>>()?;

        Ok(Self { source, binaries })
    }
}

fn parse_source(raw: &RawParagraph, path: &str) -> Result<SourceParagraph, ControlError> {
    let (name, _) = raw
        .fields
        .get("source")
        .ok_or_else(|| ControlError::MissingSource {
            path: path.to_string(),
        })?;

    let mut build_depends = Vec::new();
    for field in BUILD_DEPENDS_FIELDS {
        let Some((value, line)) = raw.fields.get(field) else {
            continue;
        };
        let relations = parse_relations(value).map_err(|e| ControlError::InvalidRelation {
            path: path.to_string(),
            line: *line,
            field: field.to_string(),
            relation: e.0,
        })?;
        build_depends.extend(relations);
    }

    Ok(SourceParagraph {
        name: name.trim().to_string(),
        build_depends,
        fields: raw.take_plain(),
    })
}

fn split_paragraphs(content: &str, path: &str) -> Result<Vec<RawParagraph>, ControlError> {
    let syntax = |line: usize, message: &str| ControlError::Syntax {
        path: path.to_string(),
        line,
        message: message.to_string(),
    };

    let mut paragraphs = Vec::new();
    let mut current: Option<RawParagraph> = None;
    let mut last_field: Option<String> = None;

    for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;

        if line.starts_with('#') {
            continue;
        }

        if line.trim().is_empty() {
            if let Some(p) = current.take() {
                paragraphs.push(p);
            }
            last_field = None;
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            let (Some(p), Some(field)) = (current.as_mut(), last_field.as_ref()) else {
                return Err(syntax(lineno, "continuation line without a field"));
            };
            if let Some((value, _)) = p.fields.get_mut(field) {
                value.push('\n');
                value.push_str(line.trim());
            }
            continue;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| syntax(lineno, "expected 'Field: value'"))?;
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(syntax(lineno, "invalid field name"));
        }

        let p = current.get_or_insert_with(|| RawParagraph {
            line: lineno,
            fields: BTreeMap::new(),
        });
        if p.fields
            .insert(name.clone(), (value.trim().to_string(), lineno))
            .is_some()
        {
            return Err(syntax(lineno, &format!("duplicate field '{name}'")));
        }
        last_field = Some(name);
    }

    if let Some(p) = current {
        paragraphs.push(p);
    }
    Ok(paragraphs)
}
