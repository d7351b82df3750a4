//! Variant key to reference identifier lookup, built once from a reference
//! annotation table.
//!
//! The annotation layout is not self-describing, so the caller names the
//! layout explicitly through [`AnnotationSchema`]. Key columns that cannot be
//! found fail the load; a missing identifier source only empties the lookup,
//! which makes every variant fall back to its own key.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::MtagPrepError;
use crate::io::open_text_reader;
use crate::logging::RunLog;
use crate::qc::check_file_exists;

pub const DEFAULT_ID_COLUMN: &str = "Existing_variation";

const LIST_SEPARATORS: &[char] = &[';'];
const INFO_SEPARATORS: &[char] = &['&', ','];

/// Layout of the reference annotation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationSchema {
    /// Headerless `CHROM POS ID REF ALT ...`.
    Positional,
    /// Header row with `CHROM POS REF ALT` and a named column holding a
    /// semicolon-delimited identifier list.
    ExistingVariation { column: String },
    /// Header row with `CHROM POS REF ALT INFO`; the identifier is the value
    /// of `tag=` inside INFO.
    InfoTag { tag: String },
}

impl Default for AnnotationSchema {
    fn default() -> Self {
        AnnotationSchema::ExistingVariation {
            column: DEFAULT_ID_COLUMN.to_string(),
        }
    }
}

/// Which token of a multi-valued identifier field is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdPolicy {
    /// First non-empty token, whatever its form.
    #[default]
    Permissive,
    /// First token starting with `rs`; rows without one get no identifier.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationLookup {
    map: HashMap<String, String>,
    pub rows_scanned: usize,
    pub rows_with_id: usize,
    pub rows_malformed: usize,
}

impl AnnotationLookup {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut lookup = Self::default();
        for (k, v) in pairs {
            lookup.rows_scanned += 1;
            lookup.insert(k.into(), v.into());
        }
        lookup
    }

    fn insert(&mut self, key: String, id: String) {
        self.rows_with_id += 1;
        if let Entry::Vacant(slot) = self.map.entry(key) {
            slot.insert(id);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// The mapped identifier, or `key` itself when there is none.
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Fraction of scanned annotation rows that produced an identifier.
    pub fn coverage(&self) -> f64 {
        if self.rows_scanned == 0 {
            0.0
        } else {
            self.rows_with_id as f64 / self.rows_scanned as f64
        }
    }
}

pub fn variant_key(chrom: &str, pos: &str, reference: &str, alternate: &str) -> String {
    format!("{chrom}:{pos}:{reference}:{alternate}")
}

fn is_absent(token: &str) -> bool {
    token.is_empty() || token == "-" || token == "." || token.eq_ignore_ascii_case("NA")
}

/// Picks one identifier out of a field holding one or more tokens split by
/// any of `separators`.
pub fn select_identifier(field: &str, separators: &[char], policy: IdPolicy) -> Option<String> {
    let mut tokens = field.split(separators).map(str::trim);
    let chosen = match policy {
        IdPolicy::Permissive => tokens.next().filter(|t| !is_absent(t)),
        IdPolicy::Strict => tokens.find(|t| t.starts_with("rs")),
    };
    chosen.map(str::to_string)
}

/// Value of `tag=` in a `;`-separated INFO field.
pub fn info_value<'a>(info: &'a str, tag: &str) -> Option<&'a str> {
    info.split(';').find_map(|entry| {
        let (key, value) = entry.split_once('=')?;
        (key.trim() == tag).then_some(value)
    })
}

enum IdSource {
    Column(usize),
    Info { column: usize, tag: String },
}

struct Layout {
    chrom: usize,
    pos: usize,
    reference: usize,
    alternate: usize,
    id: Option<IdSource>,
    separators: &'static [char],
}

impl Layout {
    fn positional() -> Self {
        Layout {
            chrom: 0,
            pos: 1,
            reference: 3,
            alternate: 4,
            id: Some(IdSource::Column(2)),
            separators: LIST_SEPARATORS,
        }
    }

    fn min_fields(&self) -> usize {
        let id_col = match &self.id {
            Some(IdSource::Column(c)) => *c,
            Some(IdSource::Info { column, .. }) => *column,
            None => 0,
        };
        [self.chrom, self.pos, self.reference, self.alternate, id_col]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }

    fn from_header(
        header: &Header,
        id: Option<IdSource>,
        separators: &'static [char],
        source: &Path,
    ) -> Result<Self> {
        Ok(Layout {
            chrom: header.require("CHROM", source)?,
            pos: header.require("POS", source)?,
            reference: header.require("REF", source)?,
            alternate: header.require("ALT", source)?,
            id,
            separators,
        })
    }
}

/// Column names of a headed annotation table, with the leading `#` of the
/// first name stripped.
struct Header {
    names: Vec<String>,
}

impl Header {
    fn parse(line: &str) -> Self {
        let names = line
            .trim_end()
            .split('\t')
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim();
                let h = if i == 0 { h.trim_start_matches('#') } else { h };
                h.to_string()
            })
            .collect();
        Header { names }
    }

    /// Skips `##` meta lines and parses the first remaining line.
    fn read<I>(lines: &mut I, source: &Path) -> Result<Self>
    where
        I: Iterator<Item = std::io::Result<String>>,
    {
        for line in lines {
            let line = line.with_context(|| format!("read {}", source.display()))?;
            if !line.starts_with("##") {
                return Ok(Header::parse(&line));
            }
        }
        Err(MtagPrepError::EmptyFile(source.display().to_string()).into())
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn require(&self, name: &str, source: &Path) -> Result<usize, MtagPrepError> {
        self.find(name).ok_or_else(|| {
            MtagPrepError::MissingColumn(format!("{name} in annotation {}", source.display()))
        })
    }
}

/// Builds the variant key lookup from an annotation table.
pub fn load_annotation_lookup(
    path: &Path,
    schema: &AnnotationSchema,
    policy: IdPolicy,
    log: &mut RunLog,
) -> Result<AnnotationLookup> {
    check_file_exists(path, "annotation")?;
    log.line(&format!("Loading identifier mapping from: {}", path.display()))?;
    let mut lines = open_text_reader(path)?.lines();

    let layout = match schema {
        AnnotationSchema::Positional => Layout::positional(),
        AnnotationSchema::ExistingVariation { column } => {
            let header = Header::read(&mut lines, path)?;
            let id = header.find(column).map(IdSource::Column);
            Layout::from_header(&header, id, LIST_SEPARATORS, path)?
        }
        AnnotationSchema::InfoTag { tag } => {
            let header = Header::read(&mut lines, path)?;
            let id = header.find("INFO").map(|column| IdSource::Info {
                column,
                tag: tag.clone(),
            });
            Layout::from_header(&header, id, INFO_SEPARATORS, path)?
        }
    };

    let mut lookup = AnnotationLookup::default();
    if layout.id.is_none() {
        log.warn(&format!(
            "No identifier source ({schema:?}) found in {}; all variants will keep their coordinate key",
            path.display()
        ))?;
        return Ok(lookup);
    }

    let min_fields = layout.min_fields();
    for line in lines {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < min_fields {
            lookup.rows_malformed += 1;
            continue;
        }
        lookup.rows_scanned += 1;
        let raw = match &layout.id {
            Some(IdSource::Column(c)) => Some(fields[*c]),
            Some(IdSource::Info { column, tag }) => info_value(fields[*column], tag),
            None => None,
        };
        let Some(id) = raw.and_then(|r| select_identifier(r, layout.separators, policy)) else {
            continue;
        };
        let key = variant_key(
            fields[layout.chrom].trim(),
            fields[layout.pos].trim(),
            fields[layout.reference].trim(),
            fields[layout.alternate].trim(),
        );
        lookup.insert(key, id);
    }

    log.line(&format!(
        "  Loaded {} identifier mappings ({:.1}% of {} annotation rows)",
        lookup.len(),
        100.0 * lookup.coverage(),
        lookup.rows_scanned
    ))?;
    if lookup.rows_malformed > 0 {
        log.warn(&format!(
            "  Skipped {} annotation row(s) with too few fields",
            lookup.rows_malformed
        ))?;
    }
    Ok(lookup)
}
