//! Declarative seed files
//!
//! A seed file holds top-level `variables` and an ordered list of `seeds`,
//! each naming a table and the rows to insert into it:
//!
//! ```yaml
//! variables:
//!   owner: hoge
//! seeds:
//!   - table: widgets
//!     insert:
//!       - name: first
//!   - table: parts
//!     insert:
//!       - widget_id: '{{ id("widgets", 0) }}'
//!         owner: '{{ var("owner") }}'
//! ```

use crate::error::{CoreError, CoreResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A parsed seed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSpec {
    /// Values available to `var()`
    pub variables: HashMap<String, String>,

    /// Groups in application order
    pub groups: Vec<SeedGroup>,
}

/// Rows destined for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedGroup {
    /// Target table
    pub table: String,

    /// Rows in insertion order; the position is what `id()` indexes
    pub rows: Vec<SeedRow>,
}

/// Column/template pairs of one row, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRow {
    pub columns: Vec<(String, String)>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSeedFile {
    #[serde(default, alias = "vars")]
    variables: serde_yaml::Mapping,
    #[serde(default)]
    seeds: Vec<RawSeedGroup>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSeedGroup {
    table: String,
    #[serde(default)]
    insert: Vec<serde_yaml::Mapping>,
}

impl SeedSpec {
    /// Read and parse a seed file
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::parse(&content, path)
    }

    /// Parse seed file content; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> CoreResult<Self> {
        let malformed = |reason: String| CoreError::MalformedArtifact {
            path: path.display().to_string(),
            reason,
        };

        let raw: RawSeedFile =
            serde_yaml::from_str(content).map_err(|e| malformed(e.to_string()))?;

        let mut variables = HashMap::with_capacity(raw.variables.len());
        for (key, value) in &raw.variables {
            let name = scalar_to_string(key)
                .ok_or_else(|| malformed("variable names must be scalars".to_string()))?;
            let value = scalar_to_string(value)
                .ok_or_else(|| malformed(format!("variable '{}' must be a scalar", name)))?;
            variables.insert(name, value);
        }

        let mut groups = Vec::with_capacity(raw.seeds.len());
        for (group_index, group) in raw.seeds.into_iter().enumerate() {
            let table = group.table.trim().to_string();
            if table.is_empty() {
                return Err(malformed(format!("seed group {} has no table", group_index)));
            }

            let mut rows = Vec::with_capacity(group.insert.len());
            for (row_index, mapping) in group.insert.iter().enumerate() {
                if mapping.is_empty() {
                    return Err(malformed(format!(
                        "row {} of table '{}' has no columns",
                        row_index, table
                    )));
                }

                let mut columns = Vec::with_capacity(mapping.len());
                for (column, value) in mapping {
                    let column = scalar_to_string(column).ok_or_else(|| {
                        malformed(format!(
                            "row {} of table '{}': column names must be scalars",
                            row_index, table
                        ))
                    })?;
                    let value = scalar_to_string(value).ok_or_else(|| {
                        malformed(format!(
                            "row {} of table '{}': value of column '{}' must be a scalar",
                            row_index, table, column
                        ))
                    })?;
                    columns.push((column, value));
                }
                rows.push(SeedRow { columns });
            }

            groups.push(SeedGroup { table, rows });
        }

        Ok(Self { variables, groups })
    }

    /// Total number of rows across all groups
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }
}

/// Render a YAML scalar as the string a template would see.
///
/// Returns `None` for null, sequences and mappings.
fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
    }
}

/// Find every `.yml`/`.yaml` file under `dir`, sorted by path
pub fn discover_seed_files(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let meta = std::fs::metadata(dir).map_err(|e| CoreError::io(dir, e))?;
    if !meta.is_dir() {
        return Err(CoreError::NotADirectory {
            path: dir.display().to_string(),
        });
    }

    let mut files = Vec::new();
    discover_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn discover_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> CoreResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;

    for entry in entries {
        let path = entry.map_err(|e| CoreError::io(dir, e))?.path();

        if path.is_dir() {
            discover_recursive(&path, files)?;
        } else if path
            .extension()
            .is_some_and(|e| e == "yml" || e == "yaml")
        {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
