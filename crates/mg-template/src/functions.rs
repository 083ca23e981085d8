//! Template functions: id() and var().

use crate::error::TemplateError;
use minijinja::value::Value;
use minijinja::{Error, ErrorKind, State};
use std::collections::HashMap;

/// Name under which the collected ids are passed into each render
pub(crate) const COLLECTED_IDS: &str = "collected_ids";

/// Wrap a typed failure so it survives the trip through minijinja
fn fail(kind: ErrorKind, err: TemplateError) -> Error {
    Error::new(kind, err.to_string()).with_source(err)
}

/// The id() function: the id generated for the `index`-th row inserted
/// into `table` earlier in the current seed file.
///
/// Usage in templates:
/// ```jinja
/// {{ id("widgets", 0) }}
/// ```
pub(crate) fn id(state: &State, table: &str, index: i64) -> Result<Value, Error> {
    let rows = state
        .lookup(COLLECTED_IDS)
        .map(|collected| collected.get_attr(table))
        .transpose()?
        .filter(|rows| !rows.is_undefined() && !rows.is_none())
        .ok_or_else(|| {
            fail(
                ErrorKind::UndefinedError,
                TemplateError::UnknownTable {
                    table: table.to_string(),
                },
            )
        })?;

    let available = rows.len().unwrap_or(0);
    let slot = usize::try_from(index)
        .ok()
        .filter(|slot| *slot < available)
        .ok_or_else(|| {
            fail(
                ErrorKind::InvalidOperation,
                TemplateError::IndexOutOfRange {
                    table: table.to_string(),
                    index,
                    available,
                },
            )
        })?;

    let value = rows.get_item(&Value::from(slot))?;
    if value.is_none() || value.is_undefined() {
        return Err(fail(
            ErrorKind::InvalidOperation,
            TemplateError::MissingGeneratedId {
                table: table.to_string(),
                index: slot,
            },
        ));
    }
    Ok(value)
}

/// Create the var() function over the seed file's variables
///
/// Usage in templates:
/// ```jinja
/// {{ var("owner") }}
/// ```
pub(crate) fn make_var_fn(
    vars: HashMap<String, String>,
) -> impl Fn(&str) -> Result<Value, Error> + Send + Sync + Clone + 'static {
    move |name: &str| {
        vars.get(name).map(|v| Value::from(v.as_str())).ok_or_else(|| {
            fail(
                ErrorKind::UndefinedError,
                TemplateError::UnknownVariable {
                    name: name.to_string(),
                },
            )
        })
    }
}
