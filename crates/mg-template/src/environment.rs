//! Seed template environment

use crate::collected::CollectedIds;
use crate::error::{TemplateError, TemplateResult};
use crate::functions::{id, make_var_fn, COLLECTED_IDS};
use crate::legacy::rewrite_bare_calls;
use minijinja::value::Value;
use minijinja::{Environment, UndefinedBehavior};
use std::collections::HashMap;

/// Renders seed column expressions for one seed file
pub struct SeedTemplates {
    env: Environment<'static>,
}

impl SeedTemplates {
    /// Create an environment exposing only `id()` and `var()`
    pub fn new(variables: &HashMap<String, String>) -> Self {
        let mut env = Environment::empty();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_function("id", id);
        env.add_function("var", make_var_fn(variables.clone()));
        Self { env }
    }

    /// Render one column expression against the ids collected so far
    pub fn render(&self, expression: &str, ids: &CollectedIds) -> TemplateResult<String> {
        let source = rewrite_bare_calls(expression);
        let ctx = HashMap::from([(COLLECTED_IDS, Value::from_serialize(ids))]);
        self.env
            .render_str(&source, ctx)
            .map_err(TemplateError::from)
    }
}

impl Default for SeedTemplates {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

#[cfg(test)]
#[path = "environment_test.rs"]
mod tests;
