//! Query recipes
//!
//! A recipe is a named list of builder steps stored as TOML or JSON and
//! replayed onto a [`QueryBuilder`]. Steps run in file order, so the same
//! ordering rules apply as for direct builder calls.
//!
//! ```toml
//! name = "cpu_by_type"
//!
//! [[steps]]
//! op = "metric"
//! names = ["cpu_used"]
//!
//! [[steps]]
//! op = "eq"
//! label = "user"
//! value = "001"
//!
//! [[steps]]
//! op = "func"
//! name = "avg_over_time"
//! range = "300s"
//!
//! [[steps]]
//! op = "aggregate"
//! aggregation = "min"
//! labels = ["type"]
//! ```

use crate::query::{Aggregation, Grouping, QueryBuilder, QueryError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

fn default_when() -> bool {
    true
}

/// One builder call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Metric {
        names: Vec<String>,
    },
    Eq {
        label: String,
        #[serde(default)]
        value: String,
        #[serde(default = "default_when")]
        when: bool,
    },
    NotEq {
        label: String,
        #[serde(default)]
        value: String,
        #[serde(default = "default_when")]
        when: bool,
    },
    Regex {
        label: String,
        pattern: String,
        #[serde(default = "default_when")]
        when: bool,
    },
    NotRegex {
        label: String,
        pattern: String,
        #[serde(default = "default_when")]
        when: bool,
    },
    Empty {
        label: String,
        #[serde(default = "default_when")]
        when: bool,
    },
    NotEmpty {
        label: String,
        #[serde(default = "default_when")]
        when: bool,
    },
    Aggregate {
        aggregation: Aggregation,
        #[serde(default)]
        grouping: Grouping,
        #[serde(default)]
        labels: Vec<String>,
    },
    CountValues {
        label: String,
    },
    Topk {
        k: u32,
    },
    Bottomk {
        k: u32,
    },
    Quantile {
        phi: f64,
    },
    Rate {
        range: String,
    },
    Irate {
        range: String,
    },
    Delta {
        range: String,
    },
    Abs,
    Absent,
    Ceil,
    Floor,
    /// Any function; with `range` it takes a range vector
    Func {
        name: String,
        range: Option<String>,
    },
    Offset {
        value: String,
    },
    Last {
        suffix: String,
    },
}

impl Step {
    /// Apply this step to `builder`
    pub fn apply(&self, builder: QueryBuilder) -> Result<QueryBuilder, QueryError> {
        match self {
            Self::Metric { names } => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                builder.metric(&names)
            }
            Self::Eq { label, value, when } => builder.eq_if(*when, label, value),
            Self::NotEq { label, value, when } => builder.not_eq_if(*when, label, value),
            Self::Regex {
                label,
                pattern,
                when,
            } => builder.regex_if(*when, label, pattern),
            Self::NotRegex {
                label,
                pattern,
                when,
            } => builder.not_regex_if(*when, label, pattern),
            Self::Empty { label, when } => builder.empty_if(*when, label),
            Self::NotEmpty { label, when } => builder.not_empty_if(*when, label),
            Self::Aggregate {
                aggregation,
                grouping,
                labels,
            } => {
                let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
                Ok(builder.aggregate(*aggregation, *grouping, &labels))
            }
            Self::CountValues { label } => builder.count_values(label),
            Self::Topk { k } => Ok(builder.topk(*k)),
            Self::Bottomk { k } => Ok(builder.bottomk(*k)),
            Self::Quantile { phi } => Ok(builder.quantile(*phi)),
            Self::Rate { range } => builder.rate(range),
            Self::Irate { range } => builder.irate(range),
            Self::Delta { range } => builder.delta(range),
            Self::Abs => Ok(builder.abs()),
            Self::Absent => Ok(builder.absent()),
            Self::Ceil => Ok(builder.ceil()),
            Self::Floor => Ok(builder.floor()),
            Self::Func {
                name,
                range: Some(range),
            } => builder.func_range(name, range),
            Self::Func { name, range: None } => builder.func(name),
            Self::Offset { value } => builder.offset(value),
            Self::Last { suffix } => Ok(builder.last(suffix)),
        }
    }
}

/// A named, replayable list of builder steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// File formats a recipe can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeFormat {
    Toml,
    Json,
}

impl RecipeFormat {
    /// Pick the format from a file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl Recipe {
    /// Parse a recipe from a string
    pub fn parse(content: &str, format: RecipeFormat) -> Result<Self, RecipeError> {
        match format {
            RecipeFormat::Toml => {
                toml::from_str(content).map_err(|e| RecipeError::Parse {
                    path: None,
                    error: e.to_string(),
                })
            }
            RecipeFormat::Json => {
                serde_json::from_str(content).map_err(|e| RecipeError::Parse {
                    path: None,
                    error: e.to_string(),
                })
            }
        }
    }

    /// Load a recipe file
    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        let content = std::fs::read_to_string(path).map_err(|e| RecipeError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let recipe = Self::parse(&content, RecipeFormat::from_path(path)).map_err(|e| match e {
            RecipeError::Parse { error, .. } => RecipeError::Parse {
                path: Some(path.to_path_buf()),
                error,
            },
            other => other,
        })?;

        tracing::info!(
            "Loaded recipe {:?} with {} steps from {:?}",
            recipe.name,
            recipe.steps.len(),
            path
        );
        Ok(recipe)
    }

    /// Replay all steps onto a fresh builder
    pub fn builder(&self) -> Result<QueryBuilder, RecipeError> {
        tracing::debug!("Replaying {} steps of recipe {:?}", self.steps.len(), self.name);
        self.steps
            .iter()
            .enumerate()
            .try_fold(QueryBuilder::new(), |builder, (index, step)| {
                step.apply(builder)
                    .map_err(|source| RecipeError::Step { index, source })
            })
    }

    /// Replay the steps and assemble the expression
    pub fn render(&self) -> Result<String, RecipeError> {
        Ok(self.builder()?.build())
    }
}

/// Find `name` in `dir`, trying `.toml` then `.json` when no extension is given
pub fn resolve(dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Some(direct);
    }

    let candidates = [
        dir.join(name),
        dir.join(format!("{}.toml", name)),
        dir.join(format!("{}.json", name)),
    ];
    candidates.into_iter().find(|p| p.is_file())
}

/// Recipe files (`.toml` / `.json`) in `dir`, sorted by path
pub fn list(dir: &Path) -> Result<Vec<PathBuf>, RecipeError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RecipeError::Io {
        path: dir.to_path_buf(),
        error: e.to_string(),
    })?;

    let mut recipes: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("toml") | Some("json")
                )
        })
        .collect();
    recipes.sort();
    Ok(recipes)
}

/// Recipe errors
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Failed to read recipe {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse recipe {path:?}: {error}")]
    Parse {
        path: Option<PathBuf>,
        error: String,
    },

    #[error("Step {index} rejected: {source}")]
    Step {
        index: usize,
        #[source]
        source: QueryError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CPU_RECIPE: &str = r#"
name = "cpu_by_type"
description = "Average CPU per type, shifted back 5 minutes"

[[steps]]
op = "metric"
names = ["cpu_used"]

[[steps]]
op = "eq"
label = "user"
value = "001"

[[steps]]
op = "func"
name = "avg_over_time"
range = "300s"

[[steps]]
op = "offset"
value = "5m"

[[steps]]
op = "aggregate"
aggregation = "min"
labels = ["type"]
"#;

    #[test]
    fn test_toml_recipe() {
        let recipe = Recipe::parse(CPU_RECIPE, RecipeFormat::Toml).unwrap();

        assert_eq!(recipe.name.as_deref(), Some("cpu_by_type"));
        assert_eq!(recipe.steps.len(), 5);
        assert_eq!(
            recipe.render().unwrap(),
            r#"min by(type)(avg_over_time(cpu_used{user="001"}[300s] offset 5m))"#
        );
    }

    #[test]
    fn test_json_recipe() {
        let json = r#"{
            "steps": [
                {"op": "metric", "names": ["cpu_total", "cpu_allocated", "cpu_used"]},
                {"op": "eq", "label": "user", "value": "24"},
                {"op": "eq", "label": "cluster", "value": "Test01"},
                {"op": "not_empty", "label": "skipped", "when": false},
                {"op": "aggregate", "aggregation": "sum", "labels": ["__name__"]}
            ]
        }"#;
        let recipe = Recipe::parse(json, RecipeFormat::Json).unwrap();

        assert!(recipe.name.is_none());
        assert_eq!(
            recipe.render().unwrap(),
            r#"sum by(__name__)({__name__=~"cpu_total|cpu_allocated|cpu_used", user="24", cluster="Test01"})"#
        );
    }

    #[test]
    fn test_unit_and_parameter_steps() {
        let toml = r#"
[[steps]]
op = "metric"
names = ["instance_memory_usage_bytes"]

[[steps]]
op = "abs"

[[steps]]
op = "topk"
k = 3

[[steps]]
op = "aggregate"
aggregation = "avg"
grouping = "without"
labels = ["pod"]

[[steps]]
op = "last"
suffix = " / 1024"
"#;
        let recipe = Recipe::parse(toml, RecipeFormat::Toml).unwrap();
        assert_eq!(
            recipe.render().unwrap(),
            "avg without(pod)(topk(3, abs(instance_memory_usage_bytes))) / 1024"
        );
    }

    #[test]
    fn test_invalid_step_reports_index() {
        let toml = r#"
[[steps]]
op = "metric"
names = ["up"]

[[steps]]
op = "rate"
range = " "
"#;
        let recipe = Recipe::parse(toml, RecipeFormat::Toml).unwrap();
        let err = recipe.render().unwrap_err();

        match err {
            RecipeError::Step { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(source.param(), "duration");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unknown_op_is_parse_error() {
        let err = Recipe::parse("[[steps]]\nop = \"nope\"\n", RecipeFormat::Toml).unwrap_err();
        assert!(matches!(err, RecipeError::Parse { path: None, .. }));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(RecipeFormat::from_path(Path::new("a.json")), RecipeFormat::Json);
        assert_eq!(RecipeFormat::from_path(Path::new("a.JSON")), RecipeFormat::Json);
        assert_eq!(RecipeFormat::from_path(Path::new("a.toml")), RecipeFormat::Toml);
        assert_eq!(RecipeFormat::from_path(Path::new("a")), RecipeFormat::Toml);
    }

    #[test]
    fn test_load_resolve_and_list() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("cpu.toml"), CPU_RECIPE).unwrap();
        std::fs::write(
            dir.path().join("up.json"),
            r#"{"name": "up", "steps": [{"op": "metric", "names": ["up"]}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let listed = list(dir.path()).unwrap();
        assert_eq!(
            listed,
            vec![dir.path().join("cpu.toml"), dir.path().join("up.json")]
        );

        let path = resolve(dir.path(), "up").unwrap();
        assert_eq!(path, dir.path().join("up.json"));
        assert_eq!(Recipe::load(&path).unwrap().render().unwrap(), "up");

        let path = resolve(dir.path(), "cpu.toml").unwrap();
        assert_eq!(Recipe::load(&path).unwrap().name.as_deref(), Some("cpu_by_type"));

        assert!(resolve(dir.path(), "missing").is_none());
    }

    #[test]
    fn test_load_errors_carry_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Recipe::load(&missing).unwrap_err(),
            RecipeError::Io { .. }
        ));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "steps = 3").unwrap();
        match Recipe::load(&broken).unwrap_err() {
            RecipeError::Parse { path, .. } => assert_eq!(path, Some(broken)),
            other => panic!("unexpected error: {}", other),
        }
    }
}
