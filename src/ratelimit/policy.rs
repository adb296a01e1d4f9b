//! Operation classification and window lookup.
//!
//! Every gated operation belongs to one [`PolicyClass`], and every class has a
//! fixed window: the minimum number of seconds between two admitted calls from
//! the same client to the same operation. The classification and the window
//! table are plain configuration, loadable from YAML.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{GateError, Result};

/// Named policy classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyClass {
    /// Destructive operations
    Delete,
    /// Listing endpoints
    ListQuery,
    /// Cheap lookups that may be polled
    RelaxedQuery,
    /// Everything else
    Default,
}

impl PolicyClass {
    /// Classes in ascending precedence. When an operation is listed under more
    /// than one class, the later class wins.
    const PRECEDENCE: [PolicyClass; 4] = [
        PolicyClass::Default,
        PolicyClass::ListQuery,
        PolicyClass::RelaxedQuery,
        PolicyClass::Delete,
    ];

    /// Name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyClass::Delete => "delete",
            PolicyClass::ListQuery => "list_query",
            PolicyClass::RelaxedQuery => "relaxed_query",
            PolicyClass::Default => "default",
        }
    }
}

impl std::fmt::Display for PolicyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Window length in seconds for each class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassWindows {
    #[serde(default = "default_delete_window")]
    pub delete: f64,
    #[serde(default = "default_list_query_window")]
    pub list_query: f64,
    #[serde(default = "default_relaxed_query_window")]
    pub relaxed_query: f64,
    #[serde(default = "default_default_window")]
    pub default: f64,
}

impl Default for ClassWindows {
    fn default() -> Self {
        Self {
            delete: default_delete_window(),
            list_query: default_list_query_window(),
            relaxed_query: default_relaxed_query_window(),
            default: default_default_window(),
        }
    }
}

fn default_delete_window() -> f64 {
    6.0
}

fn default_list_query_window() -> f64 {
    1.0
}

fn default_relaxed_query_window() -> f64 {
    0.5
}

fn default_default_window() -> f64 {
    3.0
}

impl ClassWindows {
    /// The same window for every class.
    pub fn uniform(secs: f64) -> Self {
        Self {
            delete: secs,
            list_query: secs,
            relaxed_query: secs,
            default: secs,
        }
    }

    /// Window for a class.
    pub fn window(&self, class: PolicyClass) -> f64 {
        match class {
            PolicyClass::Delete => self.delete,
            PolicyClass::ListQuery => self.list_query,
            PolicyClass::RelaxedQuery => self.relaxed_query,
            PolicyClass::Default => self.default,
        }
    }

    fn validate(&self) -> Result<()> {
        for class in PolicyClass::PRECEDENCE {
            let secs = self.window(class);
            if !secs.is_finite() || secs <= 0.0 {
                return Err(GateError::Config(format!(
                    "window for class '{}' must be a positive number of seconds, got {}",
                    class, secs
                )));
            }
        }
        Ok(())
    }
}

/// Operation ids listed under each class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLists {
    #[serde(default)]
    pub delete: Vec<String>,
    #[serde(default)]
    pub list_query: Vec<String>,
    #[serde(default)]
    pub relaxed_query: Vec<String>,
    #[serde(default)]
    pub default: Vec<String>,
}

impl Default for OperationLists {
    fn default() -> Self {
        let owned = |ops: &[&str]| -> Vec<String> { ops.iter().map(|s| s.to_string()).collect() };
        Self {
            delete: owned(&["delete_job", "delete_jobs", "delete_diagnostic_result"]),
            list_query: owned(&[
                "list_jobs",
                "list_diagnostic_results",
                "list_gpu_inspection_jobs",
            ]),
            relaxed_query: owned(&["get_diagnostic_results"]),
            default: Vec::new(),
        }
    }
}

impl OperationLists {
    /// No operations listed; everything falls into the default class.
    pub fn empty() -> Self {
        Self {
            delete: Vec::new(),
            list_query: Vec::new(),
            relaxed_query: Vec::new(),
            default: Vec::new(),
        }
    }

    fn to_class_map(&self) -> HashMap<String, PolicyClass> {
        let mut classes = HashMap::new();
        for class in PolicyClass::PRECEDENCE {
            for op in self.for_class(class) {
                classes.insert(op.clone(), class);
            }
        }
        classes
    }

    fn for_class(&self, class: PolicyClass) -> &[String] {
        match class {
            PolicyClass::Delete => &self.delete,
            PolicyClass::ListQuery => &self.list_query,
            PolicyClass::RelaxedQuery => &self.relaxed_query,
            PolicyClass::Default => &self.default,
        }
    }
}

/// Serializable policy configuration.
///
/// Omitting `operations` keeps the built-in classification; supplying it
/// replaces the built-in lists entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub windows: ClassWindows,
    #[serde(default)]
    pub operations: OperationLists,
}

impl PolicyConfig {
    /// Load policy configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading policy configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load policy configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GateError::Config(format!("Failed to parse policy config: {}", e)))
    }
}

/// Resolves operation ids to windows.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    windows: ClassWindows,
    classes: HashMap<String, PolicyClass>,
}

impl PolicyTable {
    /// Build a table from configuration, rejecting non-positive windows.
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        config.windows.validate()?;

        Ok(Self {
            windows: config.windows.clone(),
            classes: config.operations.to_class_map(),
        })
    }

    /// A table that applies one window to every operation.
    pub fn uniform(secs: f64) -> Result<Self> {
        Self::from_config(&PolicyConfig {
            windows: ClassWindows::uniform(secs),
            operations: OperationLists::empty(),
        })
    }

    /// Class of an operation; unknown operations are [`PolicyClass::Default`].
    pub fn classify(&self, operation: &str) -> PolicyClass {
        self.classes
            .get(operation)
            .copied()
            .unwrap_or(PolicyClass::Default)
    }

    /// Window in seconds for an operation.
    pub fn resolve(&self, operation: &str) -> f64 {
        self.windows.window(self.classify(operation))
    }

    /// The per-class window table.
    pub fn windows(&self) -> &ClassWindows {
        &self.windows
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            windows: ClassWindows::default(),
            classes: OperationLists::default().to_class_map(),
        }
    }
}
