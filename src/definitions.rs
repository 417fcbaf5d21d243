//! Definitions and `${name}` substitution
//!
//! Definitions come from four sources, later ones overriding earlier ones:
//! environment variables (exposed as `env.NAME`), system properties (exposed
//! as `system.name`), caller supplied user definitions and `def` statements in
//! document order. They only ever feed substitution; none of them appears in
//! the resulting store.

use crate::error::{DefinitionError, Position};
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Namespace of environment variables
pub const ENV_PREFIX: &str = "env";
/// Namespace of system properties
pub const SYSTEM_PREFIX: &str = "system";

/// Matches a `${name}` reference with a non-empty name
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("reference pattern is valid"));

/// Snapshot of the environment and system properties used for substitution
///
/// Readers take this as an explicit input so parsing stays a pure function of
/// the text and its definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientDefinitions {
    env: IndexMap<String, String>,
    system: IndexMap<String, String>,
}

impl AmbientDefinitions {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the process environment and system properties
    pub fn capture() -> Self {
        let env: IndexMap<String, String> = std::env::vars().collect();
        let system = system_properties();

        tracing::debug!(
            env = env.len(),
            system = system.len(),
            "Captured ambient definitions"
        );

        Self { env, system }
    }

    /// Adds an environment variable
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Adds a system property
    pub fn with_system(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.system.insert(name.into(), value.into());
        self
    }

    /// Returns the captured environment variables
    pub fn env(&self) -> &IndexMap<String, String> {
        &self.env
    }

    /// Returns the captured system properties
    pub fn system(&self) -> &IndexMap<String, String> {
        &self.system
    }
}

/// Rust counterparts of the usual runtime system properties
fn system_properties() -> IndexMap<String, String> {
    let mut props = IndexMap::new();
    props.insert("os.name".to_string(), std::env::consts::OS.to_string());
    props.insert("os.arch".to_string(), std::env::consts::ARCH.to_string());
    props.insert("os.family".to_string(), std::env::consts::FAMILY.to_string());
    props.insert(
        "file.separator".to_string(),
        std::path::MAIN_SEPARATOR.to_string(),
    );
    props.insert(
        "path.separator".to_string(),
        if cfg!(windows) { ";" } else { ":" }.to_string(),
    );
    props.insert(
        "line.separator".to_string(),
        if cfg!(windows) { "\r\n" } else { "\n" }.to_string(),
    );
    if let Ok(dir) = std::env::current_dir() {
        props.insert("user.dir".to_string(), dir.to_string_lossy().into_owned());
    }
    let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"));
    if let Ok(home) = home {
        props.insert("user.home".to_string(), home);
    }
    let user = std::env::var("USER").or_else(|_| std::env::var("USERNAME"));
    if let Ok(user) = user {
        props.insert("user.name".to_string(), user);
    }
    props
}

/// Returns true if `key` starts with `prefix` followed by a dot, ignoring
/// ASCII case
fn has_namespace(key: &str, prefix: &str) -> bool {
    key.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        && key.as_bytes().get(prefix.len()) == Some(&b'.')
}

/// Rejects user definitions that would shadow the reserved namespaces
pub fn validate_user_definitions(
    definitions: &IndexMap<String, String>,
) -> Result<(), DefinitionError> {
    match definitions
        .keys()
        .find(|key| has_namespace(key, ENV_PREFIX) || has_namespace(key, SYSTEM_PREFIX))
    {
        Some(key) => Err(DefinitionError::ReservedKey { key: key.clone() }),
        None => Ok(()),
    }
}

/// Definition table used while reading one document
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    table: IndexMap<String, String>,
}

impl Definitions {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table with the ambient snapshot and the user definitions
    pub fn seeded(ambient: &AmbientDefinitions, user: &IndexMap<String, String>) -> Self {
        let mut definitions = Self::new();
        for (name, value) in &ambient.env {
            definitions.define(format!("{ENV_PREFIX}.{name}"), value.clone());
        }
        for (name, value) in &ambient.system {
            definitions.define(format!("{SYSTEM_PREFIX}.{name}"), value.clone());
        }
        for (name, value) in user {
            definitions.define(name.clone(), value.clone());
        }
        definitions
    }

    /// Adds or replaces a definition
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.table.insert(name.into(), value.into());
    }

    /// Looks up a definition
    pub fn get(&self, name: &str) -> Option<&str> {
        self.table.get(name).map(String::as_str)
    }

    /// Returns the number of definitions
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no definitions are present
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Replaces every resolvable `${name}` in `text` in a single pass
    ///
    /// Substituted text is not scanned again. If a reference is still present
    /// afterwards the value is rejected with the position of its token.
    pub fn substitute(&self, text: &str, position: Position) -> Result<String, DefinitionError> {
        let substituted = REFERENCE.replace_all(text, |caps: &Captures<'_>| {
            match self.table.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        });

        if let Some(caps) = REFERENCE.captures(&substituted) {
            return Err(DefinitionError::Unresolved {
                name: caps[1].to_string(),
                position,
            });
        }

        Ok(substituted.into_owned())
    }
}
