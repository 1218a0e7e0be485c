//! Namespace registry shared by every analysis in a process.
//!
//! Holds, per namespace, the definitions created by `def`-family forms and
//! the alias tables populated by `ns`: use-aliases (short name → host class),
//! require-aliases (short name → namespace) and refers (symbol → namespace it
//! was pulled from). Aliases are namespace-scoped; no lookup here ever
//! consults another namespace's tables.
//!
//! All mutation goes through a single `RwLock` writer so a registry can be
//! shared between files analyzed on different threads.

use crate::ast::{Form, FormMap};
use crate::config::AnalyzerConfig;
use indexmap::IndexMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("namespace registry lock poisoned: {0}")]
    Poisoned(String),
    #[error("Symbol '{name}' is already defined in namespace '{namespace}'")]
    DuplicateDefinition { namespace: String, name: String },
}

/// A top-level definition as seen at analysis time: only its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub namespace: String,
    pub name: String,
    pub meta: FormMap,
}

impl Definition {
    pub fn new(namespace: &str, name: &str, meta: FormMap) -> Self {
        Definition {
            namespace: namespace.to_string(),
            name: name.to_string(),
            meta,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    pub fn meta_value(&self, key: &str) -> Option<&Form> {
        self.meta.get(&Form::keyword(key))
    }

    fn flag(&self, key: &str) -> bool {
        self.meta_value(key).map_or(false, Form::is_truthy)
    }

    pub fn is_macro(&self) -> bool {
        self.flag("macro")
    }

    pub fn is_inline(&self) -> bool {
        self.flag("inline")
    }

    /// Inline expansion is gated by an arity predicate when this key is present.
    pub fn has_inline_arity(&self) -> bool {
        self.meta_value("inline-arity").is_some()
    }

    pub fn is_private(&self) -> bool {
        self.flag("private")
    }

    pub fn doc(&self) -> Option<&str> {
        match self.meta_value("doc") {
            Some(Form::Str(doc)) => Some(doc),
            _ => None,
        }
    }
}

/// Everything the registry knows about one namespace.
#[derive(Debug, Clone, Default)]
struct NamespaceTable {
    definitions: IndexMap<String, Definition>,
    use_aliases: IndexMap<String, String>,
    require_aliases: IndexMap<String, String>,
    refers: IndexMap<String, String>,
    interfaces: IndexMap<String, Vec<String>>,
}

#[derive(Debug)]
pub struct NamespaceRegistry {
    current: RwLock<String>,
    namespaces: RwLock<IndexMap<String, NamespaceTable>>,
    allow_redefinition: bool,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        NamespaceRegistry::from_config(&AnalyzerConfig::default())
    }
}

impl NamespaceRegistry {
    pub fn new(initial_namespace: &str) -> Self {
        let mut namespaces = IndexMap::new();
        namespaces.insert(initial_namespace.to_string(), NamespaceTable::default());
        NamespaceRegistry {
            current: RwLock::new(initial_namespace.to_string()),
            namespaces: RwLock::new(namespaces),
            allow_redefinition: false,
        }
    }

    /// Registry positioned in the configured default namespace, with the
    /// core namespace already present.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let mut registry = NamespaceRegistry::new(&config.default_namespace);
        registry.allow_redefinition = config.allow_redefinition;
        if let Ok(tables) = registry.namespaces.get_mut() {
            tables.entry(config.core_namespace.clone()).or_default();
        }
        registry
    }

    pub fn with_redefinition(mut self, allow: bool) -> Self {
        self.allow_redefinition = allow;
        self
    }

    fn tables(&self) -> RegistryResult<RwLockReadGuard<'_, IndexMap<String, NamespaceTable>>> {
        self.namespaces
            .read()
            .map_err(|e| RegistryError::Poisoned(e.to_string()))
    }

    fn tables_mut(&self) -> RegistryResult<RwLockWriteGuard<'_, IndexMap<String, NamespaceTable>>> {
        self.namespaces
            .write()
            .map_err(|e| RegistryError::Poisoned(e.to_string()))
    }

    fn lookup<T>(
        &self,
        namespace: &str,
        f: impl FnOnce(&NamespaceTable) -> Option<T>,
    ) -> RegistryResult<Option<T>> {
        Ok(self.tables()?.get(namespace).and_then(f))
    }

    fn update<T>(&self, namespace: &str, f: impl FnOnce(&mut NamespaceTable) -> T) -> RegistryResult<T> {
        let mut tables = self.tables_mut()?;
        Ok(f(tables.entry(namespace.to_string()).or_default()))
    }

    // --- Current namespace ---

    pub fn current_namespace(&self) -> RegistryResult<String> {
        self.current
            .read()
            .map(|ns| ns.clone())
            .map_err(|e| RegistryError::Poisoned(e.to_string()))
    }

    /// Side channel used by `ns`/`in-ns`: later top-level forms register
    /// their definitions under `namespace`.
    pub fn set_current_namespace(&self, namespace: &str) -> RegistryResult<()> {
        self.update(namespace, |_| ())?;
        let mut current = self
            .current
            .write()
            .map_err(|e| RegistryError::Poisoned(e.to_string()))?;
        if *current != namespace {
            log::debug!("Switching current namespace {} -> {}", current, namespace);
        }
        *current = namespace.to_string();
        Ok(())
    }

    pub fn has_namespace(&self, namespace: &str) -> RegistryResult<bool> {
        Ok(self.tables()?.contains_key(namespace))
    }

    // --- Definitions ---

    /// Registers `name` and returns the definition it replaced, if any.
    pub fn add_definition(
        &self,
        namespace: &str,
        name: &str,
        meta: FormMap,
    ) -> RegistryResult<Option<Definition>> {
        let allow_redefinition = self.allow_redefinition;
        self.update(namespace, |table| {
            if table.definitions.contains_key(name) {
                if !allow_redefinition {
                    return Err(RegistryError::DuplicateDefinition {
                        namespace: namespace.to_string(),
                        name: name.to_string(),
                    });
                }
                log::debug!("Redefining {}/{}", namespace, name);
            } else {
                log::debug!("Registering definition {}/{}", namespace, name);
            }
            Ok(table
                .definitions
                .insert(name.to_string(), Definition::new(namespace, name, meta)))
        })?
    }

    /// Undoes an `add_definition`: puts `previous` back, or drops the entry
    /// when there was none.
    pub fn restore_definition(
        &self,
        namespace: &str,
        name: &str,
        previous: Option<Definition>,
    ) -> RegistryResult<()> {
        log::debug!("Rolling back definition {}/{}", namespace, name);
        self.update(namespace, |table| match previous {
            Some(definition) => {
                table.definitions.insert(name.to_string(), definition);
            }
            None => {
                table.definitions.shift_remove(name);
            }
        })
    }

    pub fn definition(&self, namespace: &str, name: &str) -> RegistryResult<Option<Definition>> {
        self.lookup(namespace, |table| table.definitions.get(name).cloned())
    }

    // --- Alias tables ---

    pub fn add_use_alias(&self, namespace: &str, alias: &str, class_name: &str) -> RegistryResult<()> {
        log::debug!("{}: use {} as {}", namespace, class_name, alias);
        self.update(namespace, |table| {
            table
                .use_aliases
                .insert(alias.to_string(), class_name.to_string());
        })
    }

    pub fn use_alias(&self, namespace: &str, alias: &str) -> RegistryResult<Option<String>> {
        self.lookup(namespace, |table| table.use_aliases.get(alias).cloned())
    }

    pub fn add_require_alias(&self, namespace: &str, alias: &str, target: &str) -> RegistryResult<()> {
        log::debug!("{}: require {} as {}", namespace, target, alias);
        self.update(namespace, |table| {
            table
                .require_aliases
                .insert(alias.to_string(), target.to_string());
        })
    }

    pub fn require_alias(&self, namespace: &str, alias: &str) -> RegistryResult<Option<String>> {
        self.lookup(namespace, |table| table.require_aliases.get(alias).cloned())
    }

    pub fn add_refer(&self, namespace: &str, name: &str, source_namespace: &str) -> RegistryResult<()> {
        self.update(namespace, |table| {
            table
                .refers
                .insert(name.to_string(), source_namespace.to_string());
        })
    }

    pub fn refer(&self, namespace: &str, name: &str) -> RegistryResult<Option<String>> {
        self.lookup(namespace, |table| table.refers.get(name).cloned())
    }

    // --- Interfaces ---

    pub fn add_interface(&self, namespace: &str, name: &str, methods: Vec<String>) -> RegistryResult<()> {
        self.update(namespace, |table| {
            table.interfaces.insert(name.to_string(), methods);
        })
    }

    pub fn interface_methods(&self, namespace: &str, name: &str) -> RegistryResult<Option<Vec<String>>> {
        self.lookup(namespace, |table| table.interfaces.get(name).cloned())
    }
}
