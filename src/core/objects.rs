/// Owner objects and named-method dispatch
///
/// A call-out names a method on the object that registered it. Objects
/// expose their methods through `CallOutTarget::invoke_named`, and live in
/// an `ObjectTable` keyed by `OwnerId`. Destroying an object removes it
/// from the table; any call-out still naming it is dropped at fire time.

use crate::callout::{CallOutRegistry, OwnerScope};
use crate::error::{CalloutError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Identity of an owner object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    pub fn new() -> Self {
        OwnerId(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An object whose methods can be invoked by name from a call-out
pub trait CallOutTarget: Send {
    /// Short label used in logs
    fn label(&self) -> &str {
        "object"
    }

    /// Invoke `method` with the call-out's stored argument
    ///
    /// `arg` is `None` when the call-out was registered without one.
    /// `scope` lets the method manage its own owner's call-outs,
    /// e.g. to reschedule itself.
    fn invoke_named(
        &mut self,
        method: &str,
        arg: Option<&Value>,
        scope: &mut OwnerScope<'_>,
    ) -> Result<()>;
}

type Method = Box<dyn FnMut(Option<&Value>, &mut OwnerScope<'_>) -> Result<()> + Send>;

/// A `CallOutTarget` assembled from closures, one per method name
pub struct MethodTable {
    label: String,
    methods: HashMap<String, Method>,
}

impl MethodTable {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            methods: HashMap::new(),
        }
    }

    /// Register a method (replaces any existing one with the same name)
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(Option<&Value>, &mut OwnerScope<'_>) -> Result<()> + Send + 'static,
    {
        self.methods.insert(name.into(), Box::new(f));
        self
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl CallOutTarget for MethodTable {
    fn label(&self) -> &str {
        &self.label
    }

    fn invoke_named(
        &mut self,
        method: &str,
        arg: Option<&Value>,
        scope: &mut OwnerScope<'_>,
    ) -> Result<()> {
        match self.methods.get_mut(method) {
            Some(f) => f(arg, scope),
            None => Err(CalloutError::UnknownMethod {
                owner: self.label.clone(),
                method: method.to_string(),
            }),
        }
    }
}

/// Live owner objects
#[derive(Default)]
pub struct ObjectTable {
    objects: HashMap<OwnerId, Box<dyn CallOutTarget>>,
}

impl ObjectTable {
    pub fn new() -> Self {
        debug!("Creating new ObjectTable");
        Self::default()
    }

    /// Add an object under a fresh id
    pub fn insert(&mut self, target: impl CallOutTarget + 'static) -> OwnerId {
        let id = OwnerId::new();
        self.insert_with_id(id, target);
        id
    }

    /// Add (or replace) an object under a known id
    pub fn insert_with_id(&mut self, id: OwnerId, target: impl CallOutTarget + 'static) {
        info!("Registering object '{}' as {}", target.label(), id);
        self.objects.insert(id, Box::new(target));
    }

    pub fn contains(&self, id: OwnerId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get_mut(&mut self, id: OwnerId) -> Option<&mut Box<dyn CallOutTarget>> {
        self.objects.get_mut(&id)
    }

    /// Remove an object without touching its call-outs
    ///
    /// Pending call-outs stay in the registry and are dropped when they
    /// come due.
    pub fn remove(&mut self, id: OwnerId) -> Option<Box<dyn CallOutTarget>> {
        let removed = self.objects.remove(&id);
        if removed.is_some() {
            debug!("Object {} removed from table", id);
        }
        removed
    }

    /// Destroy an object and cancel every call-out it owns
    pub fn destruct(&mut self, id: OwnerId, registry: &mut CallOutRegistry) -> bool {
        match self.objects.remove(&id) {
            Some(target) => {
                let cancelled = registry.remove_owner(id);
                info!(
                    "Destructed '{}' ({}), cancelled {} call-out(s)",
                    target.label(),
                    id,
                    cancelled
                );
                true
            }
            None => {
                debug!("Destruct of unknown object {}", id);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
