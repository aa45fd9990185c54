//! Live host instances and the process-wide instance list.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::runtime::context::ContextRef;
use crate::runtime::wake::WakeRegistry;

/// Identifier for one live host instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl fmt::Display for InstanceId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// One embedded interpreter root and its scheduling state.
///
/// Owns exactly one [`WakeRegistry`]. Torn down through
/// [`InstanceRegistry::destroy`], which abandons any pending tickets.
pub struct HostInstance {
    id: InstanceId,
    root: ContextRef,
    registry: WakeRegistry,
}

impl HostInstance {
    fn new(
        id: InstanceId,
        root: ContextRef,
    ) -> Self {
        Self {
            id,
            root,
            registry: WakeRegistry::new(),
        }
    }

    /// Instance identifier.
    #[inline]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The instance's root execution context.
    #[inline]
    pub fn root(&self) -> &ContextRef {
        &self.root
    }

    /// The instance's wake registry.
    #[inline]
    pub fn registry(&self) -> &WakeRegistry {
        &self.registry
    }
}

impl fmt::Debug for HostInstance {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("HostInstance")
            .field("id", &self.id)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Process-wide list of live host instances.
///
/// Instances register on creation and deregister on teardown; the driver
/// holds a read-capable handle and snapshots the list once per tick. This is
/// an explicitly owned registry, not an ambient global.
#[derive(Default)]
pub struct InstanceRegistry {
    next_id: AtomicU64,
    instances: RwLock<Vec<Arc<HostInstance>>>,
}

impl InstanceRegistry {
    /// Create an empty instance list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a new host instance around `root` and register it.
    pub fn create(
        &self,
        root: ContextRef,
    ) -> Arc<HostInstance> {
        let id = InstanceId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let instance = Arc::new(HostInstance::new(id, root));
        self.instances.write().push(instance.clone());
        tracing::debug!("{} created", id);
        instance
    }

    /// Tear an instance down: deregister it and abandon its pending wakes.
    ///
    /// Abandoned tickets are never resumed. Idempotent for an instance that
    /// was already removed.
    pub fn destroy(
        &self,
        instance: &Arc<HostInstance>,
    ) {
        self.instances
            .write()
            .retain(|live| live.id() != instance.id());
        instance.registry().discard_all();
        tracing::debug!("{} destroyed", instance.id());
    }

    /// Snapshot of the live instances, taken once per driver tick.
    pub fn snapshot(&self) -> Vec<Arc<HostInstance>> {
        self.instances.read().clone()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Whether no instance is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("live", &self.len())
            .finish()
    }
}
