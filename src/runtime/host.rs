//! Embedder-facing facade over instances and the driver.

use std::fmt;
use std::sync::Arc;

use crate::runtime::context::ContextRef;
use crate::runtime::driver::{DriverConfig, SchedulerDriver};
use crate::runtime::instance::{HostInstance, InstanceRegistry};

/// Owns the process's instance list and scheduler driver.
///
/// Thin glue: instance provisioning delegates to [`InstanceRegistry`] and
/// scheduling to [`SchedulerDriver`]. Both start/stop operations are
/// idempotent.
pub struct ScriptHost {
    instances: Arc<InstanceRegistry>,
    driver: Arc<SchedulerDriver>,
}

impl ScriptHost {
    /// Create a host with the default driver configuration.
    pub fn new() -> Self {
        Self::with_config(DriverConfig::default())
    }

    /// Create a host with a custom driver configuration.
    pub fn with_config(config: DriverConfig) -> Self {
        let instances = Arc::new(InstanceRegistry::new());
        let driver = Arc::new(SchedulerDriver::with_config(instances.clone(), config));
        Self { instances, driver }
    }

    /// Provision a new sandboxed host instance around `root`.
    pub fn create_instance(
        &self,
        root: ContextRef,
    ) -> Arc<HostInstance> {
        self.instances.create(root)
    }

    /// Tear an instance down, abandoning its pending wakes.
    pub fn destroy_instance(
        &self,
        instance: &Arc<HostInstance>,
    ) {
        self.instances.destroy(instance);
    }

    /// Start the background scheduler. No-op while already running.
    pub fn start_scheduler(&self) {
        self.driver.start();
    }

    /// Request the background scheduler to stop.
    pub fn stop_scheduler(&self) {
        self.driver.stop();
    }

    /// The process-wide instance list.
    pub fn instances(&self) -> &Arc<InstanceRegistry> {
        &self.instances
    }

    /// The scheduler driver.
    pub fn driver(&self) -> &Arc<SchedulerDriver> {
        &self.driver
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScriptHost {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ScriptHost")
            .field("instances", &self.instances)
            .field("driver", &self.driver)
            .finish()
    }
}
