//! Layer context: policy, entry points, hooks and the attached-instance table.
//!
//! # Responsibility
//! - Own everything the exported entry points need, in one value.
//! - Track per-instance state from successful creation until destroy.
//!
//! # Invariants
//! - An instance is present in the table only between a successful
//!   downstream creation and its rollback or destroy.
//! - The table lock is never held across a downstream call.

use crate::abi::{
    CreateApiLayerInstanceFn, DestroyInstanceFn, EnumerateApiLayerPropertiesFn,
    EnumerateInstanceExtensionPropertiesFn, GetInstanceProcAddrFn, Instance, PfnVoidFunction,
    VoidFunction, XrResult,
};
use crate::extension::registry::{CapabilityRegistry, LayerDescriptor};
use crate::layer::request::InstanceRequest;
use std::collections::BTreeMap;
use std::error::Error;
use std::ffi::CStr;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// This layer's own exported functions, handed out by the router and the
/// loader negotiation.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoints {
    pub get_instance_proc_addr: GetInstanceProcAddrFn,
    pub create_api_layer_instance: CreateApiLayerInstanceFn,
    pub enumerate_instance_extension_properties: EnumerateInstanceExtensionPropertiesFn,
    pub enumerate_api_layer_properties: EnumerateApiLayerPropertiesFn,
    pub destroy_instance: DestroyInstanceFn,
}

/// Feature logic plugged into the negotiation envelope.
///
/// Every method has a pass-through default.
pub trait LayerHooks: Send + Sync {
    /// Runs after the downstream instance exists and is attached.
    ///
    /// An `Err` (or a panic) rolls the downstream instance back.
    fn on_instance_created(
        &self,
        _instance: &AttachedInstance,
        _request: &InstanceRequest<'_>,
    ) -> Result<(), LayerError> {
        Ok(())
    }

    /// Runs before the downstream instance is destroyed.
    fn on_instance_destroyed(&self, _instance: &AttachedInstance) -> Result<(), LayerError> {
        Ok(())
    }

    /// Function this layer intercepts for an attached instance, if any.
    fn override_proc(&self, _name: &str) -> Option<VoidFunction> {
        None
    }
}

/// Hooks that add nothing; every call is forwarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughHooks;

impl LayerHooks for PassthroughHooks {}

/// Error raised by a [`LayerHooks`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerError {
    message: String,
}

impl LayerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for LayerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for LayerError {}

/// State bound to one instance after successful creation.
#[derive(Debug, Clone)]
pub struct AttachedInstance {
    pub handle: Instance,
    pub next_get_instance_proc_addr: GetInstanceProcAddrFn,
    pub granted_extensions: Vec<String>,
    /// Correlates log lines of the creation call.
    pub activity: Uuid,
}

impl AttachedInstance {
    /// Resolves `name` through the downstream accessor for this instance.
    pub fn resolve_next(&self, name: &CStr) -> Result<VoidFunction, XrResult> {
        let mut function: PfnVoidFunction = None;
        // SAFETY: the accessor was validated non-null during bootstrap and the
        // loader keeps it valid for the instance lifetime.
        let result =
            unsafe { (self.next_get_instance_proc_addr)(self.handle, name.as_ptr(), &mut function) };
        if result.failed() {
            return Err(result);
        }
        function.ok_or(XrResult::ERROR_FUNCTION_UNSUPPORTED)
    }
}

/// Everything the exported entry points operate on.
pub struct LayerContext {
    descriptor: LayerDescriptor,
    registry: CapabilityRegistry,
    entry_points: EntryPoints,
    hooks: Box<dyn LayerHooks>,
    instances: Mutex<BTreeMap<Instance, AttachedInstance>>,
}

impl LayerContext {
    pub fn new(
        descriptor: LayerDescriptor,
        registry: CapabilityRegistry,
        entry_points: EntryPoints,
        hooks: Box<dyn LayerHooks>,
    ) -> Self {
        Self {
            descriptor,
            registry,
            entry_points,
            hooks,
            instances: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn descriptor(&self) -> &LayerDescriptor {
        &self.descriptor
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    pub(crate) fn hooks(&self) -> &dyn LayerHooks {
        self.hooks.as_ref()
    }

    /// Snapshot of the state attached to `instance`.
    pub fn attached(&self, instance: Instance) -> Option<AttachedInstance> {
        self.instances().get(&instance).cloned()
    }

    pub fn attached_count(&self) -> usize {
        self.instances().len()
    }

    pub(crate) fn attach(&self, instance: AttachedInstance) {
        self.instances().insert(instance.handle, instance);
    }

    pub(crate) fn detach(&self, instance: Instance) -> Option<AttachedInstance> {
        self.instances().remove(&instance)
    }

    fn instances(&self) -> MutexGuard<'_, BTreeMap<Instance, AttachedInstance>> {
        // Entries stay consistent even if a holder panicked.
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
