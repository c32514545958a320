//! Mock loader chain and runtime shared by integration tests.
//!
//! All mock state is thread-local so tests running in parallel never see
//! each other's chains.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, CStr, CString};
use std::sync::atomic::{AtomicU64, Ordering};
use xrlayer_core::abi::{
    read_name, ApiLayerCreateInfo, ApiLayerNextInfo, ApiLayerProperties, ApplicationInfo,
    CreateApiLayerInstanceFn, DestroyInstanceFn, EnumerateInstanceExtensionPropertiesFn,
    ExtensionProperties, GetInstanceProcAddrFn, Instance, InstanceCreateInfo, PfnVoidFunction,
    StructureType, VoidFunction, XrResult, CURRENT_API_VERSION,
};
use xrlayer_core::{
    CapabilityRegistry, ChainLink, EntryPoints, ExtensionEntry, LayerContext, LayerDescriptor,
    LayerHooks, PassthroughHooks, LAYER_NAME,
};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

#[derive(Debug, Default)]
pub struct MockState {
    pub runtime_extensions: Vec<(String, u32)>,
    pub layer_extensions: HashMap<String, Vec<(String, u32)>>,
    pub failing_enumeration: Vec<Option<String>>,
    pub create_result: Option<XrResult>,
    pub hide_destroy: bool,
    pub create_calls: usize,
    pub forwarded_extensions: Vec<String>,
    pub forwarded_next_layer: Option<String>,
    pub enumerate_calls: usize,
    pub destroyed: Vec<Instance>,
}

thread_local! {
    static STATE: RefCell<MockState> = RefCell::new(MockState::default());
}

/// Clears the mock runtime for the current thread.
pub fn reset() {
    STATE.with(|state| *state.borrow_mut() = MockState::default());
}

pub fn with_state<R>(f: impl FnOnce(&mut MockState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

pub fn set_runtime_extensions(extensions: &[(&str, u32)]) {
    with_state(|state| state.runtime_extensions = owned(extensions));
}

pub fn set_layer_extensions(layer: &str, extensions: &[(&str, u32)]) {
    with_state(|state| {
        state
            .layer_extensions
            .insert(layer.to_string(), owned(extensions));
    });
}

fn owned(extensions: &[(&str, u32)]) -> Vec<(String, u32)> {
    extensions
        .iter()
        .map(|(name, version)| (name.to_string(), *version))
        .collect()
}

pub unsafe extern "system" fn mock_get_instance_proc_addr(
    _instance: Instance,
    name: *const c_char,
    function: *mut PfnVoidFunction,
) -> XrResult {
    let name = CStr::from_ptr(name).to_bytes();
    let resolved: Option<VoidFunction> = match name {
        b"xrEnumerateInstanceExtensionProperties" => Some(std::mem::transmute::<
            EnumerateInstanceExtensionPropertiesFn,
            VoidFunction,
        >(mock_enumerate_instance_extension_properties)),
        b"xrDestroyInstance" if !with_state(|state| state.hide_destroy) => Some(
            std::mem::transmute::<DestroyInstanceFn, VoidFunction>(mock_destroy_instance),
        ),
        b"xrMockFunction" => Some(mock_plain_function as VoidFunction),
        _ => None,
    };
    *function = resolved;
    match resolved {
        Some(_) => XrResult::SUCCESS,
        None => XrResult::ERROR_FUNCTION_UNSUPPORTED,
    }
}

pub unsafe extern "system" fn mock_enumerate_instance_extension_properties(
    layer_name: *const c_char,
    capacity: u32,
    count_out: *mut u32,
    properties: *mut ExtensionProperties,
) -> XrResult {
    let layer = (!layer_name.is_null())
        .then(|| CStr::from_ptr(layer_name).to_string_lossy().into_owned());
    let (entries, fails) = with_state(|state| {
        state.enumerate_calls += 1;
        let entries = match &layer {
            None => state.runtime_extensions.clone(),
            Some(name) => state.layer_extensions.get(name).cloned().unwrap_or_default(),
        };
        (entries, state.failing_enumeration.contains(&layer))
    });
    if fails {
        return XrResult::ERROR_RUNTIME_FAILURE;
    }

    let needed = entries.len() as u32;
    if capacity == 0 {
        *count_out = needed;
        return XrResult::SUCCESS;
    }
    if capacity < needed {
        return XrResult::ERROR_SIZE_INSUFFICIENT;
    }
    for (index, (name, version)) in entries.iter().enumerate() {
        *properties.add(index) = ExtensionProperties::new(name, *version);
    }
    *count_out = needed;
    XrResult::SUCCESS
}

pub unsafe extern "system" fn mock_create_api_layer_instance(
    create_info: *const InstanceCreateInfo,
    api_layer_info: *const ApiLayerCreateInfo,
    instance_out: *mut Instance,
) -> XrResult {
    let create_info = &*create_info;
    let names: Vec<String> = if create_info.enabled_extension_count == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(
            create_info.enabled_extension_names,
            create_info.enabled_extension_count as usize,
        )
        .iter()
        .map(|pointer| CStr::from_ptr(*pointer).to_string_lossy().into_owned())
        .collect()
    };
    let next_layer = (*api_layer_info)
        .next_info
        .as_ref()
        .and_then(|next| read_name(&next.layer_name))
        .map(|name| name.to_string_lossy().into_owned());

    let result = with_state(|state| {
        state.create_calls += 1;
        state.forwarded_extensions = names;
        state.forwarded_next_layer = next_layer;
        state.create_result
    });
    if let Some(result) = result {
        if result.failed() {
            return result;
        }
    }
    *instance_out = Instance(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
    XrResult::SUCCESS
}

pub unsafe extern "system" fn mock_destroy_instance(instance: Instance) -> XrResult {
    with_state(|state| state.destroyed.push(instance));
    XrResult::SUCCESS
}

pub unsafe extern "system" fn mock_plain_function() {}

pub unsafe extern "system" fn stub_get_instance_proc_addr(
    _instance: Instance,
    _name: *const c_char,
    _function: *mut PfnVoidFunction,
) -> XrResult {
    XrResult::SUCCESS
}

pub unsafe extern "system" fn stub_create_api_layer_instance(
    _create_info: *const InstanceCreateInfo,
    _api_layer_info: *const ApiLayerCreateInfo,
    _instance_out: *mut Instance,
) -> XrResult {
    XrResult::SUCCESS
}

pub unsafe extern "system" fn stub_enumerate_instance_extension_properties(
    _layer_name: *const c_char,
    _capacity: u32,
    _count_out: *mut u32,
    _properties: *mut ExtensionProperties,
) -> XrResult {
    XrResult::SUCCESS
}

pub unsafe extern "system" fn stub_enumerate_api_layer_properties(
    _capacity: u32,
    _count_out: *mut u32,
    _properties: *mut ApiLayerProperties,
) -> XrResult {
    XrResult::SUCCESS
}

pub unsafe extern "system" fn stub_destroy_instance(_instance: Instance) -> XrResult {
    XrResult::SUCCESS
}

pub fn stub_entry_points() -> EntryPoints {
    EntryPoints {
        get_instance_proc_addr: stub_get_instance_proc_addr,
        create_api_layer_instance: stub_create_api_layer_instance,
        enumerate_instance_extension_properties: stub_enumerate_instance_extension_properties,
        enumerate_api_layer_properties: stub_enumerate_api_layer_properties,
        destroy_instance: stub_destroy_instance,
    }
}

pub fn fn_addr(function: VoidFunction) -> usize {
    function as usize
}

pub fn context_with(registry: CapabilityRegistry, hooks: Box<dyn LayerHooks>) -> LayerContext {
    LayerContext::new(
        LayerDescriptor::builtin(),
        registry,
        stub_entry_points(),
        hooks,
    )
}

pub fn context_requiring(implicit: &[&str], blocked: &[&str]) -> LayerContext {
    let registry = CapabilityRegistry::new(
        vec![ExtensionEntry::new("XR_TEMPLATE_layer_feature", 2)],
        implicit.iter().map(|name| name.to_string()).collect(),
        blocked.iter().map(|name| name.to_string()).collect(),
    )
    .expect("valid registry");
    context_with(registry, Box::new(PassthroughHooks))
}

/// Loader-style chain: this layer first, then `downstream_layers`, then
/// the runtime binding on the tail's accessors.
pub struct MockChain {
    nodes: Vec<Box<ApiLayerNextInfo>>,
    create_info: Box<ApiLayerCreateInfo>,
}

impl MockChain {
    pub fn new(downstream_layers: &[&str]) -> Self {
        let accessor: GetInstanceProcAddrFn = mock_get_instance_proc_addr;
        let create: CreateApiLayerInstanceFn = mock_create_api_layer_instance;

        let mut nodes: Vec<Box<ApiLayerNextInfo>> = std::iter::once(LAYER_NAME)
            .chain(downstream_layers.iter().copied())
            .map(|name| Box::new(ApiLayerNextInfo::new(name, Some(accessor), Some(create))))
            .collect();
        for index in 0..nodes.len() - 1 {
            let next: *mut ApiLayerNextInfo = &mut *nodes[index + 1];
            nodes[index].next = next;
        }
        let head: *mut ApiLayerNextInfo = &mut *nodes[0];
        let create_info = Box::new(ApiLayerCreateInfo::new(head));
        Self { nodes, create_info }
    }

    pub fn api_layer_info(&self) -> *const ApiLayerCreateInfo {
        &*self.create_info
    }

    pub fn api_layer_info_mut(&mut self) -> &mut ApiLayerCreateInfo {
        &mut self.create_info
    }

    pub fn head_mut(&mut self) -> &mut ApiLayerNextInfo {
        &mut self.nodes[0]
    }

    pub fn head(&self) -> ChainLink<'_> {
        ChainLink::from_ref(&self.nodes[0])
    }
}

/// Application-side creation parameters with owned extension names.
pub struct MockCreateInfo {
    _names: Vec<CString>,
    _pointers: Vec<*const c_char>,
    info: InstanceCreateInfo,
}

impl MockCreateInfo {
    pub fn new(extensions: &[&str]) -> Self {
        let names: Vec<CString> = extensions
            .iter()
            .map(|name| CString::new(*name).expect("extension name"))
            .collect();
        let pointers: Vec<*const c_char> = names.iter().map(|name| name.as_ptr()).collect();
        let info = InstanceCreateInfo {
            ty: StructureType::INSTANCE_CREATE_INFO,
            next: std::ptr::null(),
            create_flags: 0,
            application_info: ApplicationInfo::new("mock-app", CURRENT_API_VERSION),
            enabled_api_layer_count: 0,
            enabled_api_layer_names: std::ptr::null(),
            enabled_extension_count: pointers.len() as u32,
            enabled_extension_names: if pointers.is_empty() {
                std::ptr::null()
            } else {
                pointers.as_ptr()
            },
        };
        Self {
            _names: names,
            _pointers: pointers,
            info,
        }
    }

    pub fn as_ptr(&self) -> *const InstanceCreateInfo {
        &self.info
    }

    pub fn requested_names(&self) -> Vec<String> {
        self._names
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }
}

/// Runs the full creation call against `chain` and returns the result and handle.
pub fn create(
    context: &LayerContext,
    chain: &MockChain,
    request: &MockCreateInfo,
) -> (XrResult, Instance) {
    let mut instance = Instance::NULL;
    let result = unsafe {
        context.create_api_layer_instance(request.as_ptr(), chain.api_layer_info(), &mut instance)
    };
    (result, instance)
}
