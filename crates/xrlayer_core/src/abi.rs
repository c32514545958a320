//! C ABI shapes shared with the loader, the runtime and neighbouring layers.
//!
//! # Responsibility
//! - Mirror the loader-interface and instance-creation structures bit for bit.
//! - Provide the status code and handle newtypes used across the boundary.
//!
//! # Invariants
//! - Every struct here is `#[repr(C)]` and matches the host header layout.
//! - Fixed-size name buffers are always NUL-terminated when written by us.

use std::ffi::{c_char, c_void, CStr};
use std::fmt::{Display, Formatter};

/// Capacity of `ExtensionProperties::extension_name`.
pub const MAX_EXTENSION_NAME_SIZE: usize = 128;
/// Capacity of layer name buffers.
pub const MAX_API_LAYER_NAME_SIZE: usize = 256;
/// Capacity of `ApiLayerProperties::description`.
pub const MAX_API_LAYER_DESCRIPTION_SIZE: usize = 256;
/// Capacity of `ApiLayerCreateInfo::settings_file_location`.
pub const API_LAYER_MAX_SETTINGS_PATH_SIZE: usize = 512;
pub const MAX_APPLICATION_NAME_SIZE: usize = 128;
pub const MAX_ENGINE_NAME_SIZE: usize = 128;

pub const API_LAYER_CREATE_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_NEXT_INFO_STRUCT_VERSION: u32 = 1;
pub const LOADER_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_INFO_STRUCT_VERSION: u32 = 1;
/// Loader <-> layer interface revision implemented by this crate.
pub const CURRENT_LOADER_API_LAYER_VERSION: u32 = 1;

/// API version this layer was written against.
pub const CURRENT_API_VERSION: u64 = make_version(1, 0, 34);

/// Packs a `major.minor.patch` triple the way the host API does.
pub const fn make_version(major: u64, minor: u64, patch: u64) -> u64 {
    ((major & 0xffff) << 48) | ((minor & 0xffff) << 32) | (patch & 0xffff_ffff)
}

pub const fn version_major(version: u64) -> u64 {
    (version >> 48) & 0xffff
}

pub const fn version_minor(version: u64) -> u64 {
    (version >> 32) & 0xffff
}

pub const fn version_patch(version: u64) -> u64 {
    version & 0xffff_ffff
}

/// Host status code. Negative values are failures.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XrResult(pub i32);

impl XrResult {
    pub const SUCCESS: Self = Self(0);
    pub const ERROR_VALIDATION_FAILURE: Self = Self(-1);
    pub const ERROR_RUNTIME_FAILURE: Self = Self(-2);
    pub const ERROR_OUT_OF_MEMORY: Self = Self(-3);
    pub const ERROR_API_VERSION_UNSUPPORTED: Self = Self(-4);
    pub const ERROR_INITIALIZATION_FAILED: Self = Self(-6);
    pub const ERROR_FUNCTION_UNSUPPORTED: Self = Self(-7);
    pub const ERROR_EXTENSION_NOT_PRESENT: Self = Self(-9);
    pub const ERROR_SIZE_INSUFFICIENT: Self = Self(-11);
    pub const ERROR_HANDLE_INVALID: Self = Self(-12);

    pub fn succeeded(self) -> bool {
        self.0 >= 0
    }

    pub fn failed(self) -> bool {
        self.0 < 0
    }

    /// Symbolic name used in log lines.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::SUCCESS => "XR_SUCCESS",
            Self::ERROR_VALIDATION_FAILURE => "XR_ERROR_VALIDATION_FAILURE",
            Self::ERROR_RUNTIME_FAILURE => "XR_ERROR_RUNTIME_FAILURE",
            Self::ERROR_OUT_OF_MEMORY => "XR_ERROR_OUT_OF_MEMORY",
            Self::ERROR_API_VERSION_UNSUPPORTED => "XR_ERROR_API_VERSION_UNSUPPORTED",
            Self::ERROR_INITIALIZATION_FAILED => "XR_ERROR_INITIALIZATION_FAILED",
            Self::ERROR_FUNCTION_UNSUPPORTED => "XR_ERROR_FUNCTION_UNSUPPORTED",
            Self::ERROR_EXTENSION_NOT_PRESENT => "XR_ERROR_EXTENSION_NOT_PRESENT",
            Self::ERROR_SIZE_INSUFFICIENT => "XR_ERROR_SIZE_INSUFFICIENT",
            Self::ERROR_HANDLE_INVALID => "XR_ERROR_HANDLE_INVALID",
            _ => return None,
        };
        Some(name)
    }
}

impl Display for XrResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "XR_UNKNOWN_RESULT_{}", self.0),
        }
    }
}

/// Opaque instance handle produced by the runtime.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instance(pub u64);

impl Instance {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// `XrStructureType` tag for application-visible structs.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureType(pub i32);

impl StructureType {
    pub const API_LAYER_PROPERTIES: Self = Self(1);
    pub const EXTENSION_PROPERTIES: Self = Self(2);
    pub const INSTANCE_CREATE_INFO: Self = Self(3);
}

/// `XrLoaderInterfaceStructs` tag for loader-only structs.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderInterfaceStruct(pub i32);

impl LoaderInterfaceStruct {
    pub const UNINITIALIZED: Self = Self(0);
    pub const LOADER_INFO: Self = Self(1);
    pub const API_LAYER_REQUEST: Self = Self(2);
    pub const RUNTIME_REQUEST: Self = Self(3);
    pub const API_LAYER_CREATE_INFO: Self = Self(4);
    pub const API_LAYER_NEXT_INFO: Self = Self(5);
}

pub type VoidFunction = unsafe extern "system" fn();
pub type PfnVoidFunction = Option<VoidFunction>;

pub type GetInstanceProcAddrFn =
    unsafe extern "system" fn(Instance, *const c_char, *mut PfnVoidFunction) -> XrResult;
pub type CreateApiLayerInstanceFn = unsafe extern "system" fn(
    *const InstanceCreateInfo,
    *const ApiLayerCreateInfo,
    *mut Instance,
) -> XrResult;
pub type EnumerateInstanceExtensionPropertiesFn = unsafe extern "system" fn(
    *const c_char,
    u32,
    *mut u32,
    *mut ExtensionProperties,
) -> XrResult;
pub type EnumerateApiLayerPropertiesFn =
    unsafe extern "system" fn(u32, *mut u32, *mut ApiLayerProperties) -> XrResult;
pub type DestroyInstanceFn = unsafe extern "system" fn(Instance) -> XrResult;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ApplicationInfo {
    pub application_name: [c_char; MAX_APPLICATION_NAME_SIZE],
    pub application_version: u32,
    pub engine_name: [c_char; MAX_ENGINE_NAME_SIZE],
    pub engine_version: u32,
    pub api_version: u64,
}

impl ApplicationInfo {
    pub fn new(application_name: &str, api_version: u64) -> Self {
        let mut info = Self {
            application_name: [0; MAX_APPLICATION_NAME_SIZE],
            application_version: 0,
            engine_name: [0; MAX_ENGINE_NAME_SIZE],
            engine_version: 0,
            api_version,
        };
        write_name(&mut info.application_name, application_name);
        info
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InstanceCreateInfo {
    pub ty: StructureType,
    pub next: *const c_void,
    pub create_flags: u64,
    pub application_info: ApplicationInfo,
    pub enabled_api_layer_count: u32,
    pub enabled_api_layer_names: *const *const c_char,
    pub enabled_extension_count: u32,
    pub enabled_extension_names: *const *const c_char,
}

/// Handshake envelope the loader hands to `create_api_layer_instance`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ApiLayerCreateInfo {
    pub struct_type: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub loader_instance: *mut c_void,
    pub settings_file_location: [c_char; API_LAYER_MAX_SETTINGS_PATH_SIZE],
    pub next_info: *mut ApiLayerNextInfo,
}

impl ApiLayerCreateInfo {
    /// Envelope with correct tags pointing at `next_info`.
    pub fn new(next_info: *mut ApiLayerNextInfo) -> Self {
        Self {
            struct_type: LoaderInterfaceStruct::API_LAYER_CREATE_INFO,
            struct_version: API_LAYER_CREATE_INFO_STRUCT_VERSION,
            struct_size: std::mem::size_of::<Self>(),
            loader_instance: std::ptr::null_mut(),
            settings_file_location: [0; API_LAYER_MAX_SETTINGS_PATH_SIZE],
            next_info,
        }
    }
}

/// One node of the layer chain. The tail's accessors are the runtime's.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ApiLayerNextInfo {
    pub struct_type: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_name: [c_char; MAX_API_LAYER_NAME_SIZE],
    pub next_get_instance_proc_addr: Option<GetInstanceProcAddrFn>,
    pub next_create_api_layer_instance: Option<CreateApiLayerInstanceFn>,
    pub next: *mut ApiLayerNextInfo,
}

impl ApiLayerNextInfo {
    pub fn new(
        layer_name: &str,
        next_get_instance_proc_addr: Option<GetInstanceProcAddrFn>,
        next_create_api_layer_instance: Option<CreateApiLayerInstanceFn>,
    ) -> Self {
        let mut info = Self {
            struct_type: LoaderInterfaceStruct::API_LAYER_NEXT_INFO,
            struct_version: API_LAYER_NEXT_INFO_STRUCT_VERSION,
            struct_size: std::mem::size_of::<Self>(),
            layer_name: [0; MAX_API_LAYER_NAME_SIZE],
            next_get_instance_proc_addr,
            next_create_api_layer_instance,
            next: std::ptr::null_mut(),
        };
        write_name(&mut info.layer_name, layer_name);
        info
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ExtensionProperties {
    pub ty: StructureType,
    pub next: *mut c_void,
    pub extension_name: [c_char; MAX_EXTENSION_NAME_SIZE],
    pub extension_version: u32,
}

impl ExtensionProperties {
    pub fn empty() -> Self {
        Self {
            ty: StructureType::EXTENSION_PROPERTIES,
            next: std::ptr::null_mut(),
            extension_name: [0; MAX_EXTENSION_NAME_SIZE],
            extension_version: 0,
        }
    }

    pub fn new(name: &str, version: u32) -> Self {
        let mut properties = Self::empty();
        write_name(&mut properties.extension_name, name);
        properties.extension_version = version;
        properties
    }

    pub fn name(&self) -> Option<&CStr> {
        read_name(&self.extension_name)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ApiLayerProperties {
    pub ty: StructureType,
    pub next: *mut c_void,
    pub layer_name: [c_char; MAX_API_LAYER_NAME_SIZE],
    pub spec_version: u64,
    pub layer_version: u32,
    pub description: [c_char; MAX_API_LAYER_DESCRIPTION_SIZE],
}

impl ApiLayerProperties {
    pub fn empty() -> Self {
        Self {
            ty: StructureType::API_LAYER_PROPERTIES,
            next: std::ptr::null_mut(),
            layer_name: [0; MAX_API_LAYER_NAME_SIZE],
            spec_version: 0,
            layer_version: 0,
            description: [0; MAX_API_LAYER_DESCRIPTION_SIZE],
        }
    }

    pub fn name(&self) -> Option<&CStr> {
        read_name(&self.layer_name)
    }

    pub fn description(&self) -> Option<&CStr> {
        read_name(&self.description)
    }
}

/// Loader side of `xrNegotiateLoaderApiLayerInterface`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NegotiateLoaderInfo {
    pub struct_type: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub min_interface_version: u32,
    pub max_interface_version: u32,
    pub min_api_version: u64,
    pub max_api_version: u64,
}

impl NegotiateLoaderInfo {
    pub fn new(min_api_version: u64, max_api_version: u64) -> Self {
        Self {
            struct_type: LoaderInterfaceStruct::LOADER_INFO,
            struct_version: LOADER_INFO_STRUCT_VERSION,
            struct_size: std::mem::size_of::<Self>(),
            min_interface_version: CURRENT_LOADER_API_LAYER_VERSION,
            max_interface_version: CURRENT_LOADER_API_LAYER_VERSION,
            min_api_version,
            max_api_version,
        }
    }
}

/// Layer side of `xrNegotiateLoaderApiLayerInterface`, filled by us.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NegotiateApiLayerRequest {
    pub struct_type: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_interface_version: u32,
    pub layer_api_version: u64,
    pub get_instance_proc_addr: Option<GetInstanceProcAddrFn>,
    pub create_api_layer_instance: Option<CreateApiLayerInstanceFn>,
}

impl NegotiateApiLayerRequest {
    pub fn new() -> Self {
        Self {
            struct_type: LoaderInterfaceStruct::API_LAYER_REQUEST,
            struct_version: API_LAYER_INFO_STRUCT_VERSION,
            struct_size: std::mem::size_of::<Self>(),
            layer_interface_version: 0,
            layer_api_version: 0,
            get_instance_proc_addr: None,
            create_api_layer_instance: None,
        }
    }
}

impl Default for NegotiateApiLayerRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `value` into a fixed C buffer, truncating to `len - 1` bytes.
///
/// The remainder of the buffer is zero-filled so the result is always
/// NUL-terminated.
pub fn write_name(buffer: &mut [c_char], value: &str) {
    buffer.fill(0);
    let Some(room) = buffer.len().checked_sub(1) else {
        return;
    };
    for (slot, byte) in buffer.iter_mut().zip(value.bytes().take(room)) {
        *slot = byte as c_char;
    }
}

/// Reads a NUL-terminated name out of a fixed C buffer.
///
/// Returns `None` when the buffer holds no terminator.
pub fn read_name(buffer: &[c_char]) -> Option<&CStr> {
    // SAFETY: c_char and u8 share size and alignment; the slice stays in bounds.
    let bytes = unsafe { std::slice::from_raw_parts(buffer.as_ptr().cast::<u8>(), buffer.len()) };
    CStr::from_bytes_until_nul(bytes).ok()
}
