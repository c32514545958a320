//! Function-pointer routing for `xrGetInstanceProcAddr`.
//!
//! Resolution order is fixed:
//! 1. extension-properties enumeration -> this layer, always;
//! 2. layer-properties enumeration -> this layer, always;
//! 3. attached instance with a non-empty name -> hook override, this
//!    layer's own accessor and teardown, else the downstream accessor;
//! 4. anything else -> `XR_ERROR_FUNCTION_UNSUPPORTED`.

use crate::abi::{Instance, PfnVoidFunction, VoidFunction, XrResult};
use crate::layer::context::LayerContext;
use log::{debug, error, warn};
use std::ffi::{c_char, CStr};

impl LayerContext {
    /// Raw-pointer form used by the exported accessor.
    ///
    /// # Safety
    /// `name` must be null or a valid C string; `function` must be null or
    /// writable.
    pub unsafe fn get_instance_proc_addr(
        &self,
        instance: Instance,
        name: *const c_char,
        function: *mut PfnVoidFunction,
    ) -> XrResult {
        let name = (!name.is_null()).then(|| CStr::from_ptr(name));
        let Some(function) = function.as_mut() else {
            let result = XrResult::ERROR_VALIDATION_FAILURE;
            error!(
                "event=get_instance_proc_addr module=dispatch status=error instance={} name={} result={} reason=null_output",
                instance,
                name.map(CStr::to_string_lossy).unwrap_or_default(),
                result
            );
            return result;
        };
        match self.resolve(instance, name) {
            Ok(resolved) => {
                *function = Some(resolved);
                XrResult::SUCCESS
            }
            Err(result) => {
                *function = None;
                let name = name.map(CStr::to_string_lossy).unwrap_or_default();
                // Applications query optional functions routinely.
                if result == XrResult::ERROR_FUNCTION_UNSUPPORTED {
                    debug!(
                        "event=get_instance_proc_addr module=dispatch status=unresolved instance={} name={} result={}",
                        instance, name, result
                    );
                } else {
                    warn!(
                        "event=get_instance_proc_addr module=dispatch status=error instance={} name={} result={}",
                        instance, name, result
                    );
                }
                result
            }
        }
    }

    /// Resolves `name` for `instance` (which may be null).
    pub fn resolve(&self, instance: Instance, name: Option<&CStr>) -> Result<VoidFunction, XrResult> {
        let entry = self.entry_points();
        match name.map(CStr::to_bytes) {
            Some(b"xrEnumerateInstanceExtensionProperties") => {
                // SAFETY: fn pointers share one representation; callers cast back
                // to the signature implied by the requested name.
                return Ok(unsafe {
                    std::mem::transmute::<_, VoidFunction>(
                        entry.enumerate_instance_extension_properties,
                    )
                });
            }
            Some(b"xrEnumerateApiLayerProperties") => {
                return Ok(unsafe {
                    std::mem::transmute::<_, VoidFunction>(entry.enumerate_api_layer_properties)
                });
            }
            _ => {}
        }

        match name {
            Some(name) if !instance.is_null() && !name.to_bytes().is_empty() => {
                self.resolve_for_instance(instance, name)
            }
            _ => Err(XrResult::ERROR_FUNCTION_UNSUPPORTED),
        }
    }

    fn resolve_for_instance(&self, instance: Instance, name: &CStr) -> Result<VoidFunction, XrResult> {
        let attached = self
            .attached(instance)
            .ok_or(XrResult::ERROR_HANDLE_INVALID)?;

        if let Some(function) = name.to_str().ok().and_then(|name| self.hooks().override_proc(name)) {
            return Ok(function);
        }

        let entry = self.entry_points();
        match name.to_bytes() {
            b"xrGetInstanceProcAddr" => Ok(unsafe {
                std::mem::transmute::<_, VoidFunction>(entry.get_instance_proc_addr)
            }),
            b"xrDestroyInstance" => Ok(unsafe {
                std::mem::transmute::<_, VoidFunction>(entry.destroy_instance)
            }),
            _ => attached.resolve_next(name),
        }
    }
}
