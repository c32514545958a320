//! Extension probing against one downstream link.

use crate::abi::{
    ExtensionProperties, EnumerateInstanceExtensionPropertiesFn, GetInstanceProcAddrFn, Instance,
    PfnVoidFunction, XrResult,
};
use crate::extension::capability::CapabilitySet;
use log::{debug, warn};
use std::ffi::CStr;

pub const ENUMERATE_INSTANCE_EXTENSION_PROPERTIES: &CStr =
    c"xrEnumerateInstanceExtensionProperties";

/// Queries the extensions one link supports.
///
/// `link_name == None` addresses the runtime. Failures are logged and yield
/// an empty set so one misbehaving link never aborts negotiation.
///
/// # Safety
/// `get_proc_addr` must follow the loader's proc-address protocol and any
/// function it returns must honour the two-call enumeration contract.
pub unsafe fn probe(
    link_name: Option<&CStr>,
    get_proc_addr: GetInstanceProcAddrFn,
) -> CapabilitySet {
    let label = link_name.map_or_else(|| "<runtime>".into(), CStr::to_string_lossy);
    match enumerate(link_name, get_proc_addr) {
        Ok(properties) => {
            let mut set = CapabilitySet::new();
            for property in &properties {
                if let Some(name) = property.name() {
                    set.insert_first_seen(
                        name.to_string_lossy().into_owned(),
                        property.extension_version,
                    );
                }
            }
            debug!(
                "event=probe_link module=probe status=ok link={} extensions={}",
                label,
                set.len()
            );
            set
        }
        Err(result) => {
            warn!(
                "event=probe_link module=probe status=error link={} result={}",
                label, result
            );
            CapabilitySet::new()
        }
    }
}

unsafe fn enumerate(
    link_name: Option<&CStr>,
    get_proc_addr: GetInstanceProcAddrFn,
) -> Result<Vec<ExtensionProperties>, XrResult> {
    let mut function: PfnVoidFunction = None;
    let result = get_proc_addr(
        Instance::NULL,
        ENUMERATE_INSTANCE_EXTENSION_PROPERTIES.as_ptr(),
        &mut function,
    );
    if result.failed() {
        return Err(result);
    }
    let function = function.ok_or(XrResult::ERROR_FUNCTION_UNSUPPORTED)?;
    let enumerate_properties: EnumerateInstanceExtensionPropertiesFn =
        std::mem::transmute(function);

    let name_ptr = link_name.map_or(std::ptr::null(), CStr::as_ptr);
    let mut count = 0u32;
    let result = enumerate_properties(name_ptr, 0, &mut count, std::ptr::null_mut());
    if result.failed() {
        return Err(result);
    }
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut properties = vec![ExtensionProperties::empty(); count as usize];
    let capacity = count;
    let result = enumerate_properties(name_ptr, capacity, &mut count, properties.as_mut_ptr());
    if result.failed() {
        return Err(result);
    }
    properties.truncate(count.min(capacity) as usize);
    Ok(properties)
}
