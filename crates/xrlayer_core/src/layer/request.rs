//! Read-only view of the caller's instance-creation parameters, and the
//! forwarded extension list built from it.

use crate::abi::{read_name, InstanceCreateInfo};
use std::ffi::{c_char, CStr, CString};

/// Borrowed view over an `InstanceCreateInfo` supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct InstanceRequest<'a> {
    info: &'a InstanceCreateInfo,
}

impl<'a> InstanceRequest<'a> {
    /// # Safety
    /// `info.enabled_extension_names` must point to `enabled_extension_count`
    /// valid C strings (or be null with a zero count) for `'a`.
    pub unsafe fn new(info: &'a InstanceCreateInfo) -> Self {
        Self { info }
    }

    pub fn application_name(&self) -> String {
        read_name(&self.info.application_info.application_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extensions the application asked for, in its order; null entries are skipped.
    pub fn enabled_extension_names(&self) -> Vec<&'a CStr> {
        let count = self.info.enabled_extension_count as usize;
        if count == 0 || self.info.enabled_extension_names.is_null() {
            return Vec::new();
        }
        // SAFETY: guaranteed by the contract of `InstanceRequest::new`.
        let pointers: &'a [*const c_char] =
            unsafe { std::slice::from_raw_parts(self.info.enabled_extension_names, count) };
        pointers
            .iter()
            .filter(|pointer| !pointer.is_null())
            .map(|pointer| unsafe { CStr::from_ptr(*pointer) })
            .collect()
    }
}

/// Extension list handed to the next link.
///
/// Caller names minus blocked ones (caller order and duplicates kept), then
/// each implicit name not already present.
pub fn build_forwarded_extensions<'a>(
    requested: &[&'a CStr],
    is_blocked: impl Fn(&[u8]) -> bool,
    implicit: &'a [CString],
) -> Vec<&'a CStr> {
    let mut forwarded: Vec<&'a CStr> = requested
        .iter()
        .copied()
        .filter(|name| !is_blocked(name.to_bytes()))
        .collect();
    for name in implicit {
        if !forwarded.iter().any(|existing| *existing == name.as_c_str()) {
            forwarded.push(name.as_c_str());
        }
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::build_forwarded_extensions;
    use std::ffi::{CStr, CString};

    fn blocked(names: &'static [&'static str]) -> impl Fn(&[u8]) -> bool {
        move |candidate| names.iter().any(|name| name.as_bytes() == candidate)
    }

    #[test]
    fn removes_blocked_names_and_appends_implicit() {
        let requested: Vec<&CStr> = vec![c"XR_A", c"XR_BLOCKED", c"XR_B"];
        let implicit = vec![CString::new("XR_IMPLICIT").expect("cstring")];
        let forwarded =
            build_forwarded_extensions(&requested, blocked(&["XR_BLOCKED"]), &implicit);
        assert_eq!(forwarded, vec![c"XR_A", c"XR_B", c"XR_IMPLICIT"]);
    }

    #[test]
    fn implicit_name_already_requested_is_not_duplicated() {
        let requested: Vec<&CStr> = vec![c"XR_SHARED"];
        let implicit = vec![CString::new("XR_SHARED").expect("cstring")];
        let forwarded = build_forwarded_extensions(&requested, blocked(&[]), &implicit);
        assert_eq!(forwarded, vec![c"XR_SHARED"]);
    }

    #[test]
    fn caller_duplicates_are_echoed() {
        let requested: Vec<&CStr> = vec![c"XR_A", c"XR_A"];
        let forwarded = build_forwarded_extensions(&requested, blocked(&[]), &[]);
        assert_eq!(forwarded, vec![c"XR_A", c"XR_A"]);
    }
}
