//! Borrowed, forward-only view over the loader-owned layer chain.
//!
//! # Invariants
//! - The core never allocates, frees or retains chain nodes beyond one call.
//! - A `ChainLink` only exists for a node the caller vouched for in
//!   [`ChainLink::from_raw`]; every successor reached through it is covered
//!   by the same promise.

use crate::abi::{
    read_name, ApiLayerNextInfo, CreateApiLayerInstanceFn, GetInstanceProcAddrFn,
    LoaderInterfaceStruct, API_LAYER_NEXT_INFO_STRUCT_VERSION,
};
use std::borrow::Cow;
use std::ffi::CStr;

/// One node of the chain: another layer or, at the tail, the runtime binding.
#[derive(Debug, Clone, Copy)]
pub struct ChainLink<'a> {
    info: &'a ApiLayerNextInfo,
}

impl<'a> ChainLink<'a> {
    /// Wraps a raw chain node.
    ///
    /// # Safety
    /// `ptr` must be null or point to a well-formed, acyclic
    /// `ApiLayerNextInfo` list whose nodes stay alive and unmodified for `'a`.
    pub unsafe fn from_raw(ptr: *const ApiLayerNextInfo) -> Option<Self> {
        ptr.as_ref().map(|info| Self { info })
    }

    pub fn from_ref(info: &'a ApiLayerNextInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &'a ApiLayerNextInfo {
        self.info
    }

    /// Layer name; empty when the buffer is not NUL-terminated.
    pub fn name(&self) -> &'a CStr {
        read_name(&self.info.layer_name).unwrap_or(c"")
    }

    pub fn name_lossy(&self) -> Cow<'a, str> {
        self.name().to_string_lossy()
    }

    pub fn has_valid_header(&self) -> bool {
        self.info.struct_type == LoaderInterfaceStruct::API_LAYER_NEXT_INFO
            && self.info.struct_version == API_LAYER_NEXT_INFO_STRUCT_VERSION
            && self.info.struct_size == std::mem::size_of::<ApiLayerNextInfo>()
    }

    /// Accessor of the link *after* this one.
    pub fn next_get_instance_proc_addr(&self) -> Option<GetInstanceProcAddrFn> {
        self.info.next_get_instance_proc_addr
    }

    /// Creation entry of the link *after* this one.
    pub fn next_create_api_layer_instance(&self) -> Option<CreateApiLayerInstanceFn> {
        self.info.next_create_api_layer_instance
    }

    pub fn next(&self) -> Option<ChainLink<'a>> {
        // SAFETY: successors are covered by the contract of `from_raw`.
        unsafe { Self::from_raw(self.info.next) }
    }

    /// Iterates from this link to the tail, inclusive.
    pub fn iter(self) -> ChainIter<'a> {
        ChainIter {
            current: Some(self),
        }
    }
}

pub struct ChainIter<'a> {
    current: Option<ChainLink<'a>>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = ChainLink<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.current?;
        self.current = link.next();
        Some(link)
    }
}
