//! Loader interface negotiation, the first call the host loader makes.

use crate::abi::{
    LoaderInterfaceStruct, NegotiateApiLayerRequest, NegotiateLoaderInfo, XrResult,
    API_LAYER_INFO_STRUCT_VERSION, CURRENT_API_VERSION, CURRENT_LOADER_API_LAYER_VERSION,
    LOADER_INFO_STRUCT_VERSION,
};
use crate::layer::context::LayerContext;
use log::{error, info};
use std::ffi::{c_char, CStr};

impl LayerContext {
    /// Checks the loader's supported window and hands back our entry points.
    pub fn negotiate_loader_interface(
        &self,
        loader_info: Option<&NegotiateLoaderInfo>,
        layer_name: Option<&CStr>,
        request: Option<&mut NegotiateApiLayerRequest>,
    ) -> XrResult {
        match self.check_loader_interface(loader_info, layer_name, request) {
            Ok(()) => {
                info!(
                    "event=negotiate_loader_interface module=loader status=ok interface_version={} api_version={:#x}",
                    CURRENT_LOADER_API_LAYER_VERSION, CURRENT_API_VERSION
                );
                XrResult::SUCCESS
            }
            Err(reason) => {
                let result = XrResult::ERROR_INITIALIZATION_FAILED;
                error!(
                    "event=negotiate_loader_interface module=loader status=error result={} reason={}",
                    result, reason
                );
                result
            }
        }
    }

    /// Raw-pointer form used by the exported symbol.
    ///
    /// # Safety
    /// Non-null pointers must be valid for the duration of the call.
    pub unsafe fn negotiate_loader_interface_raw(
        &self,
        loader_info: *const NegotiateLoaderInfo,
        layer_name: *const c_char,
        request: *mut NegotiateApiLayerRequest,
    ) -> XrResult {
        let layer_name = (!layer_name.is_null()).then(|| CStr::from_ptr(layer_name));
        self.negotiate_loader_interface(loader_info.as_ref(), layer_name, request.as_mut())
    }

    fn check_loader_interface(
        &self,
        loader_info: Option<&NegotiateLoaderInfo>,
        layer_name: Option<&CStr>,
        request: Option<&mut NegotiateApiLayerRequest>,
    ) -> Result<(), &'static str> {
        let loader_info = loader_info.ok_or("loader info is null")?;
        if loader_info.struct_type != LoaderInterfaceStruct::LOADER_INFO
            || loader_info.struct_version != LOADER_INFO_STRUCT_VERSION
            || loader_info.struct_size != std::mem::size_of::<NegotiateLoaderInfo>()
        {
            return Err("loader info header mismatch");
        }

        let names_this_layer =
            layer_name.is_some_and(|name| name.to_bytes() == self.descriptor().name.as_bytes());
        if !names_this_layer {
            return Err("layer name mismatch");
        }

        let request = request.ok_or("api layer request is null")?;
        if request.struct_type != LoaderInterfaceStruct::API_LAYER_REQUEST
            || request.struct_version != API_LAYER_INFO_STRUCT_VERSION
            || request.struct_size != std::mem::size_of::<NegotiateApiLayerRequest>()
        {
            return Err("api layer request header mismatch");
        }

        if loader_info.min_interface_version > CURRENT_LOADER_API_LAYER_VERSION
            || loader_info.max_interface_version < CURRENT_LOADER_API_LAYER_VERSION
        {
            return Err("loader interface version unsupported");
        }
        if loader_info.min_api_version > CURRENT_API_VERSION
            || loader_info.max_api_version < CURRENT_API_VERSION
        {
            return Err("api version unsupported");
        }

        let entry = self.entry_points();
        request.layer_interface_version = CURRENT_LOADER_API_LAYER_VERSION;
        request.layer_api_version = CURRENT_API_VERSION;
        request.get_instance_proc_addr = Some(entry.get_instance_proc_addr);
        request.create_api_layer_instance = Some(entry.create_api_layer_instance);
        Ok(())
    }
}
