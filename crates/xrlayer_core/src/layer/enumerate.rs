//! Two-call enumeration of this layer's extensions and properties.
//!
//! # Invariants
//! - `capacity == 0` only reports the count.
//! - An insufficient capacity writes nothing, neither entries nor count.
//! - A sufficient capacity fills exactly the needed number of entries.

use crate::abi::{write_name, ApiLayerProperties, ExtensionProperties, XrResult};
use crate::layer::context::LayerContext;
use log::error;
use std::ffi::{c_char, CStr};

const LAYER_PROPERTY_COUNT: u32 = 1;

impl LayerContext {
    /// Reports the extensions this layer advertises.
    ///
    /// `layer_name` must name this layer; queries for other layers or the
    /// runtime are not answered here.
    pub fn enumerate_instance_extension_properties(
        &self,
        layer_name: Option<&CStr>,
        capacity: u32,
        count_out: Option<&mut u32>,
        properties: Option<&mut [ExtensionProperties]>,
    ) -> XrResult {
        let result = self.fill_extension_properties(layer_name, capacity, count_out, properties);
        if result.failed() {
            error!(
                "event=enumerate_instance_extension_properties module=enumerate status=error capacity={} result={}",
                capacity, result
            );
        }
        result
    }

    /// Raw-pointer form used by the exported function.
    ///
    /// # Safety
    /// Non-null pointers must be valid; `properties` must hold `capacity`
    /// writable entries.
    pub unsafe fn enumerate_instance_extension_properties_raw(
        &self,
        layer_name: *const c_char,
        capacity: u32,
        count_out: *mut u32,
        properties: *mut ExtensionProperties,
    ) -> XrResult {
        let layer_name = (!layer_name.is_null()).then(|| CStr::from_ptr(layer_name));
        let properties = (!properties.is_null() && capacity > 0)
            .then(|| std::slice::from_raw_parts_mut(properties, capacity as usize));
        self.enumerate_instance_extension_properties(
            layer_name,
            capacity,
            count_out.as_mut(),
            properties,
        )
    }

    fn fill_extension_properties(
        &self,
        layer_name: Option<&CStr>,
        capacity: u32,
        count_out: Option<&mut u32>,
        properties: Option<&mut [ExtensionProperties]>,
    ) -> XrResult {
        let Some(count_out) = count_out else {
            return XrResult::ERROR_VALIDATION_FAILURE;
        };
        let names_this_layer =
            layer_name.is_some_and(|name| name.to_bytes() == self.descriptor().name.as_bytes());
        if !names_this_layer {
            return XrResult::ERROR_VALIDATION_FAILURE;
        }

        let advertised = self.registry().advertised();
        let Ok(needed) = u32::try_from(advertised.len()) else {
            return XrResult::ERROR_RUNTIME_FAILURE;
        };
        if capacity == 0 {
            *count_out = needed;
            return XrResult::SUCCESS;
        }
        let Some(properties) = properties else {
            return XrResult::ERROR_VALIDATION_FAILURE;
        };
        if capacity < needed || properties.len() < advertised.len() {
            return XrResult::ERROR_SIZE_INSUFFICIENT;
        }

        for (slot, entry) in properties.iter_mut().zip(advertised) {
            *slot = ExtensionProperties::new(&entry.name, entry.version);
        }
        *count_out = needed;
        XrResult::SUCCESS
    }

    /// Reports this layer as the single entry.
    pub fn enumerate_api_layer_properties(
        &self,
        capacity: u32,
        count_out: Option<&mut u32>,
        properties: Option<&mut [ApiLayerProperties]>,
    ) -> XrResult {
        let result = self.fill_layer_properties(capacity, count_out, properties);
        if result.failed() {
            error!(
                "event=enumerate_api_layer_properties module=enumerate status=error capacity={} result={}",
                capacity, result
            );
        }
        result
    }

    /// Raw-pointer form used by the exported function.
    ///
    /// # Safety
    /// Non-null pointers must be valid; `properties` must hold `capacity`
    /// writable entries.
    pub unsafe fn enumerate_api_layer_properties_raw(
        &self,
        capacity: u32,
        count_out: *mut u32,
        properties: *mut ApiLayerProperties,
    ) -> XrResult {
        let properties = (!properties.is_null() && capacity > 0)
            .then(|| std::slice::from_raw_parts_mut(properties, capacity as usize));
        self.enumerate_api_layer_properties(capacity, count_out.as_mut(), properties)
    }

    fn fill_layer_properties(
        &self,
        capacity: u32,
        count_out: Option<&mut u32>,
        properties: Option<&mut [ApiLayerProperties]>,
    ) -> XrResult {
        let Some(count_out) = count_out else {
            return XrResult::ERROR_VALIDATION_FAILURE;
        };
        if capacity == 0 {
            *count_out = LAYER_PROPERTY_COUNT;
            return XrResult::SUCCESS;
        }
        let Some(slot) = properties.and_then(|properties| properties.first_mut()) else {
            return XrResult::ERROR_VALIDATION_FAILURE;
        };

        let descriptor = self.descriptor();
        let mut layer = ApiLayerProperties::empty();
        write_name(&mut layer.layer_name, &descriptor.name);
        write_name(&mut layer.description, &descriptor.description);
        layer.layer_version = descriptor.layer_version;
        layer.spec_version = descriptor.spec_version;
        *slot = layer;
        *count_out = LAYER_PROPERTY_COUNT;
        XrResult::SUCCESS
    }
}
