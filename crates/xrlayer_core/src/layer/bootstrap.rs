//! Chained instance creation, rollback and teardown.
//!
//! # Responsibility
//! - Validate the loader handshake, negotiate implicit extensions, forward
//!   the adjusted request one link down, attach layer state on success.
//! - Undo a downstream instance when this layer's own initialization fails.
//!
//! # Invariants
//! - Nothing is called downstream before validation and negotiation pass.
//! - The caller's `InstanceCreateInfo` and `ApiLayerCreateInfo` are never
//!   written; copies are forwarded.
//! - Rollback destroys the downstream instance at most once and never
//!   reports its own failure.

use crate::abi::{
    ApiLayerCreateInfo, DestroyInstanceFn, Instance, InstanceCreateInfo, LoaderInterfaceStruct,
    XrResult, API_LAYER_CREATE_INFO_STRUCT_VERSION,
};
use crate::chain::ChainLink;
use crate::extension::negotiate::{negotiate, NegotiationError};
use crate::layer::context::{AttachedInstance, LayerContext, LayerError};
use crate::layer::request::{build_forwarded_extensions, InstanceRequest};
use crate::logging::panic_payload_summary;
use log::{debug, error, info, warn};
use std::error::Error;
use std::ffi::{c_char, CStr, CString};
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use uuid::Uuid;

const DESTROY_INSTANCE: &CStr = c"xrDestroyInstance";

/// Failure of one creation call, mapped onto a status by [`BootstrapError::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    /// Malformed or mismatched handshake envelope.
    InvalidCreateInfo(String),
    /// A required implicit extension is unavailable downstream.
    MissingCapability(String),
    /// The next link's creation call failed.
    Downstream(XrResult),
    /// This layer's own initialization failed after the downstream succeeded.
    LocalInit(LayerError),
    /// Fault outside the taxonomy above.
    Unexpected(String),
}

impl BootstrapError {
    pub fn status(&self) -> XrResult {
        match self {
            Self::InvalidCreateInfo(_) => XrResult::ERROR_INITIALIZATION_FAILED,
            Self::MissingCapability(_) => XrResult::ERROR_EXTENSION_NOT_PRESENT,
            Self::Downstream(result) => *result,
            Self::LocalInit(_) | Self::Unexpected(_) => XrResult::ERROR_RUNTIME_FAILURE,
        }
    }
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCreateInfo(reason) => write!(f, "create info validation failed: {reason}"),
            Self::MissingCapability(name) => {
                write!(f, "cannot satisfy implicit extension request: {name}")
            }
            Self::Downstream(result) => write!(f, "next link failed instance creation: {result}"),
            Self::LocalInit(err) => write!(f, "layer instance initialization failed: {err}"),
            Self::Unexpected(message) => write!(f, "unexpected error: {message}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LocalInit(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NegotiationError> for BootstrapError {
    fn from(value: NegotiationError) -> Self {
        match value {
            NegotiationError::MissingCapability(name) => Self::MissingCapability(name),
        }
    }
}

struct ValidatedCall<'a> {
    create_info: &'a InstanceCreateInfo,
    api_layer_info: &'a ApiLayerCreateInfo,
    head: ChainLink<'a>,
    instance_out: &'a mut Instance,
}

impl LayerContext {
    /// Creates an instance through the rest of the chain.
    ///
    /// # Safety
    /// Pointers must be null or valid for the duration of the call as the
    /// loader interface prescribes; the chain behind `api_layer_info` must
    /// be acyclic.
    pub unsafe fn create_api_layer_instance(
        &self,
        create_info: *const InstanceCreateInfo,
        api_layer_info: *const ApiLayerCreateInfo,
        instance_out: *mut Instance,
    ) -> XrResult {
        let activity = Uuid::new_v4();
        match self.bootstrap(activity, create_info, api_layer_info, instance_out) {
            Ok((result, instance)) => {
                info!(
                    "event=create_api_layer_instance module=bootstrap status=ok activity={} instance={} result={}",
                    activity, instance, result
                );
                result
            }
            Err(err) => {
                let result = err.status();
                error!(
                    "event=create_api_layer_instance module=bootstrap status=error activity={} result={} error={}",
                    activity, result, err
                );
                result
            }
        }
    }

    unsafe fn bootstrap(
        &self,
        activity: Uuid,
        create_info: *const InstanceCreateInfo,
        api_layer_info: *const ApiLayerCreateInfo,
        instance_out: *mut Instance,
    ) -> Result<(XrResult, Instance), BootstrapError> {
        let call = self.validate(create_info, api_layer_info, instance_out)?;

        for link in call.head.iter() {
            info!(
                "event=chain_link module=bootstrap activity={} layer={}",
                activity,
                link.name_lossy()
            );
        }

        let granted = if self.registry().required_implicit().is_empty() {
            Vec::new()
        } else {
            negotiate(call.head, self.registry().required_implicit())?
        };

        let request = InstanceRequest::new(call.create_info);
        let requested = request.enabled_extension_names();
        for name in &requested {
            if self.registry().is_blocked(name.to_bytes()) {
                info!(
                    "event=filter_extension module=bootstrap activity={} action=block extension={}",
                    activity,
                    name.to_string_lossy()
                );
            } else {
                debug!(
                    "event=filter_extension module=bootstrap activity={} action=forward extension={}",
                    activity,
                    name.to_string_lossy()
                );
            }
        }
        for name in &granted {
            info!(
                "event=filter_extension module=bootstrap activity={} action=implicit extension={}",
                activity, name
            );
        }

        let implicit = granted
            .iter()
            .map(|name| CString::new(name.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| BootstrapError::Unexpected(err.to_string()))?;
        let forwarded =
            build_forwarded_extensions(&requested, |name| self.registry().is_blocked(name), &implicit);
        let pointers: Vec<*const c_char> = forwarded.iter().map(|name| name.as_ptr()).collect();

        let mut chain_create_info = *call.create_info;
        chain_create_info.enabled_extension_count = u32::try_from(pointers.len())
            .map_err(|err| BootstrapError::Unexpected(err.to_string()))?;
        chain_create_info.enabled_extension_names = if pointers.is_empty() {
            std::ptr::null()
        } else {
            pointers.as_ptr()
        };

        let mut chain_api_layer_info = *call.api_layer_info;
        chain_api_layer_info.next_info = call.head.info().next;

        let (Some(create_next), Some(next_get_instance_proc_addr)) = (
            call.head.next_create_api_layer_instance(),
            call.head.next_get_instance_proc_addr(),
        ) else {
            return Err(BootstrapError::InvalidCreateInfo(
                "missing downstream entry points".to_string(),
            ));
        };

        let result = create_next(&chain_create_info, &chain_api_layer_info, &mut *call.instance_out);
        if result.failed() {
            return Err(BootstrapError::Downstream(result));
        }

        let attached = AttachedInstance {
            handle: *call.instance_out,
            next_get_instance_proc_addr,
            granted_extensions: granted,
            activity,
        };
        self.attach(attached.clone());

        if let Err(err) = self.run_create_hook(&attached, &request) {
            self.rollback(&attached);
            return Err(BootstrapError::LocalInit(err));
        }

        Ok((result, attached.handle))
    }

    unsafe fn validate<'a>(
        &self,
        create_info: *const InstanceCreateInfo,
        api_layer_info: *const ApiLayerCreateInfo,
        instance_out: *mut Instance,
    ) -> Result<ValidatedCall<'a>, BootstrapError> {
        let invalid = |reason: &str| BootstrapError::InvalidCreateInfo(reason.to_string());

        let create_info = create_info
            .as_ref()
            .ok_or_else(|| invalid("instance create info is null"))?;
        let instance_out = instance_out
            .as_mut()
            .ok_or_else(|| invalid("instance output is null"))?;
        let api_layer_info = api_layer_info
            .as_ref()
            .ok_or_else(|| invalid("api layer create info is null"))?;

        if api_layer_info.struct_type != LoaderInterfaceStruct::API_LAYER_CREATE_INFO
            || api_layer_info.struct_version != API_LAYER_CREATE_INFO_STRUCT_VERSION
            || api_layer_info.struct_size != std::mem::size_of::<ApiLayerCreateInfo>()
        {
            return Err(invalid("api layer create info header mismatch"));
        }

        let head = ChainLink::from_raw(api_layer_info.next_info)
            .ok_or_else(|| invalid("next info is null"))?;
        if !head.has_valid_header() {
            return Err(invalid("next info header mismatch"));
        }
        if head.name().to_bytes() != self.descriptor().name.as_bytes() {
            return Err(BootstrapError::InvalidCreateInfo(format!(
                "next info names layer `{}`",
                head.name_lossy()
            )));
        }
        if head.next_get_instance_proc_addr().is_none()
            || head.next_create_api_layer_instance().is_none()
        {
            return Err(invalid("missing downstream entry points"));
        }

        Ok(ValidatedCall {
            create_info,
            api_layer_info,
            head,
            instance_out,
        })
    }

    fn run_create_hook(
        &self,
        attached: &AttachedInstance,
        request: &InstanceRequest<'_>,
    ) -> Result<(), LayerError> {
        catch_unwind(AssertUnwindSafe(|| {
            self.hooks().on_instance_created(attached, request)
        }))
        .unwrap_or_else(|payload| {
            Err(LayerError::new(format!(
                "panic: {}",
                panic_payload_summary(payload.as_ref())
            )))
        })
    }

    fn rollback(&self, attached: &AttachedInstance) {
        self.detach(attached.handle);
        match destroy_downstream(attached) {
            Ok(result) if result.succeeded() => info!(
                "event=rollback module=bootstrap status=ok activity={} instance={}",
                attached.activity, attached.handle
            ),
            Ok(result) | Err(result) => warn!(
                "event=rollback module=bootstrap status=error activity={} instance={} result={}",
                attached.activity, attached.handle, result
            ),
        }
    }

    /// Tears down an attached instance and the downstream one behind it.
    pub fn destroy_instance(&self, instance: Instance) -> XrResult {
        let Some(attached) = self.detach(instance) else {
            let result = XrResult::ERROR_HANDLE_INVALID;
            error!(
                "event=destroy_instance module=bootstrap status=error instance={} result={}",
                instance, result
            );
            return result;
        };

        let hook_result = catch_unwind(AssertUnwindSafe(|| {
            self.hooks().on_instance_destroyed(&attached)
        }));
        match hook_result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(
                "event=destroy_instance module=bootstrap status=hook_error instance={} error={}",
                instance, err
            ),
            Err(payload) => warn!(
                "event=destroy_instance module=bootstrap status=hook_panic instance={} payload={}",
                instance,
                panic_payload_summary(payload.as_ref())
            ),
        }

        let result = destroy_downstream(&attached).unwrap_or_else(|result| result);
        if result.failed() {
            error!(
                "event=destroy_instance module=bootstrap status=error instance={} result={}",
                instance, result
            );
        } else {
            info!(
                "event=destroy_instance module=bootstrap status=ok instance={}",
                instance
            );
        }
        result
    }
}

fn destroy_downstream(attached: &AttachedInstance) -> Result<XrResult, XrResult> {
    let function = attached.resolve_next(DESTROY_INSTANCE)?;
    // SAFETY: the downstream accessor returned this pointer for `xrDestroyInstance`.
    let destroy: DestroyInstanceFn = unsafe { std::mem::transmute(function) };
    Ok(unsafe { destroy(attached.handle) })
}

#[cfg(test)]
mod tests {
    use super::BootstrapError;
    use crate::abi::XrResult;
    use crate::extension::negotiate::NegotiationError;
    use crate::layer::context::LayerError;

    #[test]
    fn maps_every_failure_onto_its_status() {
        assert_eq!(
            BootstrapError::InvalidCreateInfo("x".to_string()).status(),
            XrResult::ERROR_INITIALIZATION_FAILED
        );
        assert_eq!(
            BootstrapError::MissingCapability("XR_A".to_string()).status(),
            XrResult::ERROR_EXTENSION_NOT_PRESENT
        );
        assert_eq!(
            BootstrapError::Downstream(XrResult::ERROR_OUT_OF_MEMORY).status(),
            XrResult::ERROR_OUT_OF_MEMORY
        );
        assert_eq!(
            BootstrapError::LocalInit(LayerError::new("boom")).status(),
            XrResult::ERROR_RUNTIME_FAILURE
        );
        assert_eq!(
            BootstrapError::Unexpected("?".to_string()).status(),
            XrResult::ERROR_RUNTIME_FAILURE
        );
    }

    #[test]
    fn negotiation_error_converts_to_missing_capability() {
        let err: BootstrapError = NegotiationError::MissingCapability("XR_A".to_string()).into();
        assert_eq!(err, BootstrapError::MissingCapability("XR_A".to_string()));
        assert!(err.to_string().contains("XR_A"));
    }
}
