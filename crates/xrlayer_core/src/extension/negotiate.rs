//! Implicit-extension negotiation across the whole downstream chain.

use crate::chain::ChainLink;
use crate::extension::capability::CapabilitySet;
use crate::extension::probe::probe;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Collects what every downstream layer and the runtime advertise.
///
/// `head` is this layer's own chain entry: each link's accessor is used to
/// probe the link after it by name, and the tail's accessor probes the
/// runtime.
pub fn available_capabilities(head: ChainLink<'_>) -> CapabilitySet {
    let mut combined = CapabilitySet::new();
    for link in head.iter() {
        let Some(get_proc_addr) = link.next_get_instance_proc_addr() else {
            warn!(
                "event=probe_link module=negotiate status=skipped link={} reason=missing_accessor",
                link.name_lossy()
            );
            continue;
        };
        let next = link.next();
        let target = next.map(|next| next.name());
        // SAFETY: accessors come from a chain the caller vouched for when the
        // `ChainLink` was constructed.
        let found = unsafe { probe(target, get_proc_addr) };
        combined.merge_first_seen(found);
    }
    combined
}

/// Confirms that every wanted implicit extension exists somewhere downstream.
///
/// All-or-nothing: the first missing name fails the whole negotiation. The
/// returned list keeps `implicit_wanted` order.
pub fn negotiate(
    head: ChainLink<'_>,
    implicit_wanted: &[String],
) -> Result<Vec<String>, NegotiationError> {
    let available = available_capabilities(head);
    grant(&available, implicit_wanted)
}

/// Gate step of [`negotiate`] over an already-probed set.
pub fn grant(
    available: &CapabilitySet,
    implicit_wanted: &[String],
) -> Result<Vec<String>, NegotiationError> {
    let mut granted = Vec::with_capacity(implicit_wanted.len());
    for name in implicit_wanted {
        if !available.contains(name) {
            info!(
                "event=negotiate module=negotiate status=error error_code=extension_missing extension={}",
                name
            );
            return Err(NegotiationError::MissingCapability(name.clone()));
        }
        granted.push(name.clone());
    }
    Ok(granted)
}

/// Negotiation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    MissingCapability(String),
}

impl Display for NegotiationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCapability(name) => {
                write!(f, "cannot satisfy implicit extension request: {name}")
            }
        }
    }
}

impl Error for NegotiationError {}
