//! Pin consistency across the whole externals forest.
//!
//! A repository is checked out once per storage area but may be declared by
//! several manifests. If two declarations of the same (resolved) reference
//! disagree on the pin, whichever is resolved last would win, so the
//! configuration is rejected before anything is fetched.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, PinConflict, PinSite, Result};
use crate::manifest::Pin;
use crate::walk::Visit;

/// Reject `visits` in which one reference carries more than one distinct pin.
///
/// Every site of a conflicting reference is reported, in traversal order.
pub fn check(root: &Path, visits: &[Visit]) -> Result<()> {
    let mut groups: BTreeMap<&str, Vec<&Visit>> = BTreeMap::new();
    for visit in visits {
        groups.entry(visit.reference.as_str()).or_default().push(visit);
    }

    let conflicts: Vec<PinConflict> = groups
        .into_iter()
        .filter(|(_, sites)| {
            let first: &Pin = &sites[0].entry.pin;
            sites.iter().any(|v| &v.entry.pin != first)
        })
        .map(|(reference, sites)| PinConflict {
            reference: reference.to_string(),
            sites: sites
                .iter()
                .map(|v| PinSite {
                    path: v.site(root),
                    pin: v.entry.pin.to_string(),
                })
                .collect(),
        })
        .collect();

    if !conflicts.is_empty() {
        return Err(Error::InconsistentPins { conflicts });
    }

    log::info!("Sanity check passed: {} declarations are consistent", visits.len());
    Ok(())
}
