//! Serverless VPC access validation and identifier expansion.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::schema::VpcAccess;
use crate::error::{Error, Result};

/// Accepted `egress` values.
pub const VALID_EGRESS: [&str; 2] = ["ALL_TRAFFIC", "PRIVATE_RANGES_ONLY"];

fn resource_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^/]+$").expect("resource id pattern is valid"))
}

fn qualified_connector() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^projects/[^/]+/locations/[^/]+/connectors/[^/]+$")
            .expect("connector pattern is valid")
    })
}

fn qualified_network() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^projects/[^/]+/global/networks/[^/]+$").expect("network pattern is valid")
    })
}

fn qualified_subnetwork() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^projects/[^/]+/regions/[^/]+/subnetworks/[^/]+$")
            .expect("subnetwork pattern is valid")
    })
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Validation {
        field: "runConfig.vpcAccess".into(),
        message: message.into(),
    }
}

/// Check the shape of a VPC access block.
///
/// # Errors
///
/// Returns [`Error::Validation`] when neither or both of connector and
/// network interfaces are set, when egress is not a known value, when the
/// connector is neither an id nor a connector name, or when an interface
/// names neither a network nor a subnetwork.
///
/// # Examples
///
/// ```
/// use hostprep::config::{vpc, VpcAccess};
///
/// let access = VpcAccess {
///     connector: Some("my-connector".into()),
///     egress: Some("ALL_TRAFFIC".into()),
///     ..Default::default()
/// };
/// assert!(vpc::validate_vpc_access(&access).is_ok());
/// assert!(vpc::validate_vpc_access(&VpcAccess::default()).is_err());
/// ```
pub fn validate_vpc_access(access: &VpcAccess) -> Result<()> {
    if let Some(egress) = access.egress.as_deref().filter(|e| !e.is_empty()) {
        if !VALID_EGRESS.contains(&egress) {
            return Err(invalid(format!(
                "egress must be one of {VALID_EGRESS:?}, got: {egress:?}"
            )));
        }
    }

    let connector = access.connector.as_deref().filter(|c| !c.is_empty());
    if let Some(connector) = connector {
        if !qualified_connector().is_match(connector) && !resource_id().is_match(connector) {
            return Err(invalid(format!(
                "connector must be fully qualified or an ID, got: {connector:?}"
            )));
        }
    }

    match (connector.is_some(), access.network_interfaces.is_empty()) {
        (false, true) => return Err(invalid("one of connector or networkInterfaces must be set")),
        (true, false) => {
            return Err(invalid(
                "connector and networkInterfaces cannot be set at the same time",
            ))
        }
        _ => {}
    }

    for interface in &access.network_interfaces {
        let network = interface.network.as_deref().filter(|n| !n.is_empty());
        let subnetwork = interface.subnetwork.as_deref().filter(|s| !s.is_empty());
        if network.is_none() && subnetwork.is_none() {
            return Err(invalid("at least one of network or subnetwork is required"));
        }
    }

    Ok(())
}

/// Expand bare connector, network and subnetwork ids into resource names.
///
/// Fully-qualified names pass through. Connector and subnetwork names need a
/// region; without one those ids are left as written and a warning is logged.
///
/// # Examples
///
/// ```
/// use hostprep::config::{vpc, NetworkInterface, VpcAccess};
///
/// let mut access = VpcAccess {
///     network_interfaces: vec![NetworkInterface {
///         network: Some("my-network".into()),
///         subnetwork: Some("my-subnet".into()),
///         tags: vec![],
///     }],
///     ..Default::default()
/// };
/// vpc::normalize_vpc_access(&mut access, "my-project", Some("us-central1"));
/// let iface = &access.network_interfaces[0];
/// assert_eq!(iface.network.as_deref(), Some("projects/my-project/global/networks/my-network"));
/// assert_eq!(
///     iface.subnetwork.as_deref(),
///     Some("projects/my-project/regions/us-central1/subnetworks/my-subnet")
/// );
/// ```
pub fn normalize_vpc_access(access: &mut VpcAccess, project_id: &str, region: Option<&str>) {
    let region = region.filter(|r| !r.is_empty());

    if let Some(connector) = access.connector.as_mut() {
        if resource_id().is_match(connector) {
            match region {
                Some(region) => {
                    *connector = format!("projects/{project_id}/locations/{region}/connectors/{connector}");
                }
                None => log::warn!("no region set, leaving connector id {connector} unexpanded"),
            }
        }
    }

    for interface in &mut access.network_interfaces {
        if let Some(network) = interface.network.as_mut() {
            if resource_id().is_match(network) {
                *network = format!("projects/{project_id}/global/networks/{network}");
            }
        }
        if let Some(subnetwork) = interface.subnetwork.as_mut() {
            if resource_id().is_match(subnetwork) {
                match region {
                    Some(region) => {
                        *subnetwork =
                            format!("projects/{project_id}/regions/{region}/subnetworks/{subnetwork}");
                    }
                    None => log::warn!("no region set, leaving subnetwork id {subnetwork} unexpanded"),
                }
            }
        }
    }
}

/// Whether `name` is a fully-qualified connector, network or subnetwork name.
#[must_use]
pub fn is_fully_qualified(name: &str) -> bool {
    qualified_connector().is_match(name)
        || qualified_network().is_match(name)
        || qualified_subnetwork().is_match(name)
}
