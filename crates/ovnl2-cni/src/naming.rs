//! Logical entity naming.
//!
//! All switches and ports created by this plugin carry [`OVN_L2_PREFIX`] so
//! they never collide with logical entities owned by other controllers.

/// Prefix applied to every logical switch and port name.
pub const OVN_L2_PREFIX: &str = "ovnl2_";

/// Separator between the parts of a logical port name.
pub const PORT_NAME_SEPARATOR: &str = "_";

/// Applies [`OVN_L2_PREFIX`] unless `name` already carries it.
pub fn ensure_prefix(name: &str) -> String {
    if name.starts_with(OVN_L2_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", OVN_L2_PREFIX, name)
    }
}

/// Logical switch name for a network.
pub fn switch_name(network: &str) -> String {
    ensure_prefix(network)
}

/// Logical port name for a workload on a network.
pub fn port_name(namespace: &str, workload: &str, network: &str) -> String {
    ensure_prefix(&[namespace, workload, network].join(PORT_NAME_SEPARATOR))
}
