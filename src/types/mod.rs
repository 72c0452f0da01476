// ABOUTME: Validated domain types shared across the verifier.
// ABOUTME: Cluster names, per-run unique identifiers and CIDR ranges.

mod cidr;
mod cluster_name;
mod unique_id;

pub use cidr::{Cidr, CidrError};
pub use cluster_name::{ClusterName, ClusterNameError};
pub use unique_id::UniqueId;
