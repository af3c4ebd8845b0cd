use serde::{Deserialize, Serialize};

/// One counter projection as returned by the stats endpoint.
///
/// The `group` field carries the counter key, not the group name. The
/// misnomer comes from the existing wire format and is kept so current
/// consumers keep parsing responses unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub group: String,
    pub hit: u64,
}
