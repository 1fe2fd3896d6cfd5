use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a storage owner as seen by the router.
///
/// ```text
/// Uninitialized --dispatch--> Active --rebind_with_init--> Upgrading
///                                ^                             |
///                                +---------- ok ---------------+
/// Active --slot 0 no longer names a module--> Broken
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerPhase {
    /// Created, no call has committed yet.
    Uninitialized,
    Active,
    /// An init call is running against a freshly bound module.
    Upgrading,
    /// The binding word does not resolve to a registered module.
    Broken,
}

impl fmt::Display for OwnerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Upgrading => "upgrading",
            Self::Broken => "broken",
        };
        f.write_str(name)
    }
}
