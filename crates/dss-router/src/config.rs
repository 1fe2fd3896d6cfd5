use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RouterError, RouterResult};

/// Where the binding record lives inside every owner's word-array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingLayout {
    /// Slot holding the active module id.
    pub module_slot: u64,
    /// Slot holding the admin address.
    pub admin_slot: u64,
}

impl Default for BindingLayout {
    fn default() -> Self {
        Self {
            module_slot: 0,
            admin_slot: 1,
        }
    }
}

/// Configuration for the delegation router.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// enforce_layout_check = false
///
/// [binding]
/// admin_slot = 1
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Reject rebinds to a module whose layout does not preserve the
    /// current module's layout.
    pub enforce_layout_check: bool,
    pub binding: BindingLayout,
    /// Maximum number of word arguments a single call may carry.
    pub max_call_args: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enforce_layout_check: true,
            binding: BindingLayout::default(),
            max_call_args: 16,
        }
    }
}

impl RouterConfig {
    /// A configuration with the layout guard switched off.
    ///
    /// Rebinds then behave like a raw proxy upgrade: nothing stops a module
    /// from reinterpreting the binding slots as its own data.
    pub fn unguarded() -> Self {
        Self {
            enforce_layout_check: false,
            ..Default::default()
        }
    }

    pub fn from_toml_str(text: &str) -> RouterResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| RouterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> RouterResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RouterError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> RouterResult<String> {
        toml::to_string_pretty(self).map_err(|e| RouterError::Config(e.to_string()))
    }

    pub fn validate(&self) -> RouterResult<()> {
        if self.binding.module_slot == self.binding.admin_slot {
            return Err(RouterError::Config(format!(
                "module and admin share binding slot {}",
                self.binding.module_slot
            )));
        }
        if self.max_call_args == 0 {
            return Err(RouterError::Config("max_call_args must be positive".into()));
        }
        Ok(())
    }
}
