use std::fmt;

use serde::{Deserialize, Serialize};

use dss_crypto::keccak256;
use dss_types::{Word, WordCodec};

use crate::error::OperationError;

/// A call addressed to a storage owner.
///
/// `selector` names the operation. A call with no selector and no
/// arguments is a bare transfer; `value` travels with any call and is only
/// recorded by handlers that care about it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub selector: Option<String>,
    pub args: Vec<Word>,
    pub value: Word,
}

impl Call {
    /// A call to the named operation with no arguments.
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
            ..Default::default()
        }
    }

    /// A call with no selector and no arguments.
    pub fn bare() -> Self {
        Self::default()
    }

    pub fn with_arg(mut self, arg: impl Into<Word>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = Word>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn with_value(mut self, value: impl Into<Word>) -> Self {
        self.value = value.into();
        self
    }

    /// Returns `true` if the call carries a selector or any argument.
    pub fn has_payload(&self) -> bool {
        self.selector.is_some() || !self.args.is_empty()
    }

    /// Argument `index`, or `MissingArgument`.
    pub fn arg(&self, index: usize) -> Result<Word, OperationError> {
        self.args
            .get(index)
            .copied()
            .ok_or(OperationError::MissingArgument { index })
    }

    /// 4-byte selector id: the first four bytes of `keccak256(selector)`,
    /// right-aligned in a word. Zero for calls without a selector.
    pub fn selector_id(&self) -> Word {
        match &self.selector {
            Some(name) => {
                let hash = keccak256(name.as_bytes());
                WordCodec::pad32(&hash.as_bytes()[..4])
            }
            None => Word::ZERO,
        }
    }

    /// The selector, or `"<bare>"`.
    pub fn label(&self) -> &str {
        self.selector.as_deref().unwrap_or("<bare>")
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.label())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg.to_dec_string())?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_call_has_no_payload() {
        assert!(!Call::bare().has_payload());
        assert!(!Call::bare().with_value(5u64).has_payload());
        assert!(Call::new("increment").has_payload());
        assert!(Call::bare().with_arg(1u64).has_payload());
    }

    #[test]
    fn missing_argument() {
        let call = Call::new("incrementBy").with_arg(10u64);
        assert_eq!(call.arg(0).unwrap(), Word::from_u64(10));
        assert!(matches!(
            call.arg(1),
            Err(OperationError::MissingArgument { index: 1 })
        ));
    }

    #[test]
    fn selector_id_matches_known_value() {
        // keccak256("transfer(address,uint256)") starts with a9059cbb.
        let call = Call::new("transfer(address,uint256)");
        assert_eq!(call.selector_id(), Word::from_u64(0xa9059cbb));
        assert_eq!(Call::bare().selector_id(), Word::ZERO);
    }

    #[test]
    fn display_lists_arguments() {
        let call = Call::new("add").with_arg(5u64).with_arg(7u64);
        assert_eq!(call.to_string(), "add(5, 7)");
        assert_eq!(Call::bare().to_string(), "<bare>()");
    }
}
