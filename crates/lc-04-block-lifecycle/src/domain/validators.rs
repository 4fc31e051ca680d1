//! Validator set changes reported at EndBlock.

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// Voting power change for one validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub address: Address,
    /// 1 when the validator joined the primary set, 0 when it left.
    pub power: u64,
}

/// Updates that turn `previous` into `current`.
///
/// Additions come first, in `current` order, then removals in `previous`
/// order.
pub fn diff_validators(previous: &[Address], current: &[Address]) -> Vec<ValidatorUpdate> {
    let added = current
        .iter()
        .filter(|address| !previous.contains(address))
        .map(|address| ValidatorUpdate {
            address: *address,
            power: 1,
        });
    let removed = previous
        .iter()
        .filter(|address| !current.contains(address))
        .map(|address| ValidatorUpdate {
            address: *address,
            power: 0,
        });
    added.chain(removed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(name: &str) -> Address {
        Address::from_public_key(&shared_types::sha256(name.as_bytes()))
    }

    #[test]
    fn test_unchanged_set_has_no_updates() {
        let set = vec![validator("a"), validator("b")];
        assert!(diff_validators(&set, &set).is_empty());
    }

    #[test]
    fn test_added_and_removed() {
        let previous = vec![validator("a"), validator("b")];
        let current = vec![validator("b"), validator("c")];

        let updates = diff_validators(&previous, &current);
        assert_eq!(
            updates,
            vec![
                ValidatorUpdate {
                    address: validator("c"),
                    power: 1
                },
                ValidatorUpdate {
                    address: validator("a"),
                    power: 0
                },
            ]
        );
    }
}
