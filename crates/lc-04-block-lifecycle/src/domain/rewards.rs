//! Block reward arithmetic.

use shared_types::U256;

/// Split `total` evenly across `recipients`.
///
/// Returns `(share, remainder)`. With no recipients the whole amount is
/// remainder.
pub fn split_reward(total: U256, recipients: usize) -> (U256, U256) {
    if recipients == 0 {
        return (U256::zero(), total);
    }
    let count = U256::from(recipients);
    (total / count, total % count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_even_split() {
        assert_eq!(
            split_reward(U256::from(90u64), 3),
            (U256::from(30u64), U256::zero())
        );
    }

    #[test]
    fn test_remainder() {
        assert_eq!(
            split_reward(U256::from(100u64), 3),
            (U256::from(33u64), U256::from(1u64))
        );
        assert_eq!(split_reward(U256::from(2u64), 5), (U256::zero(), U256::from(2u64)));
    }

    #[test]
    fn test_no_recipients() {
        assert_eq!(split_reward(U256::from(7u64), 0), (U256::zero(), U256::from(7u64)));
    }

    proptest! {
        #[test]
        fn prop_split_conserves_total(total in any::<u64>(), recipients in 0usize..64) {
            let (share, remainder) = split_reward(U256::from(total), recipients);
            prop_assert_eq!(share * U256::from(recipients) + remainder, U256::from(total));
            if recipients > 0 {
                prop_assert!(remainder < U256::from(recipients));
            }
        }
    }
}
