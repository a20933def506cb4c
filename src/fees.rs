use ethers::types::U256;

use crate::types::FeeParameters;

pub const GWEI: u64 = 1_000_000_000;

/// Upper bound of the base fee `blocks_ahead` blocks from now.
///
/// The protocol lets the base fee grow by at most 12.5% per block. Each step
/// adds one wei on top of the truncated product so the ceiling never falls
/// below the exact compounded value.
pub fn max_base_fee_after(base_fee: U256, blocks_ahead: u64) -> U256 {
    let mut max_base_fee = base_fee;
    for _ in 0..blocks_ahead {
        max_base_fee = max_base_fee * U256::from(1125) / U256::from(1000) + U256::one();
    }
    max_base_fee
}

/// `priority_fee + max_base_fee_after(base_fee, horizon)`
pub fn max_fee_per_gas(params: &FeeParameters) -> U256 {
    params.priority_fee + max_base_fee_after(params.base_fee, params.horizon_blocks)
}

/// Renders a fixed-point amount scaled by `10^base` as a float, truncated to
/// four decimal places. For logs only.
pub fn scale_to_decimal(value: U256, base: u32) -> f64 {
    let divisor = U256::exp10(base as usize);
    let scaled = value.saturating_mul(U256::from(10_000)) / divisor;
    u256_to_f64(scaled) / 10_000.0
}

pub fn gwei(amount: u64) -> U256 {
    U256::from(amount) * U256::from(GWEI)
}

fn u256_to_f64(value: U256) -> f64 {
    if value <= U256::from(u64::MAX) {
        value.as_u64() as f64
    } else {
        value
            .0
            .iter()
            .rev()
            .fold(0.0f64, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_horizon_is_identity() {
        let base_fee = gwei(37);
        assert_eq!(max_base_fee_after(base_fee, 0), base_fee);
    }

    #[test]
    fn test_two_block_ceiling() {
        // 100 -> 113 -> 128
        assert_eq!(max_base_fee_after(U256::from(100), 1), U256::from(113));
        assert_eq!(max_base_fee_after(U256::from(100), 2), U256::from(128));
    }

    #[test]
    fn test_ceiling_is_monotonic_in_horizon() {
        for base_fee in [0u64, 1, 7, 100, 12 * GWEI, 250 * GWEI] {
            let mut previous = max_base_fee_after(U256::from(base_fee), 0);
            for horizon in 1..25 {
                let current = max_base_fee_after(U256::from(base_fee), horizon);
                assert!(current >= previous, "base {} horizon {}", base_fee, horizon);
                previous = current;
            }
        }
    }

    #[test]
    fn test_ceiling_covers_exact_compounding() {
        // Compare against b * 1125^h / 1000^h computed without intermediate truncation.
        for base_fee in [1u64, 3, 100, 999, 30 * GWEI] {
            for horizon in 0..12u64 {
                let ceiling = max_base_fee_after(U256::from(base_fee), horizon);
                let numerator = U256::from(base_fee) * U256::from(1125).pow(U256::from(horizon));
                let denominator = U256::from(1000).pow(U256::from(horizon));
                assert!(
                    ceiling * denominator >= numerator,
                    "base {} horizon {}",
                    base_fee,
                    horizon
                );
            }
        }
    }

    #[test]
    fn test_max_fee_per_gas_adds_priority_fee() {
        let params = FeeParameters {
            base_fee: U256::from(100),
            priority_fee: gwei(3),
            horizon_blocks: 2,
        };
        assert_eq!(max_fee_per_gas(&params), gwei(3) + U256::from(128));
    }

    #[test]
    fn test_scale_to_decimal_truncates() {
        assert_eq!(scale_to_decimal(U256::from(12345), 4), 1.2345);
        assert_eq!(scale_to_decimal(U256::from(99999), 4), 9.9999);
        assert_eq!(scale_to_decimal(U256::from(123_456_789u64), 9), 0.1234);
    }

    #[test]
    fn test_scale_to_decimal_ether() {
        let one_and_a_half_ether = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(scale_to_decimal(one_and_a_half_ether, 18), 1.5);
        assert_eq!(scale_to_decimal(U256::zero(), 18), 0.0);
    }
}
