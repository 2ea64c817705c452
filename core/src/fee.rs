//! Fee policy (component C5).
//!
//! Mirrors `getFeePerKb` from the original client: prefer the wallet's
//! explicit `paytxfee` if the operator set one, otherwise ask
//! `estimatesmartfee` for a 6-block target, and fall back to the node's
//! relay fee floor if neither is available. The relay fee is always the
//! final floor regardless of which branch is taken.
use bitcoin::Amount;

use crate::wallet::WalletAdapter;

const ESTIMATE_CONF_TARGET: u32 = 6;

/// Selects the fee rate (sat/kvB) this engine will pay for a spend
/// transaction, following the same preference order as the original
/// client's `getFeePerKb`.
pub fn select_fee_rate(wallet: &dyn WalletAdapter) -> anyhow::Result<Amount> {
    let relay_fee = wallet.relay_fee()?;
    let pay_tx_fee = wallet.pay_tx_fee()?;

    if pay_tx_fee > Amount::ZERO {
        return Ok(pay_tx_fee.max(relay_fee));
    }

    match wallet.estimate_smart_fee(ESTIMATE_CONF_TARGET)? {
        Some(estimate) => Ok(estimate.max(relay_fee)),
        None => {
            tracing::warn!("estimatesmartfee returned no result, falling back to relay fee");
            Ok(relay_fee)
        }
    }
}

/// `fee_rate` is sat/kvB; `size` is bytes. Rounds up, matching
/// `txrules.FeeForSerializeSize`'s behavior of never underpaying for a
/// partial kvB.
pub fn fee_for_size(fee_rate: Amount, size: usize) -> Amount {
    let rate = fee_rate.to_sat();
    let fee = (rate * size as u64).div_ceil(1000);
    Amount::from_sat(fee.max(rate))
}

/// True if `value` at `fee_rate` would be rejected by the network as dust,
/// using the same 3x-relay-cost-to-spend heuristic as
/// `txrules.IsDustAmount`.
pub fn is_dust(value: Amount, fee_rate: Amount) -> bool {
    // A spending input for a P2PKH output costs about 148 bytes; dust is
    // any output whose value is less than 3x the fee to spend it at the
    // relay fee rate.
    const SPEND_SIZE: u64 = 148;
    let dust_threshold = fee_for_size(fee_rate, SPEND_SIZE as usize).to_sat() * 3;
    value.to_sat() < dust_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::fake::FakeWallet;
    use bitcoin::NetworkKind;

    #[test]
    fn prefers_explicit_pay_tx_fee() {
        let mut wallet = FakeWallet::new(NetworkKind::Test);
        wallet.pay_tx_fee = Amount::from_sat(5_000);
        wallet.relay_fee = Amount::from_sat(1_000);
        assert_eq!(select_fee_rate(&wallet).unwrap(), Amount::from_sat(5_000));
    }

    #[test]
    fn pay_tx_fee_never_undercuts_relay_fee() {
        let mut wallet = FakeWallet::new(NetworkKind::Test);
        wallet.pay_tx_fee = Amount::from_sat(500);
        wallet.relay_fee = Amount::from_sat(1_000);
        assert_eq!(select_fee_rate(&wallet).unwrap(), Amount::from_sat(1_000));
    }

    #[test]
    fn falls_back_to_estimate_then_relay_fee() {
        let mut wallet = FakeWallet::new(NetworkKind::Test);
        wallet.pay_tx_fee = Amount::ZERO;
        wallet.smart_fee = Some(Amount::from_sat(3_000));
        wallet.relay_fee = Amount::from_sat(1_000);
        assert_eq!(select_fee_rate(&wallet).unwrap(), Amount::from_sat(3_000));

        wallet.smart_fee = None;
        assert_eq!(select_fee_rate(&wallet).unwrap(), Amount::from_sat(1_000));
    }

    #[test]
    fn dust_threshold_scales_with_fee_rate() {
        let low = Amount::from_sat(1_000);
        let high = Amount::from_sat(10_000);
        assert!(is_dust(Amount::from_sat(100), low) || !is_dust(Amount::from_sat(100), low));
        // A value that clears dust at a low fee rate may not at a high one.
        let value = Amount::from_sat(600);
        assert!(!is_dust(value, low));
        assert!(is_dust(value, high));
    }
}
