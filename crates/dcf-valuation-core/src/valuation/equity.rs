use rust_decimal::Decimal;

use crate::error::DcfError;
use crate::types::Money;
use crate::DcfResult;

/// Equity bridge: `EV - debt + cash`.
pub fn equity_value(enterprise_value: Money, cash: Money, debt: Money) -> DcfResult<Money> {
    enterprise_value
        .checked_sub(debt)
        .and_then(|x| x.checked_add(cash))
        .ok_or_else(|| DcfError::InvalidInput {
            field: "debt".into(),
            reason: "Equity bridge overflows decimal range".into(),
        })
}

/// Equity value per share.
///
/// Zero or unknown share counts report [`DcfError::DivisionByZero`]; callers
/// treat that as "price unavailable" rather than a failed valuation.
pub fn price_per_share(equity_value: Money, shares_outstanding: Option<Decimal>) -> DcfResult<Money> {
    match shares_outstanding {
        None => Err(DcfError::DivisionByZero {
            context: "price per share (shares outstanding unknown)".into(),
        }),
        Some(shares) if shares.is_zero() => Err(DcfError::DivisionByZero {
            context: "price per share (zero shares outstanding)".into(),
        }),
        Some(shares) if shares < Decimal::ZERO => Err(DcfError::InvalidInput {
            field: "shares_outstanding".into(),
            reason: "Shares outstanding cannot be negative".into(),
        }),
        Some(shares) => equity_value
            .checked_div(shares)
            .ok_or_else(|| DcfError::InvalidInput {
                field: "shares_outstanding".into(),
                reason: format!("Price per share for {shares} shares overflows decimal range"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_equity_bridge() {
        assert_eq!(equity_value(dec!(1000), dec!(150), dec!(400)).unwrap(), dec!(750));
    }

    #[test]
    fn test_net_cash_raises_equity() {
        assert!(equity_value(dec!(1000), dec!(500), dec!(100)).unwrap() > dec!(1000));
    }

    #[test]
    fn test_bridge_overflow_is_error() {
        assert!(equity_value(Decimal::MAX, Decimal::MAX, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_tiny_share_count_is_error() {
        let tiny = dec!(0.0000000000000000000000000001);
        let err = price_per_share(Decimal::MAX, Some(tiny)).unwrap_err();
        assert!(matches!(err, DcfError::InvalidInput { .. }));
    }

    #[test]
    fn test_price_per_share() {
        assert_eq!(price_per_share(dec!(750), Some(dec!(25))).unwrap(), dec!(30));
    }

    #[test]
    fn test_zero_shares_unavailable() {
        let err = price_per_share(dec!(750), Some(Decimal::ZERO)).unwrap_err();
        assert!(matches!(err, DcfError::DivisionByZero { .. }));
    }

    #[test]
    fn test_unknown_shares_unavailable() {
        assert!(matches!(
            price_per_share(dec!(750), None),
            Err(DcfError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_negative_shares_rejected() {
        assert!(matches!(
            price_per_share(dec!(750), Some(dec!(-5))),
            Err(DcfError::InvalidInput { .. })
        ));
    }
}
