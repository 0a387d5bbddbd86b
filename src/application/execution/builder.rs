//! Order construction.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::{
    AccountSnapshot, OrderIntent, OrderRequest, OrderSide, OrderType, Quote,
};
use crate::error::ValidationError;

/// Decimal places of limit prices.
pub const PRICE_SCALE: u32 = 4;

/// Limit price with a marketable buffer: above the ask for buys, below the
/// bid for sells.
#[must_use]
pub fn limit_price(side: OrderSide, quote: &Quote, buffer: Decimal) -> Decimal {
    let raw = match side {
        OrderSide::Buy => quote.ask * (Decimal::ONE + buffer),
        OrderSide::Sell => quote.bid * (Decimal::ONE - buffer),
    };
    raw.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Turn an intent into a concrete broker order.
///
/// Sized intents become limit orders for `buying_power * allocation / limit`
/// units, rounded down to the asset class lot precision. Flattening intents
/// (`close_quantity`) become market orders for the whole position.
///
/// # Errors
/// Returns a [`ValidationError`] when the order would be empty or priced at
/// or below zero.
pub fn build_order(
    intent: &OrderIntent,
    account: &AccountSnapshot,
    quote: &Quote,
    buffer: Decimal,
) -> Result<OrderRequest, ValidationError> {
    if !(Decimal::ZERO..=Decimal::ONE).contains(&intent.allocation) {
        return Err(ValidationError::AllocationOutOfRange(intent.allocation));
    }

    let scale = intent.asset_class.quantity_scale();
    let (quantity, order_type) = if let Some(close) = intent.close_quantity {
        let quantity = close
            .abs()
            .round_dp_with_strategy(scale, RoundingStrategy::ToZero);
        (quantity, OrderType::Market)
    } else {
        let price = limit_price(intent.side, quote, buffer);
        if price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(price));
        }
        let quantity = (account.buying_power.max(Decimal::ZERO) * intent.allocation / price)
            .round_dp_with_strategy(scale, RoundingStrategy::ToZero);
        (quantity, OrderType::Limit(price))
    };

    let request = OrderRequest {
        client_order_id: intent.intent_id.clone(),
        symbol: intent.symbol.clone(),
        side: intent.side,
        quantity,
        order_type,
        asset_class: intent.asset_class,
    };
    request.validate()?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AccountId, AssetClass, IntentId, IntentState, ModuleId, Symbol,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn intent(side: OrderSide, allocation: Decimal, asset_class: AssetClass) -> OrderIntent {
        OrderIntent {
            intent_id: IntentId::generate(),
            account_id: AccountId::from("a"),
            module_id: ModuleId::from("orchestrator"),
            symbol: Symbol::from("AAPL"),
            side,
            allocation,
            close_quantity: None,
            asset_class,
            estimated_slippage: Decimal::ZERO,
            state: IntentState::Routed,
            created_at: Utc::now(),
        }
    }

    fn account(buying_power: Decimal) -> AccountSnapshot {
        AccountSnapshot {
            account_id: AccountId::from("a"),
            equity: buying_power,
            buying_power,
            positions: vec![],
            open_orders: vec![],
        }
    }

    #[test]
    fn buy_limit_is_above_ask_and_quantity_rounds_down() {
        let quote = Quote::new(dec!(99.99), dec!(100.01));
        let order = build_order(
            &intent(OrderSide::Buy, dec!(0.10), AssetClass::Equity),
            &account(dec!(100000)),
            &quote,
            dec!(0.005),
        )
        .unwrap();
        // 100.01 * 1.005 = 100.51005 -> 100.5101
        assert_eq!(order.order_type, OrderType::Limit(dec!(100.5101)));
        // 10000 / 100.5101 = 99.49... -> 99
        assert_eq!(order.quantity, dec!(99));
    }

    #[test]
    fn sell_limit_is_below_bid() {
        let quote = Quote::new(dec!(100), dec!(100.02));
        let order = build_order(
            &intent(OrderSide::Sell, dec!(0.01), AssetClass::Equity),
            &account(dec!(100000)),
            &quote,
            dec!(0.005),
        )
        .unwrap();
        assert_eq!(order.order_type, OrderType::Limit(dec!(99.5)));
        assert_eq!(order.quantity, dec!(10));
    }

    #[test]
    fn crypto_keeps_eight_decimals() {
        let quote = Quote::new(dec!(30000), dec!(30000));
        let order = build_order(
            &intent(OrderSide::Buy, dec!(0.01), AssetClass::Crypto),
            &account(dec!(1000)),
            &quote,
            Decimal::ZERO,
        )
        .unwrap();
        // 10 / 30000 = 0.000333333...
        assert_eq!(order.quantity, dec!(0.00033333));
    }

    #[test]
    fn close_all_is_a_market_order_for_the_position() {
        let mut intent = intent(OrderSide::Sell, Decimal::ZERO, AssetClass::Equity);
        intent.close_quantity = Some(dec!(42));
        let order = build_order(
            &intent,
            &account(dec!(0)),
            &Quote::new(dec!(10), dec!(10.01)),
            dec!(0.005),
        )
        .unwrap();
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(order.quantity, dec!(42));
    }

    #[test]
    fn tiny_allocation_is_rejected_before_the_broker() {
        let err = build_order(
            &intent(OrderSide::Buy, dec!(0.00001), AssetClass::Equity),
            &account(dec!(1000)),
            &Quote::new(dec!(100), dec!(100)),
            dec!(0.005),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::ZeroQuantity(_)));
    }
}
