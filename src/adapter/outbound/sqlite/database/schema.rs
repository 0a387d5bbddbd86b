//! Diesel table definitions. Mirrors `migrations/`.

diesel::table! {
    ledger_entries (intent_id) {
        intent_id -> Text,
        account_id -> Text,
        module_id -> Text,
        symbol -> Text,
        side -> Text,
        quantity -> Text,
        limit_price -> Nullable<Text>,
        status -> Text,
        intent_state -> Text,
        broker_order_id -> Nullable<Text>,
        response -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
        history -> Text,
    }
}

diesel::table! {
    risk_states (account_id) {
        account_id -> Text,
        high_water_mark -> Text,
        current_equity -> Text,
        drawdown_pct -> Text,
        trading_enabled -> Bool,
        halt_reason -> Nullable<Text>,
        breached_at -> Nullable<Text>,
        trades_in_period -> Integer,
        period_started_at -> Text,
        last_updated -> Text,
        version -> BigInt,
    }
}

diesel::table! {
    control_state (id) {
        id -> Integer,
        halted -> Bool,
        reason -> Nullable<Text>,
        updated_at -> Text,
        version -> BigInt,
    }
}

diesel::table! {
    performance_records (id) {
        id -> Nullable<Integer>,
        module_id -> Text,
        period_start -> Text,
        period_end -> Text,
        realized_pnl -> Text,
        unrealized_pnl -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    ledger_entries,
    risk_states,
    control_state,
    performance_records,
);
