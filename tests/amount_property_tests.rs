//! Property-based tests for amount parsing and formatting
//!
//! User input arrives with currency symbols, grouping commas and stray
//! whitespace. These properties check that decoration never changes the value
//! read and that anything signed negative is refused.

use deal_negotiation::{
    NegotiationError,
    money::{Amount, AmountDelta, Currency, FractionDigits, parse_amount},
};
use proptest::prelude::*;

// PROPERTY TEST STRATEGIES

/// Strategy to generate amounts in minor units up to one trillion pesos
fn minor_strategy() -> impl Strategy<Value = u64> {
    0u64..=100_000_000_000_000u64
}

fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::PHP),
        Just(Currency::USD),
        Just(Currency::GBP),
        Just(Currency::EUR),
    ]
}

// PROPERTY TESTS
proptest! {
    /// Property: formatted output with two decimals parses back to the same amount
    #[test]
    fn prop_two_decimal_format_reads_back(
        minor in minor_strategy(),
        currency in currency_strategy(),
    ) {
        let amount = Amount::from_minor(minor);
        let rendered = amount.format(currency, FractionDigits::Two);

        prop_assert_eq!(parse_amount(&rendered).unwrap(), amount);
    }

    /// Property: plain Display output parses back to the same amount
    #[test]
    fn prop_display_reads_back(minor in minor_strategy()) {
        let amount = Amount::from_minor(minor);

        prop_assert_eq!(amount.to_string().parse::<Amount>().unwrap(), amount);
    }

    /// Property: a leading minus sign is always refused
    #[test]
    fn prop_negative_input_is_refused(
        minor in 1u64..=100_000_000u64,
        symbol in prop_oneof![Just(""), Just("₱"), Just("$ ")],
    ) {
        let raw = format!("-{symbol}{}", Amount::from_minor(minor));
        let refused = matches!(parse_amount(&raw), Err(NegotiationError::InvalidAmount(_)));

        prop_assert!(refused, "{} should be refused", raw);
    }

    /// Property: input without any digit is refused
    #[test]
    fn prop_digitless_input_is_refused(raw in "[a-zA-Z ,.₱$]{0,12}") {
        let refused = matches!(parse_amount(&raw), Err(NegotiationError::InvalidAmount(_)));

        prop_assert!(refused);
    }

    /// Property: zero-decimal formatting rounds to the nearest whole unit
    #[test]
    fn prop_zero_decimal_rounds_to_nearest(minor in minor_strategy()) {
        let rendered = Amount::from_minor(minor).format(Currency::PHP, FractionDigits::Zero);
        let whole = parse_amount(&rendered).unwrap().minor_units();

        prop_assert_eq!(whole % 100, 0);
        prop_assert!(whole.abs_diff(minor) <= 50);
    }

    /// Property: differences are antisymmetric and their magnitude matches
    #[test]
    fn prop_delta_antisymmetric(a in minor_strategy(), b in minor_strategy()) {
        let (a, b) = (Amount::from_minor(a), Amount::from_minor(b));
        let forward = AmountDelta::between(a, b);
        let backward = AmountDelta::between(b, a);

        prop_assert_eq!(forward.minor_units(), -backward.minor_units());
        prop_assert_eq!(forward.magnitude(), backward.magnitude());
        prop_assert_eq!(forward.is_over(), a > b);
    }
}
