//! Property-based tests for specialization constant overrides.
//!
//! Uses `proptest` to generate random override strings and verify:
//! - In-range integers are stored unchanged, out-of-range ones are rejected
//! - Ids missing from the module are always rejected
//! - Decimal floats reproduce the nearest value in the target format
//! - Entry separators and repeated ids behave the same for any input

use proptest::prelude::*;
use spirv_bridge::test_harness::*;
use spirv_bridge::{SpecConstError, parse_spec_consts};

fn int_width() -> impl Strategy<Value = u32> {
    prop_oneof![Just(8u32), Just(16), Just(32), Just(64)]
}

fn truncate(value: u64, width: u32) -> u64 {
    if width == 64 {
        value
    } else {
        value & ((1 << width) - 1)
    }
}

// ============================================================================
// Integer overrides
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn in_range_integer_is_stored_unchanged(width in int_width(), raw in any::<u64>()) {
        let value = truncate(raw, width);
        let table = table(&[(0, (width / 8) as usize)]);
        let overrides = parse_spec_consts(&format!("0:i{width}:{value}"), &table).unwrap();
        prop_assert_eq!(overrides[&0], value);
    }

    #[test]
    fn out_of_range_integer_is_rejected(
        width in prop_oneof![Just(8u32), Just(16), Just(32)],
        excess in 1u64..1024,
        raw in any::<u64>(),
    ) {
        let value = truncate(raw, width) | (excess << width);
        let table = table(&[(0, (width / 8) as usize)]);
        let result = parse_spec_consts(&format!("0:i{width}:{value}"), &table);
        let is_range_error = matches!(result, Err(SpecConstError::ValueRange { .. }));
        prop_assert!(is_range_error);
    }

    #[test]
    fn mismatched_size_is_rejected(width in int_width(), size in 1usize..=8) {
        prop_assume!(size != (width / 8) as usize);
        let table = table(&[(0, size)]);
        let result = parse_spec_consts(&format!("0:i{width}:1"), &table);
        let is_size_error = matches!(result, Err(SpecConstError::SizeMismatch { .. }));
        prop_assert!(is_size_error);
    }

    #[test]
    fn id_missing_from_module_is_rejected(known in 0u32..100, id in 100u32..) {
        let table = table(&[(known, 4)]);
        let result = parse_spec_consts(&format!("{known}:i32:0 {id}:i32:0"), &table);
        prop_assert_eq!(
            result,
            Err(SpecConstError::UnknownSpecId { entry: format!("{id}:i32:0"), id })
        );
    }

    #[test]
    fn entry_without_value_is_malformed(entry in "[0-9a-z]{1,8}(:[0-9a-z]{0,8})?") {
        let table = table(&[(0, 4)]);
        prop_assert_eq!(
            parse_spec_consts(&entry, &table),
            Err(SpecConstError::MalformedEntry { entry: entry.clone() })
        );
    }
}

// ============================================================================
// Float overrides
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn normal_double_round_trips(value in any::<f64>().prop_filter("normal", |v| v.is_normal())) {
        let table = table(&[(0, 8)]);
        let overrides = parse_spec_consts(&format!("0:f64:{value}"), &table).unwrap();
        prop_assert_eq!(overrides[&0], value.to_bits());
    }

    #[test]
    fn normal_single_round_trips(value in any::<f32>().prop_filter("normal", |v| v.is_normal())) {
        let table = table(&[(0, 4)]);
        let overrides = parse_spec_consts(&format!("0:f32:{value}"), &table).unwrap();
        prop_assert_eq!(overrides[&0], u64::from(value.to_bits()));
    }

    #[test]
    fn normal_half_round_trips(magnitude in 0x0400u16..0x7c00, negative in any::<bool>()) {
        let bits = if negative { magnitude | 0x8000 } else { magnitude };
        let value = half_to_f64(bits);
        let table = table(&[(0, 2)]);
        let overrides = parse_spec_consts(&format!("0:f16:{value}"), &table).unwrap();
        prop_assert_eq!(overrides[&0], u64::from(bits));
    }

    #[test]
    fn half_picks_nearest_value(value in -65000.0f64..65000.0) {
        // Values this close to zero underflow.
        prop_assume!(value.abs() >= 6.2e-5);
        let table = table(&[(0, 2)]);
        let overrides = parse_spec_consts(&format!("0:f16:{value}"), &table).unwrap();
        let bits = overrides[&0] as u16;

        let chosen = half_to_f64(bits);
        let below = half_to_f64(bits.wrapping_sub(1));
        let above = half_to_f64(bits.wrapping_add(1));
        let error = (chosen - value).abs();
        prop_assert!(error <= (below - value).abs());
        prop_assert!(error <= (above - value).abs());
    }
}

// ============================================================================
// Whole override strings
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn later_entry_wins(first in any::<u32>(), second in any::<u32>()) {
        let table = table(&[(3, 4)]);
        let overrides = parse_spec_consts(&format!("3:i32:{first} 3:i32:{second}"), &table).unwrap();
        prop_assert_eq!(overrides.len(), 1);
        prop_assert_eq!(overrides[&3], u64::from(second));
    }

    #[test]
    fn parsing_is_repeatable(text in "([0-3]:(i8|i32|f16|f64|q8):-?[0-9]{1,4}(\\.[0-9]{1,3})? ?){0,4}") {
        let table = table(&[(0, 1), (1, 4), (2, 2), (3, 8)]);
        prop_assert_eq!(parse_spec_consts(&text, &table), parse_spec_consts(&text, &table));
    }

    #[test]
    fn extra_spaces_are_ignored(
        lead in " {0,3}",
        sep in " {1,4}",
        trail in " {0,3}",
        a in any::<u16>(),
        b in any::<u32>(),
    ) {
        let table = table(&[(0, 2), (1, 4)]);
        let spaced = format!("{lead}0:i16:{a}{sep}1:i32:{b}{trail}");
        prop_assert_eq!(
            parse_spec_consts(&spaced, &table),
            parse_spec_consts(&format!("0:i16:{a} 1:i32:{b}"), &table)
        );
    }
}
