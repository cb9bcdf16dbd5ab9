// Collector tests: page-count to megabyte conversion

mod common;

use common::dec;
use dbsize_monitor::collector::pages_to_mb;
use rust_decimal::Decimal;

#[test]
fn single_page_keeps_full_precision() {
    assert_eq!(pages_to_mb(1), dec("0.0078125"));
    assert_eq!(pages_to_mb(3), dec("0.0234375"));
}

#[test]
fn whole_megabytes_convert_exactly() {
    assert_eq!(pages_to_mb(0), Decimal::ZERO);
    assert_eq!(pages_to_mb(128), dec("1"));
    assert_eq!(pages_to_mb(128_000), dec("1000"));
    assert_eq!(pages_to_mb(128_001), dec("1000.0078125"));
}
