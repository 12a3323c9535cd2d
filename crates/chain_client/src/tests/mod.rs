
use serde_json::json;

use crate::parse_u64_value;

#[test]
fn parses_u64_from_strings_and_numbers() {
    assert_eq!(parse_u64_value(&json!("18446744073709551615")).expect("max"), u64::MAX);
    assert_eq!(parse_u64_value(&json!(12)).expect("number"), 12);
    assert!(parse_u64_value(&json!(-1)).is_err());
    assert!(parse_u64_value(&json!("12a")).is_err());
    assert!(parse_u64_value(&json!(null)).is_err());
}
