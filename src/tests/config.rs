use crate::MAX_EXPIRES_IN;
use crate::parse_expires_in;

#[test]
fn test_parse_expires_in() {
    assert_eq!(3600, parse_expires_in("3600").unwrap());
    assert_eq!(60, parse_expires_in(" 60 ").unwrap());
    assert_eq!(MAX_EXPIRES_IN, parse_expires_in(&MAX_EXPIRES_IN.to_string()).unwrap());
}

#[test]
fn test_parse_expires_in_out_of_range() {
    assert!(parse_expires_in("0").is_err());
    assert!(parse_expires_in("-3600").is_err());
    assert!(parse_expires_in(&(MAX_EXPIRES_IN + 1).to_string()).is_err());
    assert!(parse_expires_in(&i64::MAX.to_string()).is_err());
    assert!(parse_expires_in("an hour").is_err());
}
