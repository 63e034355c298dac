//! Property tests for the tokenizer and the list blob parser

use nut_exporter_core::ResponseParser;
use nut_exporter_core::protocol::tokenize;
use proptest::prelude::*;

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

proptest! {
    /// Property: tokenizing never fails and every token consumes input
    #[test]
    fn tokenize_is_total(line in ".{0,120}") {
        let tokens = tokenize(&line);
        prop_assert!(tokens.len() <= line.chars().count());
    }

    /// Property: a quoted value survives with spaces, quotes and backslashes
    #[test]
    fn quoted_value_is_recovered(
        name in "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}",
        value in "[ -~]{0,40}",
    ) {
        let line = format!("VAR ups {name} {}", quote(&value));
        let tokens = tokenize(&line);
        prop_assert_eq!(tokens.len(), 4);
        prop_assert_eq!(&tokens[2], &name);
        prop_assert_eq!(&tokens[3], &value);
    }

    /// Property: parsing never fails and only keeps usable names
    #[test]
    fn parse_is_total(blob in "(.{0,40}\n){0,10}") {
        let records = ResponseParser::parse(&blob);
        prop_assert!(records.len() <= blob.lines().count());
        for record in &records {
            prop_assert!(!record.name.is_empty());
            prop_assert!(!record.name.contains(char::is_whitespace));
        }
    }

    /// Property: a well-formed line keeps its value verbatim
    #[test]
    fn normalized_line_round_trips(
        name in "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}",
        value in "[ -~]{0,40}",
    ) {
        let records = ResponseParser::parse(&format!("{name}: {value}"));
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(&records[0].name, &name);
        prop_assert_eq!(&records[0].value, &value);
    }
}
