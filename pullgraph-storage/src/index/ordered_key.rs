use pullgraph_api::{PropertyValue, ValueGroup};

const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_STRING: u8 = 0x04;
const TAG_LIST: u8 = 0x07;
const TAG_MAP: u8 = 0x08;

const ELEMENT: u8 = 0x01;
const END: u8 = 0x00;

/// Encode a property value so that lexicographic byte order matches value order
/// within each value group.
///
/// Total ordering across types:
/// `Null < Bool < Int < Float < String < List < Map`.
///
/// Strings are encoded with byte-stuffing so embedded `\0` does not break ordering:
/// - `0x00` byte becomes `0x00 0xFF`
/// - terminator is `0x00 0x00`
///
/// List elements and map entries are each prefixed with `0x01` and the
/// sequence ends with `0x00`, so a shorter list sorts before any extension of it.
pub fn encode_ordered_value(v: &PropertyValue) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    write_ordered_value(&mut out, v);
    out
}

fn write_ordered_value(out: &mut Vec<u8>, v: &PropertyValue) {
    match v {
        PropertyValue::Null => out.push(TAG_NULL),
        PropertyValue::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        PropertyValue::Int(i) => {
            out.push(TAG_INT);
            let u = (*i as u64) ^ 0x8000_0000_0000_0000;
            out.extend_from_slice(&u.to_be_bytes());
        }
        PropertyValue::Float(f) => {
            out.push(TAG_FLOAT);
            let bits = f.to_bits();
            let sortable = if (bits & (1 << 63)) != 0 {
                // Negative numbers sort before positives: invert all bits.
                !bits
            } else {
                bits ^ (1 << 63)
            };
            out.extend_from_slice(&sortable.to_be_bytes());
        }
        PropertyValue::String(s) => {
            out.push(TAG_STRING);
            write_escaped(out, s.as_bytes());
            out.push(0x00);
            out.push(0x00);
        }
        PropertyValue::List(items) => {
            out.push(TAG_LIST);
            for item in items {
                out.push(ELEMENT);
                write_ordered_value(out, item);
            }
            out.push(END);
        }
        PropertyValue::Map(entries) => {
            out.push(TAG_MAP);
            for (key, value) in entries {
                out.push(ELEMENT);
                write_escaped(out, key.as_bytes());
                out.push(0x00);
                out.push(0x00);
                write_ordered_value(out, value);
            }
            out.push(END);
        }
    }
}

fn write_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == 0x00 {
            out.push(0x00);
            out.push(0xFF);
        } else {
            out.push(b);
        }
    }
}

/// Key prefix shared by every string starting with `prefix`.
pub fn encode_string_prefix(prefix: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + prefix.len());
    out.push(TAG_STRING);
    write_escaped(&mut out, prefix.as_bytes());
    out
}

/// The inclusive lower and exclusive upper key covering a whole value group.
pub fn group_key_range(group: ValueGroup) -> (Vec<u8>, Vec<u8>) {
    let (first, last) = match group {
        ValueGroup::Null => (TAG_NULL, TAG_NULL),
        ValueGroup::Boolean => (TAG_BOOL, TAG_BOOL),
        ValueGroup::Number => (TAG_INT, TAG_FLOAT),
        ValueGroup::Text => (TAG_STRING, TAG_STRING),
        ValueGroup::List => (TAG_LIST, TAG_LIST),
        ValueGroup::Map => (TAG_MAP, TAG_MAP),
    };
    (vec![first], vec![last + 1])
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn assert_ordered(values: Vec<PropertyValue>) {
        let encoded: Vec<Vec<u8>> = values.iter().map(encode_ordered_value).collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted, "ordered encoding does not preserve order");
    }

    #[test]
    fn ordered_across_groups() {
        assert_ordered(vec![
            PropertyValue::Null,
            PropertyValue::Bool(false),
            PropertyValue::Bool(true),
            PropertyValue::Int(-1),
            PropertyValue::Float(0.5),
            PropertyValue::String("".into()),
            PropertyValue::String("A".into()),
            PropertyValue::String("a".into()),
            PropertyValue::String("aa".into()),
            PropertyValue::List(vec![]),
            PropertyValue::Map(BTreeMap::new()),
        ]);
    }

    #[test]
    fn ordered_string_with_nul_byte() {
        assert_ordered(vec![
            PropertyValue::String("a".into()),
            PropertyValue::String("a\0".into()),
            PropertyValue::String("a\0x".into()),
            PropertyValue::String("b".into()),
        ]);
    }

    #[test]
    fn lists_order_elementwise_then_by_length() {
        assert_ordered(vec![
            PropertyValue::List(vec![]),
            PropertyValue::List(vec![PropertyValue::from("a")]),
            PropertyValue::List(vec![PropertyValue::from("a"), PropertyValue::from("a")]),
            PropertyValue::List(vec![PropertyValue::from("b")]),
        ]);
    }

    #[test]
    fn prefix_is_a_byte_prefix_of_matching_strings() {
        let prefix = encode_string_prefix("ab");
        assert!(encode_ordered_value(&PropertyValue::from("ab")).starts_with(&prefix));
        assert!(encode_ordered_value(&PropertyValue::from("abc")).starts_with(&prefix));
        assert!(!encode_ordered_value(&PropertyValue::from("a")).starts_with(&prefix));
    }

    #[test]
    fn group_range_brackets_group_members() {
        let (lo, hi) = group_key_range(ValueGroup::Text);
        let key = encode_ordered_value(&PropertyValue::from("zzz"));
        assert!(lo <= key && key < hi);
        let other = encode_ordered_value(&PropertyValue::List(vec![]));
        assert!(other >= hi);
    }
}
