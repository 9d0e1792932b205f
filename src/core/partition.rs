use crate::kvdb::{KeyRange, schema::keys};

/// Hex digits that can start a non-zero transaction id. Boundaries are drawn
/// on these, so zero-prefixed ids always land in the first partition.
const LEAD_DIGITS: &str = "123456789abcdef";

/// Splits the transaction-id keyspace into contiguous, non-overlapping
/// half-open ranges covering every possible id.
///
/// Boundaries fall on leading hex digits, one every `ceil(15 / concurrency)`
/// digits, plus a trailing remainder range out to the end of the keyspace.
/// The count can therefore land one above the requested concurrency when the
/// division is uneven. Requests wider than the digit set are clamped.
pub fn trx_row_ranges(concurrency: usize) -> Vec<KeyRange> {
    let digits: Vec<char> = LEAD_DIGITS.chars().collect();
    let concurrency = concurrency.clamp(1, digits.len());
    let step = digits.len().div_ceil(concurrency);

    let mut ranges = Vec::new();
    let mut start = String::new();
    let mut index = 0;
    while index < digits.len() {
        let end = boundary(digits[index]);
        ranges.push(KeyRange::new(start.clone(), end.clone()));
        start = end;
        index += step;
    }

    // The remainder runs out past the last possible encoded id; ';' sorts
    // just above the ':' row separator.
    let terminal = format!("{}{}", "f".repeat(keys::TRX_ID_HEX_LEN), ';');
    ranges.push(KeyRange::new(start, terminal));
    ranges
}

/// End bound for a lead digit: the digit padded with zeros to a full id
/// length, then the `:` separator, so every row keyed by a strictly smaller
/// id sorts below it.
fn boundary(digit: char) -> String {
    format!(
        "{digit}{}{}",
        "0".repeat(keys::TRX_ID_HEX_LEN - 1),
        keys::ROW_SEPARATOR
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers_keyspace(ranges: &[KeyRange]) {
        assert!(!ranges.is_empty());
        assert_eq!(ranges[0].start, "");
        for window in ranges.windows(2) {
            assert_eq!(window[0].end, window[1].start, "ranges must be contiguous");
            assert!(window[0].start < window[0].end);
        }
        // The terminal bound sorts above any encoded trx row key.
        let max_key = keys::encode_trx_key(&"f".repeat(keys::TRX_ID_HEX_LEN), u32::MAX);
        assert!(ranges.last().unwrap().end > max_key);
    }

    #[test]
    fn single_reader_still_splits_off_the_zero_prefix() {
        let ranges = trx_row_ranges(1);
        assert_eq!(ranges.len(), 2);
        assert_covers_keyspace(&ranges);
        assert_eq!(ranges[0].end, format!("1{}:", "0".repeat(63)));
    }

    #[test]
    fn eight_way_split_is_contiguous() {
        // ceil(15 / 8) = 2 lead digits per stride: 8 boundary ranges plus
        // the remainder.
        let ranges = trx_row_ranges(8);
        assert_eq!(ranges.len(), 9);
        assert_covers_keyspace(&ranges);
        assert_eq!(ranges[1].end, format!("3{}:", "0".repeat(63)));
    }

    #[test]
    fn full_width_split_gives_one_range_per_digit() {
        let ranges = trx_row_ranges(16);
        assert_eq!(ranges.len(), 16);
        assert_covers_keyspace(&ranges);
        assert_eq!(ranges[0].end, format!("1{}:", "0".repeat(63)));
    }

    #[test]
    fn every_lead_digit_falls_in_exactly_one_range() {
        for concurrency in [1, 2, 3, 5, 8, 15, 16, 32] {
            let ranges = trx_row_ranges(concurrency);
            assert_covers_keyspace(&ranges);
            for digit in "0123456789abcdef".chars() {
                let key = keys::encode_trx_key(
                    &format!("{digit}{}", "3".repeat(keys::TRX_ID_HEX_LEN - 1)),
                    42,
                );
                let holders = ranges.iter().filter(|r| r.contains(&key)).count();
                assert_eq!(holders, 1, "digit {digit} at concurrency {concurrency}");
            }
        }
    }
}
