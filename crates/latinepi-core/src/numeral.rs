//! Roman numeral conversion

/// Largest plausible age in years
pub const MAX_AGE: u32 = 150;

fn digit_value(c: char) -> Option<u32> {
    match c.to_ascii_uppercase() {
        'I' => Some(1),
        // U and V are the same letter in normalized text
        'V' | 'U' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        'D' => Some(500),
        'M' => Some(1000),
        _ => None,
    }
}

/// Convert a Roman numeral, processing right to left and subtracting a
/// smaller value that precedes a larger one.
///
/// Returns `None` for empty input or any non-numeral character. Lenient
/// about non-canonical forms (`IIII` is 4, `IC` is 99).
pub fn roman_to_int(numeral: &str) -> Option<u32> {
    let mut total: u32 = 0;
    let mut prev = 0;
    let mut seen = false;

    for c in numeral.trim().chars().rev() {
        let value = digit_value(c)?;
        if value < prev {
            total = total.checked_sub(value)?;
        } else {
            total = total.checked_add(value)?;
            prev = value;
        }
        seen = true;
    }

    seen.then_some(total)
}

/// Convert a numeral used as an age, rejecting values outside `1..=150`
pub fn age_from_numeral(numeral: &str) -> Option<u32> {
    roman_to_int(numeral).filter(|age| (1..=MAX_AGE).contains(age))
}

/// Check whether a token consists only of numeral letters (`V` form)
pub fn is_roman_numeral(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| matches!(c.to_ascii_uppercase(), 'I' | 'V' | 'X' | 'L' | 'C' | 'D' | 'M'))
}
