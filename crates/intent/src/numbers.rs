use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Spelled-out cardinal numbers the rating/limit passes recognize
/// (spec.md §4.1 step 7: "one..twenty, thirty..hundred").
static SPELLED: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let mut m = HashMap::new();
    let ones = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
        "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
        "nineteen", "twenty",
    ];
    for (i, word) in ones.iter().enumerate() {
        m.insert(*word, (i + 1) as u32);
    }
    for (word, value) in [
        ("thirty", 30),
        ("forty", 40),
        ("fifty", 50),
        ("sixty", 60),
        ("seventy", 70),
        ("eighty", 80),
        ("ninety", 90),
        ("hundred", 100),
    ] {
        m.insert(word, value);
    }
    m
});

/// Parse a token as a number, either Arabic digits or a spelled-out word
/// from the table above. Returns `None` for anything else.
#[must_use]
pub fn parse_number(token: &str) -> Option<u32> {
    if let Ok(n) = token.parse::<u32>() {
        return Some(n);
    }
    SPELLED.get(token).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arabic_digits() {
        assert_eq!(parse_number("25"), Some(25));
    }

    #[test]
    fn parses_spelled_numbers() {
        assert_eq!(parse_number("twenty"), Some(20));
        assert_eq!(parse_number("hundred"), Some(100));
        assert_eq!(parse_number("seven"), Some(7));
    }

    #[test]
    fn rejects_unrecognized_words() {
        assert_eq!(parse_number("banana"), None);
    }
}
