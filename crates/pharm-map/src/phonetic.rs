//! Soundex-style phonetic codes for brand-name matching.

const CODE_LEN: usize = 4;

fn digit(ch: char) -> Option<char> {
    match ch {
        'B' | 'F' | 'P' | 'V' => Some('1'),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some('2'),
        'D' | 'T' => Some('3'),
        'L' => Some('4'),
        'M' | 'N' => Some('5'),
        'R' => Some('6'),
        _ => None,
    }
}

/// Four-character code: first letter, then consonant-class digits.
///
/// Repeated classes collapse even across vowels, so `PANADOL` and `PANODOL`
/// share a code.
pub fn soundex(word: &str) -> String {
    let mut chars = word.chars().flat_map(char::to_uppercase);
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut code = String::with_capacity(CODE_LEN);
    code.push(first);
    let mut previous = None;
    for class in chars.filter_map(digit) {
        if previous != Some(class) {
            code.push(class);
            previous = Some(class);
        }
    }
    while code.chars().count() < CODE_LEN {
        code.push('0');
    }
    code.chars().take(CODE_LEN).collect()
}

/// Share of words whose code appears among the other side's codes,
/// relative to the longer side.
pub fn similarity(a: &str, b: &str) -> f64 {
    let codes_a: Vec<String> = a.split_whitespace().map(soundex).collect();
    let codes_b: Vec<String> = b.split_whitespace().map(soundex).collect();
    let longest = codes_a.len().max(codes_b.len());
    if codes_a.is_empty() || codes_b.is_empty() {
        return 0.0;
    }
    let matches = codes_a.iter().filter(|code| codes_b.contains(code)).count();
    matches as f64 / longest as f64
}
