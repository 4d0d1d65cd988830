//! EAN-13 symbology.
//!
//! A symbol is 95 modules: start guard (3), six left digits (7 each),
//! centre guard (5), six right digits (7 each), end guard (3). Left digits
//! use L (odd) or G (even) patterns; the L/G mix encodes the leading
//! digit. Right digits use R patterns. Decoding works on run lengths, so a
//! row only needs to be binarized, not resampled.

/// Quiet zone drawn on each side of an encoded symbol, in modules.
pub const QUIET_ZONE: usize = 11;

/// Total modules in a symbol.
pub const SYMBOL_MODULES: usize = 95;

/// Runs (alternating bars and spaces) in a symbol.
const SYMBOL_RUNS: usize = 59;

/// Sum of per-element module deviations accepted for a digit.
const MAX_PATTERN_ERROR: f32 = 1.5;

/// Element widths of L patterns, starting with a space.
/// R patterns have the same widths starting with a bar; G patterns are
/// L reversed.
const L_WIDTHS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// L/G mix of the left half for each leading digit; bit 5 is the first
/// left digit, a set bit means G.
const PARITY: [u8; 10] = [
    0b000000, 0b001011, 0b001101, 0b001110, 0b010011, 0b011001, 0b011100, 0b010101, 0b010110,
    0b011010,
];

fn g_widths(digit: usize) -> [u8; 4] {
    let [a, b, c, d] = L_WIDTHS[digit];
    [d, c, b, a]
}

/// Computes the EAN-13 check digit for the first twelve digits.
pub fn check_digit(digits: &[u8; 12]) -> u8 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Parses thirteen ASCII digits.
fn parse_digits(code: &str) -> Option<[u8; 13]> {
    let bytes = code.as_bytes();
    if bytes.len() != 13 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let mut digits = [0u8; 13];
    for (d, b) in digits.iter_mut().zip(bytes) {
        *d = b - b'0';
    }
    Some(digits)
}

/// Returns true if `code` is thirteen digits with a correct check digit.
pub fn is_valid_code(code: &str) -> bool {
    parse_digits(code).is_some_and(|digits| {
        let mut head = [0u8; 12];
        head.copy_from_slice(&digits[..12]);
        check_digit(&head) == digits[12]
    })
}

/// Encodes a valid EAN-13 string into its 95 modules (`true` = bar).
pub fn encode_modules(code: &str) -> Option<Vec<bool>> {
    if !is_valid_code(code) {
        return None;
    }
    let digits = parse_digits(code)?;
    let parity = PARITY[usize::from(digits[0])];

    let mut modules = Vec::with_capacity(SYMBOL_MODULES);
    push_runs(&mut modules, &[1, 1, 1], true);
    for (pos, &digit) in digits[1..7].iter().enumerate() {
        let widths = if parity & (1 << (5 - pos)) != 0 {
            g_widths(usize::from(digit))
        } else {
            L_WIDTHS[usize::from(digit)]
        };
        push_runs(&mut modules, &widths, false);
    }
    push_runs(&mut modules, &[1, 1, 1, 1, 1], false);
    for &digit in &digits[7..] {
        push_runs(&mut modules, &L_WIDTHS[usize::from(digit)], true);
    }
    push_runs(&mut modules, &[1, 1, 1], true);

    Some(modules)
}

fn push_runs(modules: &mut Vec<bool>, widths: &[u8], starts_dark: bool) {
    let mut dark = starts_dark;
    for &w in widths {
        modules.extend(std::iter::repeat(dark).take(usize::from(w)));
        dark = !dark;
    }
}

/// Run-length encodes a binarized row into `(dark, width)` pairs.
fn runs_of(row: &[bool]) -> Vec<(bool, u32)> {
    let mut runs: Vec<(bool, u32)> = Vec::new();
    for &dark in row {
        match runs.last_mut() {
            Some((color, width)) if *color == dark => *width += 1,
            _ => runs.push((dark, 1)),
        }
    }
    runs
}

/// Decodes the first EAN-13 symbol found in a binarized row, trying the
/// row as given and then mirrored (symbol upside down).
pub fn decode_row(row: &[bool]) -> Option<String> {
    let runs = runs_of(row);
    decode_runs(&runs).or_else(|| {
        let mirrored: Vec<(bool, u32)> = runs.iter().rev().copied().collect();
        decode_runs(&mirrored)
    })
}

fn decode_runs(runs: &[(bool, u32)]) -> Option<String> {
    if runs.len() < SYMBOL_RUNS + 1 {
        return None;
    }
    // A symbol starts with a bar preceded by a quiet (light) run.
    (1..=runs.len() - SYMBOL_RUNS)
        .filter(|&i| runs[i].0 && !runs[i - 1].0)
        .find_map(|i| decode_window(&runs[i..i + SYMBOL_RUNS]))
}

fn widths<const N: usize>(runs: &[(bool, u32)]) -> [u32; N] {
    let mut out = [0u32; N];
    for (o, (_, w)) in out.iter_mut().zip(runs) {
        *o = *w;
    }
    out
}

/// Each guard element must be close to one module.
fn is_guard(widths: &[u32], module: f32) -> bool {
    widths.iter().all(|&w| {
        let ratio = w as f32 / module;
        (0.5..=1.75).contains(&ratio)
    })
}

/// Best-fit pattern for four element widths; returns `(index, error)`.
fn best_fit(widths: [u32; 4], patterns: impl Iterator<Item = [u8; 4]>) -> Option<(usize, f32)> {
    let total: u32 = widths.iter().sum();
    if total == 0 {
        return None;
    }
    let scale = 7.0 / total as f32;
    patterns
        .enumerate()
        .map(|(index, pattern)| {
            let error: f32 = widths
                .iter()
                .zip(pattern)
                .map(|(&w, p)| (w as f32 * scale - f32::from(p)).abs())
                .sum();
            (index, error)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|&(_, error)| error <= MAX_PATTERN_ERROR)
}

fn decode_window(window: &[(bool, u32)]) -> Option<String> {
    let start: [u32; 3] = widths(&window[0..3]);
    let mut module = start.iter().sum::<u32>() as f32 / 3.0;
    if !is_guard(&start, module) {
        return None;
    }

    let mut digits = [0u8; 13];
    let mut parity = 0u8;

    for pos in 0..6 {
        let offset = 3 + pos * 4;
        let digit_widths: [u32; 4] = widths(&window[offset..offset + 4]);
        if !plausible_digit(&digit_widths, module) {
            return None;
        }
        // L patterns are indices 0..10, G patterns 10..20.
        let candidates = (0..10).map(|d| L_WIDTHS[d]).chain((0..10).map(g_widths));
        let (index, _) = best_fit(digit_widths, candidates)?;
        digits[pos + 1] = (index % 10) as u8;
        if index >= 10 {
            parity |= 1 << (5 - pos);
        }
        module = digit_widths.iter().sum::<u32>() as f32 / 7.0;
    }

    let middle: [u32; 5] = widths(&window[27..32]);
    if !is_guard(&middle, module) {
        return None;
    }

    for pos in 0..6 {
        let offset = 32 + pos * 4;
        let digit_widths: [u32; 4] = widths(&window[offset..offset + 4]);
        if !plausible_digit(&digit_widths, module) {
            return None;
        }
        let (index, _) = best_fit(digit_widths, L_WIDTHS.iter().copied())?;
        digits[pos + 7] = index as u8;
        module = digit_widths.iter().sum::<u32>() as f32 / 7.0;
    }

    let end: [u32; 3] = widths(&window[56..59]);
    if !is_guard(&end, module) {
        return None;
    }

    digits[0] = PARITY.iter().position(|&p| p == parity)? as u8;

    let mut head = [0u8; 12];
    head.copy_from_slice(&digits[..12]);
    if check_digit(&head) != digits[12] {
        return None;
    }

    Some(digits.iter().map(|d| char::from(b'0' + d)).collect())
}

/// A digit spans roughly seven modules.
fn plausible_digit(widths: &[u32; 4], module: f32) -> bool {
    let ratio = widths.iter().sum::<u32>() as f32 / (7.0 * module);
    (0.6..=1.5).contains(&ratio)
}

#[cfg(test)]
pub(crate) fn render_row(code: &str, module_px: usize) -> Vec<bool> {
    let modules = encode_modules(code).unwrap();
    let mut row = vec![false; QUIET_ZONE * module_px];
    for dark in modules {
        row.extend(std::iter::repeat(dark).take(module_px));
    }
    row.extend(std::iter::repeat(false).take(QUIET_ZONE * module_px));
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_digit() {
        assert!(is_valid_code("9780131103627"));
        assert!(is_valid_code("9780306406157"));
        assert!(is_valid_code("5901234123457"));
        assert!(!is_valid_code("9780131103620"));
        assert!(!is_valid_code("978013110362"));
        assert!(!is_valid_code("97801311036X7"));
    }

    #[test]
    fn test_encode_shape() {
        let modules = encode_modules("9780131103627").unwrap();
        assert_eq!(modules.len(), SYMBOL_MODULES);
        assert_eq!(&modules[..3], &[true, false, true]);
        assert_eq!(&modules[45..50], &[false, true, false, true, false]);
        assert_eq!(&modules[92..], &[true, false, true]);
        assert!(encode_modules("9780131103620").is_none());
    }

    #[test]
    fn test_decode_ideal_rows() {
        for code in ["9780131103627", "9780306406157", "5901234123457", "0012345678905"] {
            for module_px in 1..=4 {
                let row = render_row(code, module_px);
                assert_eq!(decode_row(&row).as_deref(), Some(code), "{code} at {module_px}px");
            }
        }
    }

    #[test]
    fn test_decode_mirrored_row() {
        let mut row = render_row("9780131103627", 3);
        row.reverse();
        assert_eq!(decode_row(&row).as_deref(), Some("9780131103627"));
    }

    #[test]
    fn test_decode_with_uneven_bar_growth() {
        // Ink spread: every bar one pixel wider, every space one narrower.
        let row = render_row("9780306406157", 4);
        let mut grown = row.clone();
        for i in 1..row.len() {
            if row[i - 1] && !row[i] {
                grown[i] = true;
            }
        }
        assert_eq!(decode_row(&grown).as_deref(), Some("9780306406157"));
    }

    #[test]
    fn test_decode_with_offset_and_clutter() {
        let mut row = vec![true, true, false, true, false, false, false, true];
        row.extend(render_row("5901234123457", 2));
        row.extend([true, false, true, true]);
        assert_eq!(decode_row(&row).as_deref(), Some("5901234123457"));
    }

    #[test]
    fn test_blank_and_noise_rows_fail() {
        assert!(decode_row(&[]).is_none());
        assert!(decode_row(&vec![false; 500]).is_none());
        let stripes: Vec<bool> = (0..500).map(|i| i % 2 == 0).collect();
        assert!(decode_row(&stripes).is_none());
    }

    #[test]
    fn test_truncated_symbol_fails() {
        let row = render_row("9780131103627", 2);
        assert!(decode_row(&row[..row.len() / 2]).is_none());
    }
}
