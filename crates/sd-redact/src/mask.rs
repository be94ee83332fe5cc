//! Partial masking of strings.

/// Options for [`mask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOptions {
    /// Characters kept at the start.
    pub show_first: usize,
    /// Characters kept at the end.
    pub show_last: usize,
    pub mask_char: char,
    /// Minimum length of the masked result, in chars.
    pub min_length: Option<usize>,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            show_first: 0,
            show_last: 0,
            mask_char: '*',
            min_length: None,
        }
    }
}

impl MaskOptions {
    pub fn show_first(mut self, n: usize) -> Self {
        self.show_first = n;
        self
    }

    pub fn show_last(mut self, n: usize) -> Self {
        self.show_last = n;
        self
    }

    pub fn mask_char(mut self, c: char) -> Self {
        self.mask_char = c;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }
}

/// Keep the first/last characters of `value` and mask the middle.
///
/// Returns `value` unchanged when the visible window covers the whole string.
pub fn mask(value: &str, options: &MaskOptions) -> String {
    let chars: Vec<char> = value.chars().collect();
    let visible = options.show_first.saturating_add(options.show_last);
    if visible >= chars.len() {
        return value.to_string();
    }

    let natural = chars.len() - visible;
    let fill = match options.min_length {
        Some(min) => natural.max(min.saturating_sub(visible)),
        None => natural,
    };

    let mut out = String::with_capacity(value.len() + fill);
    out.extend(&chars[..options.show_first]);
    out.extend(std::iter::repeat(options.mask_char).take(fill));
    out.extend(&chars[chars.len() - options.show_last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_last() {
        assert_eq!(
            mask("4111111111111111", &MaskOptions::default().show_last(4)),
            "************1111"
        );
    }

    #[test]
    fn test_window_covers_value() {
        assert_eq!(mask("ab", &MaskOptions::default().show_first(5)), "ab");
        assert_eq!(
            mask("abcd", &MaskOptions::default().show_first(2).show_last(2)),
            "abcd"
        );
        assert_eq!(mask("", &MaskOptions::default()), "");
    }

    #[test]
    fn test_full_mask() {
        assert_eq!(mask("secret", &MaskOptions::default()), "******");
    }

    #[test]
    fn test_first_and_last_custom_char() {
        assert_eq!(
            mask(
                "john.doe@example.com",
                &MaskOptions::default().show_first(2).show_last(4).mask_char('#')
            ),
            "jo##############.com"
        );
    }

    #[test]
    fn test_min_length() {
        assert_eq!(
            mask("abc", &MaskOptions::default().show_first(1).min_length(8)),
            "a*******"
        );
        // Shorter minimum than the natural result has no effect
        assert_eq!(
            mask("abcdef", &MaskOptions::default().show_last(1).min_length(2)),
            "*****f"
        );
    }

    #[test]
    fn test_multibyte_chars() {
        assert_eq!(
            mask("日本語テキスト", &MaskOptions::default().show_first(1).show_last(1)),
            "日*****ト"
        );
    }
}
