//! RFC 1459 "Scandinavian" case folding used for nick and channel name
//! uniqueness: ASCII letters fold to uppercase, and `{}|^` fold to their
//! uppercase-range counterparts `[]\~` so e.g. `Alice` and `{lice}` with
//! a leading cap still compare distinctly but `alice`/`ALICE` do not.

pub fn casefold(s: &str) -> String {
    s.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'a'..='z' => c.to_ascii_uppercase(),
        '{' => '[',
        '}' => ']',
        '|' => '\\',
        '^' => '~',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_fold_to_uppercase() {
        assert_eq!(casefold("Alice"), casefold("alice"));
        assert_eq!(casefold("ALICE"), casefold("alice"));
    }

    #[test]
    fn scandinavian_pairs_fold_together() {
        assert_eq!(casefold("chan{1}"), casefold("chan[1]"));
        assert_eq!(casefold("a|b"), casefold("a\\b"));
        assert_eq!(casefold("a^b"), casefold("a~b"));
    }

    #[test]
    fn distinct_names_stay_distinct() {
        assert_ne!(casefold("alice"), casefold("bob"));
    }
}
