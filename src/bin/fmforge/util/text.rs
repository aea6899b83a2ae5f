/// Greedy word wrap to lines of at most `width` characters; a word longer
/// than `width` gets a line of its own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for word in text.split_whitespace() {
        match lines.last_mut() {
            Some(line) if line.chars().count() + 1 + word.chars().count() <= width => {
                line.push(' ');
                line.push_str(word);
            }
            _ => lines.push(word.to_string()),
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Cuts `s` to `max_len` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    match max_len {
        0 => String::new(),
        n => {
            let mut out: String = s.chars().take(n - 1).collect();
            out.push('…');
            out
        }
    }
}

/// `1 interaction`, `3 interactions`.
pub fn count_noun(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Half-open column range as printed in layout tables.
pub fn column_span(start: usize, end: usize) -> String {
    if start == end {
        "-".to_string()
    } else {
        format!("{start}..{end}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_short_text_on_one_line() {
        assert_eq!(wrap("nonbonded cutoff", 20), vec!["nonbonded cutoff"]);
    }

    #[test]
    fn wrap_breaks_between_words() {
        assert_eq!(
            wrap("table section count mismatch", 14),
            vec!["table section", "count mismatch"]
        );
    }

    #[test]
    fn wrap_of_blank_text_is_one_empty_line() {
        assert_eq!(wrap("   ", 10), vec![String::new()]);
    }

    #[test]
    fn truncate_marks_the_cut() {
        assert_eq!(truncate("A_B_C_D", 7), "A_B_C_D");
        assert_eq!(truncate("A_B_C_Ddih", 7), "A_B_C_…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn count_noun_pluralizes() {
        assert_eq!(count_noun(1, "column"), "1 column");
        assert_eq!(count_noun(0, "column"), "0 columns");
    }

    #[test]
    fn empty_spans_print_as_a_dash() {
        assert_eq!(column_span(4, 4), "-");
        assert_eq!(column_span(0, 46), "0..46");
    }
}
