/// Breaks model output into its non-blank lines, trimmed, in output order.
/// Handles `\n`, `\r\n` and bare `\r` line endings.
pub fn split_lines(raw: &str) -> Vec<String> {
    raw.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_dropped() {
        assert_eq!(split_lines("Q1?\n\nQ2?\n  \nQ3?"), vec!["Q1?", "Q2?", "Q3?"]);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(split_lines("").is_empty());
        assert!(split_lines(" \n\t\n ").is_empty());
    }

    #[test]
    fn test_mixed_line_endings() {
        assert_eq!(
            split_lines("  1. First \r\n2. Second\r3. Third\n"),
            vec!["1. First", "2. Second", "3. Third"]
        );
    }

    #[test]
    fn test_duplicates_and_order_kept() {
        assert_eq!(split_lines("b\na\nb"), vec!["b", "a", "b"]);
    }

    #[test]
    fn test_resplitting_joined_output_is_stable() {
        let inputs = [
            "Q1?\n\nQ2?\n  \nQ3?",
            "\r\n  lead\t\n\nmid  \r trail ",
            "single",
            "",
        ];
        for input in inputs {
            let once = split_lines(input);
            assert_eq!(split_lines(&once.join("\n")), once, "input: {input:?}");
        }
    }
}
