// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

/// Parse an `OC_OUTPUT` file.
///
/// Each line is `key=value`; `key<<DELIM` starts a multi-line value ended by
/// a line equal to `DELIM`. Later keys override earlier ones. Lines without a
/// key are ignored.
pub fn parse_output_file(content: &str) -> BTreeMap<String, String> {
    let mut outputs = BTreeMap::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        if let Some((key, delimiter)) = line.split_once("<<") {
            let key = key.trim();
            let delimiter = delimiter.trim();
            if !key.is_empty() && !delimiter.is_empty() && !key.contains('=') {
                let mut value: Vec<&str> = Vec::new();
                for body in lines.by_ref() {
                    if body == delimiter {
                        break;
                    }
                    value.push(body);
                }
                outputs.insert(key.to_string(), value.join("\n"));
                continue;
            }
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                outputs.insert(key.to_string(), value.to_string());
            }
        }
    }
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        plain = { "version=1.2\n", "version", "1.2" },
        value_with_equals = { "sha=abc=def\n", "sha", "abc=def" },
        later_value_wins = { "a=1\na=2\n", "a", "2" },
        heredoc = { "notes<<EOF\nline one\nline two\nEOF\n", "notes", "line one\nline two" },
        line_after_heredoc = { "notes<<EOF\nbody\nEOF\nafter=x\n", "after", "x" },
        unterminated_heredoc = { "log<<END\npartial", "log", "partial" },
    )]
    fn parses_value(content: &str, key: &str, expected: &str) {
        let outputs = parse_output_file(content);
        assert_eq!(outputs.get(key).map(String::as_str), Some(expected));
    }

    #[test]
    fn blank_and_keyless_lines_are_ignored() {
        let outputs = parse_output_file("version=1.2\n\n=nokey\njunk\n");
        assert_eq!(outputs.len(), 1);
    }
}
