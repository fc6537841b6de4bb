// paths.rs — Candidate file-path extraction from free text.
//
// A candidate is a token (or a quoted run of tokens) that contains at least
// one directory separator and ends in a known source/doc extension.
// Backslashes are normalized to forward slashes, surrounding punctuation is
// trimmed, URLs are ignored, and duplicates are dropped (first one wins).

const KNOWN_EXTENSIONS: &[&str] = &[
    "py", "rs", "js", "ts", "tsx", "jsx", "go", "java", "kt", "rb", "c", "h", "cc", "cpp", "hpp",
    "cs", "swift", "php", "sh", "sql", "html", "css", "md", "txt", "toml", "yaml", "yml", "json",
    "ini", "cfg",
];

const QUOTES: &[char] = &['"', '\'', '`'];

/// Extract candidate file paths mentioned in a message.
pub fn extract_file_paths(message: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for candidate in candidates(message) {
        if let Some(path) = normalize(&candidate) {
            if !found.contains(&path) {
                found.push(path);
            }
        }
    }
    found
}

/// Split into whitespace tokens, joining quoted runs back together. A quote
/// that is never closed is kept as part of its own token.
fn candidates(message: &str) -> Vec<String> {
    let tokens: Vec<&str> = message.split_whitespace().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        let Some(open) = token.chars().next().filter(|c| QUOTES.contains(c)) else {
            out.push(token.to_string());
            i += 1;
            continue;
        };

        let first = &token[open.len_utf8()..];
        let close = if closes(first, open) {
            Some(i)
        } else {
            (i + 1..tokens.len()).find(|&j| closes(tokens[j], open))
        };
        let Some(close) = close else {
            out.push(token.to_string());
            i += 1;
            continue;
        };

        let mut run = first.to_string();
        for next in &tokens[i + 1..=close] {
            run.push(' ');
            run.push_str(next);
        }
        if let Some(end) = run.rfind(open) {
            run.truncate(end);
        }
        out.push(run);
        i = close + 1;
    }
    out
}

fn closes(fragment: &str, quote: char) -> bool {
    fragment
        .trim_end_matches(|c: char| c.is_ascii_punctuation() && !QUOTES.contains(&c))
        .ends_with(quote)
}

fn normalize(candidate: &str) -> Option<String> {
    if candidate.contains("://") {
        return None;
    }

    let trimmed = candidate
        .trim_matches(|c: char| QUOTES.contains(&c) || matches!(c, '(' | ')' | '[' | ']' | '<' | '>'))
        .trim_end_matches(['.', ',', ';', ':', '!', '?']);
    let path = trimmed.replace('\\', "/");
    let path = path.strip_prefix("./").unwrap_or(&path).to_string();

    if !path.contains('/') {
        return None;
    }
    let file_name = path.rsplit('/').next()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || !KNOWN_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_relative_path() {
        assert_eq!(
            extract_file_paths("Edit modules/foo/src/bar.py to fix the crash"),
            vec!["modules/foo/src/bar.py"]
        );
    }

    #[test]
    fn requires_directory_separator_and_known_extension() {
        assert!(extract_file_paths("edit bar.py please").is_empty());
        assert!(extract_file_paths("look in src/assets/logo.png").is_empty());
        assert!(extract_file_paths("the src/ directory").is_empty());
    }

    #[test]
    fn unwraps_quoted_paths_with_spaces() {
        assert_eq!(
            extract_file_paths(r#"rename "docs/user guide.md" now"#),
            vec!["docs/user guide.md"]
        );
        assert_eq!(extract_file_paths("update `src/lib.rs`."), vec!["src/lib.rs"]);
    }

    #[test]
    fn normalizes_backslashes_and_dot_prefix() {
        assert_eq!(
            extract_file_paths(r"fix .\crates\core\src\main.rs, then ./tests/a_test.rs"),
            vec!["crates/core/src/main.rs", "tests/a_test.rs"]
        );
    }

    #[test]
    fn trims_trailing_punctuation_and_dedupes() {
        assert_eq!(
            extract_file_paths("see src/app.ts. Also src/app.ts!"),
            vec!["src/app.ts"]
        );
    }

    #[test]
    fn ignores_urls() {
        assert!(extract_file_paths("read https://example.com/docs/index.html").is_empty());
    }

    #[test]
    fn unclosed_quote_does_not_swallow_the_message() {
        assert_eq!(
            extract_file_paths("\"fix modules/foo/bar.py and then run"),
            vec!["modules/foo/bar.py"]
        );
        assert_eq!(
            extract_file_paths("'src/lib.rs and docs/guide.md"),
            vec!["src/lib.rs", "docs/guide.md"]
        );
    }

    #[test]
    fn apostrophes_inside_words_do_not_open_quotes() {
        assert_eq!(
            extract_file_paths("don't touch lib/util.go"),
            vec!["lib/util.go"]
        );
    }
}
