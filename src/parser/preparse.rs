// Comment Stripper & Statement Splitter
//
// Removes line comments (`-- `, `#`), block comments, optimizer hints
// (`/*+ ... */`) and versioned comments (`/*!NNNNN ... */`) outside string
// literals, and splits `;`-terminated statements. Quote state (single,
// double, backtick, backslash escapes) is tracked so comment-like
// sequences inside literals survive verbatim.

/// Strip comments outside string literals. Block comments are replaced by
/// a single space so they keep acting as token separators; line comments
/// run to (and keep) the newline. Idempotent.
pub fn strip_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut quote: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && q != '`' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
                i += 1;
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '-' if chars.get(i + 1) == Some(&'-')
                && matches!(chars.get(i + 2), None | Some(' ' | '\t' | '\r' | '\n')) =>
            {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                out.push(' ');
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Split off the first `;`-terminated statement. Returns the consumed
/// substring (semicolon and trailing space trimmed away, comments
/// retained) and the unparsed remainder; the remainder is empty when no
/// top-level semicolon is present.
pub fn split_statement(input: &str) -> (&str, &str) {
    let mut quote: Option<char> = None;
    let mut chars = input.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' && q != '`' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '#' => {
                while let Some((_, nc)) = chars.peek() {
                    if *nc == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '-' if input[idx..].starts_with("--")
                && matches!(
                    input[idx + 2..].chars().next(),
                    None | Some(' ' | '\t' | '\r' | '\n')
                ) =>
            {
                while let Some((_, nc)) = chars.peek() {
                    if *nc == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if input[idx..].starts_with("/*") => {
                chars.next();
                while let Some((i2, nc)) = chars.next() {
                    if nc == '*' && input[i2 + 1..].starts_with('/') {
                        chars.next();
                        break;
                    }
                }
            }
            ';' => {
                let consumed = trim_statement(&input[..idx]);
                return (consumed, &input[idx + 1..]);
            }
            _ => {}
        }
    }

    (trim_statement(input), "")
}

/// Trim surrounding whitespace and any trailing semicolons.
pub fn trim_statement(input: &str) -> &str {
    input
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Split off the first `table AS OF <value>` suffix outside string
/// literals. Returns the statement with the suffix removed, the table
/// name it qualified (unqualified, backticks stripped) and the value
/// text. The value may be a quoted literal or a bare token with an
/// optional call argument list.
pub(crate) fn split_as_of(input: &str) -> Option<(String, String, String)> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut quote: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == '\\' && q != '`' {
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                i += 1;
            }
            'a' | 'A' => {
                if let Some(found) = match_as_of(&chars, i) {
                    return Some(found);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '@'
}

/// Try to read `AS OF <value>` starting at `start` and pair it with the
/// table reference immediately before it.
fn match_as_of(chars: &[char], start: usize) -> Option<(String, String, String)> {
    if start > 0 && (is_word_char(chars[start - 1]) || chars[start - 1] == '.') {
        return None;
    }
    let word = |i: usize, w: char| chars.get(i).is_some_and(|c| c.eq_ignore_ascii_case(&w));
    if !(word(start, 'a') && word(start + 1, 's')) {
        return None;
    }
    let mut i = start + 2;
    if !chars.get(i).is_some_and(|c| c.is_whitespace()) {
        return None;
    }
    while chars.get(i).is_some_and(|c| c.is_whitespace()) {
        i += 1;
    }
    if !(word(i, 'o') && word(i + 1, 'f')) {
        return None;
    }
    i += 2;
    if !chars.get(i).is_some_and(|c| c.is_whitespace()) {
        return None;
    }
    while chars.get(i).is_some_and(|c| c.is_whitespace()) {
        i += 1;
    }

    // The table reference right before the keywords.
    let mut table_end = start;
    while table_end > 0 && chars[table_end - 1].is_whitespace() {
        table_end -= 1;
    }
    let mut table_start = table_end;
    while table_start > 0 {
        let p = chars[table_start - 1];
        if is_word_char(p) || p == '.' || p == '`' {
            table_start -= 1;
        } else {
            break;
        }
    }
    if table_start == table_end {
        return None;
    }
    let reference: String = chars[table_start..table_end].iter().collect();
    let table = reference
        .rsplit('.')
        .next()
        .unwrap_or(reference.as_str())
        .trim_matches('`')
        .to_string();
    if table.is_empty() {
        return None;
    }

    let value_start = i;
    let mut end = value_start;
    match chars.get(end) {
        Some(&q @ ('\'' | '"')) => {
            end += 1;
            while end < chars.len() {
                let c = chars[end];
                if c == '\\' {
                    end += 2;
                    continue;
                }
                end += 1;
                if c == q {
                    break;
                }
            }
        }
        Some(&c) if is_word_char(c) => {
            while chars
                .get(end)
                .is_some_and(|c| is_word_char(*c) || *c == '.')
            {
                end += 1;
            }
            if chars.get(end) == Some(&'(') {
                let mut depth = 0usize;
                let mut inner: Option<char> = None;
                while end < chars.len() {
                    let c = chars[end];
                    end += 1;
                    if let Some(q) = inner {
                        if c == '\\' && q != '`' {
                            end += 1;
                        } else if c == q {
                            inner = None;
                        }
                        continue;
                    }
                    match c {
                        '\'' | '"' | '`' => inner = Some(c),
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        _ => return None,
    }

    // Escape skipping can step one past the end of input.
    let end = end.min(chars.len());
    let prefix: String = chars[..table_end].iter().collect();
    let suffix: String = chars[end..].iter().collect();
    let value: String = chars[value_start..end].iter().collect();
    Some((format!("{}{}", prefix, suffix), table, value))
}
