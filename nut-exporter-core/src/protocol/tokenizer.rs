//! Splits upsd reply lines into tokens
//!
//! Tokens are separated by runs of whitespace. A token may be wrapped in
//! double quotes to carry spaces; inside quotes `\"` and `\\` are escapes.
//! The quotes themselves are not part of the returned token.

/// Splits one protocol line into tokens.
///
/// An unterminated quote swallows the rest of the line into the last token
/// rather than failing; the token count check done by callers is what
/// decides whether a line is usable.
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let Some(&first) = chars.peek() else {
            break;
        };

        let mut token = String::new();
        if first == '"' {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            token.push(escaped);
                        }
                    }
                    _ => token.push(c),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                token.push(c);
            }
        }
        tokens.push(token);
    }

    tokens
}

/// Returns the first token of a line without allocating the rest
#[must_use]
pub fn first_token(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}
