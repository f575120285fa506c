//! Search term tokenization.

/// Minimum token length (in characters) that takes part in matching.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Split a term on whitespace, keeping double-quoted runs as single tokens.
///
/// Quotes are removed from the token. An unterminated quote runs to the end
/// of the input.
pub fn tokenize(term: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in term.chars() {
        match c {
            '"' => {
                if in_quotes {
                    tokens.push(std::mem::take(&mut current));
                } else if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Tokens that take part in matching: at least [`MIN_TOKEN_CHARS`] long
/// and carrying at least one alphanumeric character.
///
/// Every backend matches on exactly this set. An empty set browses.
pub fn search_tokens(term: &str) -> Vec<String> {
    tokenize(term)
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .collect()
}
