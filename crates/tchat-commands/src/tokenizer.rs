//! Splits message text into command tokens.
//!
//! Tokens are separated by runs of whitespace. A `"` at the start of a token
//! opens a quoted token that runs until the next unescaped `"`; the quotes are
//! dropped, inner whitespace is kept, and `\"` inside the quotes stands for a
//! literal quote. A `"` inside a bare word is an ordinary character.

use thiserror::Error;

/// Tokenizer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A quoted token was never closed.
    #[error("unterminated quote starting at byte {position}")]
    UnterminatedQuote {
        /// Byte offset of the opening quote.
        position: usize,
    },
}

/// Tokenizes `input` into owned tokens.
pub fn tokenize(input: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut token = String::new();

        if c == '"' {
            chars.next();
            loop {
                match chars.next() {
                    None => return Err(ParseError::UnterminatedQuote { position: start }),
                    Some((_, '\\')) if matches!(chars.peek(), Some((_, '"'))) => {
                        chars.next();
                        token.push('"');
                    }
                    Some((_, '"')) => break,
                    Some((_, ch)) => token.push(ch),
                }
            }
        } else {
            while let Some(&(_, ch)) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                token.push(ch);
                chars.next();
            }
        }

        tokens.push(token);
    }

    Ok(tokens)
}
