//! Bot credential handling.

use std::fmt;

/// The bot token.
///
/// The token is part of every API URL, so it must never reach the logs.
/// `Debug` and `Display` are redacted; use [`Token::expose`] only where the
/// raw value is required to build a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Placeholder written instead of the token.
    pub const REDACTED: &'static str = "<token>";

    /// Wraps a raw token.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replaces every occurrence of the token in `text` with a placeholder.
    pub fn mask(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(&self.0, Self::REDACTED)
    }
}

impl From<String> for Token {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for Token {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&Self::REDACTED).finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::REDACTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted() {
        let token = Token::new("123:secret");
        assert_eq!(format!("{token}"), "<token>");
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(token.expose(), "123:secret");
    }

    #[test]
    fn test_mask_url() {
        let token = Token::new("123:secret");
        let masked = token.mask("https://api.example.org/bot123:secret/getMe");
        assert_eq!(masked, "https://api.example.org/bot<token>/getMe");
        assert_eq!(Token::new("").mask("unchanged"), "unchanged");
    }
}
