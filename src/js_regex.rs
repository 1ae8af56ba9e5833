use std::fmt;

/// Pattern compiled from an HTML `pattern` attribute.
#[derive(Debug, Clone)]
pub(crate) struct Regex {
    backend: fancy_regex::Regex,
}

impl Regex {
    pub(crate) fn new(pattern: &str) -> Result<Self, RegexError> {
        let backend = fancy_regex::Regex::new(pattern).map_err(RegexError::from)?;
        Ok(Self { backend })
    }

    /// Compiles `pattern` so that it must match the whole value, the way
    /// constraint validation anchors it.
    pub(crate) fn anchored(pattern: &str) -> Result<Self, RegexError> {
        Self::new(&format!("^(?:{pattern})$"))
    }

    pub(crate) fn is_match(&self, input: &str) -> Result<bool, RegexError> {
        self.backend.is_match(input).map_err(RegexError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegexError {
    message: String,
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RegexError {}

impl From<fancy_regex::Error> for RegexError {
    fn from(value: fancy_regex::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_pattern_rejects_partial_matches() -> Result<(), RegexError> {
        let regex = Regex::anchored("[0-9]{3}")?;
        assert!(regex.is_match("123")?);
        assert!(!regex.is_match("1234")?);
        assert!(!regex.is_match("a123")?);
        Ok(())
    }

    #[test]
    fn alternation_is_grouped_before_anchoring() -> Result<(), RegexError> {
        let regex = Regex::anchored("cat|dog")?;
        assert!(regex.is_match("dog")?);
        assert!(!regex.is_match("dogs")?);
        Ok(())
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(Regex::anchored("(unclosed").is_err());
    }
}
