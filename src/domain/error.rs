//! Domain error types.

/// Top-level error type for scalptrader.
#[derive(Debug, thiserror::Error)]
pub enum ScalptraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("bar {index} is not strictly after the previous bar")]
    UnorderedBars { index: usize },

    #[error("bar {index} has no indicator values; supply a fully enriched sequence")]
    MissingIndicators { index: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScalptraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ScalptraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data(reason: impl Into<String>) -> Self {
        ScalptraderError::Data {
            reason: reason.into(),
        }
    }
}

impl From<&ScalptraderError> for std::process::ExitCode {
    fn from(err: &ScalptraderError) -> Self {
        let code: u8 = match err {
            ScalptraderError::Io(_) => 1,
            ScalptraderError::ConfigParse { .. }
            | ScalptraderError::ConfigMissing { .. }
            | ScalptraderError::ConfigInvalid { .. } => 2,
            ScalptraderError::Data { .. } | ScalptraderError::UnorderedBars { .. } => 3,
            ScalptraderError::MissingIndicators { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_key() {
        let err = ScalptraderError::invalid("exit", "lot_size", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid config value [exit] lot_size: must be at least 1"
        );
    }

    #[test]
    fn missing_indicators_message() {
        let err = ScalptraderError::MissingIndicators { index: 40 };
        assert!(err.to_string().contains("bar 40"));
    }

    #[test]
    fn exit_codes_by_category() {
        use std::process::ExitCode;
        let cases = [
            (ScalptraderError::data("bad row"), ExitCode::from(3)),
            (ScalptraderError::UnorderedBars { index: 2 }, ExitCode::from(3)),
            (ScalptraderError::MissingIndicators { index: 2 }, ExitCode::from(4)),
            (
                ScalptraderError::ConfigMissing {
                    section: "s".into(),
                    key: "k".into(),
                },
                ExitCode::from(2),
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ExitCode::from(&err), expected);
        }
    }
}
