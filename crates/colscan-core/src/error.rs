use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_pick_variant() {
        let yaml = serde_yaml::from_str::<u32>("[").unwrap_err();
        assert!(matches!(Error::from(yaml), Error::Config(_)));

        let json = serde_json::from_str::<u32>("x").unwrap_err();
        // no wildcard: every variant has a producer
        match Error::from(json) {
            Error::Hash(msg) => assert!(!msg.is_empty()),
            Error::Config(msg) => panic!("json error mapped to config: {}", msg),
        }
    }
}
