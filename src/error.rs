use thiserror::Error;

/// Why a level descriptor could not be turned into a playable grid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelLoadError {
    #[error("failed to read level {path}: {message}")]
    Io { path: String, message: String },
    #[error("malformed level descriptor: {message}")]
    Malformed { message: String },
    #[error("level grid has no cells")]
    EmptyGrid,
    #[error("grid {axis} mismatch: descriptor says {expected}, grid has {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        axis: &'static str,
    },
    #[error("{what} ({x},{y}) lies outside the grid")]
    OutOfBounds { what: &'static str, x: i32, y: i32 },
    #[error("{what} ({x},{y}) is a wall")]
    BlockedEndpoint { what: &'static str, x: i32, y: i32 },
}

impl From<serde_json::Error> for LevelLoadError {
    fn from(error: serde_json::Error) -> Self {
        Self::Malformed {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_cell() {
        let error = LevelLoadError::BlockedEndpoint {
            what: "goal",
            x: 3,
            y: 1,
        };
        assert_eq!(error.to_string(), "goal (3,1) is a wall");
        let error = LevelLoadError::DimensionMismatch {
            expected: 4,
            actual: 3,
            axis: "cols",
        };
        assert_eq!(
            error.to_string(),
            "grid cols mismatch: descriptor says 4, grid has 3"
        );
    }

    #[test]
    fn json_errors_become_malformed() {
        let error: LevelLoadError = serde_json::from_str::<u32>("nope")
            .map_err(LevelLoadError::from)
            .expect_err("not a number");
        assert!(matches!(error, LevelLoadError::Malformed { .. }));
        assert!(error.to_string().starts_with("malformed level descriptor: "));
    }
}
