use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// One value of the `discrimination_error` column, as stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Null,
}

impl Cell {
    /// Numeric value if the cell holds, or parses to, a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Null => None,
        };
        value.filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("performance query failed: {0}")]
    Backend(String),
}

/// Source of the discrimination errors logged for a participant's block.
pub trait ErrorQuery {
    fn discrimination_errors(
        &self,
        participant_id: u32,
        block: u32,
    ) -> Result<Vec<Cell>, QueryError>;
}

/// What to do when a block yields no usable error samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingErrorPolicy {
    /// Treat the block as error-free. Biases the staircase towards ending
    /// practice, so it is logged at warn level.
    #[default]
    AssumeZero,
    /// Fail the check with [`CheckError::NoPerformanceData`].
    Surface,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("no usable discrimination errors for participant {participant_id}, block {block}")]
    NoPerformanceData { participant_id: u32, block: u32 },
}

/// Mean of the absolute values of every parseable sample, or `None` when
/// nothing parses.
pub fn mean_absolute_error(samples: &[Cell]) -> Option<f64> {
    let (sum, count) = samples
        .iter()
        .filter_map(Cell::as_f64)
        .fold((0.0, 0usize), |(sum, n), v| (sum + v.abs(), n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean absolute discrimination error for a block, applying `policy` when
/// the query fails or yields nothing usable.
pub fn block_error<Q>(
    query: &Q,
    participant_id: u32,
    block: u32,
    policy: MissingErrorPolicy,
) -> Result<f64, CheckError>
where
    Q: ErrorQuery + ?Sized,
{
    let mean = match query.discrimination_errors(participant_id, block) {
        Ok(rows) => mean_absolute_error(&rows),
        Err(err) => {
            warn!(participant_id, block, error = %err, "discrimination error query failed");
            None
        }
    };

    match (mean, policy) {
        (Some(mean), _) => Ok(mean),
        (None, MissingErrorPolicy::AssumeZero) => {
            warn!(
                participant_id,
                block, "no usable discrimination errors, assuming zero error"
            );
            Ok(0.0)
        }
        (None, MissingErrorPolicy::Surface) => Err(CheckError::NoPerformanceData {
            participant_id,
            block,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<Vec<Cell>, QueryError>);

    impl ErrorQuery for Fixed {
        fn discrimination_errors(&self, _: u32, _: u32) -> Result<Vec<Cell>, QueryError> {
            self.0.clone()
        }
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn averages_magnitudes() {
        let rows = vec![Cell::Number(-40.0), Cell::Number(20.0), text(" 30 ")];
        assert_eq!(mean_absolute_error(&rows), Some(30.0));
    }

    #[test]
    fn drops_sentinels_and_non_finite_values() {
        let rows = vec![
            text("catch"),
            text("timeout"),
            Cell::Null,
            Cell::Number(f64::NAN),
            text("inf"),
            Cell::Number(-10.0),
        ];
        assert_eq!(mean_absolute_error(&rows), Some(10.0));
    }

    #[test]
    fn nothing_parseable_is_none() {
        assert_eq!(mean_absolute_error(&[]), None);
        assert_eq!(mean_absolute_error(&[text("catch")]), None);
    }

    #[test]
    fn missing_data_defaults_to_zero() {
        let empty = Fixed(Ok(vec![]));
        assert_eq!(block_error(&empty, 1, 1, MissingErrorPolicy::AssumeZero), Ok(0.0));

        let failing = Fixed(Err(QueryError::Backend("disk".into())));
        assert_eq!(
            block_error(&failing, 1, 1, MissingErrorPolicy::AssumeZero),
            Ok(0.0)
        );
    }

    #[test]
    fn missing_data_can_be_surfaced() {
        let failing = Fixed(Err(QueryError::Backend("disk".into())));
        assert_eq!(
            block_error(&failing, 4, 2, MissingErrorPolicy::Surface),
            Err(CheckError::NoPerformanceData {
                participant_id: 4,
                block: 2
            })
        );

        let ok = Fixed(Ok(vec![Cell::Number(12.0)]));
        assert_eq!(block_error(&ok, 4, 2, MissingErrorPolicy::Surface), Ok(12.0));
    }
}
