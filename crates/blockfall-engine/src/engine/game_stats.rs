use serde::{Deserialize, Serialize};

/// Points for rows completed by a single piece, indexed by row count.
const SCORE_TABLE: [usize; 5] = [0, 100, 300, 500, 800];

/// Score and counters of one game.
///
/// Points come from two sources: completed rows, scored per piece through
/// [`SCORE_TABLE`], and manual downward moves, one point per row.
///
/// # Example
///
/// ```
/// use blockfall_engine::GameStats;
///
/// let mut stats = GameStats::new();
/// stats.add_drop_points(3);
/// stats.complete_piece(2);
///
/// assert_eq!(stats.score(), 303);
/// assert_eq!(stats.cleared_rows(), 2);
/// assert_eq!(stats.row_clear_counter()[2], 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    score: usize,
    completed_pieces: usize,
    cleared_rows: usize,
    row_clear_counter: [usize; 5],
}

impl GameStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            score: 0,
            completed_pieces: 0,
            cleared_rows: 0,
            row_clear_counter: [0; 5],
        }
    }

    #[must_use]
    pub const fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub const fn completed_pieces(&self) -> usize {
        self.completed_pieces
    }

    #[must_use]
    pub const fn cleared_rows(&self) -> usize {
        self.cleared_rows
    }

    /// Histogram of pieces by the number of rows they completed (0 to 4).
    #[must_use]
    pub const fn row_clear_counter(&self) -> &[usize; 5] {
        &self.row_clear_counter
    }

    /// Scores a manual downward move of `rows` rows.
    pub const fn add_drop_points(&mut self, rows: usize) {
        self.score += rows;
    }

    /// Records a settled piece that completed `rows` rows.
    pub fn complete_piece(&mut self, rows: usize) {
        let index = rows.min(SCORE_TABLE.len() - 1);
        self.completed_pieces += 1;
        self.cleared_rows += rows;
        self.row_clear_counter[index] += 1;
        self.score += SCORE_TABLE[index];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_piece_counts() {
        let mut stats = GameStats::new();
        for rows in [0, 1, 1, 4, 0] {
            stats.complete_piece(rows);
        }
        assert_eq!(stats.completed_pieces(), 5);
        assert_eq!(stats.cleared_rows(), 6);
        assert_eq!(stats.row_clear_counter(), &[2, 2, 0, 0, 1]);
        assert_eq!(stats.score(), 1000);
    }
}
