use crate::{GameBoard, Piece};

/// A resting position reachable by the current piece.
///
/// `rotation` is the orientation index from [`Piece::orientations`] and `x` the visible
/// left column of `piece`, which is already moved down to where it would settle.
#[derive(Debug)]
pub struct Placement {
    pub rotation: usize,
    pub x: i32,
    pub piece: Piece,
}

impl Placement {
    /// Index of this placement in the fixed `rotation × column` action space.
    ///
    /// The same `(rotation, x)` pair always maps to the same slot, so Q-values stay
    /// comparable between visits of one state.
    #[expect(clippy::cast_sign_loss)]
    #[must_use]
    pub fn action_slot(&self, board_width: i32) -> usize {
        self.rotation * board_width as usize + self.x as usize
    }
}

/// Enumerates every resting placement of `piece` on `board`.
///
/// Each rotation-distinct orientation is moved to every visible left column of the
/// board while keeping its current row. Candidates that are
/// invalid there are skipped; the rest are dropped straight down. Ordering is by
/// orientation, then column.
#[must_use]
pub fn enumerate_placements(board: &GameBoard, piece: &Piece) -> Vec<Placement> {
    let width = board.bounds().width();
    piece
        .orientations()
        .into_iter()
        .flat_map(|orientation| {
            (0..width).filter_map(move |x| {
                let visible = orientation.piece.visible_bounds();
                let candidate = orientation.piece.offset_by(x - visible.left, 0);
                board.valid_position(&candidate).then(|| Placement {
                    rotation: orientation.rotation,
                    x,
                    piece: board.resting_position(&candidate),
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{BoardConfig, CellColor, PieceKind};

    const SEED: [u8; 16] = [3; 16];

    fn spawned(board: &mut GameBoard, kind: PieceKind) -> Piece {
        board.spawn_piece(Piece::new(kind, CellColor::Red)).unwrap();
        board.active_piece().unwrap().shallow_clone()
    }

    #[test]
    fn test_columns_span_the_board_from_zero() {
        for kind in PieceKind::ALL {
            let mut board = GameBoard::new(BoardConfig::default(), SEED.into()).unwrap();
            let piece = spawned(&mut board, kind);
            let placements = enumerate_placements(&board, &piece);
            for orientation in piece.orientations() {
                let xs: Vec<_> = placements
                    .iter()
                    .filter(|p| p.rotation == orientation.rotation)
                    .map(|p| p.x)
                    .collect();
                let last = 10 - orientation.piece.visible_bounds().width();
                assert_eq!(xs, (0..=last).collect::<Vec<_>>(), "{kind:?}");
            }
        }
    }

    #[test]
    fn test_square_on_empty_board() {
        let mut board = GameBoard::new(BoardConfig::default(), SEED.into()).unwrap();
        let piece = spawned(&mut board, PieceKind::Square);
        let placements = enumerate_placements(&board, &piece);
        assert_eq!(placements.len(), 9);
        for (placement, x) in placements.iter().zip(0..) {
            assert_eq!(placement.rotation, 0);
            assert_eq!(placement.x, x);
            assert_eq!(placement.piece.visible_bounds().bottom, 20);
            assert!(board.valid_position(&placement.piece));
        }
    }

    #[test]
    fn test_bar_has_two_orientations() {
        let mut board = GameBoard::new(BoardConfig::default(), SEED.into()).unwrap();
        let piece = spawned(&mut board, PieceKind::Bar);
        let placements = enumerate_placements(&board, &piece);
        let vertical = placements.iter().filter(|p| p.rotation == 0).count();
        let horizontal = placements.iter().filter(|p| p.rotation == 1).count();
        assert_eq!(vertical, 10);
        assert_eq!(horizontal, 7);
        assert_eq!(placements.len(), 17);
    }

    #[test]
    fn test_action_slots_are_unique_and_in_range() {
        let config = BoardConfig::default();
        let mut board = GameBoard::new(config, SEED.into()).unwrap();
        for kind in PieceKind::ALL {
            board.reset();
            let piece = spawned(&mut board, kind);
            let placements = enumerate_placements(&board, &piece);
            let slots: BTreeSet<_> = placements
                .iter()
                .map(|p| p.action_slot(config.width))
                .collect();
            assert_eq!(slots.len(), placements.len(), "{kind:?}");
            assert!(slots.iter().all(|&slot| slot < config.action_count()));
        }
    }

    #[test]
    fn test_placements_rest_on_stack() {
        let mut board = GameBoard::from_ascii(
            BoardConfig::default(),
            SEED.into(),
            "
            #####.....
            ##########
            ",
        );
        let piece = spawned(&mut board, PieceKind::Square);
        let placements = enumerate_placements(&board, &piece);
        assert_eq!(placements.len(), 9);
        for placement in &placements {
            let bottom = placement.piece.visible_bounds().bottom;
            let expected = if placement.x <= 4 { 18 } else { 19 };
            assert_eq!(bottom, expected, "x = {}", placement.x);
        }
    }

    #[test]
    fn test_blocked_columns_are_skipped() {
        let mut board = GameBoard::from_ascii(
            BoardConfig {
                height: 6,
                key_rows: 5,
                ..BoardConfig::default()
            },
            SEED.into(),
            "
            #.........
            #.........
            #.........
            #.........
            #.........
            #.........
            ",
        );
        let piece = spawned(&mut board, PieceKind::Square);
        let placements = enumerate_placements(&board, &piece);
        assert!(placements.iter().all(|p| p.x >= 1));
        assert_eq!(placements.len(), 8);
    }
}
