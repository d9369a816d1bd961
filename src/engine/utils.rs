use crate::types::Cell;

pub(super) fn nearest(from: Cell, candidates: impl IntoIterator<Item = Cell>) -> Option<Cell> {
    let mut best: Option<(i32, Cell)> = None;
    for cell in candidates {
        let distance = from.manhattan(cell);
        if best.map_or(true, |(best_distance, _)| distance < best_distance) {
            best = Some((distance, cell));
        }
    }
    best.map(|(_, cell)| cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_keeps_first_on_ties() {
        let from = Cell::new(2, 2);
        let picked = nearest(from, [Cell::new(2, 0), Cell::new(0, 2), Cell::new(4, 2)]);
        assert_eq!(picked, Some(Cell::new(2, 0)));
        assert_eq!(nearest(from, [Cell::new(5, 5), Cell::new(2, 3)]), Some(Cell::new(2, 3)));
        assert_eq!(nearest(from, std::iter::empty()), None);
    }
}
