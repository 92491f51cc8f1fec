//! Parses the `areas` matrix form of a layout: a grid of rows, each a
//! list of cell ids, where repeated ids merge into spans. Every named id
//! must form a single rectangle, or the layout is rejected.
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::layout::{Cell, Span};

struct Bounds {
    col_start: usize,
    col_end: usize,
    row_start: usize,
    row_end: usize,
}

pub fn cells_from_areas(areas: &[Vec<String>]) -> Result<Vec<Cell>> {
    if areas.is_empty() {
        return Err(Error::Config("areas matrix must have at least one row".into()));
    }

    let ncols = areas[0].len();
    if ncols == 0 || areas.iter().any(|row| row.len() != ncols) {
        return Err(Error::Config("every row of the areas matrix must be the same width".into()));
    }

    let mut bounds: HashMap<&str, Bounds> = HashMap::new();

    for (row_idx, row) in areas.iter().enumerate() {
        for (col_idx, id) in row.iter().enumerate() {
            if id == "." {
                continue;
            }
            bounds
                .entry(id.as_str())
                .and_modify(|b| {
                    b.col_start = b.col_start.min(col_idx);
                    b.col_end = b.col_end.max(col_idx + 1);
                    b.row_start = b.row_start.min(row_idx);
                    b.row_end = b.row_end.max(row_idx + 1);
                })
                .or_insert(Bounds {
                    col_start: col_idx,
                    col_end: col_idx + 1,
                    row_start: row_idx,
                    row_end: row_idx + 1,
                });
        }
    }

    for (id, b) in &bounds {
        for row in areas.iter().take(b.row_end).skip(b.row_start) {
            for cell in row.iter().take(b.col_end).skip(b.col_start) {
                if cell != id {
                    return Err(Error::Config(format!(
                        "area {id:?} does not form a rectangle in the areas matrix"
                    )));
                }
            }
        }
    }

    let mut ids: Vec<&str> = bounds.keys().copied().collect();
    ids.sort();

    Ok(ids
        .into_iter()
        .map(|id| {
            let b = &bounds[id];
            Cell {
                id: id.to_string(),
                columns: Span::new(b.col_start as u32 + 1, b.col_end as u32 + 1),
                rows: Span::new(b.row_start as u32 + 1, b.row_end as u32 + 1),
                stack_mode: None,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn rectangular_areas_parse_into_spans() {
        let areas = grid(&[&["left", "right"], &["left", "right"]]);
        let cells = cells_from_areas(&areas).unwrap();

        let left = cells.iter().find(|c| c.id == "left").unwrap();
        assert_eq!(left.columns, Span::new(1, 2));
        assert_eq!(left.rows, Span::new(1, 3));
    }

    #[test]
    fn non_rectangular_area_is_rejected() {
        // scenario C: "main" forms an L-shape, not a rectangle.
        let areas = grid(&[&["main", "side"], &["main", "main"]]);
        assert!(cells_from_areas(&areas).is_err());
    }

    #[test]
    fn dot_marks_an_unassigned_gap() {
        let areas = grid(&[&["a", "."], &[".", "b"]]);
        let cells = cells_from_areas(&areas).unwrap();
        assert_eq!(cells.len(), 2);
    }
}
