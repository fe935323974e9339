//! Uniform spatial grid over a fixed-size world.
//!
//! Cells hold entity ids only; the entities themselves live in the
//! `EntityStore`. Every entity records the cell it was last placed in, which
//! makes removal and the common "moved but stayed in the same cell" update
//! O(1).
//!
//! Range queries work at cell granularity: they return every member of every
//! touched cell, a superset of what lies inside the requested rectangle.
//! Callers filter further (see `collision::overlaps`).

use crate::entity::{CellCoord, Entity, EntityId};
use snowfight_shared::config::WorldConfig;
use snowfight_shared::vec2::Vec2;
use std::collections::HashSet;

/// Inclusive range of cell indices. Bounds may lie outside the grid and are
/// clipped when queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min_row: i64,
    pub max_row: i64,
    pub min_col: i64,
    pub max_col: i64,
}

pub struct SpatialGrid {
    rows: usize,
    cols: usize,
    cell_size: f64,
    /// Row-major, `rows * cols` cells
    cells: Vec<HashSet<EntityId>>,
}

impl SpatialGrid {
    pub fn new(width: f64, height: f64, cell_size: f64) -> Self {
        let rows = (height / cell_size).ceil() as usize;
        let cols = (width / cell_size).ceil() as usize;
        Self {
            rows,
            cols,
            cell_size,
            cells: vec![HashSet::new(); rows * cols],
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.width, config.height, config.cell_size)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell index along one axis, not yet bounds-checked.
    fn axis_index(&self, coord: f64) -> i64 {
        (coord / self.cell_size).floor() as i64
    }

    /// Cell containing `pos`, or `None` if it lies outside the world.
    pub fn cell_of(&self, pos: Vec2) -> Option<CellCoord> {
        if !pos.is_finite() {
            return None;
        }
        let row = self.axis_index(pos.y);
        let col = self.axis_index(pos.x);
        if row < 0 || col < 0 || row >= self.rows as i64 || col >= self.cols as i64 {
            return None;
        }
        Some(CellCoord {
            row: row as usize,
            col: col as usize,
        })
    }

    fn slot(&self, cell: CellCoord) -> usize {
        cell.row * self.cols + cell.col
    }

    /// Add an entity to the cell under its position and record that cell on
    /// the entity. Out-of-bounds positions leave the entity untracked.
    pub fn insert(&mut self, entity: &mut Entity) -> bool {
        let Some(cell) = self.cell_of(entity.position()) else {
            return false;
        };
        let slot = self.slot(cell);
        self.cells[slot].insert(entity.id.clone());
        entity.set_cell(Some(cell));
        true
    }

    /// Erase an entity from its recorded cell.
    pub fn remove(&mut self, entity: &mut Entity) -> bool {
        let Some(cell) = entity.cell() else {
            return false;
        };
        entity.set_cell(None);
        if cell.row >= self.rows || cell.col >= self.cols {
            return false;
        }
        let slot = self.slot(cell);
        self.cells[slot].remove(&entity.id)
    }

    /// Re-bucket an entity after its position changed. Returns true if the
    /// entity changed cells.
    ///
    /// An entity moving outside the world keeps its last in-bounds cell; an
    /// untracked entity moving back inside is inserted.
    pub fn update(&mut self, entity: &mut Entity) -> bool {
        let Some(new_cell) = self.cell_of(entity.position()) else {
            return false;
        };
        match entity.cell() {
            Some(old_cell) if old_cell == new_cell => false,
            Some(old_cell) => {
                let old_slot = self.slot(old_cell);
                self.cells[old_slot].remove(&entity.id);
                let new_slot = self.slot(new_cell);
                self.cells[new_slot].insert(entity.id.clone());
                entity.set_cell(Some(new_cell));
                true
            }
            None => self.insert(entity),
        }
    }

    /// Union of the members of every cell in `range`, clipped to the grid.
    pub fn query(&self, range: CellRange) -> Vec<EntityId> {
        let mut found = Vec::new();
        if self.rows == 0 || self.cols == 0 {
            return found;
        }
        let min_row = range.min_row.max(0);
        let max_row = range.max_row.min(self.rows as i64 - 1);
        let min_col = range.min_col.max(0);
        let max_col = range.max_col.min(self.cols as i64 - 1);

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                let slot = row as usize * self.cols + col as usize;
                found.extend(self.cells[slot].iter().cloned());
            }
        }
        found
    }

    /// Cell range covering the world-space rectangle `[min, max]`.
    pub fn range_for_rect(&self, min: Vec2, max: Vec2) -> CellRange {
        CellRange {
            min_row: self.axis_index(min.y),
            max_row: self.axis_index(max.y),
            min_col: self.axis_index(min.x),
            max_col: self.axis_index(max.x),
        }
    }

    /// Entities in every cell touched by the world-space rectangle.
    pub fn query_rect(&self, min: Vec2, max: Vec2) -> Vec<EntityId> {
        self.query(self.range_for_rect(min, max))
    }

    pub fn contains(&self, id: &EntityId, cell: CellCoord) -> bool {
        if cell.row >= self.rows || cell.col >= self.cols {
            return false;
        }
        self.cells[self.slot(cell)].contains(id)
    }

    /// Total number of tracked entities
    pub fn len(&self) -> usize {
        self.cells.iter().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(HashSet::is_empty)
    }
}
