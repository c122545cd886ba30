//! Uniform spatial hash grid for collision broad-phase
//!
//! Divides the world into square cells and buckets combatants by the cell
//! containing their center. Queries return the 3x3 block of cells around a
//! position, so the cell size must be at least the largest entity extent for
//! every overlap to be found.
//!
//! The grid is rebuilt from scratch every tick and only holds slot indices
//! into the world's combatant list; it is never a source of truth.

use hashbrown::HashMap;

use crate::game::constants::spatial::{CELL_INITIAL_CAPACITY, CELL_SIZE, GRID_INITIAL_CAPACITY};
use crate::game::entity::{Combatant, EntityId};
use crate::util::vec2::Vec2;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Entry stored in a cell: a non-owning reference to a combatant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub id: EntityId,
    /// Index into `World::combatants`, valid until the next rebuild
    pub slot: usize,
    pub position: Vec2,
}

/// Spatial hash grid
pub struct SpatialGrid {
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<SpatialEntry>>,
    /// 3x3 neighborhood, row-major; defines query order
    neighbor_offsets: [(i32, i32); 9],
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity(GRID_INITIAL_CAPACITY),
            neighbor_offsets: [
                (-1, -1), (0, -1), (1, -1),
                (-1,  0), (0,  0), (1,  0),
                (-1,  1), (0,  1), (1,  1),
            ],
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Clear all entries, keeping cell allocations for reuse
    #[inline]
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    /// Convert world position to cell key
    #[inline]
    pub fn cell_of(&self, position: Vec2) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Insert a combatant stored at `slot`. Pending-removal entities must
    /// never be indexed; such an insert is refused (and panics in debug builds).
    pub fn insert(&mut self, slot: usize, combatant: &Combatant) -> bool {
        if !invariant!(
            !combatant.is_pending_removal,
            "spatial insert of entity {} while pending removal",
            combatant.id
        ) {
            return false;
        }

        let entry = SpatialEntry {
            id: combatant.id,
            slot,
            position: combatant.position(),
        };
        let key = self.cell_of(entry.position);
        self.cells
            .entry(key)
            .or_insert_with(|| Vec::with_capacity(CELL_INITIAL_CAPACITY))
            .push(entry);
        true
    }

    /// Clear and re-insert every collidable combatant
    pub fn rebuild(&mut self, combatants: &[Combatant]) {
        self.clear();
        for (slot, combatant) in combatants.iter().enumerate() {
            if combatant.is_collidable() {
                self.insert(slot, combatant);
            }
        }
    }

    /// All entries in the 3x3 block of cells centered on `position`'s cell,
    /// in cell-scan order. Not deduplicated; callers skip self-comparisons.
    pub fn query_neighbors(&self, position: Vec2) -> impl Iterator<Item = &SpatialEntry> {
        let (cx, cy) = self.cell_of(position);

        self.neighbor_offsets.iter().flat_map(move |&(dx, dy)| {
            self.cells
                .get(&(cx + dx, cy + dy))
                .into_iter()
                .flat_map(|cell| cell.iter())
        })
    }

    /// Whether an entity is currently indexed
    pub fn contains(&self, id: EntityId) -> bool {
        self.cells.values().any(|cell| cell.iter().any(|e| e.id == id))
    }

    /// Total indexed entries
    pub fn len(&self) -> usize {
        self.cells.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|c| c.is_empty())
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialGridStats {
        let non_empty_cells = self.cells.values().filter(|c| !c.is_empty()).count();
        let total_entities = self.len();
        let max_per_cell = self.cells.values().map(|c| c.len()).max().unwrap_or(0);

        SpatialGridStats {
            non_empty_cells,
            total_entities,
            max_per_cell,
        }
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(CELL_SIZE)
    }
}

/// Statistics about the spatial grid
#[derive(Debug, Clone)]
pub struct SpatialGridStats {
    pub non_empty_cells: usize,
    pub total_entities: usize,
    pub max_per_cell: usize,
}

impl SpatialGridStats {
    /// Mean entities per occupied cell
    pub fn average_occupancy(&self) -> f32 {
        if self.non_empty_cells == 0 {
            0.0
        } else {
            self.total_entities as f32 / self.non_empty_cells as f32
        }
    }
}
