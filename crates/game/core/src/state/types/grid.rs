//! Layered tile grid mutated by the resolvers.
//!
//! Cells carry a floor tile and an optional object tile. Themes without
//! layering describe every cell as a single flat tile, which is stored as a
//! floor with no object, so lookups treat both shapes uniformly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Position;

/// Config key that marks a placed inventory item on an object tile.
pub const ITEM_TYPE_KEY: &str = "itemType";

/// Reference to a theme tile type plus its per-cell configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileRef {
    #[serde(rename = "type")]
    pub tile_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

impl TileRef {
    pub fn new(tile_type: impl Into<String>) -> Self {
        Self {
            tile_type: tile_type.into(),
            config: Map::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn config_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(Value::as_bool)
    }

    pub fn is_type(&self, tile_type: &str) -> bool {
        self.tile_type == tile_type
    }

    /// True when this tile represents `item_id` lying on the grid.
    pub fn represents_item(&self, item_id: &str) -> bool {
        self.tile_type == item_id || self.config_str(ITEM_TYPE_KEY) == Some(item_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum CellRepr {
    Layered {
        floor: TileRef,
        #[serde(default)]
        object: Option<TileRef>,
    },
    Flat(TileRef),
}

/// One grid cell: floor plus optional object layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "CellRepr", into = "CellRepr")]
pub struct Cell {
    pub floor: TileRef,
    pub object: Option<TileRef>,
}

impl From<CellRepr> for Cell {
    fn from(repr: CellRepr) -> Self {
        match repr {
            CellRepr::Layered { floor, object } => Self { floor, object },
            CellRepr::Flat(tile) => Self::new(tile),
        }
    }
}

impl From<Cell> for CellRepr {
    fn from(cell: Cell) -> Self {
        CellRepr::Layered {
            floor: cell.floor,
            object: cell.object,
        }
    }
}

impl Cell {
    pub fn new(floor: TileRef) -> Self {
        Self {
            floor,
            object: None,
        }
    }

    pub fn layered(floor: TileRef, object: TileRef) -> Self {
        Self {
            floor,
            object: Some(object),
        }
    }

    /// The tile that defines the cell's behavior: the object if present, else the floor.
    pub fn top(&self) -> &TileRef {
        self.object.as_ref().unwrap_or(&self.floor)
    }

    pub fn top_mut(&mut self) -> &mut TileRef {
        self.object.as_mut().unwrap_or(&mut self.floor)
    }

    /// Floor first, then the object if present.
    pub fn layers(&self) -> impl Iterator<Item = &TileRef> {
        std::iter::once(&self.floor).chain(self.object.as_ref())
    }

    pub fn holds_item(&self, item_id: &str) -> bool {
        self.top().represents_item(item_id)
    }

    pub fn has_tile_type(&self, tile_type: &str) -> bool {
        self.layers().any(|tile| tile.is_type(tile_type))
    }
}

/// Grid bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub width: u32,
    pub height: u32,
}

impl GridDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && position.x < self.width as i32
            && position.y < self.height as i32
    }

    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("grid must have at least one row and one column")]
    Empty,

    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Fixed-size, row-major grid of cells.
///
/// Dimensions are fixed for the lifetime of a session. `Clone` produces a deep,
/// independent copy used by the clone-mutate-swap pattern of the resolvers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Grid {
    dimensions: GridDimensions,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a grid filled with copies of `fill`.
    pub fn filled(dimensions: GridDimensions, fill: Cell) -> Self {
        Self {
            dimensions,
            cells: vec![fill; dimensions.area()],
        }
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(width * height);
        for (row, cols) in rows.into_iter().enumerate() {
            if cols.len() != width {
                return Err(GridError::RaggedRow {
                    row,
                    expected: width,
                    found: cols.len(),
                });
            }
            cells.extend(cols);
        }

        Ok(Self {
            dimensions: GridDimensions::new(width as u32, height as u32),
            cells,
        })
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    pub fn contains(&self, position: Position) -> bool {
        self.dimensions.contains(position)
    }

    fn index(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| position.y as usize * self.dimensions.width as usize + position.x as usize)
    }

    /// Bounds-checked lookup; `None` means the position is outside the grid.
    pub fn get(&self, position: Position) -> Option<&Cell> {
        self.index(position).map(|index| &self.cells[index])
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut Cell> {
        self.index(position).map(|index| &mut self.cells[index])
    }

    /// Replaces a cell. Returns `false` when the position is out of bounds.
    pub fn set(&mut self, position: Position, cell: Cell) -> bool {
        match self.get_mut(position) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Replaces the object layer of a cell. Returns `false` when out of bounds.
    pub fn set_object(&mut self, position: Position, object: Option<TileRef>) -> bool {
        match self.get_mut(position) {
            Some(cell) => {
                cell.object = object;
                true
            }
            None => false,
        }
    }

    pub fn holds_item(&self, position: Position, item_id: &str) -> bool {
        self.get(position).is_some_and(|cell| cell.holds_item(item_id))
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let width = self.dimensions.width as i32;
        (0..self.cells.len() as i32).map(move |index| Position::new(index % width, index / width))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.positions().zip(self.cells.iter())
    }

    /// Positions of every cell with at least one layer matching `predicate`.
    pub fn find_tiles<F>(&self, mut predicate: F) -> Vec<Position>
    where
        F: FnMut(&TileRef) -> bool,
    {
        self.iter()
            .filter(|(_, cell)| cell.layers().any(&mut predicate))
            .map(|(position, _)| position)
            .collect()
    }

    /// Tile types flagged unique that appear in more than one cell.
    pub fn unique_violations<F>(&self, mut is_unique: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mut seen = std::collections::BTreeMap::<&str, usize>::new();
        for (_, cell) in self.iter() {
            for tile in cell.layers() {
                if is_unique(&tile.tile_type) {
                    *seen.entry(tile.tile_type.as_str()).or_default() += 1;
                }
            }
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(tile_type, _)| tile_type.to_owned())
            .collect()
    }

    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        let width = self.dimensions.width as usize;
        let mut rows = Vec::with_capacity(self.dimensions.height as usize);
        let mut cells = self.cells.into_iter();
        for _ in 0..self.dimensions.height {
            rows.push(cells.by_ref().take(width).collect());
        }
        rows
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<Cell>> {
    fn from(grid: Grid) -> Self {
        grid.into_rows()
    }
}
