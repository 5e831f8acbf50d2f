use escape_core::{AgentId, CellCoord, Direction, OccupantKind, ProjectileId, TraversalCost};
use glam::Vec2;

use crate::level::LevelError;

/// Axis-aligned square covered by a single cell in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellBounds {
    origin: Vec2,
    length: f32,
}

impl CellBounds {
    /// Upper-left corner of the cell.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Side length of the cell.
    #[must_use]
    pub const fn length(&self) -> f32 {
        self.length
    }

    /// Centre point of the cell.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.origin + Vec2::splat(self.length * 0.5)
    }

    /// Reports whether the point lies inside the half-open square.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.origin.x
            && point.y >= self.origin.y
            && point.x < self.origin.x + self.length
            && point.y < self.origin.y + self.length
    }
}

#[derive(Clone, Debug)]
struct Cell {
    kind: OccupantKind,
    conceals_key: bool,
    neighbors: [Option<usize>; 4],
    agents: Vec<AgentId>,
    phantoms: Vec<AgentId>,
    projectiles: Vec<ProjectileId>,
}

/// Fixed rows-by-columns node graph underlying the continuous world.
///
/// Adjacency is resolved once during construction; later mutations only touch
/// occupant kinds and the per-cell occupant sets.
#[derive(Clone, Debug)]
pub struct Grid {
    rows: u32,
    columns: u32,
    cell_length: f32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a grid in which every cell holds open floor.
    #[must_use]
    pub fn open(rows: u32, columns: u32, cell_length: f32) -> Self {
        let kinds = vec![OccupantKind::Empty; rows as usize * columns as usize];
        Self::with_kinds(rows, columns, cell_length, kinds)
    }

    /// Parses a glyph layout in which every string describes one row.
    pub fn from_layout<S: AsRef<str>>(layout: &[S], cell_length: f32) -> Result<Self, LevelError> {
        if !(cell_length.is_finite() && cell_length > 0.0) {
            return Err(LevelError::InvalidCellLength(cell_length));
        }

        let Some(first) = layout.first() else {
            return Err(LevelError::EmptyLayout);
        };
        let columns = first.as_ref().chars().count();
        if columns == 0 {
            return Err(LevelError::EmptyLayout);
        }

        let mut kinds = Vec::with_capacity(layout.len() * columns);
        for (row, line) in layout.iter().enumerate() {
            let line = line.as_ref();
            let width = line.chars().count();
            if width != columns {
                return Err(LevelError::RaggedRow {
                    row,
                    expected: columns,
                    found: width,
                });
            }

            for (column, glyph) in line.chars().enumerate() {
                let kind = OccupantKind::from_glyph(glyph).ok_or(LevelError::UnknownGlyph {
                    glyph,
                    row,
                    column,
                })?;
                kinds.push(kind);
            }
        }

        Ok(Self::with_kinds(
            layout.len() as u32,
            columns as u32,
            cell_length,
            kinds,
        ))
    }

    fn with_kinds(rows: u32, columns: u32, cell_length: f32, kinds: Vec<OccupantKind>) -> Self {
        let mut cells: Vec<Cell> = kinds
            .into_iter()
            .map(|kind| Cell {
                kind,
                conceals_key: false,
                neighbors: [None; 4],
                agents: Vec::new(),
                phantoms: Vec::new(),
                projectiles: Vec::new(),
            })
            .collect();

        for row in 0..rows {
            for column in 0..columns {
                let index = (row * columns + column) as usize;
                for direction in Direction::ALL {
                    let neighbor = step(CellCoord::new(row, column), direction, rows, columns)
                        .map(|cell| (cell.row() * columns + cell.column()) as usize);
                    cells[index].neighbors[direction.index()] = neighbor;
                }
            }
        }

        Self {
            rows,
            columns,
            cell_length,
            cells,
        }
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Side length of a single square cell in world units.
    #[must_use]
    pub const fn cell_length(&self) -> f32 {
        self.cell_length
    }

    /// Total width of the grid measured in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.cell_length
    }

    /// Total height of the grid measured in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.cell_length
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.row() < self.rows && cell.column() < self.columns
    }

    /// Dense index of the cell, usable for per-cell scratch arrays.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            Some((cell.row() * self.columns + cell.column()) as usize)
        } else {
            None
        }
    }

    /// Coordinate of the cell stored at the provided dense index.
    #[must_use]
    pub fn coord(&self, index: usize) -> CellCoord {
        let columns = self.columns as usize;
        CellCoord::new((index / columns) as u32, (index % columns) as u32)
    }

    /// Precomputed neighbour of the cell, or `None` at the boundary.
    #[must_use]
    pub fn adjacent(&self, cell: CellCoord, direction: Direction) -> Option<CellCoord> {
        let index = self.index(cell)?;
        self.cells[index].neighbors[direction.index()].map(|neighbor| self.coord(neighbor))
    }

    /// Iterates over the existing neighbours of a cell in clockwise order.
    pub fn neighbors(&self, cell: CellCoord) -> impl Iterator<Item = (Direction, CellCoord)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| {
                self.adjacent(cell, direction)
                    .map(|neighbor| (direction, neighbor))
            })
    }

    /// Terrain or item occupying the cell.
    #[must_use]
    pub fn occupant_kind(&self, cell: CellCoord) -> Option<OccupantKind> {
        self.index(cell).map(|index| self.cells[index].kind)
    }

    /// Reports whether the cell holds a wall. Cells outside the grid never do.
    #[must_use]
    pub fn is_wall(&self, cell: CellCoord) -> bool {
        self.occupant_kind(cell).is_some_and(OccupantKind::is_wall)
    }

    /// Replaces the occupant kind of a cell and returns the kind actually stored.
    ///
    /// Clearing a cell that conceals the key stores the key instead.
    pub fn set_occupant_kind(&mut self, cell: CellCoord, kind: OccupantKind) -> Option<OccupantKind> {
        let index = self.index(cell)?;
        let slot = &mut self.cells[index];
        slot.kind = if kind == OccupantKind::Empty && slot.conceals_key {
            OccupantKind::Key
        } else {
            kind
        };
        Some(slot.kind)
    }

    /// Reports whether the cell hides the key underneath its occupant.
    #[must_use]
    pub fn conceals_key(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .is_some_and(|index| self.cells[index].conceals_key)
    }

    /// Marks or clears the concealed key flag of a cell.
    pub fn set_conceals_key(&mut self, cell: CellCoord, conceals: bool) {
        if let Some(index) = self.index(cell) {
            self.cells[index].conceals_key = conceals;
        }
    }

    /// Traversal cost of the cell derived from its occupant kind.
    #[must_use]
    pub fn traversal_cost(&self, cell: CellCoord) -> Option<TraversalCost> {
        self.occupant_kind(cell).map(OccupantKind::traversal_cost)
    }

    /// Bounding square of the cell in world units.
    #[must_use]
    pub fn bounds(&self, cell: CellCoord) -> Option<CellBounds> {
        if !self.contains(cell) {
            return None;
        }
        Some(CellBounds {
            origin: Vec2::new(
                cell.column() as f32 * self.cell_length,
                cell.row() as f32 * self.cell_length,
            ),
            length: self.cell_length,
        })
    }

    /// Cell containing the provided world-space point.
    #[must_use]
    pub fn cell_at(&self, point: Vec2) -> Option<CellCoord> {
        if point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let cell = CellCoord::new(
            (point.y / self.cell_length) as u32,
            (point.x / self.cell_length) as u32,
        );
        self.contains(cell).then_some(cell)
    }

    /// Corporeal agents resident in the cell, in arrival order.
    #[must_use]
    pub fn agents(&self, cell: CellCoord) -> &[AgentId] {
        self.index(cell)
            .map_or(&[][..], |index| self.cells[index].agents.as_slice())
    }

    /// Phantom agents drifting through the cell.
    #[must_use]
    pub fn phantoms(&self, cell: CellCoord) -> &[AgentId] {
        self.index(cell)
            .map_or(&[][..], |index| self.cells[index].phantoms.as_slice())
    }

    /// Projectiles travelling through the cell.
    #[must_use]
    pub fn projectiles(&self, cell: CellCoord) -> &[ProjectileId] {
        self.index(cell)
            .map_or(&[][..], |index| self.cells[index].projectiles.as_slice())
    }

    /// Reports whether the cell holds a corporeal agent other than `agent`.
    #[must_use]
    pub fn holds_other_agent(&self, cell: CellCoord, agent: Option<AgentId>) -> bool {
        self.agents(cell)
            .iter()
            .any(|resident| Some(*resident) != agent)
    }

    /// Adds a corporeal agent to the cell's occupant set.
    ///
    /// Returns `false` if the cell lies outside the grid.
    pub fn place_agent(&mut self, cell: CellCoord, agent: AgentId) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        let agents = &mut self.cells[index].agents;
        if !agents.contains(&agent) {
            agents.push(agent);
        }
        true
    }

    /// Removes a corporeal agent from the cell's occupant set.
    pub fn remove_agent(&mut self, cell: CellCoord, agent: AgentId) -> bool {
        self.index(cell)
            .is_some_and(|index| remove_entry(&mut self.cells[index].agents, &agent))
    }

    pub(crate) fn place_phantom(&mut self, cell: CellCoord, agent: AgentId) {
        if let Some(index) = self.index(cell) {
            self.cells[index].phantoms.push(agent);
        }
    }

    pub(crate) fn remove_phantom(&mut self, cell: CellCoord, agent: AgentId) -> bool {
        self.index(cell)
            .is_some_and(|index| remove_entry(&mut self.cells[index].phantoms, &agent))
    }

    pub(crate) fn place_projectile(&mut self, cell: CellCoord, projectile: ProjectileId) {
        if let Some(index) = self.index(cell) {
            self.cells[index].projectiles.push(projectile);
        }
    }

    pub(crate) fn remove_projectile(&mut self, cell: CellCoord, projectile: ProjectileId) -> bool {
        self.index(cell).is_some_and(|index| {
            remove_entry(&mut self.cells[index].projectiles, &projectile)
        })
    }
}

fn remove_entry<T: PartialEq>(entries: &mut Vec<T>, value: &T) -> bool {
    match entries.iter().position(|entry| entry == value) {
        Some(position) => {
            let _ = entries.remove(position);
            true
        }
        None => false,
    }
}

fn step(cell: CellCoord, direction: Direction, rows: u32, columns: u32) -> Option<CellCoord> {
    match direction {
        Direction::North => cell
            .row()
            .checked_sub(1)
            .map(|row| CellCoord::new(row, cell.column())),
        Direction::South => {
            let row = cell.row() + 1;
            (row < rows).then(|| CellCoord::new(row, cell.column()))
        }
        Direction::West => cell
            .column()
            .checked_sub(1)
            .map(|column| CellCoord::new(cell.row(), column)),
        Direction::East => {
            let column = cell.column() + 1;
            (column < columns).then(|| CellCoord::new(cell.row(), column))
        }
    }
}
