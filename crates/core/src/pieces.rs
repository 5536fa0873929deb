//! Pieces module - tetromino shapes and wall kick tables
//!
//! Shapes are mino offsets inside a 4x4 bounding box whose top-left corner is the
//! piece position. Kicks follow the SRS discipline: the unkicked rotation is tried
//! first, then progressively larger offsets.
//! Reference: https://tetris.wiki/SRS

use crate::types::{PieceKind, Rotation};

/// Offset of a single mino relative to the bounding box corner
pub type MinoOffset = (i8, i8);

/// Shape of a piece - 4 mino offsets
pub type PieceShape = [MinoOffset; 4];

/// Get the shape (mino offsets) for a piece kind and rotation
pub fn get_shape(kind: PieceKind, rotation: Rotation) -> PieceShape {
    match kind {
        PieceKind::I => get_i_shape(rotation),
        PieceKind::O => get_o_shape(rotation),
        PieceKind::T => get_t_shape(rotation),
        PieceKind::S => get_s_shape(rotation),
        PieceKind::Z => get_z_shape(rotation),
        PieceKind::J => get_j_shape(rotation),
        PieceKind::L => get_l_shape(rotation),
    }
}

/// Render a shape into a 4x4 occupancy mask, `mask[y][x]`
pub fn shape_mask(kind: PieceKind, rotation: Rotation) -> [[bool; 4]; 4] {
    let mut mask = [[false; 4]; 4];
    for (x, y) in get_shape(kind, rotation) {
        mask[y as usize][x as usize] = true;
    }
    mask
}

fn get_i_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 1), (1, 1), (2, 1), (3, 1)],
        Rotation::East => [(2, 0), (2, 1), (2, 2), (2, 3)],
        Rotation::South => [(0, 2), (1, 2), (2, 2), (3, 2)],
        Rotation::West => [(1, 0), (1, 1), (1, 2), (1, 3)],
    }
}

/// O piece occupies the same cells in every rotation state
fn get_o_shape(_rotation: Rotation) -> PieceShape {
    [(1, 0), (2, 0), (1, 1), (2, 1)]
}

fn get_t_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(1, 0), (0, 1), (1, 1), (2, 1)],
        Rotation::East => [(1, 0), (1, 1), (2, 1), (1, 2)],
        Rotation::South => [(0, 1), (1, 1), (2, 1), (1, 2)],
        Rotation::West => [(1, 0), (0, 1), (1, 1), (1, 2)],
    }
}

fn get_s_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(1, 0), (2, 0), (0, 1), (1, 1)],
        Rotation::East => [(1, 0), (1, 1), (2, 1), (2, 2)],
        Rotation::South => [(1, 1), (2, 1), (0, 2), (1, 2)],
        Rotation::West => [(0, 0), (0, 1), (1, 1), (1, 2)],
    }
}

fn get_z_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 0), (1, 0), (1, 1), (2, 1)],
        Rotation::East => [(2, 0), (1, 1), (2, 1), (1, 2)],
        Rotation::South => [(0, 1), (1, 1), (1, 2), (2, 2)],
        Rotation::West => [(1, 0), (0, 1), (1, 1), (0, 2)],
    }
}

fn get_j_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 0), (0, 1), (1, 1), (2, 1)],
        Rotation::East => [(1, 0), (2, 0), (1, 1), (1, 2)],
        Rotation::South => [(0, 1), (1, 1), (2, 1), (2, 2)],
        Rotation::West => [(1, 0), (1, 1), (0, 2), (1, 2)],
    }
}

fn get_l_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(2, 0), (0, 1), (1, 1), (2, 1)],
        Rotation::East => [(1, 0), (1, 1), (1, 2), (2, 2)],
        Rotation::South => [(0, 1), (1, 1), (2, 1), (0, 2)],
        Rotation::West => [(0, 0), (1, 0), (1, 1), (1, 2)],
    }
}

/// Kick table: five (dx, dy) candidates per transition, unkicked first.
///
/// Entries are indexed by transition: 0->1, 1->2, 2->3, 3->0.
pub type KickTable = [[MinoOffset; 5]; 4];

/// Shared by J, L, S, T and Z
const JLSTZ_KICKS: KickTable = [
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
];

const I_KICKS: KickTable = [
    [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
    [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
    [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
];

/// The O piece never needs a kick
const O_KICKS: [MinoOffset; 1] = [(0, 0)];

/// Get the kick table for a piece kind (None for O)
pub fn get_kick_table(kind: PieceKind) -> Option<&'static KickTable> {
    match kind {
        PieceKind::O => None,
        PieceKind::I => Some(&I_KICKS),
        _ => Some(&JLSTZ_KICKS),
    }
}

/// Table row used for a transition.
///
/// A clockwise step `from -> from+1` uses row `from`; any other transition uses
/// row `(from + 3) mod 4`, i.e. the row of the clockwise step arriving at `from`.
fn get_kick_index(from: Rotation, to: Rotation) -> usize {
    if from.rotate_cw() == to {
        from.index() as usize
    } else {
        (from.index() as usize + 3) % 4
    }
}

/// Ordered kick candidates for rotating `kind` from `from` to `to`
pub fn kick_offsets(kind: PieceKind, from: Rotation, to: Rotation) -> &'static [MinoOffset] {
    match get_kick_table(kind) {
        Some(table) => &table[get_kick_index(from, to)],
        None => &O_KICKS,
    }
}

/// Try to rotate a piece with wall kicks
///
/// Returns the new rotation and the applied kick offset, or None if every
/// candidate collides.
pub fn try_rotate(
    kind: PieceKind,
    rotation: Rotation,
    x: i8,
    y: i8,
    direction: i32,
    collides: impl Fn(&PieceShape, i8, i8) -> bool,
) -> Option<(Rotation, MinoOffset)> {
    let new_rotation = rotation.rotate_by(direction);
    let new_shape = get_shape(kind, new_rotation);

    kick_offsets(kind, rotation, new_rotation)
        .iter()
        .find(|&&(dx, dy)| !collides(&new_shape, x + dx, y + dy))
        .map(|&offset| (new_rotation, offset))
}
