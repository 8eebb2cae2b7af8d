//! The per-agent vision builder: egocentric window, FOV cone, occlusion.
//!
//! The output is a `(2R+1) × (2R+1) × color_dim` tensor centered on the
//! agent and rotated into its local frame: local `+y` is the facing
//! direction, local `+x` is to the agent's right.  Cell `(0, 0)` of the
//! buffer is the bottom-left of the window (behind-left of the agent).
//!
//! Visibility is a cone of `agent_field_of_view` radians centered on the
//! facing axis; cells outside it read zero.  Light from a visible cell is
//! attenuated by `(1 − occlusion)` for every occluding item the sight line
//! crosses; below a transmittance cutoff the cell reads zero.

use rustc_hash::FxHashMap;

use gw_core::{Direction, Position};
use gw_energy::SimulatorConfig;
use gw_map::WorldMap;

/// Transmittance below which a cell is reported as fully dark.
const TRANSMITTANCE_CUTOFF: f32 = 0.01;

/// Slack on the cone test so cells sitting exactly on the boundary are
/// included (pinned by tests at the 90° boundary).
const FOV_EPSILON: f32 = 1e-6;

/// Rotate a local-frame offset into the world frame for `facing`.
#[inline]
fn local_to_world(offset: Position, facing: Direction) -> Position {
    match facing {
        Direction::Up    => offset,
        Direction::Down  => Position::new(-offset.x, -offset.y),
        Direction::Right => Position::new(offset.y, -offset.x),
        Direction::Left  => Position::new(-offset.y, offset.x),
    }
}

/// `true` if a local-frame offset lies inside the FOV cone.
#[inline]
fn in_field_of_view(offset: Position, field_of_view: f32) -> bool {
    if offset == Position::ORIGIN {
        return true;
    }
    // Angle between the facing axis (+y) and the cell offset.
    let angle = (offset.x as f32).atan2(offset.y as f32).abs();
    angle <= field_of_view / 2.0 + FOV_EPSILON
}

/// Build one agent's vision buffer.
///
/// `agent_markers` maps occupied world cells to how many agents stand there
/// (the agent itself included); each marker composites `agent_color` onto
/// the cell.
pub fn build_vision(
    map: &WorldMap,
    agent_position: Position,
    facing: Direction,
    agent_markers: &FxHashMap<Position, u32>,
    config: &SimulatorConfig,
) -> Vec<f32> {
    let range = config.vision_range as i64;
    let side = config.vision_side();
    let dim = config.color_dim as usize;
    let mut buffer = vec![0.0f32; config.vision_len()];

    for local_y in -range..=range {
        for local_x in -range..=range {
            let local = Position::new(local_x, local_y);
            if !in_field_of_view(local, config.agent_field_of_view) {
                continue;
            }

            let world = agent_position + local_to_world(local, facing);
            let transmittance = sight_line_transmittance(map, agent_position, world);
            if transmittance < TRANSMITTANCE_CUTOFF {
                continue;
            }

            let row = (local_y + range) as usize;
            let column = (local_x + range) as usize;
            let cell = (row * side + column) * dim;
            write_cell_color(
                map,
                world,
                agent_markers,
                config,
                transmittance,
                &mut buffer[cell..cell + dim],
            );
        }
    }
    buffer
}

/// Composite a world cell's color (item raster plus agent markers) into the
/// output slice, scaled by `transmittance`.
fn write_cell_color(
    map: &WorldMap,
    world: Position,
    agent_markers: &FxHashMap<Position, u32>,
    config: &SimulatorConfig,
    transmittance: f32,
    out: &mut [f32],
) {
    let (patch_position, offset) = world.to_patch_with_offset(map.n());
    if let Some(patch) = map.store().get_if_exists(patch_position) {
        let colors = patch.vision_at(offset, map.n(), config.color_dim);
        for (slot, &value) in out.iter_mut().zip(colors) {
            *slot = value * transmittance;
        }
    }
    if let Some(&count) = agent_markers.get(&world) {
        for (slot, &marker) in out.iter_mut().zip(&config.agent_color) {
            *slot += marker * count as f32 * transmittance;
        }
    }
}

/// Walk the sight line from the agent's cell to `target`, multiplying out
/// `(1 − occlusion)` for every intervening occluding item.  Endpoints do not
/// occlude themselves.
fn sight_line_transmittance(map: &WorldMap, from: Position, target: Position) -> f32 {
    let mut transmittance = 1.0f32;
    for cell in line_cells(from, target) {
        if cell == from || cell == target {
            continue;
        }
        if let Some(occlusion) = occlusion_at(map, cell) {
            transmittance *= 1.0 - occlusion;
            if transmittance < TRANSMITTANCE_CUTOFF {
                break;
            }
        }
    }
    transmittance
}

/// Occlusion factor of the live item at `cell`, if any (and nonzero).
fn occlusion_at(map: &WorldMap, cell: Position) -> Option<f32> {
    let (patch_position, _) = cell.to_patch_with_offset(map.n());
    let patch = map.store().get_if_exists(patch_position)?;
    let item = patch.live_item_at(cell)?;
    let occlusion = map.catalogue()[item.item_type.index()].visual_occlusion;
    (occlusion > 0.0).then_some(occlusion)
}

/// Cells crossed by the segment between two cell centers (Bresenham).
fn line_cells(from: Position, to: Position) -> Vec<Position> {
    let mut cells = Vec::new();
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let mut current = from;
    loop {
        cells.push(current);
        if current == to {
            return cells;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            current.x += sx;
        }
        if doubled <= dx {
            err += dx;
            current.y += sy;
        }
    }
}
