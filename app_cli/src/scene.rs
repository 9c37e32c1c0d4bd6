//! Scene files and scripted listener paths

use log::debug;
use room::{NodeStore, VoiceNode};
use room_core::{Error, Position};
use std::fs;
use std::path::Path;

/// Load a JSON node list from `path`.
///
/// Relative audio paths are taken relative to the scene file, so a scene can
/// ship next to its clips.
pub fn load_scene(path: &Path) -> Result<Vec<VoiceNode>, Error> {
    let json = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read scene {:?}: {}", path, e)))?;
    let mut nodes = NodeStore::parse_nodes(&json)?;

    if let Some(dir) = path.parent() {
        for node in &mut nodes {
            if !node.audio_url.contains(':') && Path::new(&node.audio_url).is_relative() {
                node.audio_url = dir.join(&node.audio_url).to_string_lossy().into_owned();
            }
        }
    }

    debug!("Loaded {} nodes from {:?}", nodes.len(), path);
    Ok(nodes)
}

/// Parse an `x,y` waypoint.
pub fn parse_waypoint(value: &str) -> Result<Position, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", value))?;
    let x: f32 = x.trim().parse().map_err(|e| format!("bad x in '{}': {}", value, e))?;
    let y: f32 = y.trim().parse().map_err(|e| format!("bad y in '{}': {}", value, e))?;
    if !(x.is_finite() && y.is_finite()) {
        return Err(format!("waypoint '{}' is not finite", value));
    }
    Ok(Position::new(x, y))
}

/// Listener positions along `waypoints`, at most `step` units apart.
///
/// Every waypoint is included exactly once.
pub fn walk(waypoints: &[Position], step: f32) -> Vec<Position> {
    let Some(first) = waypoints.first() else {
        return Vec::new();
    };

    let mut positions = vec![*first];
    for pair in waypoints.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let length = from.distance_to(to);
        let segments = if step > 0.0 {
            (length / step).ceil().max(1.0) as usize
        } else {
            1
        };

        for i in 1..=segments {
            let t = i as f32 / segments as f32;
            positions.push(Position::new(
                from.x + (to.x - from.x) * t,
                from.y + (to.y - from.y) * t,
            ));
        }
    }
    positions
}
