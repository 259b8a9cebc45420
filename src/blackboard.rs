use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use grid_snap::CellCoord;

/// Host-side view of the controller, refreshed every frame.
#[derive(Clone, Debug)]
pub struct State {
    pub active: Option<String>,
    pub placements: Vec<(String, Vec<CellCoord>)>,
    pub unplaced: Vec<String>,
    pub frames: u64,
    pub last_input_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            active: None,
            placements: Vec::new(),
            unplaced: Vec::new(),
            frames: 0,
            last_input_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

#[cfg(test)]
impl State {
    pub fn cells_of(&self, name: &str) -> Option<&[CellCoord]> {
        self.placements
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cells)| cells.as_slice())
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn touch_input(bb: &Blackboard) {
    bb.write().last_input_ts = Instant::now();
}

/// Records a fault once; repeats of the same message are dropped.
pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_fault_dedupes() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "no free cell");
        raise_fault(&bb, "no free cell");
        raise_fault(&bb, "unknown entity");
        assert_eq!(snapshot(&bb).faults, vec!["no free cell", "unknown entity"]);
    }

    #[test]
    fn test_touch_input_advances_timestamp() {
        let bb: Blackboard = Arc::default();
        let before = snapshot(&bb).last_input_ts;
        touch_input(&bb);
        assert!(snapshot(&bb).last_input_ts >= before);
    }

    #[test]
    fn test_cells_of() {
        let state = State {
            placements: vec![("boiler".to_string(), vec![CellCoord::new(4, 1)])],
            ..State::default()
        };
        assert_eq!(state.cells_of("boiler"), Some(&[CellCoord::new(4, 1)][..]));
        assert_eq!(state.cells_of("press"), None);
    }
}
