/// A joint-space target, spec §3: `robax` (6 radians) plus optional
/// external axes (up to 6 radians).
#[derive(Debug, Clone, PartialEq)]
pub struct JointTarget {
    pub robax: [f64; 6],
    pub extax: Option<Vec<f64>>,
}

/// Robot configuration quadrant, spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobTargetConfig {
    pub cf1: i32,
    pub cf4: i32,
    pub cf6: i32,
    pub cfx: i32,
}

/// A Cartesian-space target, spec §3: translation in metres, rotation as a
/// `[w, x, y, z]` quaternion (controller reporting order), configuration
/// quadrant, and external axes in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct RobTarget {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
    pub config: RobTargetConfig,
    pub extax: Vec<f64>,
}
