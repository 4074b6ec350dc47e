use serde::{Deserialize, Serialize};

/// Worm body and environment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated seconds per individual.
    pub eval_time: f64,
    /// Controller time step in seconds.
    pub dt: f64,
    /// Physics substeps per controller step.
    pub substeps: usize,
    pub num_joints: usize,
    pub aquatic: bool,
    pub log_frames: bool,
    /// Feed a sine wave into the controller as an extra input.
    pub periodic: bool,
    pub periodic_frequency: f64,

    pub segment_length: f64,
    pub segment_radius: f64,
    /// Joint limits in radians for the horizontal and vertical axes.
    pub max_yaw: f64,
    pub max_pitch: f64,
    /// Maximum joint angular speed in rad/s.
    pub joint_speed: f64,

    pub water_tangential_drag: f64,
    pub water_normal_drag: f64,
    pub ground_tangential_friction: f64,
    pub ground_normal_friction: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            eval_time: 10.0,
            dt: 0.02,
            substeps: 4,
            num_joints: 9,
            aquatic: false,
            log_frames: false,
            periodic: true,
            periodic_frequency: 1.0,

            segment_length: 0.1,
            segment_radius: 0.02,
            max_yaw: 0.8,
            max_pitch: 0.4,
            joint_speed: 6.0,

            water_tangential_drag: 1.0,
            water_normal_drag: 2.5,
            ground_tangential_friction: 1.0,
            ground_normal_friction: 6.0,
        }
    }
}

impl SimulationConfig {
    /// Controller inputs before the periodic signal and bias: two angles per joint
    /// and one sensor per segment.
    pub fn sensor_count(&self) -> usize {
        self.num_joints * 2 + self.num_joints + 1
    }

    /// Total genome inputs, including the optional periodic signal and the bias.
    pub fn genome_input_count(&self) -> usize {
        self.sensor_count() + if self.periodic { 2 } else { 1 }
    }

    pub fn genome_output_count(&self) -> usize {
        self.num_joints * 2
    }

    pub fn segment_count(&self) -> usize {
        self.num_joints + 1
    }

    pub fn control_steps(&self) -> usize {
        (self.eval_time / self.dt).round() as usize
    }
}
