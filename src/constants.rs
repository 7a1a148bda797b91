pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_POPULATION_SIZE: f64 = 1000.0;
pub const DEGREES_OF_FREEDOM: usize = 1;
pub const YATES_MAX_ADJUSTMENT: f64 = 0.5;
pub const DENSITY_MIN_UPPER: f64 = 10.0;
pub const DENSITY_POINTS: usize = 500;
pub const DEFAULT_POPULATION: [[f64; 2]; 2] = [[0.15, 0.15], [0.30, 0.40]];
pub const MAX_DRAW_POPULATION: u64 = 100_000_000;
