//! Simulation constants. Quantities are in kg, times in seconds.

/// Default duration of one simulated timestep: one average month
/// (365.25 days / 12, rounded to the second).
pub const DEFAULT_TIMESTEP_SECS: u64 = 2_629_846;

/// Generic tolerance below which a quantity is considered zero.
pub const EPS: f64 = 1e-6;

/// Tolerance used when moving material between buffers. Differences
/// below this between an advertised and a settled quantity are absorbed.
pub const EPS_RSRC: f64 = 1e-6;

/// Name of the table compositions are recorded into.
pub const COMPOSITIONS_TABLE: &str = "Compositions";

/// Identifier of the implicit "unpackaged" package.
pub const UNPACKAGED_ID: u32 = 1;

/// Name of the implicit "unpackaged" package.
pub const UNPACKAGED_NAME: &str = "unpackaged";

/// Seconds in a Julian year, used to express half-lives.
pub const SECS_PER_YEAR: f64 = 31_557_600.0;

/// Seconds in a day.
pub const SECS_PER_DAY: f64 = 86_400.0;

/// Seconds in an hour.
pub const SECS_PER_HOUR: f64 = 3_600.0;
