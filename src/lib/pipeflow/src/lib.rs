//! One-dimensional transient multiphase pipe-flow solver: gas-liquid and
//! gas-oil-water pipelines with terrain slugging, low-point liquid
//! accumulation, and pressure/temperature transients.
//!
//! Module layout follows the teacher's (`ressim`) separation of pure
//! closure modules (geometry, friction, drift-flux, regime) from the
//! stateful trackers (accumulation, slug) and the orchestrating driver,
//! with narrow collaborator traits (`thermo::ThermoAdapter`,
//! `stream::InletStream`/`OutletStream`) at the boundaries the host
//! application is expected to supply.

pub mod accumulation;
pub mod cell;
pub mod config;
pub mod driver;
pub mod drift_flux;
pub mod error;
pub mod flux;
pub mod friction;
pub mod geometry;
pub mod integrator;
pub mod regime;
pub mod rng;
pub mod slug;
pub mod stream;
pub mod thermo;

pub use cell::{Cell, ConservativeState};
pub use config::SimulationConfig;
pub use driver::{DriverState, SimulationSnapshot, TransientDriver};
pub use error::{SimError, SimResult, SimWarning, WarningCounters};
pub use regime::FlowRegime;
pub use stream::{InletStream, OutletStream};
pub use thermo::ThermoAdapter;
