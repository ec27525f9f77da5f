//! Client-side engine for the Meridian lending protocol.
//!
//! Three concerns live here: turning positions and oracle quotes into a
//! conservative borrow-capacity figure, driving the multi-phase write
//! sequence each user intent requires, and classifying raw failure text
//! into stable user-facing messages. Everything is recomputed from the
//! latest snapshots; no component owns a cache.

mod capacity;
mod classify;
mod error;
mod orchestrator;
mod settlement;

pub use capacity::{
    available_to_borrow, capacity_in_units, capacity_summary, Capacity, CapacityParams,
    CapacitySummary, MarketView,
};
pub use classify::{classify, ClassifiedError};
pub use error::{EngineError, UnknownReason, ValidationError};
pub use orchestrator::{
    DismissHandle, DismissSignal, IntentBounds, Orchestrator, OrchestratorConfig, Phase,
    RefreshSignal, RunReport,
};
pub use settlement::{ContractSettlement, Settlement, SettlementError};
