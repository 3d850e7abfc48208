//! Time tracking engine for test sessions.
//!
//! This crate contains the fundamental types and logic for:
//! - Time lines: recording start/end points and computing elapsed time,
//!   repairing ranges broken by interrupted requests
//! - Timers: per-session tracking of item visits on server and client clocks
//! - Constraints: remaining time against min/max limits of the current item,
//!   section, test part and test
//! - Adjustments: proctor-granted time increases and bounded decreases

pub mod adjustment;
mod adjustment_service;
mod constraint;
pub mod error;
pub mod format;
pub mod route;
mod session;
pub mod storage;
pub mod time_line;
pub mod time_point;
mod timer;
pub mod types;

pub use adjustment::{Adjustment, AdjustmentAction, AdjustmentMap};
pub use adjustment_service::TimerAdjustmentService;
pub use constraint::{ClientTimeConstraint, ConstraintSettings, ExtraTime, TimeConstraint};
pub use error::{StorageError, TimerError};
pub use format::{JsonFormat, PackedFormat, StorageFormat, TimeStorageFormat, TimerSnapshot};
pub use route::{ItemRef, RoutePosition, Scope, ScopedComponent, TimeLimited, TimeLimits};
pub use session::{RunnerSession, TestSession};
pub use storage::{CachedTimeStorage, MemoryTimeStorage, TimeStorage};
pub use time_line::TimeLine;
pub use time_point::{PointType, Target, TimePoint};
pub use timer::{TIMER_PRECISION, Timer};
pub use types::{NavigationMode, SessionId, SourceId, UserId, ValidationError};
