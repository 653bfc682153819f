//! Background fetching on a schedule.
//!
//! A [`FetchScheduler`] keeps a remote's tracking refs fresh by fetching it
//! periodically, backing off while the remote keeps failing.

mod scheduler;
mod state;

pub use scheduler::{FetchScheduler, OptionsFactory, SchedulerConfig, SchedulerHandle};
pub use state::FetchState;
