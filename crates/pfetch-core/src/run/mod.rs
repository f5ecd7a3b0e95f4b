//! Run controller: manifest -> jobs -> workers, dispatcher and reporter ->
//! wait for every job to be terminal -> orderly shutdown.

mod controller;
mod setup;
mod state;

pub use controller::{execute_jobs, run_fetch, FetchRequest, RunOptions};
pub use setup::{plan_jobs, SetupError};

pub(crate) use state::{Registry, RunState};
