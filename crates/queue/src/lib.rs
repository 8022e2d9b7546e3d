//! Durable task queue: a domain-agnostic polling runner, the explicit
//! handler registry, and the domain handlers it dispatches to.
//!
//! The runner is not a standing process. An external trigger (the cron
//! endpoint) calls [`TaskRunner::run_batch`], which claims due tasks one at
//! a time and executes their handlers sequentially. Handlers chain
//! multi-step workflows by enqueueing follow-on tasks (saga style) rather
//! than through any central orchestrator.

pub mod context;
pub mod handlers;
pub mod registry;
pub mod runner;

pub use context::HandlerContext;
pub use registry::{HandlerRegistry, TaskHandler};
pub use runner::{RunReport, TaskRunner};
