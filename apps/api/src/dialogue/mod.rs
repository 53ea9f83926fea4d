// Intake dialogue: collects a role and a job description, then runs a delayed
// analysis that produces a profile and renders it for the session.

pub mod controller;
pub mod handlers;
pub mod session;
pub mod source;
