// handlers/mod.rs - Two-tier handler layout
//
// Public (session optional) → Protected (principal required)
//
// Every handler runs its operation through `middleware::handle`, which owns
// the failure envelope and logging. Handlers only pick extractors, call into
// `services` and choose the success message.
pub mod protected;
pub mod public;
pub mod service;
mod utils;
