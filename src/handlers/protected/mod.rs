// handlers/protected/mod.rs - Protected handlers (principal required)
//
// Every operation starts with `session.require()`, so an unresolved caller
// gets 401 before any store call. Store access runs under the caller's own
// credential and every query is additionally scoped to the caller's id.
pub mod collections;
pub mod profile;
pub mod ratings;
pub mod reviews;
