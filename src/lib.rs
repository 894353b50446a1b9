//! Task planning core for a pomodoro workflow: an owner-scoped task store
//! with optimistic writes against a live remote store, calendar views over
//! the list, and a notes pad.

pub mod calendar;
pub mod config;
pub mod controller;
pub mod datastore;
pub mod log;
pub mod model;
pub mod notes;

#[cfg(test)]
mod e2e_tests;
