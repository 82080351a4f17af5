//! # Schedule Helper Engine
//!
//! Automated meeting-scheduling negotiation over email.
//!
//! This crate turns an inbound email plus calendar free/busy data into a
//! negotiation decision and a reply payload: confirm a proposed time, offer
//! ranked alternatives, ask a clarifying question, or decline. Email
//! transport, calendar fetching and session storage are external
//! collaborators injected behind traits.
//!
//! ## Features
//!
//! - **Extraction**: Parse availability expressions, meeting duration and
//!   intent out of free-form email text
//! - **Normalization**: Resolve local time expressions to absolute UTC
//!   windows under target-date DST rules
//! - **Intersection**: Subtract buffered busy intervals from candidate
//!   windows to find feasible slots
//! - **Ranking**: Deterministic slot ordering by start, stated preference
//!   and conflict proximity
//! - **Negotiation**: Per-thread session state machine with bounded
//!   counter-offer rounds and idempotent message retries
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Identifier newtypes and the DTOs exchanged with transport
//! - [`models`]: Core domain types (windows, proposals, sessions, replies)
//! - [`services`]: Pipeline stages and the [`services::Orchestrator`]
//! - [`calendar`]: Free/busy provider trait and the mock backend
//! - [`store`]: Session persistence trait, factory and in-memory backend
//! - [`config`]: Negotiation policy and resource limits

pub mod api;
pub mod calendar;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use api::{CalendarId, InboundMessage, ReplyEvent, ThreadId};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use services::Orchestrator;
