//! GeoQuest Back: realtime engine of a location-based team quest game.
//!
//! Players and judges connect over a WebSocket, background loops assign judges, start
//! registered games and reveal quests when a team member walks into a quest's geofence.

pub mod capability;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod geo;
pub mod identity;
pub mod routes;
pub mod services;
pub mod state;
