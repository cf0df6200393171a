//! Core data types for Fabula.
//!
//! This crate provides the data model shared by every Fabula crate: the
//! completion request/response types that cross the backend seam, and the
//! story types (beats, profiles, characters, scenes, chapters) the pipeline
//! threads through a run.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod beat;
mod character;
mod language;
mod message;
mod profile;
mod request;
mod role;
mod scene;
mod telemetry;

pub use beat::{Beat, BeatSheet};
pub use character::{CharacterProfile, CharacterRoster, FamilyRelation, Relationships};
pub use language::{Language, LanguageSelection, Pov, StyleHints, Tense};
pub use message::Message;
pub use profile::{CharacterSketch, StoryProfile, StyleProfile, WorldProfile};
pub use request::{GenerateRequest, GenerateRequestBuilder, GenerateResponse, TokenUsage};
pub use role::Role;
pub use scene::{Chapter, GeneratedScene, SceneReview};
pub use telemetry::{LogFormat, TelemetryConfig, init_telemetry, shutdown_telemetry};
