//! These models represent the objects passed around by the agent
//!
//! The orchestrator keeps the conversation in these internal structs and only converts
//! them at the edges: into the chat-completions wire format when talking to a provider,
//! and into plain text when the final reply is handed to speech synthesis.
pub mod context;
pub mod message;
pub mod role;
pub mod tool;
