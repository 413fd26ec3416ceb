pub mod agent;
pub mod audio;
pub mod channel;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod prompt_template;
pub mod providers;
pub mod speech;
pub mod tools;

pub use agent::{Agent, AgentConfig, Reply};
pub use channel::{ChannelConfig, TextChannel};
pub use pipeline::{Exchange, VoicePipeline};
