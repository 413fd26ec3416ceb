use anyhow::Result;
use console::style;
use std::path::PathBuf;

use super::{build_agent, build_channel, write_audio};
use crate::configuration::Settings;

pub async fn execute(settings: &Settings, text: &str, out: Option<PathBuf>) -> Result<()> {
    let agent = build_agent(settings)?;

    let reply = match agent.run(text).await {
        Ok(reply) => reply,
        Err(err) => {
            println!("{} {}", style("assistant:").bold().red(), err.user_message());
            return Err(err.into());
        }
    };
    println!("{} {}", style("assistant:").bold().green(), reply.text);
    println!(
        "{}",
        style(format!("completed in {} round(s)", reply.rounds)).dim()
    );

    if let Some(path) = out {
        let channel = build_channel(settings)?;
        let audio = channel.text_to_speech(&reply.text).await?;
        write_audio(&path, &audio).await?;
        println!(
            "{} {}",
            style("audio written to").dim(),
            style(path.display()).bold()
        );
    }
    Ok(())
}
