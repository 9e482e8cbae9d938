//! Line-oriented interactive front end on stdin/stdout.

pub mod commands;
pub mod render;

use std::{
    io::{self, BufRead},
    sync::Arc,
    thread,
};

use anyhow::Result;
use chrono_tz::Tz;
use tokio::sync::mpsc;

use crate::{
    feed::{FeedService, RefreshOutcome},
    infrastructure::shutdown::{Shutdown, ShutdownListener, ShutdownReason},
    stores::saved::SaveToggle,
};

use commands::{Command, ListField, ToggleField};

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub struct Console {
    feed: Arc<FeedService>,
    timezone: Tz,
}

impl Console {
    pub fn new(feed: Arc<FeedService>, timezone: Tz) -> Self {
        Self { feed, timezone }
    }

    /// Reads commands until EOF, `quit` or a shutdown signal.
    pub async fn run(&self, shutdown: &Shutdown, mut listener: ShutdownListener) -> Result<()> {
        let mut lines = spawn_stdin_reader();
        println!("{}", self.render_feed());
        println!("type `help` for commands");

        loop {
            tokio::select! {
                reason = listener.notified() => {
                    tracing::debug!(target: "console", %reason, "console stopping");
                    break;
                }
                line = lines.recv() => {
                    let Some(line) = line else {
                        shutdown.trigger(ShutdownReason::ConsoleClosed);
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match self.handle(&line).await {
                        Ok(Reply::Text(text)) => println!("{text}"),
                        Ok(Reply::Quit) => {
                            shutdown.trigger(ShutdownReason::ConsoleClosed);
                            break;
                        }
                        Err(err) => {
                            tracing::warn!(target: "console", error = %err, command = %line.trim(), "command failed");
                            println!("error: {err:#}");
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub async fn handle(&self, line: &str) -> Result<Reply> {
        let command = match commands::parse(line) {
            Ok(command) => command,
            Err(err) => return Ok(Reply::Text(err.to_string())),
        };
        tracing::debug!(target: "console", ?command, "command received");

        let text = match command {
            Command::List => self.render_feed(),
            Command::Refresh => match self.feed.refresh(true).await {
                Ok(outcome) => format!("{}\n{}", describe(outcome), self.render_feed()),
                Err(err) => format!("refresh failed: {err}\nprevious articles kept; type `refresh` to retry"),
            },
            Command::Show(index) => match self.feed.article_at(index) {
                Some(article) => render::article(&article, &self.feed.settings().snapshot(), self.timezone),
                None => no_article(index),
            },
            Command::Like(index) => self.feedback(index, true).await?,
            Command::Dislike(index) => self.feedback(index, false).await?,
            Command::Save(index) => {
                let Some(article) = self.feed.article_at(index) else {
                    return Ok(Reply::Text(no_article(index)));
                };
                match self.feed.toggle_saved(&article.id).await? {
                    SaveToggle::Saved => format!("saved \"{}\"", article.title),
                    SaveToggle::Removed => format!("removed \"{}\" from saved", article.title),
                    SaveToggle::NoUrl => "articles without a link cannot be saved".to_string(),
                }
            }
            Command::Saved => render::saved(&self.feed.saved().list(), self.timezone),
            Command::Unsave { index, confirmed } => {
                let saved = self.feed.saved().list();
                let Some(entry) = saved.get(index) else {
                    return Ok(Reply::Text(format!("no saved article {}", index + 1)));
                };
                if self.feed.settings().snapshot().confirm_unsave && !confirmed {
                    format!(
                        "remove \"{}\"? repeat as `unsave {} --yes`",
                        entry.title,
                        index + 1
                    )
                } else {
                    self.feed.remove_saved(&entry.id).await?;
                    format!("removed \"{}\"", entry.title)
                }
            }
            Command::Tags => render::tag_weights(&self.feed.tag_weights().snapshot()),
            Command::TagAdd(name) => {
                if self.feed.tag_weights().add_tag(&name).await? {
                    format!("added `{}`", name.trim().to_lowercase())
                } else {
                    format!("`{}` already exists", name.trim().to_lowercase())
                }
            }
            Command::TagRemove(name) => {
                if self.feed.tag_weights().remove_tag(&name).await? {
                    format!("removed `{}`", name.trim().to_lowercase())
                } else {
                    format!("no tag `{}`", name.trim().to_lowercase())
                }
            }
            Command::TagSet { name, value } => {
                self.feed.tag_weights().set_weight(&name, value).await?;
                format!("`{}` is now {value:+.1}", name.trim().to_lowercase())
            }
            Command::Settings => render::settings(&self.feed.settings().snapshot()),
            Command::SetList { field, values } => {
                let changed = self
                    .feed
                    .update_settings(|settings| match field {
                        ListField::Languages => settings.languages = values,
                        ListField::Countries => settings.countries = values,
                        ListField::Sources => settings.preferred_sources = values,
                    })
                    .await?;
                self.after_settings_change(changed)
            }
            Command::SetToggle { field, enabled } => {
                let changed = self
                    .feed
                    .update_settings(|settings| match field {
                        ToggleField::Quality => settings.quality_mode = enabled,
                        ToggleField::Newsdata => settings.enable_newsdata = enabled,
                        ToggleField::Rss => settings.enable_rss = enabled,
                    })
                    .await?;
                self.after_settings_change(changed)
            }
            Command::Help => render::HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Text(text))
    }

    async fn feedback(&self, index: usize, liked: bool) -> Result<String> {
        let Some(article) = self.feed.article_at(index) else {
            return Ok(no_article(index));
        };
        let key = if liked {
            self.feed.like(&article.id).await?
        } else {
            self.feed.dislike(&article.id).await?
        };
        Ok(match key {
            Some(key) => {
                let weight = self.feed.tag_weights().weight(&key).unwrap_or(0.0);
                format!("`{key}` is now {weight:+.1}")
            }
            None => "this article has no category or tags to learn from".to_string(),
        })
    }

    fn render_feed(&self) -> String {
        render::feed(&self.feed.view(), &self.feed.settings().snapshot(), self.timezone)
    }

    fn after_settings_change(&self, changed: bool) -> String {
        if !changed {
            return "settings unchanged".to_string();
        }
        format!("settings saved\n{}", self.render_feed())
    }
}

fn describe(outcome: RefreshOutcome) -> String {
    match outcome {
        RefreshOutcome::Refreshed { count } => format!("loaded {count} articles"),
        RefreshOutcome::Skipped(skip) => format!("refresh skipped: {skip}"),
    }
}

fn no_article(index: usize) -> String {
    format!("no article {}; type `list`", index + 1)
}

/// Blocking stdin reads live on their own thread so they never hold up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
