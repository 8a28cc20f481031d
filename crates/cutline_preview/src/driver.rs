//! Playback: a tokio task that ticks the workflow at the project frame rate
//! and hands each frame's output to a [`FrameSink`].

use crate::error::{PreviewError, Result};
use cutline_core::settings::RenderSettings;
use cutline_core::types::TrackType;
use cutline_render::events::FrameChangedReason;
use cutline_render::output::OutputBuffer;
use cutline_render::workflow::Workflow;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Stopped,
    Rendering,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Stop,
    Seek(i64),
}

/// One frame handed to the sink.
#[derive(Debug, Clone)]
pub struct Presented {
    pub frame: i64,
    pub paused: bool,
    pub video: Option<OutputBuffer>,
    pub audio: Option<OutputBuffer>,
}

/// Consumer of rendered frames: a preview window, an encoder, a test probe.
pub trait FrameSink: Send + 'static {
    fn present(&mut self, frame: Presented);
}

impl FrameSink for mpsc::UnboundedSender<Presented> {
    fn present(&mut self, frame: Presented) {
        // A closed receiver just means nobody is watching.
        let _ = self.send(frame);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSummary {
    pub presented: u64,
    pub end_reached: bool,
    pub last_frame: i64,
}

pub struct PlaybackDriver {
    commands: mpsc::Sender<PlaybackCommand>,
    state: watch::Receiver<PlaybackState>,
    task: JoinHandle<Result<PlaybackSummary>>,
}

impl PlaybackDriver {
    /// Spawn the playback task on the current tokio runtime. It starts
    /// stopped; send [`PlaybackCommand::Play`] to begin.
    pub fn spawn(workflow: Arc<Workflow>, sink: impl FrameSink, settings: &RenderSettings) -> Self {
        let (commands, rx) = mpsc::channel(32);
        let (state_tx, state) = watch::channel(PlaybackState::Stopped);
        let task = tokio::spawn(run(workflow, sink, settings.clone(), rx, state_tx));
        Self {
            commands,
            state,
            task,
        }
    }

    pub async fn send(&self, command: PlaybackCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PreviewError::Closed)
    }

    pub async fn play(&self) -> Result<()> {
        self.send(PlaybackCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(PlaybackCommand::Pause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(PlaybackCommand::Stop).await
    }

    pub async fn seek(&self, frame: i64) -> Result<()> {
        self.send(PlaybackCommand::Seek(frame)).await
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    /// Resolve once the task reports `target`.
    pub async fn wait_for_state(&self, target: PlaybackState) -> Result<()> {
        let mut rx = self.state.clone();
        rx.wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| PreviewError::Closed)
    }

    /// Wait for the task to finish: either the timeline ended or, once the
    /// command channel is dropped here, right away.
    pub async fn join(self) -> Result<PlaybackSummary> {
        let Self { commands, task, .. } = self;
        drop(commands);
        task.await.map_err(|e| PreviewError::Join(e.to_string()))?
    }

    /// Wait for the end of the timeline while keeping the command channel open.
    pub async fn finished(self) -> Result<PlaybackSummary> {
        let Self { commands, task, .. } = self;
        let summary = task.await.map_err(|e| PreviewError::Join(e.to_string()));
        drop(commands);
        summary?
    }
}

async fn run(
    workflow: Arc<Workflow>,
    mut sink: impl FrameSink,
    settings: RenderSettings,
    mut commands: mpsc::Receiver<PlaybackCommand>,
    state_tx: watch::Sender<PlaybackState>,
) -> Result<PlaybackSummary> {
    let mut interval = tokio::time::interval(settings.frame_duration());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut state = PlaybackState::Stopped;
    let mut summary = PlaybackSummary::default();

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::debug!("playback command channel closed");
                    break;
                };
                state = apply(&workflow, &settings, state, command)?;
                state_tx.send_replace(state);
            }
            _ = interval.tick() => {
                let paused = match state {
                    PlaybackState::Stopped => continue,
                    PlaybackState::Rendering => false,
                    PlaybackState::Paused => true,
                };
                let frame = workflow.get_current_frame();
                sink.present(Presented {
                    frame,
                    paused,
                    video: workflow.get_output(TrackType::Video, paused),
                    audio: workflow.get_output(TrackType::Audio, paused),
                });
                summary.presented += 1;
                summary.last_frame = frame;
                if paused {
                    continue;
                }
                if workflow.render_one_frame()? {
                    summary.end_reached = true;
                    break;
                }
            }
        }
    }

    if state != PlaybackState::Stopped {
        workflow.stop();
        state_tx.send_replace(PlaybackState::Stopped);
    }
    tracing::info!(
        presented = summary.presented,
        end_reached = summary.end_reached,
        "playback finished"
    );
    Ok(summary)
}

fn apply(
    workflow: &Workflow,
    settings: &RenderSettings,
    state: PlaybackState,
    command: PlaybackCommand,
) -> Result<PlaybackState> {
    tracing::debug!(?command, ?state, "playback command");
    let next = match (command, state) {
        (PlaybackCommand::Play, PlaybackState::Stopped) => {
            workflow.start_render(settings.width, settings.height)?;
            PlaybackState::Rendering
        }
        (PlaybackCommand::Play, _) => PlaybackState::Rendering,
        (PlaybackCommand::Pause, PlaybackState::Rendering) => PlaybackState::Paused,
        (PlaybackCommand::Pause, other) => other,
        (PlaybackCommand::Stop, _) => {
            workflow.stop();
            PlaybackState::Stopped
        }
        (PlaybackCommand::Seek(frame), other) => {
            workflow.set_current_frame(frame, FrameChangedReason::PreviewCursor);
            other
        }
    };
    Ok(next)
}
