//! Sample playback. Clips of a round are played strictly one after another, separated by a
//! fixed gap; a clip that fails is logged and skipped.

use std::{io, process::ExitStatus, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::{process::Command, sync::Notify};
use tracing::{debug, warn};

/// Errors raised while playing a clip.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The configured command line is empty.
    #[error("no audio command configured")]
    NoCommand,
    /// The player program could not be started or awaited.
    #[error("failed to launch `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    /// The player program reported a failure.
    #[error("player exited with {status} on `{clip}`")]
    Exit { clip: String, status: ExitStatus },
}

/// Something able to play one clip at a time.
pub trait AudioPlayer: Send + Sync {
    /// Play `clip` to the end.
    fn play(&self, clip: &str) -> BoxFuture<'static, Result<(), PlaybackError>>;

    /// Interrupt whatever is playing.
    fn stop(&self) -> BoxFuture<'static, Result<(), PlaybackError>>;
}

/// Outcome of [`play_sequence`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Clips played to the end.
    pub played: usize,
    /// Clips that failed and were skipped.
    pub skipped: Vec<String>,
}

/// Play `clips` in order with `gap` between consecutive clips.
pub async fn play_sequence(
    player: &dyn AudioPlayer,
    clips: &[String],
    gap: Duration,
) -> PlaybackReport {
    if let Err(err) = player.stop().await {
        debug!(error = %err, "nothing to stop before playback");
    }

    let mut report = PlaybackReport::default();
    for (index, clip) in clips.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(gap).await;
        }
        match player.play(clip).await {
            Ok(()) => report.played += 1,
            Err(err) => {
                warn!(clip, error = %err, "clip playback failed, skipping");
                report.skipped.push(clip.clone());
            }
        }
    }
    report
}

/// Plays clips through an external program, e.g. `mpv --no-video`, appending the clip URL
/// as the last argument.
#[derive(Clone)]
pub struct CommandPlayer {
    program: Arc<str>,
    args: Arc<[String]>,
    stop: Arc<Notify>,
}

impl CommandPlayer {
    /// Split `command_line` on whitespace into program and leading arguments.
    pub fn from_command_line(command_line: &str) -> Result<Self, PlaybackError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(PlaybackError::NoCommand)?;
        Ok(Self {
            program: Arc::from(program),
            args: parts.collect(),
            stop: Arc::new(Notify::new()),
        })
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&self, clip: &str) -> BoxFuture<'static, Result<(), PlaybackError>> {
        let program = self.program.clone();
        let args = self.args.clone();
        let stop = self.stop.clone();
        let clip = clip.to_string();

        Box::pin(async move {
            let mut child = Command::new(&*program)
                .args(args.iter())
                .arg(&clip)
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| PlaybackError::Spawn {
                    command: program.to_string(),
                    source,
                })?;

            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(|source| PlaybackError::Spawn {
                        command: program.to_string(),
                        source,
                    })?;
                    if status.success() {
                        Ok(())
                    } else {
                        Err(PlaybackError::Exit { clip, status })
                    }
                }
                _ = stop.notified() => {
                    debug!(clip, "playback interrupted");
                    // Already exited processes make kill fail; nothing left to stop.
                    let _ = child.kill().await;
                    Ok(())
                }
            }
        })
    }

    fn stop(&self) -> BoxFuture<'static, Result<(), PlaybackError>> {
        self.stop.notify_waiters();
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;

    #[derive(Default)]
    struct ScriptedPlayer {
        clip_length: Duration,
        broken: Vec<String>,
        log: Arc<Mutex<Vec<(String, Duration)>>>,
        stops: Arc<Mutex<u32>>,
        started: Option<Instant>,
    }

    impl AudioPlayer for ScriptedPlayer {
        fn play(&self, clip: &str) -> BoxFuture<'static, Result<(), PlaybackError>> {
            let clip = clip.to_string();
            let log = self.log.clone();
            let length = self.clip_length;
            let broken = self.broken.contains(&clip);
            let started = self.started.unwrap_or_else(Instant::now);
            Box::pin(async move {
                log.lock().unwrap().push((clip.clone(), started.elapsed()));
                if broken {
                    return Err(PlaybackError::NoCommand);
                }
                tokio::time::sleep(length).await;
                Ok(())
            })
        }

        fn stop(&self) -> BoxFuture<'static, Result<(), PlaybackError>> {
            *self.stops.lock().unwrap() += 1;
            Box::pin(async { Ok(()) })
        }
    }

    fn clips(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| format!("{id}.mp3")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn clips_are_serialized_with_fixed_gap() {
        let player = ScriptedPlayer {
            clip_length: Duration::from_millis(2_000),
            started: Some(Instant::now()),
            ..Default::default()
        };

        let queue = clips(&["c", "g", "am"]);
        let report = play_sequence(&player, &queue, Duration::from_secs(1)).await;
        assert_eq!(report.played, 3);
        assert!(report.skipped.is_empty());
        assert_eq!(*player.stops.lock().unwrap(), 1);

        let starts: Vec<u128> = player
            .log
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| at.as_millis())
            .collect();
        assert_eq!(starts, vec![0, 3_000, 6_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_clip_is_skipped() {
        let player = ScriptedPlayer {
            clip_length: Duration::from_millis(500),
            broken: vec!["g.mp3".into()],
            ..Default::default()
        };

        let queue = clips(&["c", "g", "am"]);
        let report = play_sequence(&player, &queue, Duration::from_secs(1)).await;
        assert_eq!(report.played, 2);
        assert_eq!(report.skipped, vec!["g.mp3".to_string()]);
        assert_eq!(player.log.lock().unwrap().len(), 3);
    }

    #[test]
    fn command_line_needs_a_program() {
        assert!(matches!(
            CommandPlayer::from_command_line("   "),
            Err(PlaybackError::NoCommand)
        ));
        let player = CommandPlayer::from_command_line("mpv --no-video --really-quiet").unwrap();
        assert_eq!(&*player.program, "mpv");
        assert_eq!(player.args.len(), 2);
    }
}
