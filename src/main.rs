//! Chord trainer terminal entrypoint: plays regular rounds against the configured backend.

use std::sync::Arc;

use anyhow::Context;
use chord_trainer::{
    config::AppConfig,
    dao::{backend::ApiClient, file_store::FileStore},
    services::{
        auth_service, game_service,
        playback::{self, CommandPlayer},
    },
    state::{
        AppState, SharedState,
        game::{GameResult, GameRound, Level},
    },
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = FileStore::open(config.data_dir.clone())
        .await
        .context("opening local store")?;
    let api = ApiClient::new(config.backend()).context("building backend client")?;
    let state = AppState::new(
        Arc::new(api.clone()),
        Arc::new(store),
        config.game_settings(),
    );

    match auth_service::restore_session(&state, &api).await {
        Ok(Some(user)) => println!("Signed in as {}", user.username.unwrap_or(user.email)),
        Ok(None) => println!("Playing as guest"),
        Err(err) => warn!(error = %err, "failed to restore session; playing as guest"),
    }

    let player = match config.audio_command.as_deref().map(CommandPlayer::from_command_line) {
        Some(Ok(player)) => Some(player),
        Some(Err(err)) => {
            warn!(error = %err, "audio disabled");
            None
        }
        None => None,
    };

    if let Err(err) = game_service::load_stats(&state).await {
        warn!(error = %err, "failed to load stats");
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        result = run(&state, player.as_ref(), &config, &mut input) => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    game_service::leave(&state).await;
    Ok(())
}

/// Round loop. Returns when the player quits or stdin closes.
async fn run(
    state: &SharedState,
    player: Option<&CommandPlayer>,
    config: &AppConfig,
    input: &mut Input,
) -> anyhow::Result<()> {
    let mut level = state.regular().read().await.current_level();

    loop {
        let round = match game_service::start_game(state, level).await {
            Ok(round) => round,
            Err(err) => {
                println!("Could not start a round: {err}");
                if state.regular().read().await.subscription_modal() {
                    println!("Level {level} needs a subscription.");
                    game_service::dismiss_subscription_modal(state).await;
                }
                game_service::clear_error(state).await;
                level = state.regular().read().await.current_level();
                println!("[enter] retry at level {level}, [q] quit");
                match input.next_line().await? {
                    Some(line) if line.trim() == "q" => return Ok(()),
                    Some(_) => continue,
                    None => return Ok(()),
                }
            }
        };

        if let Some(player) = player {
            let report =
                playback::play_sequence(player, &round.target_audio, config.playback_gap()).await;
            if !report.skipped.is_empty() {
                println!("({} clip(s) could not be played)", report.skipped.len());
            }
        }
        print_round(&round);

        loop {
            let Some(line) = input.next_line().await? else {
                return Ok(());
            };
            let line = line.trim();

            if line == "q" {
                return Ok(());
            }
            if let Some(value) = line.strip_prefix("level ") {
                match value.trim().parse::<u8>().map(Level::new) {
                    Ok(Ok(next)) => {
                        level = next;
                        break;
                    }
                    _ => {
                        println!("Levels go from 1 to 4");
                        continue;
                    }
                }
            }

            let Some(option) = line
                .parse::<usize>()
                .ok()
                .and_then(|index| index.checked_sub(1))
                .and_then(|index| round.options.get(index))
            else {
                println!("Pick a number between 1 and {}", round.options.len());
                continue;
            };

            match game_service::submit_answer(state, &option.id).await {
                Ok(result) => {
                    print_result(&result);
                    print_stats(state).await;
                }
                Err(err) => {
                    println!("Could not submit: {err}");
                    game_service::clear_error(state).await;
                    continue;
                }
            }
            break;
        }
    }
}

fn print_round(round: &GameRound) {
    println!();
    println!("Level {}: which chord is this?", round.level);
    for (index, option) in round.options.iter().enumerate() {
        println!("  {}. {}", index + 1, option.name);
    }
    println!("[number] answer, [level N] change level, [q] quit");
}

fn print_result(result: &GameResult) {
    if result.is_correct {
        println!("Correct! ({} ms)", result.response_time_ms);
    } else {
        println!("Wrong, it was {}.", result.correct_chord.name);
    }
}

async fn print_stats(state: &SharedState) {
    if let Some(stats) = state.regular().read().await.stats() {
        println!(
            "streak {} | accuracy {}% | {}/{} correct",
            stats.streak, stats.accuracy, stats.correct_answers, stats.total_attempts
        );
    }
}

/// Configure tracing subscribers, logging to stderr so prompts stay readable.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,chord_trainer=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
