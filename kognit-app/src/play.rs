//! Terminal front-end for both games.
//!
//! Game text goes to stdout; diagnostics go through `tracing`.

use anyhow::Result;
use kognit_core::{InkColor, MemoryTrial, Phase, SessionRecord, StroopTrial};
use kognit_experiment::{
    MemoryChainConfig, MemoryChainSession, RevealPlayback, StroopConfig, StroopEvent, StroopSession,
};
use kognit_timing::{HighPrecisionTimer, Timer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until};
use tracing::debug;

type InputLines = Lines<BufReader<Stdin>>;

fn input_lines() -> InputLines {
    BufReader::new(tokio::io::stdin()).lines()
}

fn painted(word: &str, ink: InkColor) -> String {
    let [r, g, b, _] = ink.rgba();
    format!("\x1b[1;38;2;{r};{g};{b}m{word}\x1b[0m")
}

/// Player input during a Stroop trial
#[derive(Debug, Clone, PartialEq)]
pub enum StroopInput {
    Answer(InkColor),
    Continue,
    Quit,
    Unknown,
}

/// Reads a colour token or a 1-based option number. An empty line continues.
pub fn parse_stroop_input(line: &str, options: &[InkColor]) -> StroopInput {
    let line = line.trim();
    if line.is_empty() {
        return StroopInput::Continue;
    }
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return StroopInput::Quit;
    }
    if let Ok(n) = line.parse::<usize>() {
        return match n.checked_sub(1).and_then(|i| options.get(i)) {
            Some(color) => StroopInput::Answer(*color),
            None => StroopInput::Unknown,
        };
    }
    line.parse::<InkColor>()
        .map(StroopInput::Answer)
        .unwrap_or(StroopInput::Unknown)
}

fn show_prompt<T, R>(session: &StroopSession<T, R>)
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    let Some(prompt) = session.current_prompt() else {
        return;
    };
    println!();
    println!(
        "[{:>2}s] batch {} trial {}   {}",
        session.time_remaining_secs(),
        session.batch_index(),
        session.trial_in_batch(),
        painted(prompt.stimulus.word.name(), prompt.stimulus.ink),
    );
    let options: Vec<String> = prompt
        .options
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}) {}", i + 1, c))
        .collect();
    println!("  {}", options.join("  "));
}

pub async fn play_stroop(config: StroopConfig) -> Result<SessionRecord<StroopTrial>> {
    let feedback_delay = Duration::from_millis(config.feedback_ms);
    let mut session = StroopSession::new(config, HighPrecisionTimer::new(), StdRng::from_os_rng());
    let mut lines = input_lines();

    println!("Name the INK colour, not the word. Type a colour or its number, q to quit.");
    println!("Press Enter to start.");
    if lines.next_line().await?.is_none() {
        return Ok(session.into_record());
    }

    session.handle_event(StroopEvent::Start);
    show_prompt(&session);

    let mut clock = interval(Duration::from_secs(1));
    clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
    clock.tick().await;
    let mut feedback_due: Option<(Instant, usize)> = None;

    while !session.is_complete() {
        let due = feedback_due;
        tokio::select! {
            _ = clock.tick() => {
                session.handle_event(StroopEvent::Tick);
            }
            _ = async move {
                match due {
                    Some((at, _)) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                if let Some((_, trial)) = feedback_due.take() {
                    if session.handle_event(StroopEvent::FeedbackElapsed { trial }) {
                        show_prompt(&session);
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let options = session
                    .current_prompt()
                    .map(|p| p.options.clone())
                    .unwrap_or_default();
                match parse_stroop_input(&line, &options) {
                    StroopInput::Answer(color) => {
                        if session.handle_event(StroopEvent::Answer(color)) {
                            if let Some(fb) = session.feedback() {
                                let verdict = if fb.correct { "correct" } else { "wrong" };
                                println!("  {verdict}  score {}  streak {}", fb.score, fb.streak);
                                feedback_due = Some((Instant::now() + feedback_delay, fb.trial));
                            }
                        }
                    }
                    StroopInput::Continue => {
                        if session.handle_event(StroopEvent::Continue) {
                            feedback_due = None;
                            show_prompt(&session);
                        }
                    }
                    StroopInput::Quit => break,
                    StroopInput::Unknown => println!("  unknown colour"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.teardown();
    println!("\nSession over.");
    Ok(session.into_record())
}

/// Plays the reveal with tokio timers. Ctrl-C cancels the playback, which
/// the session then ignores.
async fn reveal<T, R>(session: &mut MemoryChainSession<T, R>, playback: &RevealPlayback) -> bool
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    for (index, step) in playback.steps().iter().enumerate() {
        if !session.apply_reveal_step(playback, index) {
            return false;
        }
        match session.visible_digit() {
            Some(digit) => print!("\r   {digit}   "),
            None => print!("\r       "),
        }
        let _ = std::io::stdout().flush();
        tokio::select! {
            _ = tokio::time::sleep(step.duration()) => {}
            _ = tokio::signal::ctrl_c() => {
                debug!("reveal cancelled");
                playback.cancel();
            }
        }
    }
    print!("\r       \r");
    session.finish_reveal(playback)
}

/// Parses every decimal digit on the line, ignoring anything else.
pub fn parse_digits(line: &str) -> Vec<u8> {
    line.chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .collect()
}

pub async fn play_memory(config: MemoryChainConfig) -> Result<SessionRecord<MemoryTrial>> {
    let mut session =
        MemoryChainSession::new(config, HighPrecisionTimer::new(), StdRng::from_os_rng());
    let mut lines = input_lines();

    println!("Watch the digits, then type them back. q ends the game.");
    println!("Press Enter to start.");
    if lines.next_line().await?.is_none() {
        return Ok(session.into_record());
    }

    let mut playback = session.start();
    while let Some(current) = playback.take() {
        println!(
            "\nRound {}/{}  level {}",
            session.round(),
            session.config.total_rounds,
            session.level()
        );
        if !reveal(&mut session, &current).await {
            session.end();
            break;
        }

        println!("Your sequence ({} digits):", session.sequence().len());
        while session.phase().allows_input() {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                session.end();
                break;
            };
            if line.trim().eq_ignore_ascii_case("q") {
                session.end();
                break;
            }
            for digit in parse_digits(&line) {
                session.enter_digit(digit);
            }
        }
        if session.is_complete() {
            break;
        }

        let shown: Vec<String> = session.sequence().digits().iter().map(u8::to_string).collect();
        println!(
            "  {:.0}% (was {})  next level {}",
            session.last_accuracy().unwrap_or(0.0),
            shown.join(" "),
            session.next_level()
        );
        println!("Enter for the next round, q to stop.");
        match lines.next_line().await? {
            Some(line) if !line.trim().eq_ignore_ascii_case("q") => {
                playback = session.next_round();
            }
            _ => {
                session.end();
            }
        }
    }

    if !session.is_complete() {
        session.end();
    }
    Ok(session.into_record())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroop_input_forms() {
        let options = [InkColor::Green, InkColor::Red, InkColor::Blue];
        assert_eq!(parse_stroop_input("2", &options), StroopInput::Answer(InkColor::Red));
        assert_eq!(parse_stroop_input(" blue ", &options), StroopInput::Answer(InkColor::Blue));
        assert_eq!(parse_stroop_input("", &options), StroopInput::Continue);
        assert_eq!(parse_stroop_input("Q", &options), StroopInput::Quit);
        assert_eq!(parse_stroop_input("9", &options), StroopInput::Unknown);
        assert_eq!(parse_stroop_input("0", &options), StroopInput::Unknown);
        assert_eq!(parse_stroop_input("teal", &options), StroopInput::Unknown);
    }

    #[test]
    fn digits_ignore_separators() {
        assert_eq!(parse_digits("3 1-4x1"), vec![3, 1, 4, 1]);
        assert!(parse_digits("abc").is_empty());
    }
}
