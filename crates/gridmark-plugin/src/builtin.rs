#![forbid(unsafe_code)]

//! Built-in plugins.

use std::sync::atomic::{AtomicU64, Ordering};

use gridmark_core::key::{Key, KeyCode};

use crate::contract::{
    HostContext, InputResult, KeyResult, Plugin, PluginCategory, PluginMetadata, PluginOutput,
};
use crate::registry::PluginRegistry;

/// Register every built-in plugin.
pub fn register_all(registry: &mut PluginRegistry) {
    // Built-in metadata is static and valid.
    let _ = registry.register(NumberGuess::default());
}

/// Guess-the-number game.
///
/// Secrets come from a seeded mixer and a per-plugin round counter, so a
/// given seed always produces the same sequence of games.
#[derive(Debug)]
pub struct NumberGuess {
    max: u32,
    seed: u64,
    round: AtomicU64,
}

impl Default for NumberGuess {
    fn default() -> Self {
        Self::new(100, 0x9e37_79b9_7f4a_7c15)
    }
}

/// Session state for [`NumberGuess`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessState {
    secret: u32,
    low: u32,
    high: u32,
    attempts: u32,
    message: Option<String>,
}

impl NumberGuess {
    /// A game over `1..=max` (at least 1) with a fixed seed.
    #[must_use]
    pub fn new(max: u32, seed: u64) -> Self {
        Self {
            max: max.max(1),
            seed,
            round: AtomicU64::new(0),
        }
    }

    fn next_secret(&self) -> u32 {
        let round = self.round.fetch_add(1, Ordering::Relaxed);
        let mixed = splitmix64(self.seed.wrapping_add(round));
        (mixed % u64::from(self.max)) as u32 + 1
    }

    fn screen(state: &GuessState) -> PluginOutput {
        let mut out = PluginOutput::line("NUMBER GUESS");
        out.push(format!(
            "Guess a number between {} and {}.",
            state.low, state.high
        ));
        out.push(format!("Attempts: {}", state.attempts));
        if let Some(message) = &state.message {
            out.push(message.clone());
        }
        out.push("Type a number and press Enter. '?' for a hint, 'q' to quit.");
        out
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl Plugin for NumberGuess {
    type State = GuessState;

    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("number-guess", env!("CARGO_PKG_VERSION"))
            .with_description("Guess the hidden number in as few tries as possible.")
            .with_author("gridmark")
            .with_command("guess")
            .with_command("numberguess")
            .with_category(PluginCategory::Game)
    }

    fn init(&self, ctx: &HostContext) -> Result<GuessState, String> {
        if ctx.width < 20 || ctx.height < 5 {
            return Err(format!(
                "needs at least 20x5 cells, got {}x{}",
                ctx.width, ctx.height
            ));
        }
        Ok(GuessState {
            secret: self.next_secret(),
            low: 1,
            high: self.max,
            attempts: 0,
            message: None,
        })
    }

    fn handle_input(
        &self,
        input: &str,
        state: &GuessState,
        _ctx: &HostContext,
    ) -> InputResult<GuessState> {
        let input = input.trim();
        if matches!(input, "q" | "quit") {
            return InputResult::Exit {
                output: PluginOutput::line(format!("You gave up. The number was {}.", state.secret)),
            };
        }
        let Ok(guess) = input.parse::<u32>() else {
            return InputResult::Error(format!("not a number: '{input}'"));
        };
        if guess < 1 || guess > self.max {
            return InputResult::Error(format!("guess must be between 1 and {}", self.max));
        }

        let attempts = state.attempts + 1;
        if guess == state.secret {
            let tries = if attempts == 1 { "try" } else { "tries" };
            return InputResult::Exit {
                output: PluginOutput::line(format!("Correct! {guess} in {attempts} {tries}.")),
            };
        }

        let mut next = state.clone();
        next.attempts = attempts;
        if guess < state.secret {
            next.low = next.low.max(guess + 1);
            next.message = Some(format!("{guess} is too low."));
        } else {
            next.high = next.high.min(guess - 1);
            next.message = Some(format!("{guess} is too high."));
        }
        InputResult::Continue {
            output: Self::screen(&next),
            state: next,
        }
    }

    fn handle_key(&self, key: &Key, state: &GuessState, _ctx: &HostContext) -> KeyResult<GuessState> {
        if key.code != KeyCode::Char('?') {
            return KeyResult::Pass;
        }
        let parity = if state.secret % 2 == 0 { "even" } else { "odd" };
        let mut next = state.clone();
        next.message = Some(format!("Hint: the number is {parity}."));
        KeyResult::Handled {
            output: Self::screen(&next),
            state: next,
        }
    }

    fn render(&self, state: &GuessState, _ctx: &HostContext) -> PluginOutput {
        Self::screen(state)
    }

    fn cleanup(&self, _state: GuessState) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(game: &NumberGuess) -> GuessState {
        Plugin::init(game, &HostContext::default()).unwrap()
    }

    #[test]
    fn same_seed_same_games() {
        let a = NumberGuess::new(100, 7);
        let b = NumberGuess::new(100, 7);
        let secrets_a: Vec<u32> = (0..5).map(|_| start(&a).secret).collect();
        let secrets_b: Vec<u32> = (0..5).map(|_| start(&b).secret).collect();
        assert_eq!(secrets_a, secrets_b);
        assert!(secrets_a.iter().all(|s| (1..=100).contains(s)));
    }

    #[test]
    fn single_value_range() {
        let game = NumberGuess::new(0, 1);
        let state = start(&game);
        assert_eq!(state.secret, 1);
        let result = Plugin::handle_input(&game, "1", &state, &HostContext::default());
        assert_eq!(
            result,
            InputResult::Exit {
                output: PluginOutput::line("Correct! 1 in 1 try.")
            }
        );
    }

    #[test]
    fn too_low_and_too_high_narrow_range() {
        let game = NumberGuess::default();
        let ctx = HostContext::default();
        let state = GuessState {
            secret: 42,
            low: 1,
            high: 100,
            attempts: 0,
            message: None,
        };
        let InputResult::Continue { state, .. } = Plugin::handle_input(&game, "10", &state, &ctx)
        else {
            panic!("expected continue");
        };
        assert_eq!((state.low, state.high, state.attempts), (11, 100, 1));
        assert_eq!(state.message.as_deref(), Some("10 is too low."));

        let InputResult::Continue { state, output } =
            Plugin::handle_input(&game, " 50 ", &state, &ctx)
        else {
            panic!("expected continue");
        };
        assert_eq!((state.low, state.high), (11, 49));
        assert_eq!(output.lines[1], "Guess a number between 11 and 49.");

        let result = Plugin::handle_input(&game, "42", &state, &ctx);
        assert_eq!(
            result,
            InputResult::Exit {
                output: PluginOutput::line("Correct! 42 in 3 tries.")
            }
        );
    }

    #[test]
    fn bad_input_is_an_error() {
        let game = NumberGuess::default();
        let ctx = HostContext::default();
        let state = start(&game);
        assert_eq!(
            Plugin::handle_input(&game, "abc", &state, &ctx),
            InputResult::Error("not a number: 'abc'".into())
        );
        assert_eq!(
            Plugin::handle_input(&game, "0", &state, &ctx),
            InputResult::Error("guess must be between 1 and 100".into())
        );
    }

    #[test]
    fn quit_reveals_secret() {
        let game = NumberGuess::default();
        let ctx = HostContext::default();
        let mut state = start(&game);
        state.secret = 9;
        assert_eq!(
            Plugin::handle_input(&game, "q", &state, &ctx),
            InputResult::Exit {
                output: PluginOutput::line("You gave up. The number was 9.")
            }
        );
    }

    #[test]
    fn hint_key() {
        let game = NumberGuess::default();
        let ctx = HostContext::default();
        let mut state = start(&game);
        state.secret = 8;
        let KeyResult::Handled { state, .. } =
            Plugin::handle_key(&game, &Key::char('?'), &state, &ctx)
        else {
            panic!("expected handled");
        };
        assert_eq!(state.message.as_deref(), Some("Hint: the number is even."));
        assert_eq!(
            Plugin::handle_key(&game, &Key::char('5'), &state, &ctx),
            KeyResult::Pass
        );
    }

    #[test]
    fn tiny_screen_refuses_to_start() {
        let game = NumberGuess::default();
        assert_eq!(
            Plugin::init(&game, &HostContext::new(10, 3)),
            Err("needs at least 20x5 cells, got 10x3".into())
        );
    }

    #[test]
    fn builtins_register() {
        let mut registry = PluginRegistry::new();
        register_all(&mut registry);
        assert!(registry.contains("number-guess"));
        assert_eq!(
            registry.find_by_command("guess").map(|e| e.metadata.name.as_str()),
            Some("number-guess")
        );
    }
}
