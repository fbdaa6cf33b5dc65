use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
    config::GameConfig,
    state::{
        SharedState,
        game::{GameId, UserId},
    },
};

/// Games finished by the user.
pub const GAMES_PLAYED: &str = "gamesPlayed";
/// Games finished at rank 1.
pub const WINS: &str = "wins";
/// Accumulated points.
pub const POINTS: &str = "points";

/// Final placement of one user in a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameResult {
    /// User the participant belonged to before detaching.
    pub user_id: UserId,
    /// Final rank, 1 is a win.
    pub rank: u32,
}

fn read_counter(stats: &HashMap<String, String>, key: &str) -> u64 {
    let Some(raw) = stats.get(key) else {
        return 0;
    };
    match raw.trim().parse::<u64>() {
        Ok(value) => value,
        Err(err) => {
            warn!(key, value = %raw, error = %err, "unparsable stat value; counting from 0");
            0
        }
    }
}

fn add_to_counter(stats: &mut HashMap<String, String>, key: &str, amount: u64) {
    let next = read_counter(stats, key).saturating_add(amount);
    stats.insert(key.to_owned(), next.to_string());
}

/// Fold one finished game into a user's string stats.
pub fn apply_result(stats: &mut HashMap<String, String>, rank: u32, config: &GameConfig) {
    add_to_counter(stats, GAMES_PLAYED, 1);
    if rank == 1 {
        add_to_counter(stats, WINS, 1);
        add_to_counter(stats, POINTS, config.points_for_win);
    } else {
        stats.entry(WINS.to_owned()).or_insert_with(|| "0".to_owned());
        add_to_counter(stats, POINTS, config.points_for_participation);
    }
}

/// Write the results of a finished game to the user registry.
///
/// Failures are logged per user and never abort the remaining updates. Returns the number
/// of users updated.
pub async fn record_results(
    state: &SharedState,
    game_id: GameId,
    results: &[GameResult],
) -> usize {
    let mut updated = 0;

    for result in results {
        let mut user = match state.users().find_user(result.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(
                    game_id = %game_id,
                    user_id = %result.user_id,
                    "user vanished before stats update"
                );
                continue;
            }
            Err(err) => {
                warn!(
                    game_id = %game_id,
                    user_id = %result.user_id,
                    error = %err,
                    "failed to load user for stats update"
                );
                continue;
            }
        };

        apply_result(&mut user.stats, result.rank, state.config());

        if let Err(err) = state.users().save_user(user).await {
            warn!(
                game_id = %game_id,
                user_id = %result.user_id,
                error = %err,
                "failed to save user stats"
            );
            continue;
        }

        debug!(
            game_id = %game_id,
            user_id = %result.user_id,
            rank = result.rank,
            "user stats updated"
        );
        updated += 1;
    }

    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn winner_gets_a_win_and_ten_points() {
        let mut stats = stats(&[(WINS, "2"), (GAMES_PLAYED, "5"), (POINTS, "50")]);

        apply_result(&mut stats, 1, &GameConfig::default());

        assert_eq!(stats[WINS], "3");
        assert_eq!(stats[GAMES_PLAYED], "6");
        assert_eq!(stats[POINTS], "60");
    }

    #[test]
    fn other_ranks_get_participation_points() {
        let mut stats = stats(&[(WINS, "2"), (GAMES_PLAYED, "5"), (POINTS, "50")]);

        apply_result(&mut stats, 3, &GameConfig::default());

        assert_eq!(stats[WINS], "2");
        assert_eq!(stats[GAMES_PLAYED], "6");
        assert_eq!(stats[POINTS], "55");
    }

    #[test]
    fn missing_and_garbage_values_count_as_zero() {
        let mut stats = stats(&[(POINTS, "lots"), ("favouriteColour", "blue")]);

        apply_result(&mut stats, 1, &GameConfig::default());

        assert_eq!(stats[GAMES_PLAYED], "1");
        assert_eq!(stats[WINS], "1");
        assert_eq!(stats[POINTS], "10");
        assert_eq!(stats["favouriteColour"], "blue");
    }

    #[test]
    fn losing_leaves_an_existing_win_count_untouched() {
        let mut garbage = stats(&[(WINS, "n/a")]);
        apply_result(&mut garbage, 2, &GameConfig::default());
        assert_eq!(garbage[WINS], "n/a");

        let mut fresh = HashMap::new();
        apply_result(&mut fresh, 2, &GameConfig::default());
        assert_eq!(fresh[WINS], "0");
        assert_eq!(fresh[POINTS], "5");
    }
}
