use std::time::SystemTime;

use indexmap::IndexMap;

use crate::state::game::{Game, ParticipantId, ParticipantRole};

/// What the ranker needs to know about a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankEntry {
    /// Ranked participant.
    pub participant_id: ParticipantId,
    /// Role held during the game.
    pub role: ParticipantRole,
    /// When a hider was found; `None` for evaders and the hunter.
    pub found_at: Option<SystemTime>,
}

/// Compute final ranks, keyed by participant in input order.
///
/// Hiders never found share rank 1. Found hiders follow by ascending `found_at`
/// starting at rank 2. The hunter is ranked 1 when every hider was found, otherwise
/// one below the worst hider.
pub fn rank(entries: &[RankEntry]) -> IndexMap<ParticipantId, u32> {
    let mut found: Vec<(SystemTime, usize)> = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.role == ParticipantRole::Hider)
        .filter_map(|(index, entry)| entry.found_at.map(|at| (at, index)))
        .collect();
    found.sort();

    let mut found_ranks = vec![None; entries.len()];
    for (position, (_, index)) in found.iter().enumerate() {
        found_ranks[*index] = Some(position as u32 + 2);
    }

    let any_evaded = entries
        .iter()
        .any(|entry| entry.role == ParticipantRole::Hider && entry.found_at.is_none());
    let worst_hider = if found.is_empty() {
        1
    } else {
        found.len() as u32 + 1
    };
    let hunter_rank = if any_evaded { worst_hider + 1 } else { 1 };

    entries
        .iter()
        .zip(found_ranks)
        .map(|(entry, found_rank)| {
            let rank = match entry.role {
                ParticipantRole::Hunter => hunter_rank,
                ParticipantRole::Hider => found_rank.unwrap_or(1),
            };
            (entry.participant_id, rank)
        })
        .collect()
}

/// Rank every participant of `game` in place. Participants without a role are skipped.
pub fn assign_ranks(game: &mut Game) {
    let entries: Vec<RankEntry> = game
        .participants
        .values()
        .filter_map(|participant| {
            participant.role.map(|role| RankEntry {
                participant_id: participant.id,
                role,
                found_at: participant.found_at,
            })
        })
        .collect();

    for (participant_id, rank) in rank(&entries) {
        if let Some(participant) = game.participants.get_mut(&participant_id) {
            participant.rank = Some(rank);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;
    use uuid::Uuid;

    use super::*;

    fn at(minutes_ago: u64) -> Option<SystemTime> {
        Some(SystemTime::UNIX_EPOCH + Duration::from_secs(3_600 - minutes_ago * 60))
    }

    fn entry(role: ParticipantRole, found_at: Option<SystemTime>) -> RankEntry {
        RankEntry {
            participant_id: Uuid::new_v4(),
            role,
            found_at,
        }
    }

    #[test]
    fn hunter_wins_when_every_hider_is_found() {
        let hunter = entry(ParticipantRole::Hunter, None);
        let early = entry(ParticipantRole::Hider, at(5));
        let late = entry(ParticipantRole::Hider, at(2));

        let ranks = rank(&[hunter, late, early]);

        assert_eq!(ranks[&hunter.participant_id], 1);
        assert_eq!(ranks[&early.participant_id], 2);
        assert_eq!(ranks[&late.participant_id], 3);
    }

    #[test]
    fn evaders_win_and_hunter_comes_last() {
        let hunter = entry(ParticipantRole::Hunter, None);
        let first = entry(ParticipantRole::Hider, None);
        let second = entry(ParticipantRole::Hider, None);

        let ranks = rank(&[hunter, first, second]);

        assert_eq!(ranks[&first.participant_id], 1);
        assert_eq!(ranks[&second.participant_id], 1);
        assert_eq!(ranks[&hunter.participant_id], 2);
    }

    #[test]
    fn mixed_outcome_places_hunter_below_found_hiders() {
        let hunter = entry(ParticipantRole::Hunter, None);
        let evader = entry(ParticipantRole::Hider, None);
        let caught = entry(ParticipantRole::Hider, at(3));

        let ranks = rank(&[evader, hunter, caught]);

        assert_eq!(ranks[&evader.participant_id], 1);
        assert_eq!(ranks[&caught.participant_id], 2);
        assert_eq!(ranks[&hunter.participant_id], 3);
        assert_eq!(
            ranks.keys().copied().collect::<Vec<_>>(),
            vec![
                evader.participant_id,
                hunter.participant_id,
                caught.participant_id
            ]
        );
    }

    fn hiders_strategy() -> impl Strategy<Value = Vec<Option<u64>>> {
        prop::collection::vec(prop::option::of(0u64..10_000), 1..5)
    }

    proptest! {
        #[test]
        fn ranks_follow_the_capture_order(found in hiders_strategy()) {
            let hunter = entry(ParticipantRole::Hunter, None);
            let hiders: Vec<RankEntry> = found
                .iter()
                .map(|offset| entry(
                    ParticipantRole::Hider,
                    offset.map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
                ))
                .collect();
            let mut entries = vec![hunter];
            entries.extend(hiders.iter().copied());

            let ranks = rank(&entries);

            let mut caught: Vec<&RankEntry> =
                hiders.iter().filter(|h| h.found_at.is_some()).collect();
            caught.sort_by_key(|h| h.found_at);

            for hider in hiders.iter().filter(|h| h.found_at.is_none()) {
                prop_assert_eq!(ranks[&hider.participant_id], 1);
            }

            let mut caught_ranks: Vec<u32> =
                caught.iter().map(|h| ranks[&h.participant_id]).collect();
            let expected: Vec<u32> = (2..caught.len() as u32 + 2).collect();
            let in_capture_order = caught_ranks.windows(2).all(|pair| pair[0] < pair[1])
                || caught.windows(2).any(|pair| pair[0].found_at == pair[1].found_at);
            prop_assert!(in_capture_order);
            caught_ranks.sort_unstable();
            prop_assert_eq!(caught_ranks, expected);

            let max_hider = hiders
                .iter()
                .map(|h| ranks[&h.participant_id])
                .max()
                .unwrap_or(0);
            let expected_hunter = if caught.len() == hiders.len() { 1 } else { max_hider + 1 };
            prop_assert_eq!(ranks[&hunter.participant_id], expected_hunter);
        }
    }
}
