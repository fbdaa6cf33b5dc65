use rand::{Rng, seq::SliceRandom};

use crate::state::game::{Game, ParticipantId, ParticipantRole, ParticipantState};

/// Pick one hunter uniformly at random and make everybody else a hider.
///
/// The arena is re-centred on the hunter and sized to `radius_per_participant` per player.
/// Participants keep their join order. Returns the hunter, or `None` for an empty game.
pub fn assign_roles(game: &mut Game, radius_per_participant: f64) -> Option<ParticipantId> {
    assign_roles_with(game, radius_per_participant, &mut rand::rng())
}

/// [`assign_roles`] with a caller-provided random source.
pub fn assign_roles_with<R: Rng + ?Sized>(
    game: &mut Game,
    radius_per_participant: f64,
    rng: &mut R,
) -> Option<ParticipantId> {
    let mut order: Vec<ParticipantId> = game.participants.keys().copied().collect();
    order.shuffle(rng);
    let (&hunter_id, _) = order.split_first()?;

    for participant in game.participants.values_mut() {
        if participant.id == hunter_id {
            participant.role = Some(ParticipantRole::Hunter);
            participant.state = ParticipantState::Hunting;
        } else {
            participant.role = Some(ParticipantRole::Hider);
            participant.state = ParticipantState::Hiding;
        }
        participant.out_of_area = false;
    }

    game.centre = game.participants.get(&hunter_id).map(|hunter| hunter.position);
    game.radius_meters = Some(radius_per_participant * game.participants.len() as f64);

    Some(hunter_id)
}
