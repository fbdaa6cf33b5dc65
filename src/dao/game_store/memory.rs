use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    dao::{
        game_store::{GameStore, ParticipantStore},
        models::{GameEntity, ParticipantEntity},
        storage::{StorageError, StorageResult, UniqueConstraint},
    },
    geo::GeoPoint,
    state::state_machine::GameStatus,
};

/// In-memory [`GameStore`] and [`ParticipantStore`] laid out as two tables plus the
/// partial unique indexes over non-finished games.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
struct GameRow {
    id: Uuid,
    name: String,
    status: GameStatus,
    centre: Option<GeoPoint>,
    radius_meters: Option<f64>,
    preparation_seconds: u32,
    game_seconds: u32,
    creator_participant_id: Uuid,
    phase_started_at: Option<SystemTime>,
    created_at: SystemTime,
    updated_at: SystemTime,
    version: u64,
    participant_ids: Vec<Uuid>,
}

impl GameRow {
    fn is_active(&self) -> bool {
        self.status != GameStatus::Finished
    }
}

#[derive(Default)]
struct Tables {
    games: HashMap<Uuid, GameRow>,
    participants: HashMap<Uuid, ParticipantEntity>,
    /// name -> game id, non-finished games only.
    active_names: HashMap<String, Uuid>,
    /// user id -> participant id, non-finished games only.
    active_users: HashMap<Uuid, Uuid>,
}

fn split(game: GameEntity) -> (GameRow, Vec<ParticipantEntity>) {
    let row = GameRow {
        id: game.id,
        name: game.name,
        status: game.status,
        centre: game.centre,
        radius_meters: game.radius_meters,
        preparation_seconds: game.preparation_seconds,
        game_seconds: game.game_seconds,
        creator_participant_id: game.creator_participant_id,
        phase_started_at: game.phase_started_at,
        created_at: game.created_at,
        updated_at: game.updated_at,
        version: game.version,
        participant_ids: game.participants.iter().map(|p| p.id).collect(),
    };
    (row, game.participants)
}

impl Tables {
    fn save(&mut self, game: GameEntity) -> StorageResult<()> {
        let (row, participants) = split(game);

        if let Some(stored) = self.games.get(&row.id) {
            if row.version != stored.version + 1 {
                return Err(StorageError::conflict(
                    UniqueConstraint::GameVersion,
                    format!("{} v{}", row.id, row.version),
                ));
            }
        }

        if row.is_active() {
            if let Some(owner) = self.active_names.get(&row.name) {
                if *owner != row.id {
                    return Err(StorageError::conflict(
                        UniqueConstraint::ActiveGameName,
                        row.name.clone(),
                    ));
                }
            }
        }

        let mut seen_users = HashSet::new();
        for participant in &participants {
            if participant.game_id != row.id {
                return Err(StorageError::corrupted(format!(
                    "participant {} does not belong to game {}",
                    participant.id, row.id
                )));
            }
            if let Some(existing) = self.participants.get(&participant.id) {
                if existing.game_id != row.id {
                    return Err(StorageError::corrupted(format!(
                        "participant {} already belongs to game {}",
                        participant.id, existing.game_id
                    )));
                }
            }
            if !row.is_active() {
                continue;
            }
            let Some(user_id) = participant.user_id else {
                continue;
            };
            if !seen_users.insert(user_id) {
                return Err(StorageError::conflict(
                    UniqueConstraint::ActiveParticipantUser,
                    user_id.to_string(),
                ));
            }
            let owner_game = self
                .active_users
                .get(&user_id)
                .and_then(|pid| self.participants.get(pid))
                .map(|p| p.game_id);
            if owner_game.is_some_and(|game_id| game_id != row.id) {
                return Err(StorageError::conflict(
                    UniqueConstraint::ActiveParticipantUser,
                    user_id.to_string(),
                ));
            }
        }

        self.unindex(row.id);
        if let Some(previous) = self.games.get(&row.id) {
            for pid in &previous.participant_ids {
                if !row.participant_ids.contains(pid) {
                    self.participants.remove(pid);
                }
            }
        }

        if row.is_active() {
            self.active_names.insert(row.name.clone(), row.id);
            for participant in &participants {
                if let Some(user_id) = participant.user_id {
                    self.active_users.insert(user_id, participant.id);
                }
            }
        }
        for participant in participants {
            self.participants.insert(participant.id, participant);
        }
        self.games.insert(row.id, row);

        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> bool {
        self.unindex(id);
        let Some(row) = self.games.remove(&id) else {
            return false;
        };
        for pid in &row.participant_ids {
            self.participants.remove(pid);
        }
        true
    }

    /// Drop the index entries currently pointing at `game_id`.
    fn unindex(&mut self, game_id: Uuid) {
        let Some(row) = self.games.get(&game_id) else {
            return;
        };
        if self.active_names.get(&row.name) == Some(&game_id) {
            self.active_names.remove(&row.name);
        }
        for pid in &row.participant_ids {
            let Some(user_id) = self.participants.get(pid).and_then(|p| p.user_id) else {
                continue;
            };
            if self.active_users.get(&user_id) == Some(pid) {
                self.active_users.remove(&user_id);
            }
        }
    }

    fn assemble(&self, row: &GameRow) -> StorageResult<GameEntity> {
        let participants = row
            .participant_ids
            .iter()
            .map(|pid| {
                self.participants.get(pid).cloned().ok_or_else(|| {
                    StorageError::corrupted(format!(
                        "participant {pid} of game {} is missing",
                        row.id
                    ))
                })
            })
            .collect::<StorageResult<Vec<_>>>()?;

        if participants.is_empty() {
            return Err(StorageError::corrupted(format!(
                "game {} has no participants",
                row.id
            )));
        }
        let creators = participants
            .iter()
            .filter(|p| p.id == row.creator_participant_id)
            .count();
        if creators != 1 {
            return Err(StorageError::corrupted(format!(
                "game {} has {creators} creator participants",
                row.id
            )));
        }

        Ok(GameEntity {
            id: row.id,
            name: row.name.clone(),
            status: row.status,
            centre: row.centre,
            radius_meters: row.radius_meters,
            preparation_seconds: row.preparation_seconds,
            game_seconds: row.game_seconds,
            creator_participant_id: row.creator_participant_id,
            phase_started_at: row.phase_started_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
            participants,
        })
    }

    fn select(&self, predicate: impl Fn(&GameRow) -> bool) -> StorageResult<Vec<GameEntity>> {
        let mut rows: Vec<&GameRow> = self.games.values().filter(|row| predicate(row)).collect();
        rows.sort_by_key(|row| (row.created_at, row.id));
        rows.into_iter().map(|row| self.assemble(row)).collect()
    }
}

impl GameStore for MemoryGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move { tables.write().await.save(game) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let tables = tables.read().await;
            tables
                .games
                .get(&id)
                .map(|row| tables.assemble(row))
                .transpose()
        })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.write().await.delete(id)) })
    }

    fn find_games_by_status(
        &self,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { tables.read().await.select(|row| row.status == status) })
    }

    fn find_games_where_status_not(
        &self,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { tables.read().await.select(|row| row.status != status) })
    }

    fn find_active_game_by_name(
        &self,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let tables = tables.read().await;
            tables
                .active_names
                .get(&name)
                .and_then(|id| tables.games.get(id))
                .map(|row| tables.assemble(row))
                .transpose()
        })
    }
}

impl ParticipantStore for MemoryGameStore {
    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.participants.get(&id).cloned()) })
    }

    fn find_participant_by_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let tables = tables.read().await;
            Ok(tables
                .active_users
                .get(&user_id)
                .and_then(|pid| tables.participants.get(pid))
                .cloned())
        })
    }

    fn find_participants_by_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let tables = tables.read().await;
            Ok(tables
                .games
                .get(&game_id)
                .map(|row| {
                    row.participant_ids
                        .iter()
                        .filter_map(|pid| tables.participants.get(pid).cloned())
                        .collect()
                })
                .unwrap_or_default())
        })
    }
}
