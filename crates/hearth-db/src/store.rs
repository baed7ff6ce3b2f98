//! The single-writer store: load, per-tick commit, snapshots.
//!
//! Every database mutation is derived from an event by the total match in
//! [`apply_event`] -- there are no out-of-band writes, which is what makes
//! the audit log's replay equivalence hold by construction. All events of
//! one tick commit in one transaction together with the tick counter and
//! the sequence cursor; the log frames are written inside the same
//! envelope, so a failure anywhere rolls the whole tick back.

use std::path::{Path, PathBuf};

use hearth_types::{
    Agent, AgentName, Direction, Event, EventKind, Item, Journey, Position, ResourceKind,
};
use hearth_agents::{Roster, SimState};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::event_log::EventLog;
use crate::load;
use crate::sqlite;

/// The authoritative store for one world directory.
///
/// Owns the writer pool and the audit log. There is exactly one `Store`
/// per world; observer queries go through [`crate::ReadStore`] instead.
pub struct Store {
    pool: SqlitePool,
    log: EventLog,
    dir: PathBuf,
}

impl Store {
    /// Open the store under `dir`, running migrations, checking the schema
    /// version, and repairing the audit log tail against the committed
    /// tick.
    pub async fn open(dir: &Path) -> Result<Self, DbError> {
        std::fs::create_dir_all(dir)?;
        let pool = sqlite::open_writer(dir).await?;
        let committed = load::load_meta(&pool).await?.map_or(0, |m| m.tick);
        let log = EventLog::open(dir.join("events.jsonl"), committed)?;
        Ok(Self {
            pool,
            log,
            dir: dir.to_path_buf(),
        })
    }

    /// The world directory this store lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the world has been initialised.
    pub async fn is_initialised(&self) -> Result<bool, DbError> {
        Ok(load::load_meta(&self.pool).await?.is_some())
    }

    /// Write a freshly generated world (terrain, roster, meta) into an
    /// empty database. Used by `init` only.
    pub async fn init_world(&self, state: &SimState) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO world_state (id, tick, width, height, weather, last_seq)
             VALUES (1, ?1, ?2, ?3, ?4, 0)",
        )
        .bind(to_i64(state.meta.tick))
        .bind(i64::from(state.meta.width))
        .bind(i64::from(state.meta.height))
        .bind(load::enum_to_str(&state.meta.weather)?)
        .execute(&mut *tx)
        .await?;

        for (pos, cell) in state.grid.stored_cells() {
            sqlx::query(
                "INSERT INTO cells (x, y, terrain, walls, doors) VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(i64::from(pos.x))
            .bind(i64::from(pos.y))
            .bind(load::enum_to_str(&cell.terrain)?)
            .bind(serde_json::to_string(&cell.walls)?)
            .bind(serde_json::to_string(&cell.doors)?)
            .execute(&mut *tx)
            .await?;
        }

        for agent in state.roster.agents().values() {
            insert_agent(&mut tx, agent).await?;
        }

        tx.commit().await?;
        info!(agents = state.roster.len(), "world initialised");
        Ok(())
    }

    /// Reconstruct the full in-memory state from the database alone.
    pub async fn load(&self) -> Result<SimState, DbError> {
        let meta = load::load_meta(&self.pool)
            .await?
            .ok_or(DbError::CorruptRow {
                table: "world_state",
                detail: String::from("world not initialised; run init first"),
            })?;
        let grid = load::load_grid(&self.pool, &meta).await?;
        let roster = Roster::from_agents(load::load_agents(&self.pool).await?);
        let social = load::load_social(&self.pool).await?;
        Ok(SimState::new(meta, grid, roster, social))
    }

    /// Commit one tick: stamp sequence numbers onto `kinds`, apply every
    /// event to the database, advance the tick counter, and append the
    /// frames to the audit log -- all or nothing. Returns the stamped
    /// events.
    pub async fn commit_tick(
        &mut self,
        tick: u64,
        kinds: Vec<EventKind>,
    ) -> Result<Vec<Event>, DbError> {
        let last_seq = load::load_last_seq(&self.pool).await?;
        let events: Vec<Event> = kinds
            .into_iter()
            .enumerate()
            .map(|(offset, kind)| Event {
                seq: last_seq
                    .saturating_add(1)
                    .saturating_add(u64::try_from(offset).unwrap_or(u64::MAX)),
                tick,
                kind,
            })
            .collect();
        let new_seq = events.last().map_or(last_seq, |e| e.seq);

        let mut tx = self.pool.begin().await?;
        for event in &events {
            apply_event(&mut tx, event).await?;
        }
        sqlx::query("UPDATE world_state SET tick = ?1, last_seq = ?2 WHERE id = 1")
            .bind(to_i64(tick))
            .bind(to_i64(new_seq))
            .execute(&mut *tx)
            .await?;

        // Frames go to disk before the transaction lands; a crash between
        // the two leaves frames the reopen scan will truncate (their tick
        // exceeds the committed one).
        if let Err(err) = self.log.append(&events) {
            warn!(%err, tick, "audit log append failed; rolling the tick back");
            drop(tx);
            return Err(err);
        }

        tx.commit().await?;
        debug!(tick, events = events.len(), "tick committed");
        Ok(events)
    }

    /// Write a self-contained snapshot copy of the database keyed by tick
    /// and prune old ones beyond `retain`.
    pub async fn snapshot(&self, tick: u64, retain: usize) -> Result<PathBuf, DbError> {
        let snapshots = self.dir.join("snapshots");
        std::fs::create_dir_all(&snapshots)?;
        let path = snapshots.join(format!("snapshot_{tick}.db"));

        // VACUUM INTO refuses to overwrite.
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        sqlx::query("VACUUM INTO ?1")
            .bind(path.display().to_string())
            .execute(&self.pool)
            .await?;
        info!(tick, path = %path.display(), "snapshot written");

        prune_snapshots(&snapshots, retain)?;
        Ok(path)
    }

    /// The writer pool (used by `load` helpers and tests).
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Remove the oldest snapshots beyond the rolling window.
fn prune_snapshots(dir: &Path, retain: usize) -> Result<(), DbError> {
    let mut ticks: Vec<(u64, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(tick) = name
            .strip_prefix("snapshot_")
            .and_then(|rest| rest.strip_suffix(".db"))
            .and_then(|tick| tick.parse::<u64>().ok())
        {
            ticks.push((tick, entry.path()));
        }
    }
    ticks.sort_unstable();
    while ticks.len() > retain {
        let (tick, path) = ticks.remove(0);
        debug!(tick, "pruning old snapshot");
        std::fs::remove_file(path)?;
    }
    Ok(())
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

async fn insert_agent(tx: &mut Transaction<'_, Sqlite>, agent: &Agent) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO agents (name, model_id, personality, x, y, journey, sleeping,
                             session_id, last_turn_tick, known_agents)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(agent.name.as_str())
    .bind(&agent.model_id)
    .bind(&agent.personality)
    .bind(i64::from(agent.position.x))
    .bind(i64::from(agent.position.y))
    .bind(agent.journey.as_ref().map(serde_json::to_string).transpose()?)
    .bind(agent.sleeping)
    .bind(agent.session_id.as_deref())
    .bind(to_i64(agent.last_turn_tick))
    .bind(serde_json::to_string(&agent.known_agents)?)
    .execute(&mut **tx)
    .await?;

    for (resource, quantity) in &agent.inventory.stacks {
        sqlx::query(
            "INSERT INTO inventory_stacks (agent_name, resource, quantity) VALUES (?1, ?2, ?3)",
        )
        .bind(agent.name.as_str())
        .bind(load::enum_to_str(resource)?)
        .bind(i64::from(*quantity))
        .execute(&mut **tx)
        .await?;
    }
    for item in &agent.inventory.items {
        insert_item(tx, &agent.name, item).await?;
    }
    Ok(())
}

async fn insert_item(
    tx: &mut Transaction<'_, Sqlite>,
    owner: &AgentName,
    item: &Item,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO inventory_items (id, agent_name, kind, properties) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(item.id.to_string())
    .bind(owner.as_str())
    .bind(&item.kind)
    .bind(serde_json::to_string(&item.properties)?)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn stack_delta(
    tx: &mut Transaction<'_, Sqlite>,
    agent: &AgentName,
    resource: ResourceKind,
    delta: i64,
) -> Result<(), DbError> {
    let resource_str = load::enum_to_str(&resource)?;
    if delta >= 0 {
        sqlx::query(
            "INSERT INTO inventory_stacks (agent_name, resource, quantity) VALUES (?1, ?2, ?3)
             ON CONFLICT (agent_name, resource) DO UPDATE SET quantity = quantity + ?3",
        )
        .bind(agent.as_str())
        .bind(&resource_str)
        .bind(delta)
        .execute(&mut **tx)
        .await?;
    } else {
        sqlx::query(
            "UPDATE inventory_stacks SET quantity = quantity + ?3
             WHERE agent_name = ?1 AND resource = ?2",
        )
        .bind(agent.as_str())
        .bind(&resource_str)
        .bind(delta)
        .execute(&mut **tx)
        .await?;
        sqlx::query(
            "DELETE FROM inventory_stacks
             WHERE agent_name = ?1 AND resource = ?2 AND quantity <= 0",
        )
        .bind(agent.as_str())
        .bind(&resource_str)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Mutate one cell row keeping sparse storage: default cells have no row.
async fn update_cell(
    tx: &mut Transaction<'_, Sqlite>,
    pos: Position,
    mutate: impl FnOnce(&mut hearth_types::Cell),
) -> Result<(), DbError> {
    let row = sqlx::query("SELECT terrain, walls, doors FROM cells WHERE x = ?1 AND y = ?2")
        .bind(i64::from(pos.x))
        .bind(i64::from(pos.y))
        .fetch_optional(&mut **tx)
        .await?;

    let mut cell = match row {
        None => hearth_types::Cell::default(),
        Some(row) => {
            let terrain: String = row.try_get("terrain")?;
            let walls: String = row.try_get("walls")?;
            let doors: String = row.try_get("doors")?;
            hearth_types::Cell {
                terrain: load::enum_from_str("cells", &terrain)?,
                walls: serde_json::from_str(&walls)?,
                doors: serde_json::from_str(&doors)?,
            }
        }
    };
    mutate(&mut cell);

    if cell.is_default() {
        sqlx::query("DELETE FROM cells WHERE x = ?1 AND y = ?2")
            .bind(i64::from(pos.x))
            .bind(i64::from(pos.y))
            .execute(&mut **tx)
            .await?;
    } else {
        sqlx::query(
            "INSERT INTO cells (x, y, terrain, walls, doors) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (x, y) DO UPDATE SET terrain = ?3, walls = ?4, doors = ?5",
        )
        .bind(i64::from(pos.x))
        .bind(i64::from(pos.y))
        .bind(load::enum_to_str(&cell.terrain)?)
        .bind(serde_json::to_string(&cell.walls)?)
        .bind(serde_json::to_string(&cell.doors)?)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Apply a symmetric wall mutation to both sides of an edge, mirroring the
/// world service's placement routine.
async fn apply_edge(
    tx: &mut Transaction<'_, Sqlite>,
    pos: Position,
    direction: Direction,
    op: EdgeOp,
) -> Result<(), DbError> {
    let (width, height) = world_bounds(tx).await?;
    update_cell(tx, pos, |cell| op.apply(cell, direction)).await?;
    if let Some(neighbour) = pos.step(direction)
        && neighbour.x < width
        && neighbour.y < height
    {
        update_cell(tx, neighbour, |cell| op.apply(cell, direction.opposite())).await?;
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum EdgeOp {
    PlaceWall,
    RemoveWall,
    PlaceDoor,
}

impl EdgeOp {
    fn apply(self, cell: &mut hearth_types::Cell, direction: Direction) {
        match self {
            Self::PlaceWall => {
                cell.walls.insert(direction);
            }
            Self::RemoveWall => {
                cell.walls.remove(&direction);
                cell.doors.remove(&direction);
            }
            Self::PlaceDoor => {
                cell.doors.insert(direction);
            }
        }
    }
}

async fn world_bounds(tx: &mut Transaction<'_, Sqlite>) -> Result<(u32, u32), DbError> {
    let row = sqlx::query("SELECT width, height FROM world_state WHERE id = 1")
        .fetch_one(&mut **tx)
        .await?;
    let width: i64 = row.try_get("width")?;
    let height: i64 = row.try_get("height")?;
    Ok((load::to_u32(width), load::to_u32(height)))
}

async fn update_known_agents(
    tx: &mut Transaction<'_, Sqlite>,
    who: &AgentName,
    other: &AgentName,
) -> Result<(), DbError> {
    let row = sqlx::query("SELECT known_agents FROM agents WHERE name = ?1")
        .bind(who.as_str())
        .fetch_optional(&mut **tx)
        .await?;
    let Some(row) = row else {
        return Ok(());
    };
    let known: String = row.try_get("known_agents")?;
    let mut known: std::collections::BTreeSet<AgentName> = serde_json::from_str(&known)?;
    known.insert(other.clone());
    sqlx::query("UPDATE agents SET known_agents = ?2 WHERE name = ?1")
        .bind(who.as_str())
        .bind(serde_json::to_string(&known)?)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Remove the oldest carried item of `kind` from `agent`, returning its
/// properties JSON (the dropped object inherits them).
async fn pop_item(
    tx: &mut Transaction<'_, Sqlite>,
    agent: &AgentName,
    kind: &str,
) -> Result<String, DbError> {
    let row = sqlx::query(
        "SELECT rowid, properties FROM inventory_items
         WHERE agent_name = ?1 AND kind = ?2 ORDER BY rowid LIMIT 1",
    )
    .bind(agent.as_str())
    .bind(kind)
    .fetch_optional(&mut **tx)
    .await?;
    let Some(row) = row else {
        return Ok(String::from("{}"));
    };
    let rowid: i64 = row.try_get("rowid")?;
    let properties: String = row.try_get("properties")?;
    sqlx::query("DELETE FROM inventory_items WHERE rowid = ?1")
        .bind(rowid)
        .execute(&mut **tx)
        .await?;
    Ok(properties)
}

async fn insert_object(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    pos: Position,
    kind: &str,
    extras: &serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO objects (id, x, y, kind, extras) VALUES (?1, ?2, ?3, ?4, ?5)")
        .bind(id)
        .bind(i64::from(pos.x))
        .bind(i64::from(pos.y))
        .bind(kind)
        .bind(serde_json::to_string(extras)?)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Apply one event's database mutation. Total match: a new event variant
/// without an arm here fails to compile.
#[allow(clippy::too_many_lines)]
async fn apply_event(tx: &mut Transaction<'_, Sqlite>, event: &Event) -> Result<(), DbError> {
    let tick = to_i64(event.tick);
    match &event.kind {
        EventKind::AgentMoved { agent, to, .. } => {
            // Advance the journey cursor when this step follows the path.
            let row = sqlx::query("SELECT journey FROM agents WHERE name = ?1")
                .bind(agent.as_str())
                .fetch_optional(&mut **tx)
                .await?;
            let journey: Option<Journey> = row
                .and_then(|r| r.try_get::<Option<String>, _>("journey").ok().flatten())
                .map(|j| serde_json::from_str(&j))
                .transpose()?;
            let journey = journey.map(|mut j| {
                if j.next_step() == Some(*to) {
                    j.progress = j.progress.saturating_add(1);
                }
                j
            });
            sqlx::query("UPDATE agents SET x = ?2, y = ?3, journey = ?4 WHERE name = ?1")
                .bind(agent.as_str())
                .bind(i64::from(to.x))
                .bind(i64::from(to.y))
                .bind(journey.as_ref().map(serde_json::to_string).transpose()?)
                .execute(&mut **tx)
                .await?;
        }
        EventKind::AgentGathered {
            agent, resource, ..
        } => {
            stack_delta(tx, agent, *resource, 1).await?;
        }
        EventKind::AgentSlept { agent, .. } => {
            sqlx::query("UPDATE agents SET sleeping = 1 WHERE name = ?1")
                .bind(agent.as_str())
                .execute(&mut **tx)
                .await?;
        }
        EventKind::AgentWoke { agent, .. } => {
            sqlx::query("UPDATE agents SET sleeping = 0 WHERE name = ?1")
                .bind(agent.as_str())
                .execute(&mut **tx)
                .await?;
        }
        EventKind::AgentsMet { a, b } => {
            update_known_agents(tx, a, b).await?;
            update_known_agents(tx, b, a).await?;
        }
        EventKind::JourneyStarted {
            agent,
            destination,
            path,
        } => {
            let journey = Journey {
                destination: *destination,
                path: path.clone(),
                progress: 0,
            };
            sqlx::query("UPDATE agents SET journey = ?2 WHERE name = ?1")
                .bind(agent.as_str())
                .bind(serde_json::to_string(&journey)?)
                .execute(&mut **tx)
                .await?;
        }
        EventKind::JourneyInterrupted { agent, .. } | EventKind::JourneyArrived { agent, .. } => {
            sqlx::query("UPDATE agents SET journey = NULL WHERE name = ?1")
                .bind(agent.as_str())
                .execute(&mut **tx)
                .await?;
        }
        EventKind::ItemTaken {
            agent,
            object,
            item,
            ..
        } => {
            let row = sqlx::query("SELECT extras FROM objects WHERE id = ?1")
                .bind(object.to_string())
                .fetch_optional(&mut **tx)
                .await?;
            let properties = row
                .map(|r| r.try_get::<String, _>("extras"))
                .transpose()?
                .and_then(|extras| {
                    serde_json::from_str::<serde_json::Value>(&extras)
                        .ok()
                        .and_then(|v| v.get("properties").cloned())
                })
                .unwrap_or_else(|| serde_json::json!({}));
            sqlx::query("DELETE FROM objects WHERE id = ?1")
                .bind(object.to_string())
                .execute(&mut **tx)
                .await?;
            match ResourceKind::parse(item) {
                Some(resource) => stack_delta(tx, agent, resource, 1).await?,
                None => {
                    // Item id is derived from the object id (see the take
                    // handler), so memory and storage agree.
                    sqlx::query(
                        "INSERT INTO inventory_items (id, agent_name, kind, properties)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .bind(object.to_string())
                    .bind(agent.as_str())
                    .bind(item)
                    .bind(serde_json::to_string(&properties)?)
                    .execute(&mut **tx)
                    .await?;
                }
            }
        }
        EventKind::ItemDropped {
            agent,
            object,
            position,
            item,
        }
        | EventKind::ItemPlaced {
            agent,
            object,
            position,
            item,
        } => {
            let properties = match ResourceKind::parse(item) {
                Some(resource) => {
                    stack_delta(tx, agent, resource, -1).await?;
                    String::from("{}")
                }
                None => pop_item(tx, agent, item).await?,
            };
            let extras = serde_json::json!({
                "item": item,
                "properties": serde_json::from_str::<serde_json::Value>(&properties)?,
            });
            insert_object(tx, &object.to_string(), *position, "placed_item", &extras).await?;
        }
        EventKind::ItemGiven {
            giver,
            recipient,
            item,
        } => match ResourceKind::parse(item) {
            Some(resource) => {
                stack_delta(tx, giver, resource, -1).await?;
                stack_delta(tx, recipient, resource, 1).await?;
            }
            None => {
                sqlx::query(
                    "UPDATE inventory_items SET agent_name = ?3
                     WHERE rowid = (SELECT rowid FROM inventory_items
                                    WHERE agent_name = ?1 AND kind = ?2
                                    ORDER BY rowid LIMIT 1)",
                )
                .bind(giver.as_str())
                .bind(item)
                .bind(recipient.as_str())
                .execute(&mut **tx)
                .await?;
            }
        },
        EventKind::SignWritten {
            agent,
            object,
            position,
            text,
        } => {
            let extras = serde_json::json!({ "text": text, "author": agent });
            insert_object(tx, &object.to_string(), *position, "sign", &extras).await?;
        }
        EventKind::WallPlaced {
            position,
            direction,
            ..
        } => {
            apply_edge(tx, *position, *direction, EdgeOp::PlaceWall).await?;
        }
        EventKind::WallRemoved {
            position,
            direction,
            ..
        } => {
            apply_edge(tx, *position, *direction, EdgeOp::RemoveWall).await?;
        }
        EventKind::DoorPlaced {
            position,
            direction,
            ..
        } => {
            apply_edge(tx, *position, *direction, EdgeOp::PlaceDoor).await?;
        }
        EventKind::PlaceNamed {
            agent,
            position,
            name,
        } => {
            sqlx::query(
                "INSERT INTO named_places (x, y, name, named_by) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (x, y) DO UPDATE SET name = ?3, named_by = ?4",
            )
            .bind(i64::from(position.x))
            .bind(i64::from(position.y))
            .bind(name)
            .bind(agent.as_str())
            .execute(&mut **tx)
            .await?;
        }
        EventKind::ShelterBuilt { .. } => {
            // Summary only; the component wall and door events carry the
            // state changes.
        }
        EventKind::StructureFormed { structure } => {
            sqlx::query(
                "INSERT INTO structures (id, interior, creators, is_private)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (id) DO UPDATE SET interior = ?2, creators = ?3, is_private = ?4",
            )
            .bind(structure.id.to_string())
            .bind(serde_json::to_string(&structure.interior)?)
            .bind(serde_json::to_string(&structure.creators)?)
            .bind(structure.is_private)
            .execute(&mut **tx)
            .await?;
        }
        EventKind::StructureDissolved { id } => {
            sqlx::query("DELETE FROM structures WHERE id = ?1")
                .bind(id.to_string())
                .execute(&mut **tx)
                .await?;
        }
        EventKind::CraftSucceeded {
            agent,
            output,
            quantity,
            inputs,
            item,
        } => {
            for input in inputs {
                stack_delta(tx, agent, *input, -1).await?;
            }
            if let Some(item) = item {
                insert_item(tx, agent, item).await?;
            } else if let Some(resource) = ResourceKind::parse(output) {
                stack_delta(tx, agent, resource, i64::from(*quantity)).await?;
            }
        }
        EventKind::InvitationSent {
            id,
            inviter,
            invitee,
            privacy,
        } => {
            sqlx::query(
                "INSERT INTO conversation_invitations
                 (id, inviter, invitee, privacy, created_tick, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending')",
            )
            .bind(id.to_string())
            .bind(inviter.as_str())
            .bind(invitee.as_str())
            .bind(load::enum_to_str(privacy)?)
            .bind(tick)
            .execute(&mut **tx)
            .await?;
        }
        EventKind::InvitationAccepted { id, .. } => {
            set_invitation_status(tx, *id, "accepted").await?;
        }
        EventKind::InvitationDeclined { id, .. } => {
            set_invitation_status(tx, *id, "declined").await?;
        }
        EventKind::InvitationExpired { id } => {
            set_invitation_status(tx, *id, "expired").await?;
        }
        EventKind::ConversationStarted {
            id,
            privacy,
            participants,
        } => {
            sqlx::query(
                "INSERT INTO conversations (id, privacy, started_tick, ended_tick)
                 VALUES (?1, ?2, ?3, NULL)",
            )
            .bind(id.to_string())
            .bind(load::enum_to_str(privacy)?)
            .bind(tick)
            .execute(&mut **tx)
            .await?;
            for participant in participants {
                insert_participant(tx, *id, participant, tick).await?;
            }
        }
        EventKind::TurnAdded {
            conversation,
            speaker,
            text,
        } => {
            sqlx::query(
                "INSERT INTO conversation_turns
                 (conversation_id, turn_index, speaker, text, tick)
                 VALUES (?1,
                         (SELECT COALESCE(MAX(turn_index) + 1, 0)
                          FROM conversation_turns WHERE conversation_id = ?1),
                         ?2, ?3, ?4)",
            )
            .bind(conversation.to_string())
            .bind(speaker.as_str())
            .bind(text)
            .bind(tick)
            .execute(&mut **tx)
            .await?;
        }
        EventKind::ParticipantJoined {
            conversation,
            agent,
        } => {
            insert_participant(tx, *conversation, agent, tick).await?;
        }
        EventKind::ParticipantLeft {
            conversation,
            agent,
        } => {
            sqlx::query(
                "UPDATE conversation_participants SET left_tick = ?3
                 WHERE conversation_id = ?1 AND agent_name = ?2",
            )
            .bind(conversation.to_string())
            .bind(agent.as_str())
            .bind(tick)
            .execute(&mut **tx)
            .await?;
        }
        EventKind::ConversationEnded { conversation } => {
            sqlx::query("UPDATE conversations SET ended_tick = ?2 WHERE id = ?1")
                .bind(conversation.to_string())
                .bind(tick)
                .execute(&mut **tx)
                .await?;
            // An observer-forced end marks stragglers as having left too.
            sqlx::query(
                "UPDATE conversation_participants SET left_tick = ?2
                 WHERE conversation_id = ?1 AND left_tick IS NULL",
            )
            .bind(conversation.to_string())
            .bind(tick)
            .execute(&mut **tx)
            .await?;
        }
        EventKind::WeatherChanged { weather } => {
            sqlx::query("UPDATE world_state SET weather = ?1 WHERE id = 1")
                .bind(load::enum_to_str(weather)?)
                .execute(&mut **tx)
                .await?;
        }
        EventKind::DreamDelivered { .. } | EventKind::ObserverTriggered { .. } => {
            // Audit-only: dreams and observer notes live in the log.
        }
        EventKind::SessionAssigned { agent, session_id } => {
            sqlx::query("UPDATE agents SET session_id = ?2 WHERE name = ?1")
                .bind(agent.as_str())
                .bind(session_id)
                .execute(&mut **tx)
                .await?;
        }
        EventKind::PerceptionDelivered {
            agent,
            conversation,
        } => {
            sqlx::query("UPDATE agents SET last_turn_tick = ?2 WHERE name = ?1")
                .bind(agent.as_str())
                .bind(tick)
                .execute(&mut **tx)
                .await?;
            if let Some(conversation) = conversation {
                sqlx::query(
                    "UPDATE conversation_participants SET last_turn_tick = ?3
                     WHERE conversation_id = ?1 AND agent_name = ?2",
                )
                .bind(conversation.to_string())
                .bind(agent.as_str())
                .bind(tick)
                .execute(&mut **tx)
                .await?;
            }
        }
    }
    Ok(())
}

async fn set_invitation_status(
    tx: &mut Transaction<'_, Sqlite>,
    id: hearth_types::InvitationId,
    status: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE conversation_invitations SET status = ?2 WHERE id = ?1")
        .bind(id.to_string())
        .bind(status)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_participant(
    tx: &mut Transaction<'_, Sqlite>,
    conversation: hearth_types::ConversationId,
    agent: &AgentName,
    tick: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO conversation_participants
         (conversation_id, agent_name, joined_tick, left_tick, last_turn_tick)
         VALUES (?1, ?2, ?3, NULL, ?3)",
    )
    .bind(conversation.to_string())
    .bind(agent.as_str())
    .bind(tick)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
