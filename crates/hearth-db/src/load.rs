//! Row-to-domain reconstruction shared by the writer's `load()` and the
//! observer's `ReadStore`.
//!
//! Every function reads from whichever pool it is handed; the writer pool
//! and the read-only pool see the same schema.

use std::collections::BTreeMap;

use hearth_types::{
    Agent, AgentName, Cell, Conversation, ConversationId, ConversationTurn, Invitation,
    InvitationId, Inventory, Item, ItemId, Journey, NamedPlace, ObjectId, ObjectKind, Participant,
    Position, Structure, StructureId, WorldMeta, WorldObject,
};
use hearth_world::WorldGrid;
use hearth_social::SocialLedger;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::DbError;

/// Serialize a unit-variant enum to its bare string form (`grass`, not
/// `"grass"`).
pub(crate) fn enum_to_str<T: serde::Serialize>(value: &T) -> Result<String, DbError> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(DbError::CorruptRow {
            table: "enum",
            detail: format!("expected string-shaped enum, got {other}"),
        }),
    }
}

/// Parse a bare enum string back into its type.
pub(crate) fn enum_from_str<T: serde::de::DeserializeOwned>(
    table: &'static str,
    s: &str,
) -> Result<T, DbError> {
    serde_json::from_value(serde_json::Value::String(s.to_owned())).map_err(|e| {
        DbError::CorruptRow {
            table,
            detail: format!("bad enum value {s}: {e}"),
        }
    })
}

pub(crate) fn parse_uuid(table: &'static str, s: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::CorruptRow {
        table,
        detail: format!("bad uuid {s}: {e}"),
    })
}

pub(crate) fn to_u64(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

pub(crate) fn to_u32(v: i64) -> u32 {
    u32::try_from(v).unwrap_or(0)
}

pub(crate) fn position_of(row: &sqlx::sqlite::SqliteRow) -> Result<Position, DbError> {
    let x: i64 = row.try_get("x")?;
    let y: i64 = row.try_get("y")?;
    Ok(Position::new(to_u32(x), to_u32(y)))
}

/// The world singleton row, or `None` before `init`.
pub(crate) async fn load_meta(pool: &SqlitePool) -> Result<Option<WorldMeta>, DbError> {
    let row = sqlx::query("SELECT tick, width, height, weather FROM world_state WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let tick: i64 = row.try_get("tick")?;
    let width: i64 = row.try_get("width")?;
    let height: i64 = row.try_get("height")?;
    let weather: String = row.try_get("weather")?;
    Ok(Some(WorldMeta {
        tick: to_u64(tick),
        width: to_u32(width),
        height: to_u32(height),
        weather: enum_from_str("world_state", &weather)?,
    }))
}

/// The global sequence counter.
pub(crate) async fn load_last_seq(pool: &SqlitePool) -> Result<u64, DbError> {
    let row = sqlx::query("SELECT last_seq FROM world_state WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row
        .map(|r| r.try_get::<i64, _>("last_seq").map(to_u64))
        .transpose()?
        .unwrap_or(0))
}

pub(crate) async fn load_cells(pool: &SqlitePool) -> Result<BTreeMap<Position, Cell>, DbError> {
    let rows = sqlx::query("SELECT x, y, terrain, walls, doors FROM cells")
        .fetch_all(pool)
        .await?;
    let mut cells = BTreeMap::new();
    for row in rows {
        let pos = position_of(&row)?;
        let terrain: String = row.try_get("terrain")?;
        let walls: String = row.try_get("walls")?;
        let doors: String = row.try_get("doors")?;
        cells.insert(
            pos,
            Cell {
                terrain: enum_from_str("cells", &terrain)?,
                walls: serde_json::from_str(&walls)?,
                doors: serde_json::from_str(&doors)?,
            },
        );
    }
    Ok(cells)
}

pub(crate) async fn load_objects(
    pool: &SqlitePool,
) -> Result<BTreeMap<ObjectId, WorldObject>, DbError> {
    let rows = sqlx::query("SELECT id, x, y, kind, extras FROM objects")
        .fetch_all(pool)
        .await?;
    let mut objects = BTreeMap::new();
    for row in rows {
        let object = object_of(&row)?;
        objects.insert(object.id, object);
    }
    Ok(objects)
}

pub(crate) fn object_of(row: &sqlx::sqlite::SqliteRow) -> Result<WorldObject, DbError> {
    let id: String = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    let extras: String = row.try_get("extras")?;
    let position = position_of(row)?;
    let extras_value: serde_json::Value = serde_json::from_str(&extras)?;

    let kind = match kind.as_str() {
        "sign" => ObjectKind::Sign {
            text: extras_value
                .get("text")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            author: AgentName::from(
                extras_value
                    .get("author")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default(),
            ),
        },
        "placed_item" => ObjectKind::PlacedItem {
            item: extras_value
                .get("item")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            properties: extras_value
                .get("properties")
                .and_then(serde_json::Value::as_object)
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
        },
        other => {
            return Err(DbError::CorruptRow {
                table: "objects",
                detail: format!("unknown object kind {other}"),
            });
        }
    };

    Ok(WorldObject {
        id: ObjectId::from(parse_uuid("objects", &id)?),
        position,
        kind,
    })
}

pub(crate) async fn load_named_places(
    pool: &SqlitePool,
) -> Result<BTreeMap<Position, NamedPlace>, DbError> {
    let rows = sqlx::query("SELECT x, y, name, named_by FROM named_places")
        .fetch_all(pool)
        .await?;
    let mut places = BTreeMap::new();
    for row in rows {
        let position = position_of(&row)?;
        let name: String = row.try_get("name")?;
        let named_by: String = row.try_get("named_by")?;
        places.insert(
            position,
            NamedPlace {
                position,
                name,
                named_by: AgentName::from(named_by),
            },
        );
    }
    Ok(places)
}

pub(crate) async fn load_structures(
    pool: &SqlitePool,
) -> Result<BTreeMap<StructureId, Structure>, DbError> {
    let rows = sqlx::query("SELECT id, interior, creators, is_private FROM structures")
        .fetch_all(pool)
        .await?;
    let mut structures = BTreeMap::new();
    for row in rows {
        let id: String = row.try_get("id")?;
        let interior: String = row.try_get("interior")?;
        let creators: String = row.try_get("creators")?;
        let is_private: bool = row.try_get("is_private")?;
        let id = StructureId::from(parse_uuid("structures", &id)?);
        structures.insert(
            id,
            Structure {
                id,
                interior: serde_json::from_str(&interior)?,
                creators: serde_json::from_str(&creators)?,
                is_private,
            },
        );
    }
    Ok(structures)
}

/// One agent with inventory, or `None`.
pub(crate) async fn load_agent(
    pool: &SqlitePool,
    name: &AgentName,
) -> Result<Option<Agent>, DbError> {
    let row = sqlx::query(
        "SELECT name, model_id, personality, x, y, journey, sleeping, session_id,
                last_turn_tick, known_agents
         FROM agents WHERE name = ?1",
    )
    .bind(name.as_str())
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let mut agent = agent_of(&row)?;
    agent.inventory = load_inventory(pool, name).await?;
    Ok(Some(agent))
}

pub(crate) async fn load_agents(pool: &SqlitePool) -> Result<BTreeMap<AgentName, Agent>, DbError> {
    let rows = sqlx::query(
        "SELECT name, model_id, personality, x, y, journey, sleeping, session_id,
                last_turn_tick, known_agents
         FROM agents ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    let mut agents = BTreeMap::new();
    for row in rows {
        let mut agent = agent_of(&row)?;
        agent.inventory = load_inventory(pool, &agent.name).await?;
        agents.insert(agent.name.clone(), agent);
    }
    Ok(agents)
}

fn agent_of(row: &sqlx::sqlite::SqliteRow) -> Result<Agent, DbError> {
    let name: String = row.try_get("name")?;
    let model_id: String = row.try_get("model_id")?;
    let personality: String = row.try_get("personality")?;
    let journey: Option<String> = row.try_get("journey")?;
    let sleeping: bool = row.try_get("sleeping")?;
    let session_id: Option<String> = row.try_get("session_id")?;
    let last_turn_tick: i64 = row.try_get("last_turn_tick")?;
    let known_agents: String = row.try_get("known_agents")?;
    let position = position_of(row)?;

    let journey: Option<Journey> = journey.map(|j| serde_json::from_str(&j)).transpose()?;

    Ok(Agent {
        name: AgentName::from(name),
        model_id,
        personality,
        position,
        inventory: Inventory::default(),
        journey,
        sleeping,
        session_id,
        last_turn_tick: to_u64(last_turn_tick),
        known_agents: serde_json::from_str(&known_agents)?,
    })
}

pub(crate) async fn load_inventory(
    pool: &SqlitePool,
    name: &AgentName,
) -> Result<Inventory, DbError> {
    let mut inventory = Inventory::default();

    let rows = sqlx::query(
        "SELECT resource, quantity FROM inventory_stacks WHERE agent_name = ?1",
    )
    .bind(name.as_str())
    .fetch_all(pool)
    .await?;
    for row in rows {
        let resource: String = row.try_get("resource")?;
        let quantity: i64 = row.try_get("quantity")?;
        inventory
            .stacks
            .insert(enum_from_str("inventory_stacks", &resource)?, to_u32(quantity));
    }

    let rows = sqlx::query(
        "SELECT id, kind, properties FROM inventory_items
         WHERE agent_name = ?1 ORDER BY rowid",
    )
    .bind(name.as_str())
    .fetch_all(pool)
    .await?;
    for row in rows {
        let id: String = row.try_get("id")?;
        let kind: String = row.try_get("kind")?;
        let properties: String = row.try_get("properties")?;
        inventory.items.push(Item {
            id: ItemId::from(parse_uuid("inventory_items", &id)?),
            kind,
            properties: serde_json::from_str(&properties)?,
        });
    }

    Ok(inventory)
}

pub(crate) async fn load_conversations(
    pool: &SqlitePool,
) -> Result<BTreeMap<ConversationId, Conversation>, DbError> {
    let rows = sqlx::query("SELECT id, privacy, started_tick, ended_tick FROM conversations")
        .fetch_all(pool)
        .await?;

    let mut conversations = BTreeMap::new();
    for row in rows {
        let id: String = row.try_get("id")?;
        let privacy: String = row.try_get("privacy")?;
        let started_tick: i64 = row.try_get("started_tick")?;
        let ended_tick: Option<i64> = row.try_get("ended_tick")?;
        let id = ConversationId::from(parse_uuid("conversations", &id)?);
        conversations.insert(
            id,
            Conversation {
                id,
                privacy: enum_from_str("conversations", &privacy)?,
                participants: Vec::new(),
                turns: Vec::new(),
                started_tick: to_u64(started_tick),
                ended_tick: ended_tick.map(to_u64),
            },
        );
    }

    let rows = sqlx::query(
        "SELECT conversation_id, agent_name, joined_tick, left_tick, last_turn_tick
         FROM conversation_participants ORDER BY joined_tick, agent_name",
    )
    .fetch_all(pool)
    .await?;
    for row in rows {
        let conversation_id: String = row.try_get("conversation_id")?;
        let agent_name: String = row.try_get("agent_name")?;
        let joined_tick: i64 = row.try_get("joined_tick")?;
        let left_tick: Option<i64> = row.try_get("left_tick")?;
        let last_turn_tick: i64 = row.try_get("last_turn_tick")?;
        let id = ConversationId::from(parse_uuid("conversation_participants", &conversation_id)?);
        if let Some(conversation) = conversations.get_mut(&id) {
            conversation.participants.push(Participant {
                name: AgentName::from(agent_name),
                joined_tick: to_u64(joined_tick),
                left_tick: left_tick.map(to_u64),
                last_turn_tick: to_u64(last_turn_tick),
            });
        }
    }

    let rows = sqlx::query(
        "SELECT conversation_id, speaker, text, tick FROM conversation_turns
         ORDER BY conversation_id, turn_index",
    )
    .fetch_all(pool)
    .await?;
    for row in rows {
        let conversation_id: String = row.try_get("conversation_id")?;
        let speaker: String = row.try_get("speaker")?;
        let text: String = row.try_get("text")?;
        let tick: i64 = row.try_get("tick")?;
        let id = ConversationId::from(parse_uuid("conversation_turns", &conversation_id)?);
        if let Some(conversation) = conversations.get_mut(&id) {
            conversation.turns.push(ConversationTurn {
                speaker: AgentName::from(speaker),
                text,
                tick: to_u64(tick),
            });
        }
    }

    Ok(conversations)
}

pub(crate) async fn load_invitations(
    pool: &SqlitePool,
) -> Result<BTreeMap<InvitationId, Invitation>, DbError> {
    let rows = sqlx::query(
        "SELECT id, inviter, invitee, privacy, created_tick, status
         FROM conversation_invitations",
    )
    .fetch_all(pool)
    .await?;
    let mut invitations = BTreeMap::new();
    for row in rows {
        let id: String = row.try_get("id")?;
        let inviter: String = row.try_get("inviter")?;
        let invitee: String = row.try_get("invitee")?;
        let privacy: String = row.try_get("privacy")?;
        let created_tick: i64 = row.try_get("created_tick")?;
        let status: String = row.try_get("status")?;
        let id = InvitationId::from(parse_uuid("conversation_invitations", &id)?);
        invitations.insert(
            id,
            Invitation {
                id,
                inviter: AgentName::from(inviter),
                invitee: AgentName::from(invitee),
                privacy: enum_from_str("conversation_invitations", &privacy)?,
                created_tick: to_u64(created_tick),
                status: enum_from_str("conversation_invitations", &status)?,
            },
        );
    }
    Ok(invitations)
}

/// Reconstruct the full grid from the database.
pub(crate) async fn load_grid(pool: &SqlitePool, meta: &WorldMeta) -> Result<WorldGrid, DbError> {
    Ok(WorldGrid::from_parts(
        meta.width,
        meta.height,
        load_cells(pool).await?,
        load_objects(pool).await?,
        load_named_places(pool).await?,
        load_structures(pool).await?,
    ))
}

/// Reconstruct the full social ledger from the database.
pub(crate) async fn load_social(pool: &SqlitePool) -> Result<SocialLedger, DbError> {
    Ok(SocialLedger::from_parts(
        load_invitations(pool).await?,
        load_conversations(pool).await?,
    ))
}
