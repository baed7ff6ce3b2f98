//! The `tick_once` orchestrator.
//!
//! A tick is a fixed, ordered sequence: drain observer commands, expire
//! invitations, wake sleepers, schedule clusters, advance journeys, run
//! agent turns, sweep invariants, commit. Events accumulate in order and
//! reach storage only at commit -- a failure anywhere aborts the tick and
//! reloads the last committed state, so the world never half-advances.
//!
//! Cluster turns run concurrently as plain futures on the engine's worker
//! thread; the shared state sits in a `RefCell` that is only ever borrowed
//! between suspension points (the reasoner and narrator awaits), which is
//! the whole concurrency contract in one sentence.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use hearth_types::{
    AgentName, Event, EventKind, InterruptReason, Position, TimeOfDay, WakeReason,
};
use hearth_agents::actions::{ActionContext, execute_action};
use hearth_agents::{RecipeBook, SimState};
use hearth_db::{Store, status};
use hearth_world::{WeatherSystem, effective_vision};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::narrator::Narrator;
use crate::operator::{CommandQueue, ObserverCommand};
use crate::perception::build_perception;
use crate::reasoner::{Reasoner, ReasonerError};
use crate::scheduler::build_schedule;

/// What one tick did.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// The tick that committed.
    pub tick: u64,
    /// The committed events, in sequence order.
    pub events: Vec<Event>,
    /// How many clusters ran.
    pub clusters: usize,
}

/// Engine scratch state that lives between ticks but is not persisted:
/// last tick's arrivals (for wake-on-company), queued dreams, observer
/// force/skip marks, and pending world notices.
#[derive(Debug, Default)]
struct Scratch {
    arrivals: BTreeMap<Position, Vec<AgentName>>,
    dreams: BTreeMap<AgentName, Vec<String>>,
    force_next: BTreeSet<AgentName>,
    skip: BTreeMap<AgentName, u32>,
    world_notices: Vec<String>,
}

/// The engine: one world, one writer, one tick at a time.
pub struct Engine<R, N> {
    config: EngineConfig,
    state: SimState,
    store: Store,
    recipes: RecipeBook,
    weather: WeatherSystem,
    commands: CommandQueue,
    scratch: Scratch,
    reasoner: R,
    narrator: N,
}

impl<R: Reasoner, N: Narrator> Engine<R, N> {
    /// Assemble an engine over an already-loaded state.
    pub fn new(config: EngineConfig, state: SimState, store: Store, reasoner: R, narrator: N) -> Self {
        let weather = WeatherSystem::new(config.world.seed, config.weather.drift_interval);
        Self {
            config,
            state,
            store,
            recipes: RecipeBook::default(),
            weather,
            commands: CommandQueue::new(),
            scratch: Scratch::default(),
            reasoner,
            narrator,
        }
    }

    /// The current in-memory state (read-only).
    pub const fn state(&self) -> &SimState {
        &self.state
    }

    /// A handle observers use to enqueue commands.
    pub fn commands(&self) -> CommandQueue {
        self.commands.clone()
    }

    /// The reasoner (tests use this to feed the scripted stub).
    pub const fn reasoner(&self) -> &R {
        &self.reasoner
    }

    /// The engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one complete tick.
    pub async fn tick_once(&mut self) -> Result<TickOutcome, EngineError> {
        let tick = self.state.meta.tick.saturating_add(1);
        let mut kinds: Vec<EventKind> = Vec::new();

        // Observer commands land before anything else.
        self.apply_observer_commands(tick, &mut kinds);

        // Phase 1: invitation expiry.
        let expiry = self.config.social.invitation_expiry_ticks;
        for invitation in self.state.social.expire_pending(tick, expiry) {
            kinds.push(EventKind::InvitationExpired { id: invitation.id });
        }

        // Phase 2: wake (and weather drift).
        if let Some(weather) = self.weather.drift(tick, self.state.meta.weather) {
            self.state.meta.weather = weather;
            kinds.push(EventKind::WeatherChanged { weather });
        }
        self.phase_wake(tick, &mut kinds);

        // Phase 3: schedule.
        let skipped = self.take_skipped();
        let schedule = build_schedule(
            &self.state,
            self.config.cluster_radius(),
            &skipped,
            &self.scratch.force_next,
        );
        debug!(tick, clusters = schedule.clusters.len(), "schedule built");

        // Phase 4: movement.
        let arrivals = self.phase_movement(tick, &mut kinds);

        // Phase 5: agent turns.
        let cluster_count = schedule.clusters.len();
        self.phase_agent_turns(tick, &schedule.clusters, &mut kinds).await?;

        // Impossible states abort the tick and keep the committed state.
        if let Err(violation) = self.state.check_invariants(tick, expiry) {
            warn!(tick, %violation, "invariant sweep failed; restoring committed state");
            self.state = self.store.load().await?;
            return Err(violation.into());
        }

        // Phase 6: commit.
        let events = match self.store.commit_tick(tick, kinds).await {
            Ok(events) => events,
            Err(err) => {
                warn!(tick, %err, "commit failed; restoring committed state");
                self.state = self.store.load().await?;
                return Err(err.into());
            }
        };
        self.state.meta.tick = tick;

        let interval = self.config.storage.snapshot_interval;
        if interval > 0 && tick % interval == 0 {
            self.store
                .snapshot(tick, self.config.storage.snapshot_retain)
                .await?;
        }
        status::write_status_files(&self.state, self.store.dir())?;

        self.scratch.arrivals = arrivals;
        self.scratch.force_next.clear();

        info!(tick, events = events.len(), clusters = cluster_count, "tick committed");
        Ok(TickOutcome {
            tick,
            events,
            clusters: cluster_count,
        })
    }

    /// Drain the observer queue into events and scratch marks.
    fn apply_observer_commands(&mut self, tick: u64, kinds: &mut Vec<EventKind>) {
        for command in self.commands.drain() {
            match command {
                ObserverCommand::TriggerEvent { text } => {
                    self.scratch.world_notices.push(text.clone());
                    kinds.push(EventKind::ObserverTriggered { text });
                }
                ObserverCommand::SetWeather { weather } => {
                    if self.state.meta.weather != weather {
                        self.state.meta.weather = weather;
                        kinds.push(EventKind::WeatherChanged { weather });
                    }
                }
                ObserverCommand::SendDream { agent, text } => {
                    self.scratch
                        .dreams
                        .entry(agent.clone())
                        .or_default()
                        .push(text.clone());
                    kinds.push(EventKind::DreamDelivered { agent, text });
                }
                ObserverCommand::ForceTurn { agent } => {
                    self.scratch.force_next.insert(agent);
                }
                ObserverCommand::SkipTurns { agent, n } => {
                    if n > 0 {
                        self.scratch.skip.insert(agent, n);
                    }
                }
                ObserverCommand::EndConversation { id } => {
                    match self.state.social.end_conversation(id, tick) {
                        Ok(_) => kinds.push(EventKind::ConversationEnded { conversation: id }),
                        Err(err) => warn!(%err, "end_conversation command ignored"),
                    }
                }
            }
        }
    }

    /// Phase 2: wake sleeping agents at morning, on company, or on force.
    fn phase_wake(&mut self, tick: u64, kinds: &mut Vec<EventKind>) {
        let morning = TimeOfDay::from_tick(tick) == TimeOfDay::Morning;
        let sleepers: Vec<(AgentName, Position)> = self
            .state
            .roster
            .agents()
            .values()
            .filter(|a| a.sleeping)
            .map(|a| (a.name.clone(), a.position))
            .collect();

        for (name, position) in sleepers {
            let company = self
                .scratch
                .arrivals
                .get(&position)
                .is_some_and(|arrived| arrived.iter().any(|n| n != &name));
            let reason = if morning {
                WakeReason::Morning
            } else if self.scratch.force_next.contains(&name) {
                WakeReason::Forced
            } else if company {
                WakeReason::Company
            } else {
                continue;
            };
            if let Some(agent) = self.state.roster.get_mut(&name) {
                agent.sleeping = false;
            }
            kinds.push(EventKind::AgentWoke {
                agent: name,
                reason,
            });
        }
    }

    /// Decrement skip counters, returning the set still being skipped.
    fn take_skipped(&mut self) -> BTreeSet<AgentName> {
        let skipped: BTreeSet<AgentName> = self.scratch.skip.keys().cloned().collect();
        self.scratch.skip.retain(|_, remaining| {
            *remaining = remaining.saturating_sub(1);
            *remaining > 0
        });
        skipped
    }

    /// Phase 4: advance journeys one step, handling all four interrupt
    /// conditions. Returns this tick's arrivals for next tick's wake.
    fn phase_movement(
        &mut self,
        tick: u64,
        kinds: &mut Vec<EventKind>,
    ) -> BTreeMap<Position, Vec<AgentName>> {
        let mut arrivals: BTreeMap<Position, Vec<AgentName>> = BTreeMap::new();
        let radius = effective_vision(
            self.config.vision.radius,
            TimeOfDay::from_tick(tick),
            self.config.vision.night_percent,
        );

        let journeying: Vec<AgentName> = self
            .state
            .roster
            .agents()
            .values()
            .filter(|a| a.in_trance())
            .map(|a| a.name.clone())
            .collect();

        for name in journeying {
            // Interrupt 4: an observer forced this agent's turn.
            if self.scratch.force_next.contains(&name) {
                if let Some(position) = self.clear_journey(&name) {
                    kinds.push(EventKind::JourneyInterrupted {
                        agent: name,
                        position,
                        reason: InterruptReason::Forced,
                    });
                }
                continue;
            }

            let Some((position, next, destination)) = self.state.roster.get(&name).and_then(|a| {
                let journey = a.journey.as_ref()?;
                Some((a.position, journey.next_step(), journey.destination))
            }) else {
                continue;
            };

            let Some(next) = next else {
                // Path already exhausted: arrival.
                let _ = self.clear_journey(&name);
                kinds.push(EventKind::JourneyArrived {
                    agent: name,
                    destination,
                });
                continue;
            };

            // Interrupt 2: the path was invalidated (a wall went up, the
            // terrain changed) -- the next step is no longer legal.
            let step_ok = direction_between(position, next)
                .is_some_and(|dir| self.state.grid.can_step(position, dir));
            if !step_ok {
                let _ = self.clear_journey(&name);
                kinds.push(EventKind::JourneyInterrupted {
                    agent: name,
                    position,
                    reason: InterruptReason::PathBlocked,
                });
                continue;
            }

            let before: BTreeSet<AgentName> = self
                .state
                .roster
                .visible_from(&name, position, radius)
                .iter()
                .map(|a| a.name.clone())
                .collect();

            let mut arrived = false;
            if let Some(agent) = self.state.roster.get_mut(&name) {
                agent.position = next;
                if let Some(journey) = agent.journey.as_mut() {
                    journey.progress = journey.progress.saturating_add(1);
                    arrived = journey.next_step().is_none();
                }
            }
            kinds.push(EventKind::AgentMoved {
                agent: name.clone(),
                from: position,
                to: next,
            });
            arrivals.entry(next).or_default().push(name.clone());

            // Interrupt 3: arrival.
            if arrived {
                let _ = self.clear_journey(&name);
                kinds.push(EventKind::JourneyArrived {
                    agent: name,
                    destination,
                });
                continue;
            }

            // Interrupt 1: somebody newly within vision of the new cell.
            let after: Vec<AgentName> = self
                .state
                .roster
                .visible_from(&name, next, radius)
                .iter()
                .map(|a| a.name.clone())
                .collect();
            if after.iter().any(|other| !before.contains(other)) {
                let _ = self.clear_journey(&name);
                kinds.push(EventKind::JourneyInterrupted {
                    agent: name,
                    position: next,
                    reason: InterruptReason::CompanySighted,
                });
            }
        }

        arrivals
    }

    fn clear_journey(&mut self, name: &AgentName) -> Option<Position> {
        let agent = self.state.roster.get_mut(name)?;
        agent.journey = None;
        Some(agent.position)
    }

    /// Phase 5: run each cluster concurrently; within a cluster agents act
    /// sequentially so each sees the previous actor's results.
    async fn phase_agent_turns(
        &mut self,
        tick: u64,
        clusters: &[Vec<AgentName>],
        kinds: &mut Vec<EventKind>,
    ) -> Result<(), EngineError> {
        let notices = per_agent_notices(kinds);
        let world_notices = std::mem::take(&mut self.scratch.world_notices);

        let deadline = Duration::from_secs(self.config.timing.tick_deadline_secs.max(1));
        let tools = hearth_types::tool_schemas();

        // Disjoint borrows of self so the shared cell can own the state
        // while the reasoner and narrator stay directly callable.
        let Self {
            state,
            recipes,
            scratch,
            reasoner,
            narrator,
            config,
            ..
        } = self;
        let reasoner = &*reasoner;
        let narrator = &*narrator;

        let shared = RefCell::new(TurnShared {
            state,
            recipes,
            dreams: &mut scratch.dreams,
            notices,
            world_notices,
            events: Vec::new(),
            terminal: None,
        });

        let turn_config = TurnConfig {
            tick,
            vision_radius: config.vision.radius,
            night_percent: config.vision.night_percent,
            max_actions: config.timing.max_actions_per_turn,
            tools: &tools,
        };

        let cluster_futures: Vec<_> = clusters
            .iter()
            .map(|cluster| run_cluster(&shared, cluster, &turn_config, reasoner, narrator))
            .collect();

        // One deadline for the whole phase: when it passes, outstanding
        // reasoner calls are simply dropped. Cancelled agents produced no
        // actions and are not penalised.
        if tokio::time::timeout(deadline, futures::future::join_all(cluster_futures))
            .await
            .is_err()
        {
            warn!(tick, "tick deadline passed; outstanding turns cancelled");
        }

        let shared = shared.into_inner();
        kinds.extend(shared.events);
        if let Some(message) = shared.terminal {
            return Err(EngineError::ReasonerTerminal { message });
        }
        Ok(())
    }
}

/// Mutable state shared by the concurrently running cluster futures.
/// Borrowed only between suspension points.
struct TurnShared<'a> {
    state: &'a mut SimState,
    recipes: &'a RecipeBook,
    dreams: &'a mut BTreeMap<AgentName, Vec<String>>,
    notices: BTreeMap<AgentName, Vec<String>>,
    world_notices: Vec<String>,
    events: Vec<EventKind>,
    terminal: Option<String>,
}

/// Per-turn fixed parameters.
struct TurnConfig<'a> {
    tick: u64,
    vision_radius: u32,
    night_percent: u32,
    max_actions: u32,
    tools: &'a serde_json::Value,
}

async fn run_cluster<R: Reasoner, N: Narrator>(
    shared: &RefCell<TurnShared<'_>>,
    cluster: &[AgentName],
    config: &TurnConfig<'_>,
    reasoner: &R,
    narrator: &N,
) {
    for name in cluster {
        if shared.borrow().terminal.is_some() {
            return;
        }
        run_turn(shared, name, config, reasoner, narrator).await;
    }
}

#[allow(clippy::too_many_lines)]
async fn run_turn<R: Reasoner, N: Narrator>(
    shared: &RefCell<TurnShared<'_>>,
    name: &AgentName,
    config: &TurnConfig<'_>,
    reasoner: &R,
    narrator: &N,
) {
    // Build the perception (and take an agent snapshot for the session
    // opener) under one short borrow.
    let (snapshot, session, perception) = {
        let mut guard = shared.borrow_mut();
        let Some(agent) = guard.state.roster.get(name) else {
            return;
        };
        // A previous actor in this cluster may have changed things; a
        // freshly sleeping or entranced agent forfeits its turn.
        if agent.sleeping || agent.in_trance() {
            return;
        }
        let snapshot = agent.clone();
        let session = agent.session_id.clone();

        let dreams = guard.dreams.remove(name).unwrap_or_default();
        let mut notices = guard.notices.remove(name).unwrap_or_default();
        notices.extend(guard.world_notices.iter().cloned());
        let shared_ref = &mut *guard;
        let Some((perception, events)) = build_perception(
            &mut *shared_ref.state,
            name,
            config.tick,
            config.vision_radius,
            config.night_percent,
            dreams,
            notices,
        ) else {
            return;
        };
        shared_ref.events.extend(events);
        (snapshot, session, perception)
    };

    // Open a session on first contact; the id persists via its event.
    let session = match session {
        Some(session) => session,
        None => match reasoner.begin_session(&snapshot).await {
            Ok(session) => {
                let mut guard = shared.borrow_mut();
                if let Some(agent) = guard.state.roster.get_mut(name) {
                    agent.session_id = Some(session.clone());
                }
                guard.events.push(EventKind::SessionAssigned {
                    agent: name.clone(),
                    session_id: session.clone(),
                });
                session
            }
            Err(ReasonerError::Backend(err)) => {
                warn!(agent = %name, %err, "session open failed; skipping turn");
                return;
            }
            Err(ReasonerError::Terminal(err)) => {
                shared.borrow_mut().terminal = Some(err);
                return;
            }
        },
    };

    let mut executed: u32 = 0;
    let mut narrations: Vec<String> = Vec::new();
    let mut first = true;

    loop {
        let reply = if first {
            reasoner
                .take_turn(&session, &perception, config.tools)
                .await
        } else {
            reasoner.continue_turn(&session, &narrations).await
        };
        first = false;

        let reply = match reply {
            Ok(reply) => reply,
            Err(ReasonerError::Backend(err)) => {
                warn!(agent = %name, %err, "reasoner call failed; skipping rest of turn");
                return;
            }
            Err(ReasonerError::Terminal(err)) => {
                shared.borrow_mut().terminal = Some(err);
                return;
            }
        };

        if reply.actions.is_empty() {
            break;
        }

        narrations.clear();
        let mut turn_over = false;
        for action in reply.actions {
            if executed >= config.max_actions {
                turn_over = true;
                break;
            }
            // Execute synchronously under a short borrow; narrate after
            // the borrow is released.
            let result = {
                let mut guard = shared.borrow_mut();
                let shared_ref = &mut *guard;
                let mut ctx = ActionContext {
                    state: &mut *shared_ref.state,
                    tick: config.tick,
                    vision_radius: config.vision_radius,
                    night_vision_percent: config.night_percent,
                    recipes: shared_ref.recipes,
                };
                let outcome = execute_action(&mut ctx, name, &action);
                shared_ref.events.extend(outcome.events);
                outcome.result
            };
            executed = executed.saturating_add(1);

            let narration = match narrator.narrate(&result, name).await {
                Ok(narration) => narration,
                Err(err) => {
                    debug!(agent = %name, %err, "narrator failed; using raw message");
                    result.message.clone()
                }
            };
            narrations.push(narration);

            // Sleeping or entering trance ends the turn.
            let resting = {
                let guard = shared.borrow();
                guard
                    .state
                    .roster
                    .get(name)
                    .is_some_and(|a| a.sleeping || a.in_trance())
            };
            if resting {
                debug!(agent = %name, action = action.name(), "turn ended early");
                turn_over = true;
                break;
            }
        }

        if turn_over || reply.done {
            break;
        }
    }
}

/// Compose per-agent notices from this tick's earlier events (wake
/// reasons, journey interrupts and arrivals).
fn per_agent_notices(kinds: &[EventKind]) -> BTreeMap<AgentName, Vec<String>> {
    let mut notices: BTreeMap<AgentName, Vec<String>> = BTreeMap::new();
    for kind in kinds {
        match kind {
            EventKind::AgentWoke { agent, reason } => {
                let line = match reason {
                    WakeReason::Morning => "You wake with the morning light.",
                    WakeReason::Company => "You wake -- someone is here.",
                    WakeReason::Forced => "You wake suddenly.",
                };
                notices.entry(agent.clone()).or_default().push(line.to_owned());
            }
            EventKind::JourneyInterrupted { agent, reason, .. } => {
                let line = match reason {
                    InterruptReason::CompanySighted => "Your journey breaks off -- someone has come into view.",
                    InterruptReason::PathBlocked => "Your journey breaks off -- the way ahead is blocked.",
                    InterruptReason::Forced => "Your journey breaks off.",
                };
                notices.entry(agent.clone()).or_default().push(line.to_owned());
            }
            EventKind::JourneyArrived { agent, destination } => {
                notices
                    .entry(agent.clone())
                    .or_default()
                    .push(format!("You arrive at {destination}."));
            }
            _ => {}
        }
    }
    notices
}

/// The cardinal direction from `a` to an adjacent `b`, if they are one
/// step apart.
fn direction_between(a: Position, b: Position) -> Option<hearth_types::Direction> {
    hearth_types::Direction::ALL
        .into_iter()
        .find(|&dir| a.step(dir) == Some(b))
}
