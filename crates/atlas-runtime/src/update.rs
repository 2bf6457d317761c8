// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The single-writer update loop.
use std::sync::Arc;

use atlas_app_core::EngineConfig;
use atlas_core::{AnchorError, AnchorEvent, World};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::feed::AnchorFeed;
use crate::handle::{Command, PublishedViews, WorldHandle};

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    /// Anchor events applied.
    pub events_applied: u64,
    /// `Updated`/`Removed` events for anchors the store does not know; dropped.
    pub events_ignored: u64,
    /// Other rejected anchor events (duplicates, kind changes).
    pub events_rejected: u64,
    /// Mutation closures run.
    pub mutations: u64,
    /// Query closures run.
    pub queries: u64,
}

/// Owns the [`World`] on one tokio task.
///
/// Anchor events and queued closures are applied strictly one at a time; when
/// both are pending, anchor events go first so tracking never lags behind user
/// edits.
#[derive(Debug)]
pub struct UpdateLoop {
    world: World,
    events: mpsc::Receiver<AnchorEvent>,
    commands: mpsc::Receiver<Command>,
    views: watch::Sender<PublishedViews>,
    commits: u64,
    report: LoopReport,
}

impl UpdateLoop {
    /// Starts the loop on the current tokio runtime.
    ///
    /// Queue capacities come from `config`. The loop runs until every
    /// [`AnchorFeed`] and [`WorldHandle`] clone has been dropped, then yields its
    /// [`LoopReport`].
    pub fn spawn(
        world: World,
        config: &EngineConfig,
    ) -> (WorldHandle, AnchorFeed, JoinHandle<LoopReport>) {
        let (event_tx, events) = mpsc::channel(config.event_queue_capacity.max(1));
        let (command_tx, commands) = mpsc::channel(config.command_queue_capacity.max(1));
        let (views, views_rx) = watch::channel(PublishedViews {
            anchors: world.snapshot(None),
            spatial: Arc::clone(world.spatial()),
            commits: 0,
        });
        let update_loop = Self {
            world,
            events,
            commands,
            views,
            commits: 0,
            report: LoopReport::default(),
        };
        let task = tokio::spawn(update_loop.run());
        (
            WorldHandle::new(command_tx, views_rx),
            AnchorFeed::new(event_tx),
            task,
        )
    }

    #[instrument(name = "update_loop", skip_all)]
    async fn run(mut self) -> LoopReport {
        info!("update loop started");
        let mut events_open = true;
        let mut commands_open = true;
        loop {
            tokio::select! {
                biased;
                event = self.events.recv(), if events_open => match event {
                    Some(event) => self.apply_event(event),
                    None => {
                        debug!("anchor feed closed");
                        events_open = false;
                    }
                },
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => self.run_command(command),
                    None => {
                        debug!("all world handles dropped");
                        commands_open = false;
                    }
                },
                else => break,
            }
        }
        info!(report = ?self.report, "update loop stopped");
        self.report
    }

    fn apply_event(&mut self, event: AnchorEvent) {
        let kind = event.kind();
        match self.world.apply_anchor_event(event) {
            Ok(change) => {
                self.report.events_applied += 1;
                debug!(
                    anchor = %change.id,
                    ?kind,
                    version = change.version,
                    "anchor event committed"
                );
                self.publish();
            }
            Err(AnchorError::UnknownAnchor(id)) => {
                self.report.events_ignored += 1;
                warn!(anchor = %id, ?kind, "event for unknown anchor ignored");
            }
            Err(err) => {
                self.report.events_rejected += 1;
                warn!(%err, ?kind, "anchor event rejected");
            }
        }
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Mutate(f) => {
                f(&mut self.world);
                self.report.mutations += 1;
                self.publish();
            }
            Command::Query(f) => {
                f(&self.world);
                self.report.queries += 1;
            }
        }
    }

    fn publish(&mut self) {
        self.commits += 1;
        self.views.send_replace(PublishedViews {
            anchors: self.world.snapshot(None),
            spatial: Arc::clone(self.world.spatial()),
            commits: self.commits,
        });
    }
}
