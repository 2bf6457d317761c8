// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `atlas replay`: drive a recorded anchor log through the update loop.
use std::io::Write;

use anyhow::{bail, Context, Result};
use atlas_app_core::EngineConfig;
use atlas_assets::{FsResourceLoader, TemplateCache};
use atlas_core::{make_anchor_id, AnchorEvent, ConnectPort, PortDirection, PortId, World};
use atlas_runtime::{AnchorFeed, LoopReport, OverflowError, UpdateLoop, WorldHandle};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ReplayArgs;
use crate::events::{PlaceRecord, Record, Step};

/// What the world looked like once the log was drained.
#[derive(Debug, Serialize)]
pub struct ReplaySummary {
    pub anchors: usize,
    pub anchor_version: u64,
    pub primary_room: Option<String>,
    pub nodes: usize,
    pub ports: usize,
    pub links: usize,
    pub placed: usize,
    pub overflowed: u64,
    pub events_applied: u64,
    pub events_ignored: u64,
    pub events_rejected: u64,
    pub visible: Vec<VisibleSummary>,
}

#[derive(Debug, Serialize)]
pub struct VisibleSummary {
    pub node: u64,
    pub mesh: String,
    pub material: String,
    pub position: [f32; 3],
}

/// Scene-side numbers gathered on the writer task.
struct WorldCounts {
    anchors: usize,
    anchor_version: u64,
    primary_room: Option<String>,
    nodes: usize,
    ports: usize,
    links: usize,
    visible: Vec<VisibleSummary>,
}

impl WorldCounts {
    fn gather(world: &World) -> Self {
        Self {
            anchors: world.anchors().len(),
            anchor_version: world.anchors().version(),
            primary_room: world.anchors().primary_room().map(|id| id.to_string()),
            nodes: world.scene().len(),
            ports: world.connections().port_count(),
            links: world.connections().link_count(),
            visible: world
                .enumerate_visible()
                .into_iter()
                .map(|item| VisibleSummary {
                    node: item.node.0,
                    mesh: item.mesh,
                    material: item.material,
                    position: item.world.position().to_array(),
                })
                .collect(),
        }
    }
}

/// Per-run driver state.
struct Replayer {
    handle: WorldHandle,
    feed: AnchorFeed,
    cache: Option<TemplateCache>,
    /// Free Out port of the last placed piece, for `chain` placements.
    tail: Option<PortId>,
    placed: usize,
    overflowed: u64,
}

impl Replayer {
    /// Queues an anchor event, waiting for room when the feed is full.
    async fn feed(&mut self, event: AnchorEvent) -> Result<()> {
        match self.feed.push(event) {
            Ok(()) => Ok(()),
            Err(err @ OverflowError::Full { .. }) => {
                self.overflowed += 1;
                warn!(%err, "anchor feed full, waiting for the update loop");
                self.feed.send(err.into_event()).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn place(&mut self, place: &PlaceRecord) -> Result<()> {
        let Some(cache) = &self.cache else {
            bail!("`place` records need --templates");
        };
        let piece = self
            .handle
            .load_and_instantiate(cache, &place.template)
            .await?;
        let root = piece.root;

        if let Some(label) = &place.anchor {
            let anchor = make_anchor_id(label);
            self.handle
                .mutate(move |w| w.bind(root, anchor))
                .await?
                .with_context(|| format!("binding `{}` to anchor `{label}`", place.template))?;
        }

        let ports = piece.ports.clone();
        let (head, tail) = self
            .handle
            .query(move |w| {
                let first = |dir: PortDirection| {
                    ports
                        .iter()
                        .filter_map(|id| w.connections().port(*id))
                        .find(|p| p.direction() == dir)
                        .map(ConnectPort::id)
                };
                (first(PortDirection::In), first(PortDirection::Out))
            })
            .await?;

        if place.chain {
            match (self.tail, head) {
                (Some(out), Some(input)) => self.handle.connect(out, input).await?,
                (None, _) => warn!(template = %place.template, "nothing to chain onto"),
                (_, None) => warn!(template = %place.template, "template has no In port"),
            }
        }
        self.tail = tail;
        self.placed += 1;
        info!(template = %place.template, %root, nodes = piece.nodes.len(), "piece placed");
        Ok(())
    }
}

/// Replays `args.events` against a fresh world and returns the summary.
pub async fn run(args: &ReplayArgs, mut config: EngineConfig) -> Result<ReplaySummary> {
    if let Some(capacity) = args.capacity {
        config.event_queue_capacity = capacity;
    }
    config.validate()?;

    let text = tokio::fs::read_to_string(&args.events)
        .await
        .with_context(|| format!("reading {}", args.events.display()))?;
    let cache = args
        .templates
        .as_ref()
        .map(|dir| TemplateCache::new(FsResourceLoader::new(dir), config.template_parallelism));

    let world = World::with_padding(config.placement_padding);
    let (handle, feed, task) = UpdateLoop::spawn(world, &config);
    let mut replayer = Replayer {
        handle,
        feed,
        cache,
        tail: None,
        placed: 0,
        overflowed: 0,
    };

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step = serde_json::from_str::<Record>(line)
            .map_err(anyhow::Error::from)
            .and_then(Record::into_step)
            .with_context(|| format!("line {line_no}: bad record"))?;
        let applied = match step {
            Step::Anchor(event) => replayer.feed(event).await,
            Step::Place(place) => replayer.place(&place).await,
        };
        applied.with_context(|| format!("line {line_no}"))?;
    }

    let counts = replayer.handle.query(WorldCounts::gather).await?;
    let Replayer {
        handle,
        feed,
        placed,
        overflowed,
        ..
    } = replayer;
    drop(handle);
    drop(feed);
    let report: LoopReport = task.await.context("update loop panicked")?;

    Ok(ReplaySummary {
        anchors: counts.anchors,
        anchor_version: counts.anchor_version,
        primary_room: counts.primary_room,
        nodes: counts.nodes,
        ports: counts.ports,
        links: counts.links,
        placed,
        overflowed,
        events_applied: report.events_applied,
        events_ignored: report.events_ignored,
        events_rejected: report.events_rejected,
        visible: counts.visible,
    })
}

/// Human-readable rendering of a summary.
pub fn write_text(out: &mut impl Write, summary: &ReplaySummary) -> std::io::Result<()> {
    writeln!(
        out,
        "anchors  {} (version {})",
        summary.anchors, summary.anchor_version
    )?;
    writeln!(
        out,
        "primary  {}",
        summary.primary_room.as_deref().unwrap_or("none")
    )?;
    writeln!(
        out,
        "scene    {} nodes, {} ports, {} links, {} placed",
        summary.nodes, summary.ports, summary.links, summary.placed
    )?;
    writeln!(
        out,
        "events   {} applied, {} ignored, {} rejected, {} overflowed",
        summary.events_applied, summary.events_ignored, summary.events_rejected, summary.overflowed
    )?;
    writeln!(out, "visible  {}", summary.visible.len())?;
    for item in &summary.visible {
        let [x, y, z] = item.position;
        writeln!(
            out,
            "  node#{:<4} {} ({}) at [{x:.3}, {y:.3}, {z:.3}]",
            item.node, item.mesh, item.material
        )?;
    }
    Ok(())
}
