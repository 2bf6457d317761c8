// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mutation/query entry points and published read views.
use std::sync::Arc;

use atlas_assets::{TemplateCache, TemplateLoadError};
use atlas_core::{
    AnchorSnapshot, Instantiated, NodeId, NodeSpec, NodeTemplate, PortDirection, PortId,
    SpatialIndex, VisibleItem, World, WorldError,
};
use atlas_geom::Pose;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// Closure queued for the writer task.
pub(crate) enum Command {
    Mutate(Box<dyn FnOnce(&mut World) + Send>),
    Query(Box<dyn FnOnce(&World) + Send>),
}

/// Read views republished after every committed change.
#[derive(Debug, Clone, Default)]
pub struct PublishedViews {
    /// Anchors at the latest committed version.
    pub anchors: AnchorSnapshot,
    /// Spatial index matching `anchors`.
    pub spatial: Arc<SpatialIndex>,
    /// Number of commits (anchor events and mutations) so far.
    pub commits: u64,
}

/// Errors surfaced by [`WorldHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The update loop has stopped.
    #[error("update loop has stopped")]
    Closed,
    /// The world rejected the mutation.
    #[error(transparent)]
    World(#[from] WorldError),
    /// A template could not be loaded.
    #[error(transparent)]
    Template(#[from] TemplateLoadError),
}

/// Cloneable entry point into a running [`crate::UpdateLoop`].
#[derive(Debug, Clone)]
pub struct WorldHandle {
    commands: mpsc::Sender<Command>,
    views: watch::Receiver<PublishedViews>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Mutate(_) => "Mutate",
            Self::Query(_) => "Query",
        })
    }
}

impl WorldHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        views: watch::Receiver<PublishedViews>,
    ) -> Self {
        Self { commands, views }
    }

    /// Runs `f` against the world on the writer task and returns its result.
    pub async fn mutate<F, R>(&self, f: F) -> Result<R, RuntimeError>
    where
        F: FnOnce(&mut World) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let command = Command::Mutate(Box::new(move |world| {
            let _ = tx.send(f(world));
        }));
        self.commands
            .send(command)
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    /// Runs a read-only `f` on the writer task, ordered after everything queued
    /// before it.
    pub async fn query<F, R>(&self, f: F) -> Result<R, RuntimeError>
    where
        F: FnOnce(&World) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let command = Command::Query(Box::new(move |world| {
            let _ = tx.send(f(world));
        }));
        self.commands
            .send(command)
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    /// Creates a scene node.
    pub async fn create_node(&self, spec: NodeSpec) -> Result<NodeId, RuntimeError> {
        Ok(self
            .mutate(move |w| w.create_node(spec))
            .await?
            .map_err(WorldError::from)?)
    }

    /// Destroys a node and its subtree, unlinking their ports.
    pub async fn destroy(&self, node: NodeId) -> Result<Vec<NodeId>, RuntimeError> {
        Ok(self
            .mutate(move |w| w.destroy(node))
            .await?
            .map_err(WorldError::from)?)
    }

    /// Adds a connect port.
    pub async fn add_port(
        &self,
        node: NodeId,
        direction: PortDirection,
        tag: impl Into<String>,
        local: Pose,
    ) -> Result<PortId, RuntimeError> {
        let tag = tag.into();
        Ok(self
            .mutate(move |w| w.add_port(node, direction, tag, local))
            .await?
            .map_err(WorldError::from)?)
    }

    /// Links two ports.
    pub async fn connect(&self, out: PortId, input: PortId) -> Result<(), RuntimeError> {
        Ok(self
            .mutate(move |w| w.connect(out, input))
            .await?
            .map_err(WorldError::from)?)
    }

    /// Unlinks a port.
    pub async fn disconnect(&self, port: PortId) -> Result<(), RuntimeError> {
        Ok(self
            .mutate(move |w| w.disconnect(port))
            .await?
            .map_err(WorldError::from)?)
    }

    /// Moves a node (and its downstream chain).
    pub async fn set_local_transform(&self, node: NodeId, local: Pose) -> Result<(), RuntimeError> {
        Ok(self
            .mutate(move |w| w.set_local_transform(node, local))
            .await??)
    }

    /// Deep-clones an already loaded template into the world.
    pub async fn instantiate(
        &self,
        template: Arc<NodeTemplate>,
    ) -> Result<Instantiated, RuntimeError> {
        self.mutate(move |w| w.instantiate(&template)).await
    }

    /// Loads `name` through `cache` off the writer task, then instantiates it.
    pub async fn load_and_instantiate(
        &self,
        cache: &TemplateCache,
        name: &str,
    ) -> Result<Instantiated, RuntimeError> {
        let template = cache.load(name).await?;
        self.instantiate(template).await
    }

    /// Render list at the current state.
    pub async fn enumerate_visible(&self) -> Result<Vec<VisibleItem>, RuntimeError> {
        self.query(World::enumerate_visible).await
    }

    /// Latest published views.
    pub fn views(&self) -> PublishedViews {
        self.views.borrow().clone()
    }

    /// Latest published spatial index. Answers without touching the writer task.
    pub fn spatial(&self) -> Arc<SpatialIndex> {
        Arc::clone(&self.views.borrow().spatial)
    }

    /// Latest published anchor snapshot.
    pub fn anchors(&self) -> AnchorSnapshot {
        self.views.borrow().anchors.clone()
    }

    /// Waits until the published anchor snapshot reaches `version`.
    pub async fn wait_for_anchor_version(
        &self,
        version: u64,
    ) -> Result<PublishedViews, RuntimeError> {
        let mut views = self.views.clone();
        let ready = views
            .wait_for(|v| v.anchors.version() >= version)
            .await
            .map_err(|_| RuntimeError::Closed)?;
        Ok(ready.clone())
    }
}
