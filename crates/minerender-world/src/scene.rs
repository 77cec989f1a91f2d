//! Scene container with an instance cache.
//!
//! The scene owns every renderable object added to it. Objects built for a
//! keyed asset with instancing requested are registered in an
//! [`InstancePool`]: the object is built and initialised once, and every later
//! request for the same key receives a lightweight [`InstanceRef`] onto it.

use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering},
    },
};

use glam::Vec3;
use minerender_assets::{AssetKey, BlockState};
use tokio::sync::OnceCell;

use crate::error::Result;

/// Future type for object initialisation.
pub type InitFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A renderable object managed by a [`Scene`].
pub trait SceneObject: Send + Sync + 'static {
    /// Asynchronous setup (texture resolution, buffer creation). The scene
    /// runs this to completion before anyone else sees the object.
    fn init(&self) -> InitFuture<'_>;

    /// Position in scene units.
    fn position(&self) -> Vec3;

    /// Move the object, in scene units.
    fn set_position(&self, position: Vec3);

    /// Human-readable name for log output.
    fn label(&self) -> String;

    /// Access to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Something that can be turned into a scene object.
pub trait SceneAsset {
    /// Identity used for instancing. Unkeyed assets are never pooled.
    fn asset_key(&self) -> Option<&AssetKey>;
}

impl SceneAsset for AssetKey {
    fn asset_key(&self) -> Option<&AssetKey> {
        Some(self)
    }
}

impl SceneAsset for BlockState {
    fn asset_key(&self) -> Option<&AssetKey> {
        self.key.as_ref()
    }
}

/// Options for [`Scene::add_scene_object`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Share one built object between every request with the same key.
    pub instance: bool,
}

impl AddOptions {
    #[must_use]
    pub fn instanced() -> Self {
        Self { instance: true }
    }
}

/// Identifier of an object in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

/// One built object shared by many placements.
pub struct InstancePool {
    key: String,
    id: ObjectId,
    object: Arc<dyn SceneObject>,
    next_index: AtomicU32,
    transforms: Mutex<BTreeMap<u32, Vec3>>,
}

impl fmt::Debug for InstancePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstancePool")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("live", &self.live_instances())
            .finish_non_exhaustive()
    }
}

impl InstancePool {
    fn new(key: String, id: ObjectId, object: Arc<dyn SceneObject>) -> Self {
        Self {
            key,
            id,
            object,
            next_index: AtomicU32::new(0),
            transforms: Mutex::new(BTreeMap::new()),
        }
    }

    /// Hand out a new instance. Never rebuilds the shared object.
    #[must_use]
    pub fn next_instance(self: &Arc<Self>) -> InstanceRef {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        self.transforms().insert(index, self.object.position());
        InstanceRef {
            pool: Arc::clone(self),
            index,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The shared object.
    #[must_use]
    pub fn object(&self) -> &Arc<dyn SceneObject> {
        &self.object
    }

    /// Number of instances handed out and not yet released.
    #[must_use]
    pub fn live_instances(&self) -> usize {
        self.transforms().len()
    }

    /// Positions of every live instance, by instance index.
    #[must_use]
    pub fn instance_positions(&self) -> Vec<(u32, Vec3)> {
        self.transforms().iter().map(|(i, p)| (*i, *p)).collect()
    }

    fn release(&self, index: u32) -> bool {
        self.transforms().remove(&index).is_some()
    }

    fn transforms(&self) -> MutexGuard<'_, BTreeMap<u32, Vec3>> {
        self.transforms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A placement multiplexed onto a pooled object.
#[derive(Clone)]
pub struct InstanceRef {
    pool: Arc<InstancePool>,
    index: u32,
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRef")
            .field("key", &self.pool.key)
            .field("index", &self.index)
            .finish()
    }
}

impl InstanceRef {
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<InstancePool> {
        &self.pool
    }

    /// Position of this instance, or `None` once released.
    #[must_use]
    pub fn position(&self) -> Option<Vec3> {
        self.pool.transforms().get(&self.index).copied()
    }

    pub fn set_position(&self, position: Vec3) {
        if let Some(slot) = self.pool.transforms().get_mut(&self.index) {
            *slot = position;
        }
    }
}

/// What the scene hands back for an added object.
#[derive(Clone)]
pub enum SceneHandle {
    /// A standalone object.
    Object {
        id: ObjectId,
        object: Arc<dyn SceneObject>,
    },
    /// An instance of a pooled object.
    Instance(InstanceRef),
}

impl fmt::Debug for SceneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneHandle::Object { id, object } => f
                .debug_struct("Object")
                .field("id", id)
                .field("label", &object.label())
                .finish(),
            SceneHandle::Instance(instance) => fmt::Debug::fmt(instance, f),
        }
    }
}

impl SceneHandle {
    /// The underlying object, shared for instances.
    #[must_use]
    pub fn object(&self) -> &Arc<dyn SceneObject> {
        match self {
            SceneHandle::Object { object, .. } => object,
            SceneHandle::Instance(instance) => &instance.pool.object,
        }
    }

    #[must_use]
    pub fn is_instance(&self) -> bool {
        matches!(self, SceneHandle::Instance(_))
    }

    /// Position in scene units.
    #[must_use]
    pub fn position(&self) -> Option<Vec3> {
        match self {
            SceneHandle::Object { object, .. } => Some(object.position()),
            SceneHandle::Instance(instance) => instance.position(),
        }
    }

    /// Move this placement, in scene units.
    pub fn set_position(&self, position: Vec3) {
        match self {
            SceneHandle::Object { object, .. } => object.set_position(position),
            SceneHandle::Instance(instance) => instance.set_position(position),
        }
    }
}

/// Counters describing scene contents.
#[derive(Debug, Default)]
pub struct SceneStats {
    object_count: AtomicUsize,
    pool_count: AtomicUsize,
    instance_count: AtomicUsize,
}

/// A point-in-time copy of [`SceneStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStatsSnapshot {
    /// Objects in the scene graph, pooled or not.
    pub object_count: usize,
    /// Registered instance pools.
    pub pool_count: usize,
    /// Live instance handles across all pools.
    pub instance_count: usize,
}

type PoolSlot = Arc<OnceCell<Arc<InstancePool>>>;

/// Scene graph plus instance cache.
#[derive(Default)]
pub struct Scene {
    objects: Mutex<HashMap<ObjectId, Arc<dyn SceneObject>>>,
    instance_cache: Mutex<HashMap<String, PoolSlot>>,
    next_id: AtomicU64,
    stats: SceneStats,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an already initialised object to the scene graph.
    pub fn add(&self, object: Arc<dyn SceneObject>) -> ObjectId {
        let id = ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(?id, object = %object.label(), "adding to scene");
        self.objects().insert(id, object);
        self.stats.object_count.fetch_add(1, Ordering::Relaxed);
        id
    }

    /// Initialise an object, then add it.
    pub async fn init_and_add(&self, object: Arc<dyn SceneObject>) -> Result<ObjectId> {
        object.init().await?;
        Ok(self.add(object))
    }

    /// Build, initialise and add an object for `asset`, or reuse a pooled one.
    ///
    /// With instancing requested and a keyed asset, the first call for a key
    /// builds the object and registers a pool; every call returns a fresh
    /// [`InstanceRef`]. The pool slot is reserved before the build is awaited,
    /// so concurrent first requests wait for one build instead of racing. A
    /// failed build leaves the slot empty for the next caller to retry.
    ///
    /// Otherwise the object is always built and returned directly.
    pub async fn add_scene_object<A, F, Fut>(
        &self,
        asset: &A,
        build: F,
        options: AddOptions,
    ) -> Result<SceneHandle>
    where
        A: SceneAsset + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn SceneObject>>>,
    {
        let key = match asset.asset_key() {
            Some(key) if options.instance => key.serialize(),
            _ => {
                let object = build().await?;
                let id = self.init_and_add(Arc::clone(&object)).await?;
                return Ok(SceneHandle::Object { id, object });
            }
        };

        let slot = Arc::clone(self.instance_cache().entry(key.clone()).or_default());
        let pool = slot
            .get_or_try_init(|| async {
                tracing::debug!(key, "building pooled object");
                let object = build().await?;
                let id = self.init_and_add(Arc::clone(&object)).await?;
                self.stats.pool_count.fetch_add(1, Ordering::Relaxed);
                Ok::<_, crate::Error>(Arc::new(InstancePool::new(key.clone(), id, object)))
            })
            .await?;

        self.stats.instance_count.fetch_add(1, Ordering::Relaxed);
        Ok(SceneHandle::Instance(pool.next_instance()))
    }

    /// Release a handle obtained from this scene.
    ///
    /// Standalone objects leave the scene graph. Instances free their slot;
    /// the pooled object stays so later requests never rebuild it.
    pub fn release(&self, handle: &SceneHandle) {
        match handle {
            SceneHandle::Object { id, .. } => {
                if self.objects().remove(id).is_some() {
                    self.stats.object_count.fetch_sub(1, Ordering::Relaxed);
                }
            }
            SceneHandle::Instance(instance) => {
                if instance.pool.release(instance.index) {
                    self.stats.instance_count.fetch_sub(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// The pool registered for a serialized key, if its build has finished.
    #[must_use]
    pub fn pool(&self, key: &str) -> Option<Arc<InstancePool>> {
        self.instance_cache()
            .get(key)
            .and_then(|slot| slot.get().cloned())
    }

    /// Whether `id` is in the scene graph.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects().contains_key(&id)
    }

    #[must_use]
    pub fn stats(&self) -> SceneStatsSnapshot {
        SceneStatsSnapshot {
            object_count: self.stats.object_count.load(Ordering::Relaxed),
            pool_count: self.stats.pool_count.load(Ordering::Relaxed),
            instance_count: self.stats.instance_count.load(Ordering::Relaxed),
        }
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<ObjectId, Arc<dyn SceneObject>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn instance_cache(&self) -> MutexGuard<'_, HashMap<String, PoolSlot>> {
        self.instance_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
