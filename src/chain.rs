//! The object chain: an owning, insertion-ordered registry of every live GPU
//! object.
//!
//! Linking allocates an object's GPU handles before the object becomes
//! reachable, unlinking releases them, and [`ObjectChain::tear_down`]
//! releases whatever is still linked in the order it was created. Storage is
//! a [`SlotMap`] so keys stay valid while neighbours come and go, and the
//! creation order is kept in a separate list so teardown never recurses.

use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::object::{GpuObject, ObjectKey};

/// Registry of linked GPU objects.
pub struct ObjectChain<O> {
    objects: SlotMap<ObjectKey, O>,
    order: Vec<ObjectKey>,
    initialized: bool,
}

impl<O: GpuObject> ObjectChain<O> {
    /// Create an empty, uninitialized chain.
    pub fn new() -> Self {
        Self {
            objects: SlotMap::with_key(),
            order: Vec::new(),
            initialized: false,
        }
    }

    /// Make the chain accept links.
    ///
    /// Returns `false` (and logs a warning) if it was already initialized.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            log::warn!("object chain is already initialized");
            return false;
        }
        self.initialized = true;
        log::debug!("object chain initialized");
        true
    }

    /// Whether [`initialize`](Self::initialize) has been called without a
    /// matching [`tear_down`](Self::tear_down).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Release every linked object in creation order and return the chain to
    /// its uninitialized state.
    ///
    /// Returns the number of objects released. Warns and releases nothing if
    /// the chain is not initialized.
    pub fn tear_down(&mut self, device: &O::Device) -> usize {
        if !self.initialized {
            log::warn!("object chain is not initialized (tear down)");
            return 0;
        }

        let mut released = 0;
        for key in self.order.drain(..) {
            if let Some(mut object) = self.objects.remove(key) {
                object.release(device);
                released += 1;
            }
        }
        self.initialized = false;
        log::debug!("object chain torn down, {released} objects released");
        released
    }

    /// Allocate `object` and append it to the chain.
    ///
    /// # Errors
    ///
    /// - [`Error::ChainNotInitialized`] if the chain does not accept links;
    ///   the object is dropped without being allocated.
    /// - Any error from [`GpuObject::allocate`]; the object is dropped and
    ///   nothing is linked.
    pub fn link(&mut self, device: &O::Device, mut object: O) -> Result<ObjectKey> {
        if !self.initialized {
            log::warn!("object chain is not initialized (link)");
            return Err(Error::ChainNotInitialized);
        }

        object.allocate(device)?;
        let kind = object.kind();
        let key = self.objects.insert(object);
        self.order.push(key);
        log::debug!("linked {kind} {key:?}");
        Ok(key)
    }

    /// Release the object behind `key` and remove it from the chain.
    ///
    /// The released object is handed back so the caller can inspect or drop
    /// it. Returns `None` for unknown keys and for an uninitialized chain.
    pub fn unlink(&mut self, device: &O::Device, key: ObjectKey) -> Option<O> {
        if !self.initialized {
            log::warn!("object chain is not initialized (unlink)");
            return None;
        }

        let mut object = self.objects.remove(key)?;
        object.release(device);
        self.order.retain(|linked| *linked != key);
        log::debug!("unlinked {} {key:?}", object.kind());
        Some(object)
    }

    /// Number of linked objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no objects are linked.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Whether `key` refers to a linked object.
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    /// Borrow a linked object.
    pub fn get(&self, key: ObjectKey) -> Option<&O> {
        self.objects.get(key)
    }

    /// Mutably borrow a linked object.
    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut O> {
        self.objects.get_mut(key)
    }

    /// Keys of all linked objects in creation order.
    pub fn keys(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.order.iter().copied()
    }
}

impl<O: GpuObject> Default for ObjectChain<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Drop for ObjectChain<O> {
    fn drop(&mut self) {
        if !self.objects.is_empty() {
            log::warn!(
                "object chain dropped with {} objects still linked; their GPU handles leak",
                self.objects.len()
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::object::ObjectKind;

    /// Records allocate/release calls by object id.
    #[derive(Default)]
    pub(crate) struct Journal {
        pub allocated: RefCell<Vec<u32>>,
        pub released: RefCell<Vec<u32>>,
        pub fail_next: RefCell<bool>,
    }

    pub(crate) struct Dummy {
        pub id: u32,
        pub kind: ObjectKind,
    }

    impl Dummy {
        pub fn new(id: u32) -> Self {
            Self {
                id,
                kind: ObjectKind::Texture,
            }
        }

        pub fn of_kind(id: u32, kind: ObjectKind) -> Self {
            Self { id, kind }
        }
    }

    impl GpuObject for Dummy {
        type Device = Journal;

        fn kind(&self) -> ObjectKind {
            self.kind
        }

        fn allocate(&mut self, device: &Journal) -> Result<()> {
            if device.fail_next.replace(false) {
                return Err(Error::Allocation("out of handles".into()));
            }
            device.allocated.borrow_mut().push(self.id);
            Ok(())
        }

        fn release(&mut self, device: &Journal) {
            device.released.borrow_mut().push(self.id);
        }
    }

    fn initialized_chain() -> ObjectChain<Dummy> {
        let mut chain = ObjectChain::new();
        assert!(chain.initialize());
        chain
    }

    #[test]
    fn link_allocates_before_insertion() {
        let journal = Journal::default();
        let mut chain = initialized_chain();
        let key = chain.link(&journal, Dummy::new(7)).unwrap();
        assert!(chain.contains(key));
        assert_eq!(*journal.allocated.borrow(), vec![7]);
        assert!(journal.released.borrow().is_empty());
        chain.tear_down(&journal);
    }

    #[test]
    fn link_before_initialize_is_rejected() {
        let journal = Journal::default();
        let mut chain = ObjectChain::<Dummy>::new();
        assert!(matches!(
            chain.link(&journal, Dummy::new(1)),
            Err(Error::ChainNotInitialized)
        ));
        assert!(chain.is_empty());
        assert!(journal.allocated.borrow().is_empty());
    }

    #[test]
    fn double_initialize_is_a_no_op() {
        let mut chain = initialized_chain();
        assert!(!chain.initialize());
        assert!(chain.is_initialized());
    }

    #[test]
    fn failed_allocation_links_nothing() {
        let journal = Journal::default();
        let mut chain = initialized_chain();
        *journal.fail_next.borrow_mut() = true;
        assert!(chain.link(&journal, Dummy::new(1)).is_err());
        assert!(chain.is_empty());
        assert_eq!(chain.tear_down(&journal), 0);
        assert!(journal.released.borrow().is_empty());
    }

    #[test]
    fn length_is_links_minus_unlinks() {
        let journal = Journal::default();
        let mut chain = initialized_chain();
        let keys: Vec<_> = (0..10)
            .map(|id| chain.link(&journal, Dummy::new(id)).unwrap())
            .collect();
        for key in keys.iter().step_by(3) {
            assert!(chain.unlink(&journal, *key).is_some());
        }
        assert_eq!(chain.len(), 10 - 4);
        chain.tear_down(&journal);
    }

    #[test]
    fn unlink_releases_once() {
        let journal = Journal::default();
        let mut chain = initialized_chain();
        let key = chain.link(&journal, Dummy::new(3)).unwrap();
        let object = chain.unlink(&journal, key).unwrap();
        assert_eq!(object.id, 3);
        assert!(chain.unlink(&journal, key).is_none());
        assert_eq!(*journal.released.borrow(), vec![3]);
        chain.tear_down(&journal);
        assert_eq!(*journal.released.borrow(), vec![3]);
    }

    #[test]
    fn tear_down_releases_exactly_the_linked_objects_in_creation_order() {
        let journal = Journal::default();
        let mut chain = initialized_chain();
        let keys: Vec<_> = (0..6)
            .map(|id| chain.link(&journal, Dummy::new(id)).unwrap())
            .collect();
        chain.unlink(&journal, keys[1]);
        chain.unlink(&journal, keys[4]);

        journal.released.borrow_mut().clear();
        assert_eq!(chain.tear_down(&journal), 4);
        assert_eq!(*journal.released.borrow(), vec![0, 2, 3, 5]);
        assert!(chain.is_empty());
        assert!(!chain.is_initialized());
    }

    #[test]
    fn tear_down_twice_releases_nothing_the_second_time() {
        let journal = Journal::default();
        let mut chain = initialized_chain();
        chain.link(&journal, Dummy::new(0)).unwrap();
        assert_eq!(chain.tear_down(&journal), 1);
        assert_eq!(chain.tear_down(&journal), 0);
        assert_eq!(journal.released.borrow().len(), 1);
    }

    #[test]
    fn chain_can_be_reinitialized_after_tear_down() {
        let journal = Journal::default();
        let mut chain = initialized_chain();
        chain.tear_down(&journal);
        assert!(chain.initialize());
        assert!(chain.link(&journal, Dummy::new(9)).is_ok());
        chain.tear_down(&journal);
    }

    #[test]
    fn keys_follow_creation_order() {
        let journal = Journal::default();
        let mut chain = initialized_chain();
        let a = chain.link(&journal, Dummy::new(0)).unwrap();
        let b = chain.link(&journal, Dummy::new(1)).unwrap();
        let c = chain.link(&journal, Dummy::new(2)).unwrap();
        chain.unlink(&journal, b);
        assert_eq!(chain.keys().collect::<Vec<_>>(), vec![a, c]);
        chain.tear_down(&journal);
    }

    #[test]
    fn large_chains_tear_down_without_recursion() {
        let journal = Journal::default();
        let mut chain = initialized_chain();
        for id in 0..100_000 {
            chain.link(&journal, Dummy::new(id)).unwrap();
        }
        assert_eq!(chain.tear_down(&journal), 100_000);
    }
}
