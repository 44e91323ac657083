#![allow(clippy::unwrap_used)]

use std::cell::RefCell;

use canvas_gl::{Error, GpuObject, ObjectChain, ObjectKind, ObjectLibrary, Result};

/// Remembers the order objects were released in.
#[derive(Default)]
struct Log {
    released: RefCell<Vec<&'static str>>,
}

struct Fake {
    name: &'static str,
    kind: ObjectKind,
}

impl Fake {
    fn new(name: &'static str, kind: ObjectKind) -> Self {
        Self { name, kind }
    }
}

impl GpuObject for Fake {
    type Device = Log;

    fn kind(&self) -> ObjectKind {
        self.kind
    }

    fn allocate(&mut self, _device: &Log) -> Result<()> {
        Ok(())
    }

    fn release(&mut self, device: &Log) {
        device.released.borrow_mut().push(self.name);
    }
}

fn chain() -> ObjectChain<Fake> {
    let mut chain = ObjectChain::new();
    chain.initialize();
    chain
}

#[test]
fn length_tracks_links_and_unlinks() {
    let log = Log::default();
    let mut chain = chain();
    let keys: Vec<_> = ["a", "b", "c", "d", "e"]
        .into_iter()
        .map(|name| chain.link(&log, Fake::new(name, ObjectKind::Texture)).unwrap())
        .collect();
    chain.unlink(&log, keys[1]);
    chain.unlink(&log, keys[3]);
    assert_eq!(chain.len(), 3);
    assert!(chain.unlink(&log, keys[1]).is_none());
    assert_eq!(chain.len(), 3);

    assert_eq!(chain.tear_down(&log), 3);
    assert_eq!(*log.released.borrow(), vec!["b", "d", "a", "c", "e"]);
}

#[test]
fn library_reuses_names_and_checks_kinds() {
    let log = Log::default();
    let mut chain = chain();
    let mut library = ObjectLibrary::new();

    let first = library
        .create(&mut chain, &log, "screen", ObjectKind::Canvas, || {
            Ok(Fake::new("screen", ObjectKind::Canvas))
        })
        .unwrap();
    let second = library
        .create(&mut chain, &log, "screen", ObjectKind::Canvas, || {
            panic!("an existing name must not build a new object")
        })
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(library.len(), 1);
    assert_eq!(chain.len(), 1);

    assert_eq!(library.find(&chain, "screen", ObjectKind::RenderTexture).unwrap(), first);
    assert!(matches!(
        library.find(&chain, "screen", ObjectKind::Shader),
        Err(Error::WrongKind { found: ObjectKind::Canvas, requested: ObjectKind::Shader, .. })
    ));
    assert!(matches!(library.find(&chain, "nothing", ObjectKind::Texture), Err(Error::NotFound(_))));

    chain.tear_down(&log);
}

#[test]
fn defaults_survive_delete_until_tear_down() {
    let log = Log::default();
    let mut chain = chain();
    let mut library = ObjectLibrary::new();
    library
        .create(&mut chain, &log, "quad", ObjectKind::VertexArray, || {
            Ok(Fake::new("quad", ObjectKind::VertexArray))
        })
        .unwrap();
    library.mark_default("quad");
    library
        .create(&mut chain, &log, "ship", ObjectKind::Texture, || {
            Ok(Fake::new("ship", ObjectKind::Texture))
        })
        .unwrap();

    assert!(!library.delete(&mut chain, &log, "quad"));
    assert!(library.delete(&mut chain, &log, "ship"));
    assert!(!library.contains("ship"));
    assert_eq!(*log.released.borrow(), vec!["ship"]);

    library.clear();
    chain.tear_down(&log);
    assert_eq!(*log.released.borrow(), vec!["ship", "quad"]);
}
