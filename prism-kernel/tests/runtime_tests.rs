//! Integration tests for production, seeking and dispatch.
//!
//! A small mock module produces three unit types:
//! - `Widget`: repeatable, fails when named "broken"
//! - `Label`: unique-keyed by name, reconfigurable
//! - `Screen`: repeatable, implements the `Window` capability

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use prism_kernel::prism_api::{
    CapabilityKind, CursorHandle, Descriptor, Extent, IdentityKey, NativeHandle, RuntimeError,
    Target, TraitTag, UnitKind,
};
use prism_kernel::{
    Factory, Keyed, Module, ModuleLibrary, Produced, Production, Request, SeekScope, Thing,
    UniqueKeyed, Unit, UnitCore, Verb, VerbKind, Window,
};

const WIDGET: UnitKind = UnitKind("Widget");
const LABEL: UnitKind = UnitKind("Label");
const SCREEN: UnitKind = UnitKind("Screen");

struct Widget {
    core: UnitCore,
}

impl Unit for Widget {
    fn kind(&self) -> UnitKind {
        WIDGET
    }

    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Produced for Widget {
    type Producer = MockModule;
    const KIND: UnitKind = WIDGET;

    fn construct(cx: &Production<'_, MockModule>) -> Result<Self, RuntimeError> {
        if cx.descriptor().text(TraitTag::Name) == Some("broken") {
            return Err(RuntimeError::construct("Widget", "refusing to build"));
        }
        cx.producer().constructed.set(cx.producer().constructed.get() + 1);
        Ok(Self {
            core: UnitCore::new(cx.descriptor()),
        })
    }
}

struct Label {
    core: UnitCore,
    text: RefCell<String>,
}

impl Unit for Label {
    fn kind(&self) -> UnitKind {
        LABEL
    }

    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Produced for Label {
    type Producer = MockModule;
    const KIND: UnitKind = LABEL;

    fn construct(cx: &Production<'_, MockModule>) -> Result<Self, RuntimeError> {
        Ok(Self {
            core: UnitCore::new(cx.descriptor()),
            text: RefCell::new(cx.descriptor().text(TraitTag::Text).unwrap_or("").to_string()),
        })
    }

    fn reconfigure(&self, cx: &Production<'_, MockModule>) -> Result<(), RuntimeError> {
        match cx.descriptor().text(TraitTag::Text) {
            Some("reject") => Err(RuntimeError::construct("Label", "rejected text")),
            text => {
                *self.text.borrow_mut() = text.unwrap_or("").to_string();
                Ok(())
            }
        }
    }
}

impl Keyed for Label {
    fn identity(descriptor: &Descriptor) -> Option<IdentityKey> {
        descriptor.text(TraitTag::Name).map(IdentityKey::new)
    }

    /// Surrounding whitespace in the text doesn't make a different label.
    fn normalize(descriptor: &Descriptor) -> Descriptor {
        let text = descriptor.text(TraitTag::Text).unwrap_or("").trim().to_string();
        descriptor.clone().with(TraitTag::Text, text)
    }
}

struct Screen {
    core: UnitCore,
    clipboard: RefCell<String>,
}

impl Unit for Screen {
    fn kind(&self) -> UnitKind {
        SCREEN
    }

    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_window(&self) -> Option<&(dyn Window + 'static)> {
        Some(self)
    }
}

impl Window for Screen {
    fn clipboard(&self) -> String {
        self.clipboard.borrow().clone()
    }

    fn set_clipboard(&self, text: &str) {
        *self.clipboard.borrow_mut() = text.to_string();
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle::default()
    }

    fn size(&self) -> Extent {
        Extent::new(640, 480)
    }

    fn set_cursor(&self, _: Option<CursorHandle>) {}
}

impl Produced for Screen {
    type Producer = MockModule;
    const KIND: UnitKind = SCREEN;
    const CAPABILITIES: &'static [CapabilityKind] = &[CapabilityKind::Window];

    fn construct(cx: &Production<'_, MockModule>) -> Result<Self, RuntimeError> {
        Ok(Self {
            core: UnitCore::new(cx.descriptor()),
            clipboard: RefCell::new(String::new()),
        })
    }
}

struct MockModule {
    widgets: RefCell<Factory<Widget>>,
    labels: RefCell<Factory<Label, UniqueKeyed>>,
    screens: RefCell<Factory<Screen>>,
    constructed: Cell<usize>,
}

static MOCK: ModuleLibrary = ModuleLibrary {
    name: "Mock",
    priority: 5,
    description: "test module",
    produces: &[
        Target::Unit(WIDGET),
        Target::Unit(LABEL),
        Target::Unit(SCREEN),
        Target::Capability(CapabilityKind::Window),
    ],
    instantiate: |_| {
        let module = Rc::new(MockModule {
            widgets: RefCell::new(Factory::new()),
            labels: RefCell::new(Factory::new()),
            screens: RefCell::new(Factory::new()),
            constructed: Cell::new(0),
        });
        LOADED.with(|loaded| *loaded.borrow_mut() = Some(module.clone()));
        Ok(module)
    },
};

thread_local! {
    /// Typed handle to the last instantiated mock module, for assertions.
    static LOADED: RefCell<Option<Rc<MockModule>>> = const { RefCell::new(None) };
}

static LOW: ModuleLibrary = ModuleLibrary {
    name: "Low",
    priority: 1,
    description: "lower priority module",
    produces: &[],
    instantiate: |_| Ok(Rc::new(Inert(&LOW))),
};

static HIGH: ModuleLibrary = ModuleLibrary {
    name: "High",
    priority: 20,
    description: "higher priority module",
    produces: &[],
    instantiate: |_| Ok(Rc::new(Inert(&HIGH))),
};

struct Inert(&'static ModuleLibrary);

impl Module for Inert {
    fn library(&self) -> &'static ModuleLibrary {
        self.0
    }

    fn act(self: Rc<Self>, _: &mut Verb) {}
}

impl Module for MockModule {
    fn library(&self) -> &'static ModuleLibrary {
        &MOCK
    }

    fn act(self: Rc<Self>, verb: &mut Verb) {
        match verb.kind() {
            VerbKind::Create => {
                self.widgets.borrow_mut().create(&self, verb);
                self.labels.borrow_mut().create(&self, verb);
                self.screens.borrow_mut().create(&self, verb);
            }
            VerbKind::Destroy => {
                self.widgets.borrow_mut().destroy(verb);
                self.labels.borrow_mut().destroy(verb);
                self.screens.borrow_mut().destroy(verb);
            }
            VerbKind::Draw => {}
        }
    }
}

/// Test harness: a root with a runtime and the mock module loaded.
struct Harness {
    root: Rc<Thing>,
    module: Rc<MockModule>,
}

impl Harness {
    fn new() -> Self {
        let root = Thing::root();
        let runtime = root.create_runtime();
        runtime.register(&MOCK);
        let loaded = root
            .load_module("mock", &Descriptor::new())
            .expect("Failed to load mock module");
        assert_eq!(loaded.name(), "Mock");

        let module = LOADED
            .with(|loaded| loaded.borrow_mut().take())
            .expect("mock module instantiated");
        Self { root, module }
    }

    fn named(name: &str) -> Descriptor {
        Descriptor::new().with(TraitTag::Name, name)
    }
}

#[test]
fn test_repeatable_production_is_additive() {
    let h = Harness::new();
    let first = h
        .root
        .create_unit(Request::unit(WIDGET, Harness::named("w")))
        .expect("first widget");
    let second = h
        .root
        .create_unit(Request::unit(WIDGET, Harness::named("w")))
        .expect("second widget");

    assert_ne!(first[0].id(), second[0].id());
    assert_eq!(h.module.widgets.borrow().len(), 2);
    assert_eq!(h.module.constructed.get(), 2);
    assert_eq!(h.root.units().len(), 2);
}

#[test]
fn test_count_produces_several_instances() {
    let h = Harness::new();
    let made = h
        .root
        .create_unit(Request::unit(WIDGET, Descriptor::new()).times(3))
        .expect("widgets");
    assert_eq!(made.len(), 3);
    assert_eq!(h.module.widgets.borrow().len(), 3);
}

#[test]
fn test_unique_keyed_production_is_idempotent() {
    let h = Harness::new();
    let descriptor = Harness::named("title").with(TraitTag::Text, "Hello");

    let first = h
        .root
        .create_unit(Request::unit(LABEL, descriptor.clone()))
        .expect("label");
    let again = h
        .root
        .create_unit(Request::unit(LABEL, descriptor))
        .expect("label again");

    assert_eq!(first[0].id(), again[0].id());
    let labels = h.module.labels.borrow();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels.generation(first[0].id()), Some(0));
}

#[test]
fn test_unique_keyed_changed_descriptor_reconfigures() {
    let h = Harness::new();
    let made = h
        .root
        .create_unit(Request::unit(
            LABEL,
            Harness::named("title").with(TraitTag::Text, "Hello"),
        ))
        .expect("label");
    let id = made[0].id();

    h.root
        .create_unit(Request::unit(
            LABEL,
            Harness::named("title").with(TraitTag::Text, "Bye"),
        ))
        .expect("relabel");

    let labels = h.module.labels.borrow();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels.generation(id), Some(1));
    let label = labels.find(&IdentityKey::new("title")).expect("keyed lookup");
    assert_eq!(label.text.borrow().as_str(), "Bye");
}

#[test]
fn test_unique_keyed_compares_normalized_descriptors() {
    let h = Harness::new();
    let made = h
        .root
        .create_unit(Request::unit(LABEL, Harness::named("title")))
        .expect("label");
    let id = made[0].id();

    for text in ["", "   "] {
        h.root
            .create_unit(Request::unit(
                LABEL,
                Harness::named("title").with(TraitTag::Text, text),
            ))
            .expect("same label");
    }
    assert_eq!(h.module.labels.borrow().generation(id), Some(0));

    h.root
        .create_unit(Request::unit(
            LABEL,
            Harness::named("title").with(TraitTag::Text, " Hi "),
        ))
        .expect("relabel");
    assert_eq!(h.module.labels.borrow().generation(id), Some(1));
}

#[test]
fn test_unit_debug_names_the_unit() {
    let h = Harness::new();
    let made = h
        .root
        .create_unit(Request::unit(LABEL, Harness::named("title")))
        .expect("label");
    let debug = format!("{:?}", made[0]);
    assert!(debug.contains("Label"), "{debug}");
    assert!(debug.contains("title"), "{debug}");
}

#[test]
fn test_failed_reconfigure_keeps_previous_state() {
    let h = Harness::new();
    let made = h
        .root
        .create_unit(Request::unit(
            LABEL,
            Harness::named("title").with(TraitTag::Text, "Hello"),
        ))
        .expect("label");
    let id = made[0].id();

    let result = h.root.create_unit(Request::unit(
        LABEL,
        Harness::named("title").with(TraitTag::Text, "reject"),
    ));
    assert!(matches!(result, Err(RuntimeError::Construct { .. })));

    let labels = h.module.labels.borrow();
    assert_eq!(labels.generation(id), Some(0));
    assert_eq!(labels.get(id).unwrap().text.borrow().as_str(), "Hello");
}

#[test]
fn test_batch_failure_keeps_siblings() {
    let h = Harness::new();
    let mut verb = Verb::create()
        .with(Request::unit(WIDGET, Harness::named("a")))
        .with(Request::unit(WIDGET, Harness::named("broken")))
        .with(Request::unit(WIDGET, Harness::named("c")));
    h.root.run(&mut verb).expect("verb dispatched");

    assert_eq!(verb.outputs().len(), 2);
    assert_eq!(verb.failures().len(), 1);
    assert!(verb.failures()[0].is_construct());
    assert_eq!(h.module.widgets.borrow().len(), 2);
    assert!(verb.requests().iter().all(|request| request.is_handled()));
}

#[test]
fn test_destroy_removes_exactly_one_instance() {
    let h = Harness::new();
    let made = h
        .root
        .create_unit(Request::unit(WIDGET, Descriptor::new()).times(2))
        .expect("widgets");
    let doomed = made[0].id();
    let survivor = made[1].id();
    let weak = Rc::downgrade(&made[0]);
    drop(made);

    let mut verb = Verb::destroy().with(Request::instance(doomed));
    h.root.run(&mut verb).expect("destroy dispatched");

    assert!(verb.is_done());
    assert!(weak.upgrade().is_none(), "instance outlived destroy");
    let widgets = h.module.widgets.borrow();
    assert!(widgets.get(doomed).is_none());
    assert!(widgets.get(survivor).is_some());
    assert_eq!(h.root.units().len(), 1);
}

#[test]
fn test_destroy_by_key() {
    let h = Harness::new();
    h.root
        .create_unit(Request::unit(LABEL, Harness::named("a")))
        .expect("a");
    h.root
        .create_unit(Request::unit(LABEL, Harness::named("b")))
        .expect("b");

    let mut verb = Verb::destroy().with(Request::unit(LABEL, Harness::named("a")));
    h.root.run(&mut verb).expect("destroy dispatched");

    let labels = h.module.labels.borrow();
    assert_eq!(labels.len(), 1);
    assert!(labels.find(&IdentityKey::new("a")).is_none());
    assert!(labels.find(&IdentityKey::new("b")).is_some());
}

#[test]
fn test_unhandled_target_reports_error() {
    let h = Harness::new();
    let result = h
        .root
        .create_unit(Request::unit(UnitKind("Nope"), Descriptor::new()));
    assert_eq!(result.err(), Some(RuntimeError::Unhandled(Target::Unit(UnitKind("Nope")))));
}

#[test]
fn test_mixed_verb_reports_unhandled_alongside_success() {
    let h = Harness::new();
    let mut verb = Verb::create()
        .with(Request::unit(WIDGET, Descriptor::new()))
        .with(Request::capability(CapabilityKind::Renderer, Descriptor::new()));
    h.root.run(&mut verb).expect("partially routed verb is not an error");

    assert_eq!(verb.outputs().len(), 1);
    assert_eq!(
        verb.failures(),
        &[RuntimeError::Unhandled(Target::Capability(CapabilityKind::Renderer))]
    );
}

#[test]
fn test_capability_request_routes_to_implementor() {
    let h = Harness::new();
    let made = h
        .root
        .create_unit(Request::capability(CapabilityKind::Window, Descriptor::new()))
        .expect("window");
    assert!(made[0].as_window().is_some());
    assert_eq!(made[0].kind(), SCREEN);
}

#[test]
fn test_seek_prefers_nearest_provider() {
    let h = Harness::new();
    let child = h.root.spawn_child();
    let grandchild = child.spawn_child();

    h.root
        .create_unit(Request::unit(SCREEN, Harness::named("far")))
        .expect("far screen");
    let near = child
        .create_unit(Request::unit(SCREEN, Harness::named("near")))
        .expect("near screen");

    let found = prism_kernel::seek::<dyn Window>(
        &grandchild,
        &Descriptor::new(),
        None,
        SeekScope::HereAndAbove,
    )
    .expect("a window is reachable");
    assert_eq!(found.id(), near[0].id());
}

#[test]
fn test_seek_honors_hints_and_tags() {
    let h = Harness::new();
    let child = h.root.spawn_child();
    let far = h
        .root
        .create_unit(Request::unit(SCREEN, Harness::named("far")))
        .expect("far screen");
    child
        .create_unit(Request::unit(SCREEN, Harness::named("near")))
        .expect("near screen");

    let hinted = Descriptor::new().with_hint(far[0].id());
    let found = prism_kernel::seek::<dyn Window>(&child, &hinted, None, SeekScope::Here)
        .expect("hint wins");
    assert_eq!(found.id(), far[0].id());

    let tagged = prism_kernel::seek::<dyn Window>(
        &child,
        &Descriptor::new(),
        Some("far"),
        SeekScope::HereAndAbove,
    )
    .expect("tag skips the nearer screen");
    assert_eq!(found.id(), tagged.id());
}

#[test]
fn test_seek_everywhere_searches_sibling_branches() {
    let h = Harness::new();
    let left = h.root.spawn_child();
    let right = h.root.spawn_child();
    let made = right
        .create_unit(Request::unit(SCREEN, Descriptor::new()))
        .expect("screen");

    assert!(
        prism_kernel::seek::<dyn Window>(&left, &Descriptor::new(), None, SeekScope::HereAndAbove)
            .is_none()
    );
    let found =
        prism_kernel::seek::<dyn Window>(&left, &Descriptor::new(), None, SeekScope::Everywhere)
            .expect("sibling branch is searched");
    assert_eq!(found.id(), made[0].id());
}

#[test]
fn test_capability_ref_does_not_keep_unit_alive() {
    let h = Harness::new();
    let made = h
        .root
        .create_unit(Request::unit(SCREEN, Descriptor::new()))
        .expect("screen");
    let id = made[0].id();
    let found = prism_kernel::require::<dyn Window>("Test", &h.root, &Descriptor::new(), None)
        .expect("window");
    drop(made);

    found.with(|window| window.set_clipboard("copied"));
    assert_eq!(found.with(|window| window.clipboard()).as_deref(), Some("copied"));

    let mut verb = Verb::destroy().with(Request::instance(id));
    h.root.run(&mut verb).expect("destroy dispatched");
    assert!(!found.is_alive());
    assert!(found.with(|window| window.size()).is_none());

    let missing = prism_kernel::require::<dyn Window>("Test", &h.root, &Descriptor::new(), None);
    assert!(matches!(missing, Err(RuntimeError::Construct { unit: "Test", .. })));
}

#[test]
fn test_modules_ordered_by_priority() {
    let root = Thing::root();
    let runtime = root.create_runtime();
    runtime.register(&LOW);
    runtime.register(&MOCK);
    runtime.register(&HIGH);

    root.load_module("Low", &Descriptor::new()).unwrap();
    root.load_module("High", &Descriptor::new()).unwrap();
    root.load_module("Mock", &Descriptor::new()).unwrap();
    let again = root.load_module("HIGH", &Descriptor::new()).unwrap();

    let names: Vec<_> = runtime.modules().iter().map(|module| module.name()).collect();
    assert_eq!(names, vec!["High", "Mock", "Low"]);
    assert!(Rc::ptr_eq(&again, &runtime.module("high").unwrap()));

    assert_eq!(
        root.load_module("Missing", &Descriptor::new()).err(),
        Some(RuntimeError::UnknownModule("Missing".to_string()))
    );
}

#[test]
fn test_update_advances_ticks() {
    let h = Harness::new();
    let first = h.root.update(std::time::Duration::from_millis(16)).unwrap();
    let second = h.root.update(std::time::Duration::from_millis(16)).unwrap();
    assert_eq!(second.0, first.0 + 1);
}
