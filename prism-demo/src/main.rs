//! Prism demo - a GUI system driven for a few frames on the headless platform.
//!
//! Tree layout:
//! ```text
//! ROOT     window, renderer, cursors
//! └─ UI    GUI system, fonts, items
//! ```

mod cli;
mod logging;

use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use prism_headless::HeadlessRenderer;
use prism_imgui::{GUI_FONT, GUI_ITEM, GUI_SYSTEM, GuiSystem, MouseCursor};
use prism_kernel::prism_api::{CapabilityKind, Descriptor, Extent, TraitTag};
use prism_kernel::{Request, Thing, Unit};

use crate::cli::Args;
use crate::logging::setup_logging;

const FRAME_TIME: Duration = Duration::from_millis(16);

/// Cursor roles the platform provides; the rest fall back to the arrow.
const PLATFORM_CURSORS: [MouseCursor; 3] =
    [MouseCursor::Arrow, MouseCursor::TextInput, MouseCursor::Hand];

fn create(thing: &Rc<Thing>, request: Request) -> Result<Rc<dyn Unit>> {
    let target = request.target;
    let mut units = thing
        .create_unit(request)
        .with_context(|| format!("couldn't create {target}"))?;
    Ok(units.remove(0))
}

fn gui_settings(args: &Args) -> Descriptor {
    let mut descriptor = Descriptor::new();
    if let Some(path) = &args.settings {
        descriptor = descriptor.with(TraitTag::Path, path.display().to_string());
    }
    if let Some(style) = args.style {
        descriptor = descriptor.with(TraitTag::Style, style.to_string());
    }
    descriptor
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);
    tracing::info!("Starting Prism demo");

    let root = Thing::root();
    root.add_trait(TraitTag::Name, "ROOT");
    let runtime = root.create_runtime();
    prism_headless::register(&runtime);
    runtime.register(&prism_imgui::LIBRARY);

    root.load_module("Headless", &Descriptor::new())?;
    root.load_module("ImGui", &gui_settings(&args))
        .context("couldn't load the GUI module")?;

    let (width, height) = args.size;
    create(
        &root,
        Request::capability(
            CapabilityKind::Window,
            Descriptor::new()
                .with(TraitTag::Name, "Main window")
                .with(TraitTag::Size, Extent::new(width, height)),
        ),
    )?;
    let renderer = create(
        &root,
        Request::capability(CapabilityKind::Renderer, Descriptor::new()),
    )?;
    for role in PLATFORM_CURSORS {
        create(
            &root,
            Request::capability(
                CapabilityKind::Cursor,
                Descriptor::new().with(TraitTag::Name, role.role()),
            ),
        )?;
    }

    let ui = root.spawn_child();
    ui.add_trait(TraitTag::Name, "UI");
    let system = create(&ui, Request::unit(GUI_SYSTEM, Descriptor::new()))?;
    let system = system
        .downcast_ref::<GuiSystem>()
        .context("GUI system has an unexpected type")?;

    if let Some(font) = &args.font {
        let request = Request::unit(
            GUI_FONT,
            Descriptor::new()
                .with(TraitTag::Name, font.display().to_string())
                .with(TraitTag::Size, args.font_size)
                .with(TraitTag::Charset, args.charset.name()),
        );
        match ui.create_unit(request) {
            Ok(_) => tracing::info!(font = %font.display(), "Font loaded"),
            Err(error) => tracing::warn!(font = %font.display(), %error, "Font unavailable"),
        }
    }

    let items = ui.create_unit(Request::unit(
        GUI_ITEM,
        Descriptor::new()
            .with(TraitTag::Name, "Status")
            .with(TraitTag::Text, "Waiting for the first frame"),
    ))?;
    ui.create_unit(Request::unit(
        GUI_ITEM,
        Descriptor::new()
            .with(TraitTag::Name, "Links")
            .with(TraitTag::Text, "Hover to get a hand")
            .with(TraitTag::Cursor, MouseCursor::Hand.role()),
    ))?;
    let status = system
        .items()
        .into_iter()
        .find(|item| item.id() == items[0].id())
        .context("status item went missing")?;

    for _ in 0..args.frames {
        let tick = root.update(FRAME_TIME)?;
        status.set_text(format!("Frame {}", tick.0));
    }

    let renderer = renderer
        .downcast_ref::<HeadlessRenderer>()
        .context("renderer has an unexpected type")?;
    tracing::info!(
        frames = renderer.frame_count(),
        fonts = system.fonts().len(),
        items = system.items().len(),
        cursors = system.cursors().bound_count(),
        "Done"
    );
    root.dump_hierarchy();

    if args.dump_frame {
        let frame = renderer.last_frame().unwrap_or_default();
        println!("{}", serde_json::to_string_pretty(&frame)?);
    }
    Ok(())
}
