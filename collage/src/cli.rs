//! The subcommands. Each loads what it needs, does one thing through the command queue, and saves.

use std::path::{Path, PathBuf};

use anyhow::Context;
use collage_core::{
    boundary::{DocumentChange, LinePointBoundary},
    commands::{CommandError, LayerCommand, ShapeCommand},
    io,
    queue::CollageQueue,
    resource::ResourceIdentifier,
    state::{
        events::{Event, Filter},
        shape::ShapeKind,
        Collage, Shape,
    },
    util::Point,
};

use crate::global::{self, preferences::Preferences};

pub const USAGE: &str = "\
usage:
    collage info <collage>...
    collage edit <collage> <resource> <start line> <old last line> <new last line> [deleted]
    collage note <collage> <resource> <line> <text>...
    collage rect <collage> <resource> <top line> <bottom line>
    collage new-layer <collage> [name]
    collage import <collage> <other>...
    collage export <collage> <out>";

#[derive(thiserror::Error, Debug)]
#[error("expected {0}\n\n{USAGE}")]
pub struct UsageError(&'static str);

/// Pops arguments in order, failing with usage help on anything missing or malformed.
pub struct Args(std::vec::IntoIter<std::ffi::OsString>);
impl Args {
    #[must_use]
    pub fn new(args: Vec<std::ffi::OsString>) -> Self {
        Self(args.into_iter())
    }
    fn path(&mut self, what: &'static str) -> Result<PathBuf, UsageError> {
        self.0.next().map(Into::into).ok_or(UsageError(what))
    }
    fn string(&mut self, what: &'static str) -> Result<String, UsageError> {
        self.0
            .next()
            .and_then(|arg| arg.into_string().ok())
            .ok_or(UsageError(what))
    }
    fn line(&mut self, what: &'static str) -> Result<u32, UsageError> {
        self.string(what)?
            .parse()
            .ok()
            .filter(|line| *line > 0)
            .ok_or(UsageError(what))
    }
    fn rest(&mut self) -> Vec<std::ffi::OsString> {
        self.0.by_ref().collect()
    }
}

/// Load every path in parallel into the global provider. Returns how many failed.
fn open_all(paths: Vec<PathBuf>) -> usize {
    use rayon::iter::{IntoParallelIterator, ParallelIterator};
    paths
        .into_par_iter()
        .filter(|path| {
            let try_block = || -> Result<CollageQueue, io::Error> {
                io::load(path).map(CollageQueue::from_collage)
            };
            match try_block() {
                Err(e) => {
                    log::error!("failed to open collage {path:?}: {e:#}");
                    true
                }
                Ok(queue) => {
                    // Same file named twice, the first one wins.
                    let _ = global::provider().insert(path.clone(), queue);
                    false
                }
            }
        })
        .count()
}

pub fn info(mut args: Args) -> anyhow::Result<()> {
    let paths: Vec<PathBuf> = args.rest().into_iter().map(Into::into).collect();
    if paths.is_empty() {
        return Err(UsageError("at least one collage").into());
    }
    let failed = open_all(paths);
    for path in global::provider().document_iter() {
        global::provider().inspect(&path, |queue| {
            queue.read(|collage| print!("{}", outline(&path, collage)));
        });
    }
    if failed > 0 {
        anyhow::bail!("{failed} collage(s) failed to open");
    }
    Ok(())
}

fn outline(path: &Path, collage: &Collage) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let _ = writeln!(out, "{}", path.display());
    for warning in collage.dependency_warnings() {
        let _ = writeln!(out, "  ! {warning}");
    }
    for layer in collage.layers().collect::<Vec<_>>().into_iter().rev() {
        let active = if collage.is_active(layer.id()) { " *" } else { "" };
        let hidden = if layer.is_visible() { "" } else { " (hidden)" };
        let _ = writeln!(out, "  {}{hidden}{active}", layer.name());
        for list in layer.populated_shape_lists() {
            let _ = writeln!(out, "    {}", list.resource());
            for shape in list.shapes().filter_map(|id| collage.shape(id)) {
                let _ = writeln!(out, "      {shape}");
            }
            for unknown in list.unknown() {
                let _ = writeln!(
                    out,
                    "      unrecognized {}",
                    unknown.type_name().unwrap_or("shape")
                );
            }
        }
    }
    out
}

/// Run `modify` on the collage at `path`, then save it if anything happened.
fn modify_and_save<F>(path: &Path, modify: F) -> anyhow::Result<()>
where
    F: FnOnce(&CollageQueue) -> anyhow::Result<()>,
{
    let queue = CollageQueue::from_collage(io::load(path)?);
    let changes = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    {
        let changes = changes.clone();
        queue.subscribe(Filter::All, move |event: &Event| {
            log::debug!("{event:?}");
            changes.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        });
    }
    modify(&queue)?;
    if let Some(label) = queue.undo_label() {
        println!("{label}");
    }
    if changes.load(std::sync::atomic::Ordering::Relaxed) == 0 {
        println!("nothing changed");
        return Ok(());
    }
    io::save(&queue.snapshot(), path)?;
    Ok(())
}

pub fn edit(mut args: Args) -> anyhow::Result<()> {
    let path = args.path("a collage")?;
    let resource = ResourceIdentifier::for_path(args.string("a resource")?);
    let start = args.line("a start line")?;
    let old_last = args.line("an old last line")?;
    let new_last = args.line("a new last line")?;
    let deleted = args.string("").is_ok_and(|flag| flag == "deleted");
    let change = DocumentChange::new(start, old_last, new_last, deleted);

    modify_and_save(&path, |queue| {
        let command = queue.read(|collage| {
            collage_core::reconcile::handle_document_change(collage, &resource, &change)
        });
        if let Some(command) = command {
            queue.execute(command)?;
        }
        Ok(())
    })
}

/// Draw a new shape of the user's style in the active layer.
fn draw(
    path: &Path,
    resource: ResourceIdentifier,
    kind: ShapeKind,
    boundary: LinePointBoundary,
) -> anyhow::Result<()> {
    let settings = &Preferences::get().settings;
    let shape = Shape::new(kind, settings.creator.clone())
        .with_colour(settings.colour)
        .with_line_width(settings.line_width);
    modify_and_save(path, |queue| {
        queue.write_with(|writer| {
            let target = writer.stage_shape(shape);
            let command = ShapeCommand::create(writer.collage(), target, resource, boundary)?;
            writer.execute(command)
        })?;
        Ok(())
    })
}

pub fn note(mut args: Args) -> anyhow::Result<()> {
    let path = args.path("a collage")?;
    let resource = ResourceIdentifier::for_path(args.string("a resource")?);
    let line = args.line("a line")?;
    let text: Vec<String> = args
        .rest()
        .into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    if text.is_empty() {
        return Err(UsageError("note text").into());
    }
    draw(&path, resource, ShapeKind::TextNote(text.join(" ")), note_boundary(line))
}

/// Two lines tall from `line`, clamped at the last line there can be.
fn note_boundary(line: u32) -> LinePointBoundary {
    LinePointBoundary::from_lines(
        line,
        Point::ORIGIN,
        line.saturating_add(1),
        Point::new(200, 0),
    )
}

pub fn rect(mut args: Args) -> anyhow::Result<()> {
    let path = args.path("a collage")?;
    let resource = ResourceIdentifier::for_path(args.string("a resource")?);
    let top = args.line("a top line")?;
    let bottom = args.line("a bottom line")?;
    let boundary = LinePointBoundary::from_lines(top, Point::ORIGIN, bottom, Point::new(400, 16));
    boundary.validate()?;
    draw(&path, resource, ShapeKind::Rectangle, boundary)
}

pub fn new_layer(mut args: Args) -> anyhow::Result<()> {
    let path = args.path("a collage")?;
    let name = args.string("").ok();
    modify_and_save(&path, |queue| {
        queue.write_with(|writer| {
            let create = LayerCommand::create(writer.collage());
            let target = create.target().ok_or(CommandError::UnknownResource)?;
            writer.execute(create)?;
            if let Some(name) = name {
                let rename = LayerCommand::rename(writer.collage(), target, name)?;
                writer.execute(rename)?;
            }
            let activate = LayerCommand::activate(writer.collage(), target)?;
            writer.execute(activate)
        })?;
        Ok(())
    })
}

pub fn import(mut args: Args) -> anyhow::Result<()> {
    let path = args.path("a collage")?;
    let others: Vec<PathBuf> = args.rest().into_iter().map(Into::into).collect();
    if others.is_empty() {
        return Err(UsageError("a collage to import").into());
    }
    modify_and_save(&path, |queue| {
        for other in &others {
            let layers = io::import_layers(queue, other)
                .with_context(|| format!("importing {}", other.display()))?;
            log::info!("{} layer(s) from {}", layers.len(), other.display());
        }
        Ok(())
    })
}

pub fn export(mut args: Args) -> anyhow::Result<()> {
    let path = args.path("a collage")?;
    let out = args.path("an output path")?;
    let collage = io::load(&path)?;
    let written = io::export_layers(&collage, collage.layer_ids(), &out)?;
    println!("{}", written.display());
    Ok(())
}
