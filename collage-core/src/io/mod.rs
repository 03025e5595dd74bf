//! # Collage files
//!
//! A collage is stored as a `toml` document: the plugin dependencies it was saved with, the active
//! layer, and every layer with its shape lists. Shapes are tables tagged by `type` and `plugin`.
//! Shapes of unknown type are kept verbatim and written back as they were read.
//!
//! ```toml
//! model_version = "0.1.0"
//! current_layer = 0
//!
//! [[dependencies]]
//! id = "org.eclipselabs.collage"
//! version = "0.1.0"
//!
//! [[layers]]
//! name = "Layer 1"
//! visible = true
//!
//! [[layers.lists]]
//! resource = { kind = "file", short_name = "lib.rs", path = "src/lib.rs" }
//!
//! [[layers.lists.shapes]]
//! type = "rectangle"
//! plugin = "org.eclipselabs.collage.draw"
//! colour = "ff0000"
//! line_width = 3
//! top_left = { line = 4, offset = "0,2" }
//! bottom_right = { line = 6, offset = "120,10" }
//! ```

pub mod lock;

use std::path::{Path, PathBuf};

use crate::boundary::{LinePoint, LinePointBoundary};
use crate::color::Rgb;
use crate::commands::{CommandError, LayerCommand};
use crate::dependency::{self, DependencyError, PluginDependency, MODEL_VERSION};
use crate::points::PointList;
use crate::queue::CollageQueue;
use crate::resource::ResourceIdentifier;
use crate::state::shape::ShapeKind;
use crate::state::shape_list::Entry;
use crate::state::{Collage, Layer, LayerID, Shape, UnknownShape};
use crate::util::Point;

/// Extension of exported layer files.
pub const EXPORT_EXTENSION: &str = "xcl";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{} exists but cannot be read as a file", .0.display())]
    Unreadable(PathBuf),
    #[error("malformed collage: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("malformed {type_name} shape on {resource}: {source}")]
    Shape {
        type_name: String,
        resource: ResourceIdentifier,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error("import refused: {0}")]
    Import(#[from] CommandError),
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct DocumentRecord {
    model_version: String,
    #[serde(default)]
    current_layer: usize,
    #[serde(default)]
    dependencies: Vec<PluginDependency>,
    #[serde(default)]
    layers: Vec<LayerRecord>,
}
#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct LayerRecord {
    name: String,
    #[serde(default = "visible_default")]
    visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    lists: Vec<ListRecord>,
}
fn visible_default() -> bool {
    true
}
#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct ListRecord {
    resource: ResourceIdentifier,
    shapes: Vec<toml::Table>,
}
#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct ShapeRecord {
    #[serde(rename = "type")]
    type_name: String,
    plugin: String,
    colour: Rgb,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<PointList>,
    #[serde(default)]
    creator: String,
    created: chrono::DateTime<chrono::Utc>,
    last_modified: chrono::DateTime<chrono::Utc>,
    top_left: AnchorRecord,
    bottom_right: AnchorRecord,
}
#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct AnchorRecord {
    line: u32,
    #[serde(with = "crate::points::comma_point")]
    offset: Point,
}
impl From<LinePoint> for AnchorRecord {
    fn from(point: LinePoint) -> Self {
        Self {
            line: point.line(),
            offset: point.offset(),
        }
    }
}
impl From<&AnchorRecord> for LinePoint {
    fn from(record: &AnchorRecord) -> Self {
        LinePoint::new(record.line.into(), record.offset)
    }
}
impl From<&Shape> for ShapeRecord {
    fn from(shape: &Shape) -> Self {
        Self {
            type_name: shape.kind().type_name().to_owned(),
            plugin: shape.kind().plugin_id().to_owned(),
            colour: shape.colour(),
            line_width: shape.line_width(),
            text: shape.text().map(str::to_owned),
            points: shape.points().cloned(),
            creator: shape.creator().to_owned(),
            created: shape.date_created(),
            last_modified: shape.date_last_modified(),
            top_left: shape.boundary().top_left().into(),
            bottom_right: shape.boundary().bottom_right().into(),
        }
    }
}
impl ShapeRecord {
    fn into_shape(self) -> Shape {
        let kind = match self.type_name.as_str() {
            "ellipse" => ShapeKind::Ellipse,
            "sketch" => ShapeKind::Sketch(self.points.unwrap_or_default()),
            "textNote" => ShapeKind::TextNote(self.text.unwrap_or_default()),
            _ => ShapeKind::Rectangle,
        };
        let boundary = LinePointBoundary::new((&self.top_left).into(), (&self.bottom_right).into());
        let shape = Shape::new(kind, self.creator)
            .with_boundary(boundary)
            .with_colour(self.colour)
            .with_dates(self.created, self.last_modified);
        match self.line_width {
            Some(width) => shape.with_line_width(width),
            None => shape,
        }
    }
}
fn is_known_type(type_name: &str) -> bool {
    matches!(type_name, "rectangle" | "ellipse" | "sketch" | "textNote")
}

/// Serialize the placed layers of `collage`, with its dependencies pruned to what they use.
pub fn to_string(collage: &Collage) -> Result<String, Error> {
    let record = DocumentRecord {
        model_version: MODEL_VERSION.to_owned(),
        current_layer: collage.current_index(),
        dependencies: collage.pruned_dependencies(),
        layers: collage.layers().map(|layer| layer_record(collage, layer)).collect(),
    };
    Ok(toml::ser::to_string_pretty(&record)?)
}
fn layer_record(collage: &Collage, layer: &Layer) -> LayerRecord {
    // Lists without children are left out.
    let lists = layer
        .populated_shape_lists()
        .into_iter()
        .map(|list| ListRecord {
            resource: list.resource().clone(),
            shapes: list
                .entries()
                .iter()
                .filter_map(|entry| match entry {
                    Entry::Shape(id) => shape_table(collage.shape(*id)?),
                    Entry::Unknown(unknown) => Some(unknown.raw().clone()),
                })
                .collect(),
        })
        .collect();
    LayerRecord {
        name: layer.name().to_owned(),
        visible: layer.is_visible(),
        lists,
    }
}
fn shape_table(shape: &Shape) -> Option<toml::Table> {
    match toml::Value::try_from(ShapeRecord::from(shape)) {
        Ok(toml::Value::Table(table)) => Some(table),
        Ok(_) => None,
        Err(err) => {
            log::error!("Failed to serialize {shape}: {err}");
            None
        }
    }
}

/// Read a collage, merging its dependencies against the installed plugins.
///
/// Fails without partial results if any stored dependency is newer than what is installed.
/// Missing plugins only warn, and their shapes are kept as unknown entries.
pub fn from_str(text: &str) -> Result<Collage, Error> {
    let record: DocumentRecord = toml::from_str(text)?;
    if record.model_version != MODEL_VERSION {
        log::info!(
            "Collage saved with model version {}, now {MODEL_VERSION}",
            record.model_version
        );
    }
    let merged = dependency::merge(&dependency::installed(), &record.dependencies)?;
    let missing = |plugin: Option<&str>| {
        merged
            .dependencies
            .iter()
            .any(|dep| dep.missing && Some(dep.id.as_str()) == plugin)
    };

    let mut collage = Collage::loading();
    for layer in record.layers {
        let id = collage.load_layer(layer.name, layer.visible);
        for list in layer.lists {
            for table in list.shapes {
                let unknown = UnknownShape::new(table);
                let type_name = unknown.type_name().unwrap_or_default().to_owned();
                if !is_known_type(&type_name) || missing(unknown.plugin()) {
                    log::debug!("Keeping unrecognized {type_name:?} shape on {}", list.resource);
                    collage.load_unknown(id, &list.resource, unknown);
                    continue;
                }
                let shape: ShapeRecord = toml::Value::Table(unknown.raw().clone())
                    .try_into()
                    .map_err(|source| Error::Shape {
                        type_name,
                        resource: list.resource.clone(),
                        source,
                    })?;
                collage.load_shape(id, &list.resource, shape.into_shape());
            }
        }
    }
    let current = collage.finish_loading(record.current_layer, merged.dependencies, merged.warnings);
    if current != record.current_layer {
        log::warn!(
            "Active layer {} out of range, using {current}",
            record.current_layer
        );
    }
    Ok(collage)
}

fn read(path: &Path) -> Result<Option<String>, Error> {
    match std::fs::metadata(path) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
        Ok(meta) if !meta.is_file() => Err(Error::Unreadable(path.to_owned())),
        Ok(_) => Ok(Some(std::fs::read_to_string(path)?)),
    }
}

/// Load the collage at `path`, or a fresh one if there is no such file.
pub fn load(path: &Path) -> Result<Collage, Error> {
    let _lock = lock::lock(path);
    match read(path)? {
        Some(text) => from_str(&text),
        None => {
            log::info!("No collage at {}, starting a new one", path.display());
            Ok(Collage::new())
        }
    }
}
pub fn save(collage: &Collage, path: &Path) -> Result<(), Error> {
    let text = to_string(collage)?;
    let _lock = lock::lock(path);
    std::fs::write(path, text)?;
    log::info!("Saved collage to {}", path.display());
    Ok(())
}

/// Write some layers of `collage` to their own file, given the export extension if it has none.
/// Returns the path written.
///
/// Takes a detached collage, such as a [`CollageQueue::snapshot`], so no lock is held on the live
/// one during the write.
pub fn export_layers(collage: &Collage, layers: &[LayerID], path: &Path) -> Result<PathBuf, Error> {
    let path = if path.extension().is_some() {
        path.to_owned()
    } else {
        path.with_extension(EXPORT_EXTENSION)
    };
    let records: Vec<_> = collage
        .layers()
        .filter(|layer| layers.contains(&layer.id()))
        .map(|layer| layer_record(collage, layer))
        .collect();

    let dependencies = {
        let mut referenced = hashbrown::HashSet::new();
        let mut has_unknown = false;
        for shape in records.iter().flat_map(|layer| &layer.lists).flat_map(|list| &list.shapes) {
            let known = shape
                .get("type")
                .and_then(toml::Value::as_str)
                .is_some_and(is_known_type);
            match shape.get("plugin").and_then(toml::Value::as_str) {
                Some(plugin) if known => {
                    referenced.insert(plugin);
                }
                _ => has_unknown = true,
            }
        }
        dependency::prune(collage.dependencies(), referenced, has_unknown)
    };
    let record = DocumentRecord {
        model_version: MODEL_VERSION.to_owned(),
        current_layer: 0,
        dependencies,
        layers: records,
    };
    let text = toml::ser::to_string_pretty(&record)?;

    let _lock = lock::lock(&path);
    std::fs::write(&path, text)?;
    log::info!("Exported {} layer(s) to {}", layers.len(), path.display());
    Ok(path)
}

/// Read a whole collage file and add its layers on top of the queue's collage, as one undoable
/// import. Returns the layers added, bottom to top.
pub fn import_layers(queue: &CollageQueue, path: &Path) -> Result<Vec<LayerID>, Error> {
    let other = {
        let _lock = lock::lock(path);
        let text = read(path)?.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })?;
        from_str(&text)?
    };
    for warning in other.dependency_warnings() {
        log::warn!("{}: {warning}", path.display());
    }
    let dependencies = other.dependencies().to_vec();
    let layers = queue.write_with(|writer| {
        let layers = writer.stage_layers(other);
        let command = LayerCommand::import(writer.collage(), layers.clone(), &dependencies);
        writer.execute(command).map(|()| layers)
    })?;
    log::info!("Imported {} layer(s) from {}", layers.len(), path.display());
    Ok(layers)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dependency::{CORE_PLUGIN_ID, DRAW_PLUGIN_ID, TEXT_PLUGIN_ID};

    fn resource() -> ResourceIdentifier {
        ResourceIdentifier::for_path("src/lib.rs")
    }
    fn boundary() -> LinePointBoundary {
        LinePointBoundary::from_lines(4, Point::new(0, 2), 6, Point::new(120, 10))
    }
    fn sample() -> Collage {
        let mut collage = Collage::new();
        let layer = collage.current_layer().unwrap();
        collage.load_shape(
            layer,
            &resource(),
            Shape::new(ShapeKind::Rectangle, "ann")
                .with_boundary(boundary())
                .with_colour("ff0000".parse().unwrap()),
        );
        collage.load_shape(
            layer,
            &resource(),
            Shape::new(ShapeKind::Sketch(PointList::from_flat(&[0, 0, 5, 7]).unwrap()), "ann"),
        );
        collage
    }
    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("collage-{}-{name}", std::process::id()))
    }

    #[test]
    fn format() {
        let text = to_string(&sample()).unwrap();
        assert!(text.contains("model_version = \"0.1.0\""));
        assert!(text.contains("colour = \"ff0000\""));
        assert!(text.contains("points = \"0 0 5 7\""));
        assert!(text.contains("offset = \"120,10\""));
        // Only the plugins in use.
        assert!(text.contains(DRAW_PLUGIN_ID));
        assert!(!text.contains(TEXT_PLUGIN_ID));
    }
    #[test]
    fn reload() {
        let text = to_string(&sample()).unwrap();
        let collage = from_str(&text).unwrap();
        let layer = collage.current_layer().unwrap();
        let list = collage.shape_list(layer, &resource()).unwrap();
        let shapes: Vec<_> = list.shapes().map(|id| collage.shape(id).unwrap()).collect();
        assert_eq!(shapes.len(), 2);
        assert_eq!(*shapes[0].boundary(), boundary());
        assert_eq!(shapes[0].colour().to_string(), "ff0000");
        assert_eq!(shapes[0].creator(), "ann");
        assert!(shapes[0].is_live());
        assert_eq!(shapes[1].points().unwrap().len(), 2);
        assert!(collage.dependency_warnings().is_empty());
    }
    #[test]
    fn empty_lists_omitted() {
        let mut collage = Collage::new();
        let layer = collage.current_layer().unwrap();
        collage.shapes_for(layer, &resource());
        let text = to_string(&collage).unwrap();
        assert!(!text.contains("lists"));
    }
    #[test]
    fn unknown_shapes_survive() {
        let text = r#"
            model_version = "0.1.0"
            current_layer = 0

            [[dependencies]]
            id = "org.eclipselabs.collage"
            version = "0.1.0"

            [[dependencies]]
            id = "org.example.stars"
            version = "2.0.0"

            [[layers]]
            name = "Stars"

            [[layers.lists]]
            resource = { kind = "file", short_name = "a.rs", path = "a.rs" }

            [[layers.lists.shapes]]
            type = "star"
            plugin = "org.example.stars"
            points = 5
        "#;
        let collage = from_str(text).unwrap();
        assert_eq!(collage.dependency_warnings().len(), 1);
        assert!(collage.has_unknown_shapes());

        let saved = to_string(&collage).unwrap();
        assert!(saved.contains("type = \"star\""));
        assert!(saved.contains("points = 5"));
        // The missing plugin is still needed by the unknown shape.
        assert!(saved.contains("org.example.stars"));
    }
    #[test]
    fn newer_dependency_fails() {
        let text = format!(
            "model_version = \"0.1.0\"\n[[dependencies]]\nid = \"{CORE_PLUGIN_ID}\"\nversion = \"9.0.0\"\n"
        );
        assert!(matches!(from_str(&text), Err(Error::Dependency(_))));
    }
    #[test]
    fn malformed_colour_fails() {
        let text = sample_text().replace("ff0000", "#ff000");
        assert!(matches!(from_str(&text), Err(Error::Shape { .. })));
    }
    fn sample_text() -> String {
        to_string(&sample()).unwrap()
    }
    #[test]
    fn current_layer_clamped() {
        let text = sample_text().replace("current_layer = 0", "current_layer = 7");
        let collage = from_str(&text).unwrap();
        assert_eq!(collage.current_index(), 0);
    }
    #[test]
    fn no_layers_gets_one() {
        let collage = from_str("model_version = \"0.1.0\"").unwrap();
        assert_eq!(collage.layer_count(), 1);
    }
    #[test]
    fn missing_file_is_new() {
        let collage = load(&temp_path("missing.toml")).unwrap();
        assert_eq!(collage.layer_count(), 1);
    }
    #[test]
    fn directory_unreadable() {
        assert!(matches!(
            load(&std::env::temp_dir()),
            Err(Error::Unreadable(_))
        ));
    }
    #[test]
    fn save_load_export_import() {
        let path = temp_path("save.toml");
        save(&sample(), &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.layer_count(), 1);

        let exported = export_layers(&loaded, loaded.layer_ids(), &temp_path("export")).unwrap();
        assert_eq!(exported.extension().unwrap(), EXPORT_EXTENSION);

        let queue = CollageQueue::new();
        let layers = import_layers(&queue, &exported).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(queue.read(Collage::layer_count), 2);
        let shapes = queue.read(|collage| collage.shape_list(layers[0], &resource()).unwrap().len());
        assert_eq!(shapes, 2);
        assert_eq!(queue.undo_label(), Some("layer import"));
        queue.undo().unwrap();
        assert_eq!(queue.read(Collage::layer_count), 1);

        assert!(import_layers(&queue, &temp_path("nothing.xcl")).is_err());
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(exported);
    }
}
