//! Labeling configuration.
//!
//! The configuration is the XML dialect used by the external annotation
//! store: object tags name the data being annotated, control tags name the
//! tools and label sets that act on them. Parsing produces a typed
//! [`LabelConfig`] that the rest of the engine queries by name.
//!
//! ```text
//! <View>
//!   <Image name="img" value="$image"/>
//!   <RectangleLabels name="tag" toName="img">
//!     <Label value="Car"/>
//!   </RectangleLabels>
//! </View>
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use roxmltree::Node;

use crate::error::RegionError;
use crate::region::ShapeKind;

/// Kinds of data object a control can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Image,
    Audio,
    Text,
    HyperText,
    TimeSeries,
}

impl ObjectKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "audio" | "audioplus" => Some(Self::Audio),
            "text" => Some(Self::Text),
            "hypertext" => Some(Self::HyperText),
            "timeseries" => Some(Self::TimeSeries),
            _ => None,
        }
    }

    /// True for objects measured in pixels.
    pub fn is_visual(self) -> bool {
        self == Self::Image
    }
}

/// Kinds of control tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlKind {
    RectangleLabels,
    Rectangle,
    PolygonLabels,
    Polygon,
    KeyPointLabels,
    KeyPoint,
    BrushLabels,
    Brush,
    Labels,
    HyperTextLabels,
    TimeSeriesLabels,
    Choices,
    TextArea,
    Relations,
}

impl ControlKind {
    fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag.to_ascii_lowercase().as_str() {
            "rectanglelabels" => Self::RectangleLabels,
            "rectangle" => Self::Rectangle,
            "polygonlabels" => Self::PolygonLabels,
            "polygon" => Self::Polygon,
            "keypointlabels" => Self::KeyPointLabels,
            "keypoint" => Self::KeyPoint,
            "brushlabels" => Self::BrushLabels,
            "brush" => Self::Brush,
            "labels" => Self::Labels,
            "hypertextlabels" => Self::HyperTextLabels,
            "timeserieslabels" => Self::TimeSeriesLabels,
            "choices" => Self::Choices,
            "textarea" => Self::TextArea,
            "relations" => Self::Relations,
            _ => return None,
        };
        Some(kind)
    }

    /// The wire `type` of entries produced by this control.
    pub fn result_type(self) -> &'static str {
        match self {
            Self::RectangleLabels => "rectanglelabels",
            Self::Rectangle => "rectangle",
            Self::PolygonLabels => "polygonlabels",
            Self::Polygon => "polygon",
            Self::KeyPointLabels => "keypointlabels",
            Self::KeyPoint => "keypoint",
            Self::BrushLabels => "brushlabels",
            Self::Brush => "brush",
            Self::Labels => "labels",
            Self::HyperTextLabels => "hypertextlabels",
            Self::TimeSeriesLabels => "timeserieslabels",
            Self::Choices => "choices",
            Self::TextArea => "textarea",
            Self::Relations => "relations",
        }
    }

    /// Shape this control creates on an object of `object` kind.
    pub fn shape_for(self, object: ObjectKind) -> Option<ShapeKind> {
        match (self, object) {
            (Self::RectangleLabels | Self::Rectangle, ObjectKind::Image) => Some(ShapeKind::Rectangle),
            (Self::PolygonLabels | Self::Polygon, ObjectKind::Image) => Some(ShapeKind::Polygon),
            (Self::KeyPointLabels | Self::KeyPoint, ObjectKind::Image) => Some(ShapeKind::KeyPoint),
            (Self::BrushLabels | Self::Brush, ObjectKind::Image) => Some(ShapeKind::Brush),
            (Self::Labels, ObjectKind::Text | ObjectKind::HyperText) => Some(ShapeKind::CharacterRange),
            (Self::Labels, ObjectKind::Audio | ObjectKind::TimeSeries) => Some(ShapeKind::TimeRange),
            (Self::HyperTextLabels, ObjectKind::HyperText | ObjectKind::Text) => Some(ShapeKind::CharacterRange),
            (Self::TimeSeriesLabels, ObjectKind::TimeSeries) => Some(ShapeKind::TimeRange),
            _ => None,
        }
    }

    /// True for controls whose state is a set of option values on a shape.
    pub fn is_labels(self) -> bool {
        matches!(
            self,
            Self::RectangleLabels
                | Self::PolygonLabels
                | Self::KeyPointLabels
                | Self::BrushLabels
                | Self::Labels
                | Self::HyperTextLabels
                | Self::TimeSeriesLabels
        )
    }

    /// True for controls that only classify existing regions.
    pub fn is_classification(self) -> bool {
        matches!(self, Self::Choices | Self::TextArea)
    }

    /// True for option-less drawing controls (`Rectangle`, `Polygon`, ...).
    pub fn is_bare_shape(self) -> bool {
        matches!(self, Self::Rectangle | Self::Polygon | Self::KeyPoint | Self::Brush)
    }
}

/// How many options may be active at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChoiceMode {
    #[default]
    Single,
    Multiple,
}

/// A data object declared by the configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectTag {
    pub name: String,
    pub kind: ObjectKind,
    /// Data reference such as `$image`.
    pub value: String,
}

impl ObjectTag {
    /// Key into the task `data` map (`value` without the `$`).
    pub fn data_key(&self) -> &str {
        self.value.strip_prefix('$').unwrap_or(&self.value)
    }
}

/// A control declared by the configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlTag {
    pub name: String,
    pub kind: ControlKind,
    pub to_name: Vec<String>,
    /// Values of child `Label`, `Choice` or `Relation` tags.
    pub options: Vec<String>,
    pub choice: ChoiceMode,
    pub allow_empty: bool,
    pub stroke_width: Option<f64>,
    pub threshold: Option<f64>,
    pub per_region: bool,
}

impl ControlTag {
    pub fn result_type(&self) -> &'static str {
        self.kind.result_type()
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option == value)
    }

    pub fn targets(&self, object: &str) -> bool {
        self.to_name.iter().any(|name| name == object)
    }

    /// Whether a state with no values is acceptable.
    pub fn accepts_empty(&self) -> bool {
        self.allow_empty || self.kind.is_bare_shape() || self.kind == ControlKind::TextArea
    }
}

/// A parsed labeling configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelConfig {
    pub objects: Vec<ObjectTag>,
    pub controls: Vec<ControlTag>,
}

impl LabelConfig {
    /// Parses a configuration from XML text.
    pub fn parse(xml: &str) -> Result<Self, RegionError> {
        let document = roxmltree::Document::parse(xml).map_err(|source| RegionError::ConfigParse {
            message: source.to_string(),
        })?;

        let mut config = LabelConfig::default();
        for node in document.root_element().descendants().filter(Node::is_element) {
            let tag = node.tag_name().name();
            if let Some(kind) = ObjectKind::from_tag(tag) {
                config.objects.push(ObjectTag {
                    name: required_attr(node, "name")?,
                    kind,
                    value: node.attribute("value").unwrap_or_default().to_string(),
                });
            } else if let Some(kind) = ControlKind::from_tag(tag) {
                config.controls.push(parse_control(node, kind)?);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    pub fn read(path: &Path) -> Result<Self, RegionError> {
        let xml = fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectTag> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn control(&self, name: &str) -> Option<&ControlTag> {
        self.controls.iter().find(|control| control.name == name)
    }

    /// Controls targeting `object`, in document order.
    pub fn controls_for<'a>(&'a self, object: &'a str) -> impl Iterator<Item = &'a ControlTag> + 'a {
        self.controls.iter().filter(move |control| control.targets(object))
    }

    /// The `Relations` control, if the configuration declares one.
    pub fn relations(&self) -> Option<&ControlTag> {
        self.controls.iter().find(|control| control.kind == ControlKind::Relations)
    }

    fn validate(&self) -> Result<(), RegionError> {
        let mut names = BTreeSet::new();
        let all_names = self
            .objects
            .iter()
            .map(|o| o.name.as_str())
            .chain(self.controls.iter().map(|c| c.name.as_str()));
        for name in all_names {
            if !names.insert(name) {
                return Err(config_error(format!("duplicate tag name '{name}'")));
            }
        }

        for control in &self.controls {
            if control.kind == ControlKind::Relations {
                continue;
            }
            if control.to_name.is_empty() {
                return Err(config_error(format!("control '{}' has no toName", control.name)));
            }
            for target in &control.to_name {
                let object = self.object(target).ok_or_else(|| {
                    config_error(format!(
                        "control '{}' targets unknown object '{target}'",
                        control.name
                    ))
                })?;
                if !control.kind.is_classification() && control.kind.shape_for(object.kind).is_none() {
                    return Err(config_error(format!(
                        "control '{}' cannot annotate object '{}'",
                        control.name, object.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_control(node: Node<'_, '_>, kind: ControlKind) -> Result<ControlTag, RegionError> {
    let name = match kind {
        ControlKind::Relations => node.attribute("name").unwrap_or("relations").to_string(),
        _ => required_attr(node, "name")?,
    };
    let to_name = node
        .attribute("toName")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();

    let option_tag = match kind {
        ControlKind::Choices => "Choice",
        ControlKind::Relations => "Relation",
        _ => "Label",
    };
    let options = node
        .children()
        .filter(|child| child.is_element() && child.tag_name().name().eq_ignore_ascii_case(option_tag))
        .map(|child| required_attr(child, "value"))
        .collect::<Result<Vec<_>, _>>()?;

    let choice = match node.attribute("choice").map(str::to_ascii_lowercase).as_deref() {
        None | Some("single") | Some("single-radio") => ChoiceMode::Single,
        Some("multiple") => ChoiceMode::Multiple,
        Some(other) => {
            return Err(config_error(format!(
                "control '{name}' has invalid choice '{other}'"
            )))
        }
    };

    Ok(ControlTag {
        kind,
        to_name,
        options,
        choice,
        allow_empty: bool_attr(node, "allowEmpty", &name)?,
        stroke_width: f64_attr(node, "strokeWidth", &name)?,
        threshold: f64_attr(node, "threshold", &name)?,
        per_region: bool_attr(node, "perRegion", &name)?,
        name,
    })
}

fn required_attr(node: Node<'_, '_>, attr: &str) -> Result<String, RegionError> {
    node.attribute(attr)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            config_error(format!(
                "<{}> is missing the '{attr}' attribute",
                node.tag_name().name()
            ))
        })
}

fn bool_attr(node: Node<'_, '_>, attr: &str, control: &str) -> Result<bool, RegionError> {
    match node.attribute(attr).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(value) => match value.as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(config_error(format!(
                "control '{control}' has invalid {attr} '{value}'"
            ))),
        },
    }
}

fn f64_attr(node: Node<'_, '_>, attr: &str, control: &str) -> Result<Option<f64>, RegionError> {
    node.attribute(attr)
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| {
                    config_error(format!(
                        "control '{control}' has invalid {attr} '{raw}'; expected a non-negative number"
                    ))
                })
        })
        .transpose()
}

fn config_error(message: String) -> RegionError {
    RegionError::ConfigParse { message }
}
