use canopy_types::Timestamp;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Describes a class of nodes: its fields, naming and nesting rules.
///
/// Serialized with PascalCase keys, which is what the daemons speak.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NodeType {
    /// Globally unique id, e.g. `core.Document`.
    pub id: String,
    /// Display name per locale.
    pub name: BTreeMap<String, String>,
    pub fields: Vec<NodeField>,
    pub embed: Vec<EmbedNode>,
    /// Parent node types this type may be added to. `"."` allows any parent.
    pub addable_to: Vec<String>,
    /// Hidden types are not offered in navigation.
    pub hide: bool,
    /// Template for the intermediate path of new children, e.g. `$year/$month`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

impl NodeType {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Sets the display name for a locale.
    pub fn named(mut self, locale: &str, label: &str) -> Self {
        self.name.insert(locale.into(), label.into());
        self
    }

    pub fn with_field(mut self, field: NodeField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_embed(mut self, embed: EmbedNode) -> Self {
        self.embed.push(embed);
        self
    }

    pub fn addable_to(mut self, parent_type: impl Into<String>) -> Self {
        self.addable_to.push(parent_type.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hide = true;
        self
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Looks up a declared field by id.
    pub fn field(&self, id: &str) -> Option<&NodeField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Expands `$year`, `$month` and `$day` in the path prefix for the given
    /// instant. Returns `None` if the type has no prefix.
    pub fn expand_path_prefix(&self, at: Timestamp) -> Option<String> {
        let date = at.as_datetime();
        self.path_prefix.as_ref().map(|prefix| {
            prefix
                .replace("$year", &format!("{:04}", date.year()))
                .replace("$month", &format!("{:02}", date.month()))
                .replace("$day", &format!("{:02}", date.day()))
        })
    }
}

/// One field declaration of a [`NodeType`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NodeField {
    /// Dotted id; each segment is one level of nesting in the node document.
    pub id: String,
    pub name: BTreeMap<String, String>,
    pub required: bool,
    /// Field type name selecting the loader, e.g. `Text` or `DateTime`.
    #[serde(rename = "Type")]
    pub field_type: String,
}

impl NodeField {
    fn simple(id: &str, field_type: &str) -> Self {
        Self {
            id: id.into(),
            field_type: field_type.into(),
            ..Default::default()
        }
    }

    /// Shorthand for a plain text field.
    pub fn text(id: &str) -> Self {
        Self::simple(id, "Text")
    }

    /// Shorthand for a rich text (markup) field.
    pub fn html(id: &str) -> Self {
        Self::simple(id, "HTMLArea")
    }

    /// Shorthand for a date and time field.
    pub fn datetime(id: &str) -> Self {
        Self::simple(id, "DateTime")
    }

    /// Shorthand for a file reference field.
    pub fn file(id: &str) -> Self {
        Self::simple(id, "File")
    }

    /// Shorthand for a field of an arbitrary type name.
    pub fn of_type(id: &str, field_type: &str) -> Self {
        Self::simple(id, field_type)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn named(mut self, locale: &str, label: &str) -> Self {
        self.name.insert(locale.into(), label.into());
        self
    }
}

/// A node embedded into another node's page, addressed by URI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EmbedNode {
    pub id: String,
    /// Path of the embedded node plus an optional query, e.g. `/blog?limit=3`.
    #[serde(rename = "URI")]
    pub uri: String,
}

impl EmbedNode {
    pub fn new(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
        }
    }

    /// The path part of the URI.
    pub fn path(&self) -> &str {
        self.uri.split_once('?').map_or(&self.uri, |(path, _)| path)
    }

    /// The raw query part of the URI, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, query)| query)
    }
}
