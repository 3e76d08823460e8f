//! Conversion from raw playlist JSON into the canonical tree.
//!
//! Playlist files have accumulated a few shapes over time: a bare array of
//! entries, group objects whose child list sits under `items` or `tracks`
//! instead of `children`, and 2-element `[name, ...]` arrays for named
//! groups and tracks. Normalization accepts all of them and produces one
//! canonical tree; normalizing the serialized output of a normalized
//! playlist yields an equivalent tree.

use serde_json::{Map, Value};

use crate::error::TreeError;
use crate::tree::{NodeId, Playlist};

const CHILD_KEYS: [&str; 3] = ["children", "items", "tracks"];
const SOURCE_KEYS: [&str; 2] = ["sourceRef", "downloaderArg"];

/// Build a canonical [`Playlist`] from a raw value.
///
/// A bare array is treated as the root group's children; an object is the
/// root group itself.
pub fn normalize(raw: &Value) -> Result<Playlist, TreeError> {
    let mut playlist = Playlist::new();
    let root = playlist.root();
    match raw {
        Value::Array(entries) => normalize_into(&mut playlist, root, entries, None)?,
        Value::Object(fields) => {
            playlist.set_name(root, name_of(fields));
            let children = child_list(fields)?.map(Vec::as_slice).unwrap_or(&[]);
            let apply = fields.get("apply").and_then(Value::as_object);
            normalize_into(&mut playlist, root, children, apply)?;
        }
        other => return Err(invalid(other)),
    }
    Ok(playlist)
}

fn normalize_into(
    playlist: &mut Playlist,
    group: NodeId,
    children: &[Value],
    apply: Option<&Map<String, Value>>,
) -> Result<(), TreeError> {
    for raw in children {
        let child = normalize_entry(playlist, group, raw)?;
        // A group's `apply` block lands on its direct track children only.
        if let Some(apply) = apply {
            if playlist.is_track(child) {
                apply_overrides(playlist, child, apply);
            }
        }
    }
    Ok(())
}

fn normalize_entry(
    playlist: &mut Playlist,
    parent: NodeId,
    raw: &Value,
) -> Result<NodeId, TreeError> {
    match raw {
        Value::Array(parts) => {
            if parts.len() != 2 {
                return Err(invalid(raw));
            }
            let name = parts[0]
                .as_str()
                .ok_or_else(|| invalid(raw))?
                .to_string();
            match &parts[1] {
                Value::Array(children) => {
                    let group = playlist.alloc_group(name);
                    playlist.push_child(parent, group);
                    normalize_into(playlist, group, children, None)?;
                    Ok(group)
                }
                Value::String(source_ref) => {
                    let track = playlist.alloc_track(name, source_ref.clone(), Map::new());
                    playlist.push_child(parent, track);
                    Ok(track)
                }
                _ => Err(invalid(raw)),
            }
        }
        Value::Object(fields) => {
            if let Some(children) = child_list(fields)? {
                let group = playlist.alloc_group(name_of(fields));
                playlist.push_child(parent, group);
                let apply = fields.get("apply").and_then(Value::as_object);
                normalize_into(playlist, group, children, apply)?;
                Ok(group)
            } else {
                // Anything without a child list is a track.
                let source_ref = SOURCE_KEYS
                    .iter()
                    .find_map(|key| fields.get(*key))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let mut props = Map::new();
                for (key, value) in fields {
                    if key == "name" || SOURCE_KEYS.contains(&key.as_str()) {
                        continue;
                    }
                    props.insert(key.clone(), value.clone());
                }
                let track = playlist.alloc_track(name_of(fields), source_ref, props);
                playlist.push_child(parent, track);
                Ok(track)
            }
        }
        other => Err(invalid(other)),
    }
}

fn apply_overrides(playlist: &mut Playlist, track: NodeId, apply: &Map<String, Value>) {
    for (key, value) in apply {
        match key.as_str() {
            "name" => {
                if let Some(name) = value.as_str() {
                    playlist.set_name(track, name.to_string());
                }
            }
            "sourceRef" | "downloaderArg" => {
                if let Some(source_ref) = value.as_str() {
                    playlist.set_source_ref(track, source_ref.to_string());
                }
            }
            _ => playlist.insert_prop(track, key.clone(), value.clone()),
        }
    }
}

fn name_of(fields: &Map<String, Value>) -> String {
    fields
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn child_list<'a>(fields: &'a Map<String, Value>) -> Result<Option<&'a Vec<Value>>, TreeError> {
    for key in CHILD_KEYS {
        if let Some(value) = fields.get(key) {
            return match value {
                Value::Array(children) => Ok(Some(children)),
                _ => Err(TreeError::InvalidFormat(format!("`{key}` is not an array"))),
            };
        }
    }
    Ok(None)
}

fn invalid(raw: &Value) -> TreeError {
    let shown: String = raw.to_string().chars().take(80).collect();
    TreeError::InvalidFormat(shown)
}

impl Playlist {
    /// Serialize a (sub)tree back to canonical JSON.
    pub fn to_value(&self, id: NodeId) -> Value {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::String(self.name(id).to_string()));
        if self.is_group(id) {
            let children: Vec<Value> = self
                .children(id)
                .iter()
                .map(|child| self.to_value(*child))
                .collect();
            fields.insert("children".into(), Value::Array(children));
        } else {
            let source_ref = self.source_ref(id).unwrap_or("").to_string();
            fields.insert("sourceRef".into(), Value::String(source_ref));
            if let Some(props) = self.props(id) {
                for (key, value) in props {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
        Value::Object(fields)
    }
}
