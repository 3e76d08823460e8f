//! Path resolution and read-only tree queries.

use crate::error::TreeError;
use crate::tree::{NodeId, Playlist};

/// Outcome of a lenient path resolution.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// Deepest entry reached.
    pub entry: NodeId,
    /// First segment that failed to match, if any.
    pub unmatched: Option<String>,
}

/// Split a `/`-separated path string into its segments.
pub fn parse_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn name_matches(name: &str, segment: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        let name = name.to_lowercase();
        let segment = segment.to_lowercase();
        name == segment || name == format!("{segment}/")
    } else {
        name == segment || name.strip_suffix('/') == Some(segment)
    }
}

impl Playlist {
    /// Resolve `segments` starting at `from`, one segment at a time.
    ///
    /// A segment prefixed with `?` searches all descendants of the current
    /// entry instead of only direct children. Exact name matches win, with
    /// a trailing `/` on the entry name tolerated; a case-insensitive match
    /// is the fallback. An unmatched segment stops the walk: the deepest
    /// entry reached is returned together with the failing segment, and a
    /// warning is logged. Deliberately lenient for interactive browsing.
    pub fn resolve_path<S: AsRef<str>>(&self, from: NodeId, segments: &[S]) -> Resolution {
        let mut current = from;
        for segment in segments {
            let segment = segment.as_ref();
            let (needle, candidates) = match segment.strip_prefix('?') {
                Some(rest) => (rest, self.collect_descendants(current, None)),
                None => (segment, self.children(current).to_vec()),
            };
            let found = candidates
                .iter()
                .copied()
                .find(|c| name_matches(self.name(*c), needle, false))
                .or_else(|| {
                    candidates
                        .iter()
                        .copied()
                        .find(|c| name_matches(self.name(*c), needle, true))
                });
            match found {
                Some(id) => current = id,
                None => {
                    tracing::warn!(segment = needle, "not found");
                    return Resolution {
                        entry: current,
                        unmatched: Some(needle.to_string()),
                    };
                }
            }
        }
        Resolution {
            entry: current,
            unmatched: None,
        }
    }

    /// Collect all descendants of `from` in pre-order.
    ///
    /// A group is always descended into, even when the filter rejects the
    /// group itself.
    pub fn collect_descendants(
        &self,
        from: NodeId,
        filter: Option<&dyn Fn(&Playlist, NodeId) -> bool>,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_into(from, filter, &mut out);
        out
    }

    fn collect_into(
        &self,
        from: NodeId,
        filter: Option<&dyn Fn(&Playlist, NodeId) -> bool>,
        out: &mut Vec<NodeId>,
    ) {
        for child in self.children(from) {
            if filter.is_none_or(|keep| keep(self, *child)) {
                out.push(*child);
            }
            if self.is_group(*child) {
                self.collect_into(*child, filter, out);
            }
        }
    }

    /// Entries from the root down to `id`, both inclusive, following the
    /// parent chain.
    pub fn item_path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Render the parent chain as `/Name/Name`, substituting `(Unnamed)`
    /// for empty names. The root renders as a bare `/` and is omitted from
    /// deeper paths.
    pub fn item_path_string(&self, id: NodeId) -> String {
        let path = self.item_path(id);
        if path.len() == 1 {
            return "/".to_string();
        }
        let mut out = String::new();
        for entry in &path[1..] {
            out.push('/');
            let name = self.name(*entry);
            out.push_str(if name.is_empty() { "(Unnamed)" } else { name });
        }
        out
    }

    /// Position of `id` within its parent's children, with the sibling
    /// count.
    pub fn index_in_parent(&self, id: NodeId) -> Result<(usize, usize), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::NoParent)?;
        let siblings = self.children(parent);
        let index = siblings
            .iter()
            .position(|sibling| *sibling == id)
            .ok_or(TreeError::NoParent)?;
        Ok((index, siblings.len()))
    }

    /// Indented outline of the subtree for diagnostics.
    pub fn tree_string(&self, from: NodeId, show_tracks: bool) -> String {
        let mut group_lines = Vec::new();
        for child in self.children(from).to_vec() {
            if !self.is_group(child) {
                continue;
            }
            let body = self.tree_string(child, show_tracks);
            if body.is_empty() {
                group_lines.push(self.name(child).to_string());
            } else {
                let indented: Vec<String> =
                    body.lines().map(|line| format!("| {line}")).collect();
                group_lines.push(format!("\n{}\n{}", self.name(child), indented.join("\n")));
            }
        }
        let children_string = group_lines.join("\n");
        let tracks_string = if show_tracks {
            self.children(from)
                .iter()
                .filter(|child| self.is_track(**child))
                .map(|child| self.name(*child))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            String::new()
        };
        match (tracks_string.is_empty(), children_string.is_empty()) {
            (false, false) => format!("{tracks_string}\n{children_string}"),
            (true, false) => children_string,
            (false, true) => tracks_string,
            (true, true) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::normalize::normalize;

    fn sample() -> Playlist {
        normalize(&json!({
            "children": [
                {"name": "A", "children": [
                    {"name": "B", "children": [{"name": "track1", "sourceRef": "s1"}]},
                    {"name": "track2", "sourceRef": "s2"},
                ]},
            ]
        }))
        .unwrap()
    }

    #[test]
    fn resolve_walks_nested_groups() {
        let playlist = sample();
        let root = playlist.root();
        let found = playlist.resolve_path(root, &["A", "B"]);
        assert!(found.unmatched.is_none());
        assert_eq!(playlist.name(found.entry), "B");
    }

    #[test]
    fn resolve_reports_the_unmatched_segment_and_keeps_the_ancestor() {
        let playlist = sample();
        let found = playlist.resolve_path(playlist.root(), &["A", "X"]);
        assert_eq!(playlist.name(found.entry), "A");
        assert_eq!(found.unmatched.as_deref(), Some("X"));
    }

    #[test]
    fn question_prefix_searches_all_descendants() {
        let playlist = sample();
        let found = playlist.resolve_path(playlist.root(), &["?track1"]);
        assert!(found.unmatched.is_none());
        assert_eq!(playlist.name(found.entry), "track1");
    }

    #[test]
    fn exact_match_beats_case_insensitive() {
        let playlist = normalize(&json!({
            "children": [
                {"name": "rock", "children": []},
                {"name": "Rock", "children": []},
            ]
        }))
        .unwrap();
        let found = playlist.resolve_path(playlist.root(), &["Rock"]);
        assert_eq!(found.entry, playlist.children(playlist.root())[1]);

        let fallback = playlist.resolve_path(playlist.root(), &["ROCK"]);
        assert_eq!(fallback.entry, playlist.children(playlist.root())[0]);
    }

    #[test]
    fn trailing_slash_names_still_match() {
        let playlist = normalize(&json!({
            "children": [{"name": "albums/", "children": []}]
        }))
        .unwrap();
        let found = playlist.resolve_path(playlist.root(), &["albums"]);
        assert!(found.unmatched.is_none());
        assert_eq!(playlist.name(found.entry), "albums/");
    }

    #[test]
    fn parse_path_drops_empty_segments() {
        assert_eq!(parse_path("/A//B/"), vec!["A".to_string(), "B".to_string()]);
        assert!(parse_path("").is_empty());
    }

    #[test]
    fn collect_descendants_is_preorder_and_always_descends() {
        let playlist = sample();
        let root = playlist.root();
        let all = playlist.collect_descendants(root, None);
        let names: Vec<&str> = all.iter().map(|id| playlist.name(*id)).collect();
        assert_eq!(names, vec!["A", "B", "track1", "track2"]);

        // Groups are traversed even though the filter rejects them.
        let only_tracks = |pl: &Playlist, id: NodeId| pl.is_track(id);
        let tracks = playlist.collect_descendants(root, Some(&only_tracks));
        let names: Vec<&str> = tracks.iter().map(|id| playlist.name(*id)).collect();
        assert_eq!(names, vec!["track1", "track2"]);
    }

    #[test]
    fn item_paths_follow_the_parent_chain() {
        let playlist = sample();
        let root = playlist.root();
        let found = playlist.resolve_path(root, &["A", "B", "track1"]);
        let path = playlist.item_path(found.entry);
        assert_eq!(path.first(), Some(&root));
        assert_eq!(path.len(), 4);
        assert_eq!(playlist.item_path_string(found.entry), "/A/B/track1");
        assert_eq!(playlist.item_path_string(root), "/");
    }

    #[test]
    fn unnamed_entries_render_as_placeholder() {
        let playlist = normalize(&json!({
            "children": [{"children": [{"name": "t", "sourceRef": "s"}]}]
        }))
        .unwrap();
        let found = playlist.resolve_path(playlist.root(), &["?t"]);
        assert_eq!(playlist.item_path_string(found.entry), "/(Unnamed)/t");
    }

    #[test]
    fn index_in_parent_reports_position_and_sibling_count() {
        let playlist = sample();
        let a = playlist.children(playlist.root())[0];
        let track2 = playlist.children(a)[1];
        assert_eq!(playlist.index_in_parent(track2).unwrap(), (1, 2));
        assert!(matches!(
            playlist.index_in_parent(playlist.root()),
            Err(TreeError::NoParent)
        ));
    }

    #[test]
    fn tree_string_outlines_groups_and_tracks() {
        let playlist = sample();
        let outline = playlist.tree_string(playlist.root(), true);
        assert!(outline.contains("A"));
        assert!(outline.contains("| track2"));
        assert!(outline.contains("| | track1"));

        let groups_only = playlist.tree_string(playlist.root(), false);
        assert!(!groups_only.contains("track1"));
    }
}
