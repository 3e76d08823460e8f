//! Structure-sharing transforms over playlist trees.
//!
//! Every operation allocates fresh group nodes and references the source
//! tree's track ids, so per-track records stay valid through any derived
//! view and a track's parent chain keeps describing the canonical tree.
//! Inputs are never mutated.

use serde_json::Value;

use crate::tree::{NodeId, Playlist};

impl Playlist {
    /// Keep only tracks the predicate accepts; groups left empty are
    /// pruned, nested empties included.
    pub fn filter_tracks(
        &mut self,
        from: NodeId,
        keep: &dyn Fn(&Playlist, NodeId) -> bool,
    ) -> NodeId {
        let name = self.name(from).to_string();
        let wrapper = self.alloc_group(name);
        for child in self.children(from).to_vec() {
            if self.is_track(child) {
                if keep(self, child) {
                    self.push_view_child(wrapper, child);
                }
            } else {
                let sub = self.filter_tracks(child, keep);
                if !self.children(sub).is_empty() {
                    self.push_view_child(wrapper, sub);
                }
            }
        }
        wrapper
    }

    /// Collect every track under `from` into a single flat group,
    /// depth-first left-to-right, discarding all group structure.
    pub fn flatten(&mut self, from: NodeId) -> NodeId {
        let only_tracks = |pl: &Playlist, id: NodeId| pl.is_track(id);
        let tracks = self.collect_descendants(from, Some(&only_tracks));
        let name = self.name(from).to_string();
        let wrapper = self.alloc_group(name);
        for track in tracks {
            self.push_view_child(wrapper, track);
        }
        wrapper
    }

    /// Preserve nesting up to `depth` levels, `from` counting as one;
    /// deeper subtrees are fully flattened. A depth of one or less is a
    /// full flatten.
    pub fn partially_flatten(&mut self, from: NodeId, depth: usize) -> NodeId {
        if depth <= 1 {
            return self.flatten(from);
        }
        let name = self.name(from).to_string();
        let wrapper = self.alloc_group(name);
        for child in self.children(from).to_vec() {
            if self.is_group(child) {
                let sub = self.partially_flatten(child, depth - 1);
                self.push_view_child(wrapper, sub);
            } else {
                self.push_view_child(wrapper, child);
            }
        }
        wrapper
    }

    /// Collapse to one level of sibling groups: every group that directly
    /// contains tracks contributes a wrapper named after it holding just
    /// those tracks, followed by its nested groups' own collapsed results
    /// in depth-first order. Pure-group branches contribute no wrapper of
    /// their own.
    pub fn collapse(&mut self, from: NodeId) -> NodeId {
        let branches = self.collapse_branches(from);
        let wrapper = self.alloc_group(String::new());
        for branch in branches {
            self.push_view_child(wrapper, branch);
        }
        wrapper
    }

    fn collapse_branches(&mut self, from: NodeId) -> Vec<NodeId> {
        let children = self.children(from).to_vec();
        let tracks: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|child| self.is_track(*child))
            .collect();
        let mut out = Vec::new();
        if !tracks.is_empty() {
            let name = self.name(from).to_string();
            let branch = self.alloc_group(name);
            for track in tracks {
                self.push_view_child(branch, track);
            }
            out.push(branch);
        }
        for child in children {
            if self.is_group(child) {
                out.extend(self.collapse_branches(child));
            }
        }
        out
    }

    /// Keep tracks whose `property` equals `value`, or whose
    /// sequence-valued property contains `value`; prune groups left empty.
    ///
    /// `name` and `sourceRef` address the built-in fields; anything else
    /// addresses the track's extra props.
    pub fn filter_by_property(&mut self, from: NodeId, property: &str, value: &Value) -> NodeId {
        let matches = |pl: &Playlist, id: NodeId| -> bool {
            let current = match property {
                "name" => Some(Value::String(pl.name(id).to_string())),
                "sourceRef" => pl.source_ref(id).map(|s| Value::String(s.to_string())),
                _ => pl.prop(id, property).cloned(),
            };
            match current {
                Some(Value::Array(entries)) => entries.contains(value),
                Some(other) => other == *value,
                None => false,
            }
        };
        self.filter_tracks(from, &matches)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::normalize::normalize;
    use crate::tree::{NodeId, Playlist};

    fn sample() -> Playlist {
        normalize(&json!({
            "name": "root",
            "children": [
                {"name": "t0", "sourceRef": "s0"},
                {"name": "A", "children": [
                    {"name": "t1", "sourceRef": "s1"},
                    {"name": "B", "children": [{"name": "t2", "sourceRef": "s2"}]},
                ]},
                {"name": "empty-after-filter", "children": [
                    {"name": "drop-me", "sourceRef": "sx"},
                ]},
            ]
        }))
        .unwrap()
    }

    fn names(playlist: &Playlist, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|id| playlist.name(*id).to_string()).collect()
    }

    #[test]
    fn filter_tracks_prunes_groups_left_empty() {
        let mut playlist = sample();
        let root = playlist.root();
        let keep = |pl: &Playlist, id: NodeId| pl.name(id) != "drop-me";
        let filtered = playlist.filter_tracks(root, &keep);

        let top = names(&playlist, playlist.children(filtered));
        assert_eq!(top, vec!["t0", "A"]);
        let descendants = playlist.collect_descendants(filtered, None);
        assert!(descendants.iter().all(|id| playlist.name(*id) != "empty-after-filter"));
    }

    #[test]
    fn filter_does_not_mutate_the_source_tree() {
        let mut playlist = sample();
        let root = playlist.root();
        let before = playlist.to_value(root);
        let keep = |_: &Playlist, _: NodeId| false;
        playlist.filter_tracks(root, &keep);
        assert_eq!(before, playlist.to_value(root));
    }

    #[test]
    fn flatten_matches_collected_descendant_tracks() {
        let mut playlist = sample();
        let root = playlist.root();
        let flat = playlist.flatten(root);

        let only_tracks = |pl: &Playlist, id: NodeId| pl.is_track(id);
        let collected = playlist.collect_descendants(root, Some(&only_tracks));
        assert_eq!(playlist.children(flat), collected.as_slice());
        assert!(playlist.children(flat).iter().all(|id| playlist.is_track(*id)));
        assert_eq!(names(&playlist, playlist.children(flat)), vec!["t0", "t1", "t2", "drop-me"]);
    }

    #[test]
    fn partially_flatten_keeps_one_level_then_flattens() {
        let mut playlist = sample();
        let root = playlist.root();
        let partial = playlist.partially_flatten(root, 2);

        let top = names(&playlist, playlist.children(partial));
        assert_eq!(top, vec!["t0", "A", "empty-after-filter"]);
        let a = playlist.children(partial)[1];
        // A's own subtree got fully flattened.
        assert_eq!(names(&playlist, playlist.children(a)), vec!["t1", "t2"]);
        assert!(playlist.children(a).iter().all(|id| playlist.is_track(*id)));
    }

    #[test]
    fn partially_flatten_depth_one_is_a_full_flatten() {
        let mut playlist = sample();
        let root = playlist.root();
        let partial = playlist.partially_flatten(root, 1);
        let flat = playlist.flatten(root);
        assert_eq!(playlist.children(partial), playlist.children(flat));
    }

    #[test]
    fn collapse_emits_one_branch_per_mixed_group() {
        let mut playlist = sample();
        let root = playlist.root();
        let collapsed = playlist.collapse(root);

        let branches = playlist.children(collapsed).to_vec();
        assert_eq!(names(&playlist, &branches), vec!["root", "A", "B", "empty-after-filter"]);
        // Each branch holds only that group's direct tracks.
        assert_eq!(names(&playlist, playlist.children(branches[0])), vec!["t0"]);
        assert_eq!(names(&playlist, playlist.children(branches[1])), vec!["t1"]);
        assert_eq!(names(&playlist, playlist.children(branches[2])), vec!["t2"]);
    }

    #[test]
    fn collapse_skips_pure_group_branches() {
        let mut playlist = normalize(&json!({
            "children": [
                {"name": "outer", "children": [
                    {"name": "inner", "children": [{"name": "t", "sourceRef": "s"}]},
                ]},
            ]
        }))
        .unwrap();
        let collapsed = playlist.collapse(playlist.root());
        let branches = playlist.children(collapsed).to_vec();
        assert_eq!(names(&playlist, &branches), vec!["inner"]);
    }

    #[test]
    fn filter_by_property_matches_scalars_and_sequences() {
        let mut playlist = normalize(&json!({
            "children": [
                {"name": "t1", "sourceRef": "s1", "genre": "jazz"},
                {"name": "t2", "sourceRef": "s2", "genre": ["rock", "jazz"]},
                {"name": "t3", "sourceRef": "s3", "genre": "rock"},
                {"name": "untagged", "children": [
                    {"name": "t4", "sourceRef": "s4"},
                ]},
            ]
        }))
        .unwrap();
        let root = playlist.root();
        let jazz = playlist.filter_by_property(root, "genre", &json!("jazz"));

        assert_eq!(names(&playlist, playlist.children(jazz)), vec!["t1", "t2"]);
        // No empty group anywhere in the result.
        let descendants = playlist.collect_descendants(jazz, None);
        assert!(descendants
            .iter()
            .all(|id| playlist.is_track(*id) || !playlist.children(*id).is_empty()));
    }

    #[test]
    fn derived_views_share_track_identities() {
        let mut playlist = sample();
        let root = playlist.root();
        let source_t2 = playlist.resolve_path(root, &["A", "B", "t2"]).entry;

        let flat = playlist.flatten(root);
        assert!(playlist.children(flat).contains(&source_t2));
        // The shared track still reports its canonical tree position.
        assert_eq!(playlist.item_path_string(source_t2), "/A/B/t2");
    }
}
