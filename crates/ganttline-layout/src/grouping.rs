//! Rendered rows.
//!
//! With grouping on, every visible task sharing a name lands in one
//! [`GroupedTask`]; groups get a nesting level, nested levels get shaded,
//! and the groups are ordered so each parent's subtree stays contiguous.
//! With grouping off, each visible task is its own row.

use crate::hierarchy::TaskTree;
use ganttline_core::settings::MAX_SUB_TASK_SHADE;
use ganttline_core::{GroupedTask, Task};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Divisor that turns the configured shade step into a blend fraction
const SHADE_SCALE: f64 = 30.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupingOptions {
    pub enabled: bool,
    /// Shade step per nesting level, 0..=5
    pub sub_task_shade: u32,
}

impl GroupingOptions {
    pub fn new(enabled: bool, sub_task_shade: u32) -> Self {
        Self {
            enabled,
            sub_task_shade,
        }
    }
}

/// Build the rendered rows from the visible tasks.
///
/// `visible` must be in display order. Rows named in `collapsed` are
/// consolidated with their direct children afterwards.
pub fn group_tasks(
    tree: &TaskTree,
    visible: Vec<Task>,
    options: GroupingOptions,
    collapsed: &[String],
) -> Vec<GroupedTask> {
    let mut groups = if options.enabled {
        merge_by_name(visible, options.sub_task_shade)
    } else {
        one_row_per_task(visible)
    };

    for group in groups.iter_mut().filter(|g| collapsed.contains(&g.name)) {
        if !options.enabled {
            span_children(tree, group);
        }
        gather_child_milestones(tree, group);
    }

    debug!(rows = groups.len(), grouped = options.enabled, "rows built");
    groups
}

fn one_row_per_task(visible: Vec<Task>) -> Vec<GroupedTask> {
    visible
        .into_iter()
        .enumerate()
        .map(|(index, mut task)| {
            task.index = Some(index);
            GroupedTask {
                id: task.id,
                name: task.name.clone(),
                level: None,
                parent: None,
                index,
                tasks: vec![task],
            }
        })
        .collect()
}

fn merge_by_name(visible: Vec<Task>, sub_task_shade: u32) -> Vec<GroupedTask> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupedTask> = Vec::new();
    for task in visible {
        let pos = *positions.entry(task.name.clone()).or_insert_with(|| {
            groups.push(GroupedTask {
                id: task.id,
                name: task.name.clone(),
                level: None,
                tasks: Vec::new(),
                parent: None,
                index: groups.len(),
            });
            groups.len() - 1
        });
        let group = &mut groups[pos];
        if task.parent.is_some() {
            group.parent = task.parent.clone();
        }
        group.tasks.push(task);
    }

    // Root-to-self chains of bucket indices; a parent name with no group
    // ends the chain
    let paths: Vec<Vec<usize>> = (0..groups.len())
        .map(|pos| {
            let mut path = vec![pos];
            let mut seen = HashSet::from([pos]);
            let mut parent = groups[pos].parent.as_deref();
            while let Some(&next) = parent.and_then(|name| positions.get(name)) {
                if !seen.insert(next) {
                    break;
                }
                path.push(next);
                parent = groups[next].parent.as_deref();
            }
            path.reverse();
            path
        })
        .collect();

    let shade = sub_task_shade.min(MAX_SUB_TASK_SHADE);
    for (group, path) in groups.iter_mut().zip(&paths) {
        let level = path.len() as u32;
        group.level = Some(level);
        if level > 1 && shade > 0 {
            let amount = (f64::from(shade) / SHADE_SCALE) * f64::from(level.min(5) - 1);
            for task in &mut group.tasks {
                task.color = task.default_color.shade(amount);
            }
        }
    }

    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|a, b| paths[*a].cmp(&paths[*b]));

    let mut slots: Vec<Option<GroupedTask>> = groups.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|pos| slots[pos].take())
        .enumerate()
        .map(|(index, mut group)| {
            group.index = index;
            for task in &mut group.tasks {
                task.index = Some(index);
            }
            group
        })
        .collect()
}

/// Stretch the first task over its own and its direct children's spans
/// and keep only that task on the row
fn span_children(tree: &TaskTree, group: &mut GroupedTask) {
    let Some(mut first) = group.tasks.first().cloned() else {
        return;
    };
    for task in &group.tasks {
        let Some(linked) = tree.get(task.id) else { continue };
        for child in tree.children(linked) {
            first.start = first.start.min(child.start);
            first.end = first.end.max(child.end);
        }
    }
    group.tasks = vec![first];
}

/// Hand every direct child's milestones to the group's last task
fn gather_child_milestones(tree: &TaskTree, group: &mut GroupedTask) {
    let gathered: Vec<_> = group
        .tasks
        .iter()
        .filter_map(|task| tree.get(task.id))
        .flat_map(|linked| tree.children(linked))
        .flat_map(|child| child.milestones.iter().cloned())
        .collect();
    if let Some(last) = group.tasks.last_mut() {
        last.milestones.extend(gathered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build_and_sort;
    use chrono::{NaiveDate, NaiveDateTime};
    use ganttline_core::Color;
    use pretty_assertions::assert_eq;

    fn at(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn task(id: usize, name: &str, parent: Option<&str>, start: u32, end: u32) -> Task {
        let task = Task::new(id, name, at(start), at(end)).color(Color::rgb(0, 0, 0));
        match parent {
            Some(p) => task.parent(p),
            None => task,
        }
    }

    fn rows(groups: &[GroupedTask]) -> Vec<(&str, usize, Option<u32>)> {
        groups.iter().map(|g| (g.name.as_str(), g.tasks.len(), g.level)).collect()
    }

    #[test]
    fn shared_names_merge() {
        let tree = build_and_sort(
            vec![task(0, "Phase1", None, 1, 3), task(1, "Phase1", None, 5, 8)],
            None,
        );
        let groups = group_tasks(&tree, tree.tasks().to_vec(), GroupingOptions::new(true, 0), &[]);
        assert_eq!(rows(&groups), [("Phase1", 2, Some(1))]);
        assert!(groups[0].tasks.iter().all(|t| t.index == Some(0)));
    }

    #[test]
    fn grouping_off_is_one_to_one() {
        let tree = build_and_sort(
            vec![task(0, "A", None, 1, 2), task(1, "A", None, 2, 3), task(2, "B", Some("A"), 1, 2)],
            None,
        );
        let groups = group_tasks(&tree, tree.tasks().to_vec(), GroupingOptions::default(), &[]);
        assert_eq!(rows(&groups), [("A", 1, None), ("B", 1, None), ("A", 1, None)]);
        assert!(groups.iter().all(|g| g.parent.is_none()));
        for (pos, group) in groups.iter().enumerate() {
            assert_eq!(group.index, pos);
            assert_eq!(group.tasks[0].index, Some(pos));
        }
    }

    #[test]
    fn levels_follow_parents() {
        let tree = build_and_sort(
            vec![
                task(0, "Root", None, 1, 2),
                task(1, "Mid", Some("Root"), 1, 2),
                task(2, "Leaf", Some("Mid"), 1, 2),
                task(3, "Stray", Some("Gone"), 1, 2),
            ],
            None,
        );
        let groups = group_tasks(&tree, tree.tasks().to_vec(), GroupingOptions::new(true, 0), &[]);
        let by_name: HashMap<_, _> = groups.iter().map(|g| (g.name.as_str(), g)).collect();
        for group in &groups {
            match group.parent.as_deref().and_then(|p| by_name.get(p)) {
                Some(parent) => assert_eq!(group.level, parent.level.map(|l| l + 1)),
                None => assert_eq!(group.level, Some(1)),
            }
        }
        assert_eq!(by_name["Leaf"].level, Some(3));
    }

    #[test]
    fn subtrees_stay_contiguous() {
        let tree = build_and_sort(
            vec![
                task(0, "A", None, 1, 2),
                task(1, "B", None, 1, 2),
                task(2, "b1", Some("B"), 1, 2),
                task(3, "a1", Some("A"), 1, 2),
                task(4, "a1", Some("A"), 3, 4),
            ],
            None,
        );
        // Children arrive before their parents, so buckets start out of order
        let mut visible = tree.tasks().to_vec();
        visible.reverse();
        let groups = group_tasks(&tree, visible, GroupingOptions::new(true, 0), &[]);
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["B", "b1", "A", "a1"]);
        assert_eq!(groups[3].tasks.len(), 2);
    }

    #[test]
    fn nested_levels_are_shaded() {
        let tree = build_and_sort(
            vec![task(0, "R", None, 1, 2), task(1, "C", Some("R"), 1, 2), task(2, "G", Some("C"), 1, 2)],
            None,
        );
        let groups = group_tasks(&tree, tree.tasks().to_vec(), GroupingOptions::new(true, 3), &[]);
        let colors: Vec<Color> = groups.iter().map(|g| g.tasks[0].color).collect();

        assert_eq!(colors[0], Color::rgb(0, 0, 0));
        // 3/30 of the way to white, then 6/30
        assert_eq!(colors[1], Color::rgb(26, 26, 26));
        assert_eq!(colors[2], Color::rgb(51, 51, 51));
        assert!(groups.iter().all(|g| g.tasks[0].default_color == Color::rgb(0, 0, 0)));
    }

    #[test]
    fn collapsed_row_spans_its_children() {
        let tree = build_and_sort(
            vec![
                task(0, "P", None, 3, 4),
                task(1, "c1", Some("P"), 1, 5),
                task(2, "c2", Some("P"), 2, 9).milestone("Done"),
            ],
            None,
        );
        let collapsed = vec!["P".to_string()];
        let visible = vec![tree.tasks()[0].clone()];
        let groups = group_tasks(&tree, visible, GroupingOptions::default(), &collapsed);

        assert_eq!(groups.len(), 1);
        let row = &groups[0].tasks[0];
        assert_eq!((row.start, row.end), (at(1), at(9)));
        assert_eq!(row.milestones.len(), 1);
        assert_eq!(row.milestones[0].category, "c2");
    }

    #[test]
    fn collapsed_group_keeps_members_but_gathers_milestones() {
        let tree = build_and_sort(
            vec![
                task(0, "P", None, 3, 4),
                task(1, "P", None, 6, 7),
                task(2, "c", Some("P"), 1, 2).milestone("Gate"),
            ],
            None,
        );
        let collapsed = vec!["P".to_string()];
        let visible: Vec<Task> = tree.tasks().iter().filter(|t| t.name == "P").cloned().collect();
        let groups = group_tasks(&tree, visible, GroupingOptions::new(true, 0), &collapsed);

        assert_eq!(groups[0].tasks.len(), 2);
        assert_eq!(groups[0].tasks[0].start, at(3));
        assert!(groups[0].tasks[0].milestones.is_empty());
        assert_eq!(groups[0].tasks[1].milestones.len(), 1);
    }
}
