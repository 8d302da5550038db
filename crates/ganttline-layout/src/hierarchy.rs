//! Parent/child linkage and display order.
//!
//! Rows name their parent rather than pointing at it. The builder resolves
//! each parent name to the first task carrying that name, keeps the links
//! as ids, and walks the resulting forest depth-first to hand out display
//! indices. The walk uses an explicit stack, so deep hierarchies do not
//! recurse.

use ganttline_core::{SortDirection, Task, TaskId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Tasks in display order with their resolved links
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskTree {
    /// Position equals the task's display index
    tasks: Vec<Task>,
    /// Task id -> position in `tasks`
    positions: HashMap<TaskId, usize>,
    /// Child id -> linked parent id
    parents: HashMap<TaskId, TaskId>,
}

impl TaskTree {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.positions.get(&id).map(|&pos| &self.tasks[pos])
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        let pos = *self.positions.get(&id)?;
        self.tasks.get_mut(pos)
    }

    /// Every task carrying `name`, in display order
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.name == name)
    }

    /// Direct children in their sorted order
    pub fn children<'a>(&'a self, task: &'a Task) -> impl Iterator<Item = &'a Task> + 'a {
        task.children.iter().filter_map(|id| self.get(*id))
    }

    /// The task `task` is attached under, if its parent name resolved
    pub fn parent_of(&self, task: &Task) -> Option<&Task> {
        self.parents.get(&task.id).and_then(|id| self.get(*id))
    }

    /// Linked ancestors from the direct parent upwards
    pub fn ancestors<'a>(&'a self, task: &'a Task) -> Vec<&'a Task> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([task.id]);
        let mut current = task;
        while let Some(parent) = self.parent_of(current) {
            if !seen.insert(parent.id) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}

fn compare_names(a: &Task, b: &Task, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => a.name.cmp(&b.name),
        SortDirection::Descending => b.name.cmp(&a.name),
    }
}

fn walk_pre_order(
    start: TaskId,
    children: &HashMap<TaskId, Vec<TaskId>>,
    visited: &mut HashSet<TaskId>,
    order: &mut Vec<TaskId>,
) {
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        order.push(id);
        if let Some(kids) = children.get(&id) {
            stack.extend(kids.iter().rev().copied());
        }
    }
}

/// Link children to parents, optionally sort siblings by name, and assign
/// depth-first pre-order display indices.
///
/// Orphans (a parent name no task carries) and self-parented rows become
/// roots. Rows caught in a parent cycle are never reached from a root;
/// they are indexed after the forest, starting from the earliest row.
pub fn build_and_sort(tasks: Vec<Task>, sort: Option<SortDirection>) -> TaskTree {
    let mut tasks = tasks;
    let row_positions: HashMap<TaskId, usize> =
        tasks.iter().enumerate().map(|(pos, t)| (t.id, pos)).collect();

    let mut first_by_name: HashMap<&str, TaskId> = HashMap::new();
    for task in &tasks {
        first_by_name.entry(task.name.as_str()).or_insert(task.id);
    }

    let mut parents: HashMap<TaskId, TaskId> = HashMap::new();
    let mut children: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    let mut roots: Vec<TaskId> = Vec::new();
    for task in &tasks {
        let linked = task.parent.as_deref().and_then(|name| match first_by_name.get(name) {
            Some(&parent) if parent == task.id => {
                warn!(task = %task.name, "task names itself as parent, treating as root");
                None
            }
            Some(&parent) => Some(parent),
            None => {
                debug!(task = %task.name, parent = name, "parent not found, treating as root");
                None
            }
        });
        match linked {
            Some(parent) => {
                parents.insert(task.id, parent);
                children.entry(parent).or_default().push(task.id);
            }
            None => roots.push(task.id),
        }
    }

    if let Some(direction) = sort {
        let by_id = |id: &TaskId| &tasks[row_positions[id]];
        roots.sort_by(|a, b| compare_names(by_id(a), by_id(b), direction));
        for list in children.values_mut() {
            list.sort_by(|a, b| compare_names(by_id(a), by_id(b), direction));
        }
    }

    let mut order: Vec<TaskId> = Vec::with_capacity(tasks.len());
    let mut visited: HashSet<TaskId> = HashSet::new();
    for &root in &roots {
        walk_pre_order(root, &children, &mut visited, &mut order);
    }
    for task in &tasks {
        if !visited.contains(&task.id) {
            warn!(task = %task.name, "task is part of a parent cycle, indexing after the forest");
            walk_pre_order(task.id, &children, &mut visited, &mut order);
        }
    }

    for task in &mut tasks {
        task.children = children.remove(&task.id).unwrap_or_default();
    }

    let mut slots: Vec<Option<Task>> = tasks.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(slots.len());
    for (index, id) in order.iter().enumerate() {
        if let Some(mut task) = slots[row_positions[id]].take() {
            if task.index.is_none() {
                task.index = Some(index);
            }
            ordered.push(task);
        }
    }

    let positions = ordered.iter().enumerate().map(|(pos, t)| (t.id, pos)).collect();
    debug!(tasks = ordered.len(), roots = roots.len(), "hierarchy built");

    TaskTree {
        tasks: ordered,
        positions,
        parents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;

    fn at(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn task(id: TaskId, name: &str, parent: Option<&str>) -> Task {
        let task = Task::new(id, name, at(1), at(2));
        match parent {
            Some(p) => task.parent(p),
            None => task,
        }
    }

    fn names(tree: &TaskTree) -> Vec<&str> {
        tree.tasks().iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn links_child_to_parent() {
        let tree = build_and_sort(vec![task(0, "A", None), task(1, "B", Some("A"))], None);

        let a = tree.get(0).unwrap();
        assert_eq!(a.index, Some(0));
        assert_eq!(a.children, vec![1]);
        assert_eq!(tree.get(1).unwrap().index, Some(1));
        assert_eq!(tree.parent_of(tree.get(1).unwrap()).map(|t| t.id), Some(0));
    }

    #[test]
    fn pre_order_places_children_after_parent() {
        let tree = build_and_sort(
            vec![
                task(0, "C1", Some("P1")),
                task(1, "P1", None),
                task(2, "P2", None),
                task(3, "C2", Some("P1")),
                task(4, "G", Some("C1")),
            ],
            None,
        );
        assert_eq!(names(&tree), ["P1", "C1", "G", "C2", "P2"]);
        for (pos, task) in tree.tasks().iter().enumerate() {
            assert_eq!(task.index, Some(pos));
        }
    }

    #[test]
    fn sorts_roots_and_siblings() {
        let rows = vec![
            task(0, "b", None),
            task(1, "a", None),
            task(2, "z", Some("a")),
            task(3, "y", Some("a")),
        ];
        let tree = build_and_sort(rows.clone(), Some(SortDirection::Ascending));
        assert_eq!(names(&tree), ["a", "y", "z", "b"]);

        let tree = build_and_sort(rows.clone(), Some(SortDirection::Descending));
        assert_eq!(names(&tree), ["b", "a", "z", "y"]);

        let tree = build_and_sort(rows, None);
        assert_eq!(names(&tree), ["b", "a", "z", "y"]);
    }

    #[test]
    fn orphans_and_self_parents_are_roots() {
        let tree = build_and_sort(
            vec![task(0, "A", Some("Nowhere")), task(1, "B", Some("B")), task(2, "C", Some("A"))],
            None,
        );
        assert_eq!(names(&tree), ["A", "C", "B"]);
        assert!(tree.get(1).unwrap().children.is_empty());
    }

    #[test]
    fn duplicate_names_link_to_first_occurrence() {
        let tree = build_and_sort(
            vec![task(0, "X", None), task(1, "X", None), task(2, "child", Some("X"))],
            None,
        );
        assert_eq!(tree.get(0).unwrap().children, vec![2]);
        assert!(tree.get(1).unwrap().children.is_empty());
        assert_eq!(tree.named("X").count(), 2);
    }

    #[test]
    fn cycles_are_indexed_once() {
        let tree = build_and_sort(
            vec![task(0, "R", None), task(1, "A", Some("B")), task(2, "B", Some("A"))],
            None,
        );
        assert_eq!(tree.len(), 3);
        assert_eq!(names(&tree), ["R", "A", "B"]);
        let a = tree.get(1).unwrap();
        assert_eq!(tree.ancestors(a).len(), 1);
    }

    #[test]
    fn deep_chains_do_not_recurse() {
        let depth = 20_000;
        let mut rows = vec![task(0, "n0", None)];
        for i in 1..depth {
            rows.push(task(i, &format!("n{i}"), Some(&format!("n{}", i - 1))));
        }
        let tree = build_and_sort(rows, None);
        assert_eq!(tree.len(), depth);
        assert_eq!(tree.tasks()[depth - 1].name, format!("n{}", depth - 1));
        assert_eq!(tree.ancestors(&tree.tasks()[depth - 1]).len(), depth - 1);
    }
}
