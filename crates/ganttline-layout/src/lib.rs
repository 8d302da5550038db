//! # ganttline-layout
//!
//! Hierarchy, grouping, collapse state and geometry for ganttline.
//!
//! This crate provides:
//! - The hierarchy builder: parent linkage, sibling sort, display indices ([`hierarchy`])
//! - The grouping engine: merged rows, levels, shading ([`grouping`])
//! - The collapse state machine with echo suppression ([`collapse`])
//! - The time scale and coordinate engine ([`scale`], [`coordinates`])
//! - [`GanttEngine`], which runs the whole pipeline on every update
//!
//! ## Example
//!
//! ```rust
//! use ganttline_core::{FixedClock, Settings};
//! use ganttline_ingest::{Column, DataTable, Role};
//! use ganttline_layout::{GanttEngine, PersistedCollapse, UpdateOutcome};
//!
//! let table = DataTable::new()
//!     .column(Column::new(Role::Task, "Task").texts(["A", "B"]))
//!     .column(Column::new(Role::Parent, "Parent").texts(["", "A"]))
//!     .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01", "2024-01-01"]))
//!     .column(Column::new(Role::Duration, "Duration").texts(["3", "1"]));
//!
//! let now = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let mut engine = GanttEngine::new(Settings::default()).with_clock(FixedClock(now));
//! let UpdateOutcome::Rendered(model) = engine.update(&table, &PersistedCollapse::empty()) else {
//!     unreachable!()
//! };
//! assert_eq!(model.tasks[0].children, vec![1]);
//!
//! let transition = engine.toggle("A").unwrap();
//! assert_eq!(transition.model.grouped.len(), 1);
//! ```

pub mod collapse;
pub mod coordinates;
pub mod grouping;
pub mod hierarchy;
pub mod scale;
pub mod shapes;

pub use collapse::{CollapseState, PersistedCollapse, RefreshDecision};
pub use coordinates::{compute_layout, ChartLayout, LayoutContext};
pub use grouping::{group_tasks, GroupingOptions};
pub use hierarchy::{build_and_sort, TaskTree};
pub use scale::TimeScale;

use ganttline_core::{Clock, DurationUnit, GroupedTask, Settings, SystemClock, Task};
use ganttline_ingest::{ingest, DataTable, Legend, MilestoneRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Model
// ============================================================================

/// Everything the rendering layer reads after a recompute
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GanttModel {
    /// All tasks, position equals display index
    pub tasks: Vec<Task>,
    /// Rendered rows, position equals row index
    pub grouped: Vec<GroupedTask>,
    pub layout: ChartLayout,
    pub legend: Legend,
    pub milestones: MilestoneRegistry,
    pub duration_unit: DurationUnit,
    /// Names whose descendants are hidden
    pub collapsed: Vec<String>,
}

impl GanttModel {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks that are currently shown
    pub fn visible(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.visibility)
    }
}

/// Result of [`GanttEngine::update`]
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOutcome {
    /// The update carried one of our own tokens; nothing was recomputed
    Echo,
    Rendered(GanttModel),
}

/// A collapse transition: what to persist and the model to show
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub persisted: PersistedCollapse,
    pub model: GanttModel,
}

/// Output of the last full recompute that transitions re-derive from
#[derive(Clone, Debug)]
struct Dataset {
    tree: TaskTree,
    duration_unit: DurationUnit,
    legend: Legend,
    milestones: MilestoneRegistry,
    resources_present: bool,
}

// ============================================================================
// Engine
// ============================================================================

/// Runs ingestion, hierarchy, grouping and layout, and owns the collapse state
pub struct GanttEngine {
    settings: Settings,
    collapse: CollapseState,
    clock: Box<dyn Clock>,
    dataset: Option<Dataset>,
}

impl GanttEngine {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: settings.normalized(),
            collapse: CollapseState::new(),
            clock: Box::new(SystemClock),
            dataset: None,
        }
    }

    /// Use `clock` for rows without a start date
    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        self.with_boxed_clock(Box::new(clock))
    }

    pub fn with_boxed_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn collapse_state(&self) -> &CollapseState {
        &self.collapse
    }

    /// Handle new data.
    ///
    /// A refresh carrying a token this engine minted is an echo of its own
    /// write and is skipped. Anything else replaces the collapse list from
    /// `persisted` and recomputes everything from scratch.
    pub fn update(&mut self, table: &DataTable, persisted: &PersistedCollapse) -> UpdateOutcome {
        if self.collapse.accept_refresh(&persisted.update_id) == RefreshDecision::Echo {
            return UpdateOutcome::Echo;
        }
        self.collapse.load(persisted);

        let ingested = ingest(table, &self.settings, self.clock.as_ref());
        let tree = build_and_sort(ingested.tasks, ingested.sort);
        self.dataset = Some(Dataset {
            tree,
            duration_unit: ingested.duration_unit,
            legend: ingested.legend,
            milestones: ingested.milestones,
            resources_present: ingested.roles.resource,
        });

        let model = self.model().unwrap_or_else(|| self.empty_model());
        debug!(tasks = model.tasks.len(), rows = model.grouped.len(), "recomputed");
        UpdateOutcome::Rendered(model)
    }

    /// The model for the current data and collapse state
    pub fn model(&self) -> Option<GanttModel> {
        let dataset = self.dataset.as_ref()?;
        let collapsed = self.collapse.collapsed();

        let mut tree = dataset.tree.clone();
        self.collapse.apply_visibility(&mut tree);
        let visible: Vec<Task> = tree.tasks().iter().filter(|t| t.visibility).cloned().collect();

        let groups = &self.settings.task_groups;
        let options = GroupingOptions::new(groups.group_tasks, groups.sub_task_shade);
        let grouped = group_tasks(&tree, visible, options, collapsed);

        let ctx = LayoutContext {
            settings: &self.settings,
            milestones: &dataset.milestones,
            collapsed,
            resources_present: dataset.resources_present,
            duration_unit: dataset.duration_unit,
        };
        let layout = compute_layout(&grouped, &ctx);

        Some(GanttModel {
            tasks: tree.into_tasks(),
            grouped,
            layout,
            legend: dataset.legend.clone(),
            milestones: dataset.milestones.clone(),
            duration_unit: dataset.duration_unit,
            collapsed: collapsed.to_vec(),
        })
    }

    fn empty_model(&self) -> GanttModel {
        GanttModel {
            tasks: Vec::new(),
            grouped: Vec::new(),
            layout: ChartLayout::default(),
            legend: Legend::default(),
            milestones: MilestoneRegistry::new(),
            duration_unit: self.settings.general.duration_unit,
            collapsed: self.collapse.collapsed().to_vec(),
        }
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    fn transition(
        &mut self,
        apply: impl FnOnce(&mut CollapseState, &TaskTree) -> bool,
    ) -> Option<Transition> {
        let dataset = self.dataset.as_ref()?;
        if !apply(&mut self.collapse, &dataset.tree) {
            return None;
        }
        let persisted = self.collapse.persist();
        let model = self.model()?;
        Some(Transition { persisted, model })
    }

    /// Collapse `name` when it shows children, expand it when collapsed.
    ///
    /// `None` for leaf or unknown names, and before the first update.
    pub fn toggle(&mut self, name: &str) -> Option<Transition> {
        self.transition(|state, tree| {
            if state.is_collapsed(name) {
                state.expand(name)
            } else {
                state.collapse(tree, name)
            }
        })
    }

    pub fn collapse(&mut self, name: &str) -> Option<Transition> {
        self.transition(|state, tree| state.collapse(tree, name))
    }

    pub fn expand(&mut self, name: &str) -> Option<Transition> {
        self.transition(|state, _| state.expand(name))
    }

    /// Expand everything when anything is collapsed, otherwise collapse all
    pub fn toggle_all(&mut self) -> Option<Transition> {
        self.transition(|state, tree| {
            if state.collapsed().is_empty() {
                state.collapse_all(tree)
            } else {
                state.expand_all()
            }
        })
    }
}

impl Default for GanttEngine {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use ganttline_core::FixedClock;
    use ganttline_ingest::{Column, Role};
    use pretty_assertions::assert_eq;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn engine(settings: Settings) -> GanttEngine {
        GanttEngine::new(settings).with_clock(FixedClock(now()))
    }

    fn table(rows: &[(&str, &str)]) -> DataTable {
        DataTable::new()
            .column(Column::new(Role::Task, "Task").texts(rows.iter().map(|r| r.0)))
            .column(Column::new(Role::Parent, "Parent").texts(rows.iter().map(|r| r.1)))
            .column(Column::new(Role::Duration, "Duration").texts(rows.iter().map(|_| "2")))
    }

    fn three_roots() -> DataTable {
        table(&[("R1", ""), ("a", "R1"), ("R2", ""), ("b", "R2"), ("R3", ""), ("c", "R3")])
    }

    fn rendered(outcome: UpdateOutcome) -> GanttModel {
        match outcome {
            UpdateOutcome::Rendered(model) => model,
            UpdateOutcome::Echo => panic!("expected a recompute"),
        }
    }

    #[test]
    fn scenario_parent_and_child() {
        let table = DataTable::new()
            .column(Column::new(Role::Task, "Task").texts(["A", "B"]))
            .column(Column::new(Role::Parent, "Parent").texts(["", "A"]))
            .column(Column::new(Role::StartDate, "Start").texts(["2024-01-01", "2024-01-01"]))
            .column(Column::new(Role::Duration, "Duration").texts(["3", "1"]));
        let model = rendered(engine(Settings::default()).update(&table, &PersistedCollapse::empty()));

        assert_eq!(model.tasks[0].name, "A");
        assert_eq!(model.tasks[0].index, Some(0));
        assert_eq!(model.tasks[1].index, Some(1));
        assert_eq!(model.tasks[0].children, vec![1]);
        assert_eq!(model.layout.bars.len(), 2);
    }

    #[test]
    fn scenario_collapse_all_three_roots() {
        let mut engine = engine(Settings::default());
        engine.update(&three_roots(), &PersistedCollapse::empty());

        let collapsed = engine.toggle_all().unwrap();
        assert_eq!(collapsed.model.collapsed, ["R1", "R2", "R3"]);
        assert_eq!(collapsed.persisted.collapsed().unwrap(), vec!["R1", "R2", "R3"]);
        assert_eq!(collapsed.model.grouped.len(), 3);

        let expanded = engine.toggle_all().unwrap();
        assert!(expanded.model.collapsed.is_empty());
        assert_eq!(expanded.persisted.list, "[]");
        assert_eq!(expanded.model.grouped.len(), 6);
    }

    #[test]
    fn scenario_shared_name_groups() {
        let table = table(&[("Phase1", ""), ("Phase1", ""), ("Other", "")]);
        let mut engine = engine(Settings::default().group_tasks(0));
        let model = rendered(engine.update(&table, &PersistedCollapse::empty()));

        let phase: Vec<_> = model.grouped.iter().filter(|g| g.name == "Phase1").collect();
        assert_eq!(phase.len(), 1);
        assert_eq!(phase[0].tasks.len(), 2);
    }

    #[test]
    fn collapse_round_trip_restores_visibility() {
        let mut engine = engine(Settings::default());
        let before = rendered(engine.update(&three_roots(), &PersistedCollapse::empty()));
        let visible = |m: &GanttModel| m.visible().map(|t| t.id).collect::<Vec<_>>();

        let collapsed = engine.collapse("R2").unwrap();
        assert_eq!(visible(&collapsed.model).len(), 5);
        let expanded = engine.expand("R2").unwrap();
        assert_eq!(visible(&expanded.model), visible(&before));
    }

    #[test]
    fn own_write_is_an_echo() {
        let mut engine = engine(Settings::default());
        let table = three_roots();
        engine.update(&table, &PersistedCollapse::empty());

        let transition = engine.toggle("R1").unwrap();
        assert_eq!(engine.update(&table, &transition.persisted), UpdateOutcome::Echo);

        // A foreign token carrying a list is applied
        let foreign = PersistedCollapse::new(r#"["R3"]"#, "elsewhere");
        let model = rendered(engine.update(&table, &foreign));
        assert_eq!(model.collapsed, ["R3"]);
        assert_eq!(model.visible().count(), 5);
    }

    #[test]
    fn leaf_toggle_and_early_transitions_do_nothing() {
        let mut engine = engine(Settings::default());
        assert!(engine.toggle_all().is_none());
        engine.update(&three_roots(), &PersistedCollapse::empty());
        assert!(engine.toggle("a").is_none());
        assert!(engine.toggle("nope").is_none());
        assert!(engine.collapse_state().pending().is_empty());
    }

    #[test]
    fn missing_task_column_renders_nothing() {
        let table = DataTable::new().column(Column::new(Role::Duration, "Duration").texts(["1"]));
        let model = rendered(engine(Settings::default()).update(&table, &PersistedCollapse::empty()));
        assert!(model.is_empty());
        assert!(model.layout.bars.is_empty());
        assert!(model.layout.scale.is_none());
    }

    #[test]
    fn invalid_persisted_list_collapses_nothing() {
        let mut engine = engine(Settings::default());
        let model = rendered(engine.update(&three_roots(), &PersistedCollapse::new("{oops", "x")));
        assert!(model.collapsed.is_empty());
        assert_eq!(model.visible().count(), 6);
    }
}
