use std::path::Path;

use anyhow::anyhow;

use crate::analysis::aggregate::DeDataset;
use crate::analysis::pca::{PcaOptions, PcaResult, run_pca};
use crate::analysis::volcano::{self, Cutoffs, VolcanoPoint, VolcanoSummary, volcano_points};
use crate::color::ColorMap;
use crate::config::Config;
use crate::data::filter::{GroupSelection, selected_samples};
use crate::data::loader::{self, Separator};
use crate::data::model::{ColumnSummary, MetadataValue, Table, summarize};
use crate::portal::{DataPortal, DatasetInfo, LocalPortal, Selection, filter_datasets, load_de_dataset};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Table,
    DifferentialExpression,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: Config,

    /// Current domain / project / dataset / file / separator.
    pub selection: Selection,

    portal: Option<Box<dyn DataPortal>>,

    /// Dropdown contents for the cascade.
    pub projects: Vec<String>,
    pub datasets: Vec<DatasetInfo>,
    pub files: Vec<String>,

    pub view: ViewMode,

    /// Generic viewer: the loaded table and where it came from.
    pub table: Option<Table>,
    pub table_source: Option<String>,
    pub column_summary: Vec<ColumnSummary>,

    /// DE viewer: aggregated dataset and derived plots.
    pub de: Option<DeDataset>,
    pub selected_groups: GroupSelection,
    pub color_column: Option<String>,
    pub color_map: Option<ColorMap>,
    pub log_transform: bool,
    pub pca: Option<PcaResult>,
    pub pca_error: Option<String>,
    pub comparison: Option<String>,
    pub cutoffs: Cutoffs,
    pub volcano: Vec<VolcanoPoint>,
    pub volcano_summary: VolcanoSummary,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Build the state and replay `initial` through the cascade.
    ///
    /// Values that no longer exist (a deleted dataset, a file from another
    /// dataset) are dropped, along with everything below them.
    pub fn new(config: Config, initial: Selection) -> Self {
        let cutoffs = config.de.cutoffs();
        let log_transform = config.de.log_transform;
        let mut state = Self {
            config,
            selection: Selection::default(),
            portal: None,
            projects: Vec::new(),
            datasets: Vec::new(),
            files: Vec::new(),
            view: ViewMode::default(),
            table: None,
            table_source: None,
            column_summary: Vec::new(),
            de: None,
            selected_groups: GroupSelection::new(),
            color_column: None,
            color_map: None,
            log_transform,
            pca: None,
            pca_error: None,
            comparison: None,
            cutoffs,
            volcano: Vec::new(),
            volcano_summary: VolcanoSummary::default(),
            status_message: None,
        };
        state.selection.sep = initial.sep;

        let domain = initial.domain.clone().or_else(|| {
            (state.config.domains.len() == 1)
                .then(|| state.config.domains.keys().next().cloned())
                .flatten()
        });
        state.select_domain(domain);
        if initial.project.as_ref().is_some_and(|p| state.projects.contains(p)) {
            state.select_project(initial.project.clone());
        }
        if initial
            .dataset
            .as_ref()
            .is_some_and(|d| state.visible_datasets().iter().any(|i| &i.id == d))
        {
            state.select_dataset(initial.dataset.clone());
        }
        if initial.file.as_ref().is_some_and(|f| state.files.contains(f)) {
            state.select_file(initial.file.clone());
        }
        state
    }

    /// Separator for delimited files: the selection's, else the configured default.
    pub fn separator(&self) -> Separator {
        self.selection.sep.unwrap_or(self.config.viewer.default_sep)
    }

    /// Query string mirroring the current selection.
    pub fn query_string(&self) -> String {
        self.selection.to_query()
    }

    /// Datasets offered in the dropdown, narrowed by `portal.dataset_types`.
    pub fn visible_datasets(&self) -> Vec<DatasetInfo> {
        filter_datasets(&self.datasets, &self.config.portal.dataset_types)
    }

    fn report(&mut self, context: &str, err: anyhow::Error) {
        log::error!("{context}: {err:#}");
        self.status_message = Some(format!("Error: {err:#}"));
    }

    fn clear_loaded(&mut self) {
        self.table = None;
        self.table_source = None;
        self.column_summary.clear();
        self.de = None;
        self.pca = None;
        self.pca_error = None;
        self.volcano.clear();
        self.volcano_summary = VolcanoSummary::default();
    }

    // -- Cascade ------------------------------------------------------------

    pub fn select_domain(&mut self, domain: Option<String>) {
        self.selection.set_domain(domain.clone());
        self.portal = None;
        self.projects.clear();
        self.datasets.clear();
        self.files.clear();
        self.clear_loaded();
        self.status_message = None;

        let Some(domain) = domain else { return };
        let Some(root) = self.config.domain_root(&domain).map(Path::to_path_buf) else {
            self.report("Selecting domain", anyhow!("unknown domain '{domain}'"));
            return;
        };
        let portal = LocalPortal::new(root);
        match portal.list_projects() {
            Ok(projects) => self.projects = projects,
            Err(e) => self.report("Listing projects", e),
        }
        self.portal = Some(Box::new(portal));
    }

    pub fn select_project(&mut self, project: Option<String>) {
        self.selection.set_project(project.clone());
        self.datasets.clear();
        self.files.clear();
        self.clear_loaded();

        let (Some(portal), Some(project)) = (self.portal.as_deref(), project) else {
            return;
        };
        match portal.list_datasets(&project) {
            Ok(datasets) => self.datasets = datasets,
            Err(e) => self.report("Listing datasets", e),
        }
    }

    pub fn select_dataset(&mut self, dataset: Option<String>) {
        self.selection.set_dataset(dataset.clone());
        self.files.clear();
        self.clear_loaded();

        let (Some(portal), Some(project), Some(dataset)) = (
            self.portal.as_deref(),
            self.selection.project.clone(),
            dataset,
        ) else {
            return;
        };
        match portal.list_files(&project, &dataset) {
            Ok(files) => self.files = files,
            Err(e) => self.report("Listing files", e),
        }
        if self.view == ViewMode::DifferentialExpression {
            self.load_de();
        }
    }

    pub fn select_file(&mut self, file: Option<String>) {
        self.selection.file = file;
        self.table = None;
        self.table_source = None;
        self.column_summary.clear();
        self.load_selected_file();
    }

    pub fn set_separator(&mut self, sep: Separator) {
        self.selection.sep = Some(sep);
        if self.selection.file.is_some() {
            self.load_selected_file();
        }
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
        if view == ViewMode::DifferentialExpression
            && self.de.is_none()
            && self.selection.dataset.is_some()
        {
            self.load_de();
        }
    }

    // -- Generic table viewer -----------------------------------------------

    fn load_selected_file(&mut self) {
        let sep = self.separator();
        let (Some(portal), Some(project), Some(dataset), Some(file)) = (
            self.portal.as_deref(),
            self.selection.project.as_deref(),
            self.selection.dataset.as_deref(),
            self.selection.file.as_deref(),
        ) else {
            return;
        };
        let source = format!("{project}/{dataset}/{file}");
        match portal.read_table(project, dataset, file, sep) {
            Ok(table) => {
                self.set_table(table, source);
                self.status_message = None;
            }
            Err(e) => self.report(&format!("Reading {source}"), e),
        }
    }

    /// Load a file from disk outside the portal tree.
    pub fn open_local_file(&mut self, path: &Path) {
        match loader::load_file(path, None) {
            Ok(table) => {
                self.set_table(table, path.display().to_string());
                self.view = ViewMode::Table;
                self.status_message = None;
            }
            Err(e) => self.report("Failed to load file", e),
        }
    }

    fn set_table(&mut self, table: Table, source: String) {
        self.column_summary = summarize(&table);
        self.table = Some(table);
        self.table_source = Some(source);
    }

    // -- DE viewer ----------------------------------------------------------

    pub fn load_de(&mut self) {
        let (Some(portal), Some(project), Some(dataset)) = (
            self.portal.as_deref(),
            self.selection.project.as_deref(),
            self.selection.dataset.as_deref(),
        ) else {
            return;
        };
        match load_de_dataset(portal, project, dataset, &self.config.portal) {
            Ok(ds) => {
                self.set_de(ds);
                self.status_message = None;
            }
            Err(e) => {
                self.de = None;
                self.report("Loading differential expression data", e);
            }
        }
    }

    /// Ingest an aggregated dataset: select every group, default colour and comparison.
    pub fn set_de(&mut self, ds: DeDataset) {
        self.selected_groups = ds.groups.clone();
        self.color_column = ds.metadata.column_names.first().cloned();
        self.color_map = self
            .color_column
            .as_deref()
            .and_then(|c| ColorMap::for_column(&ds.metadata, c));
        self.comparison = ds.comparisons.first().map(|c| c.name.clone());
        self.de = Some(ds);
        self.recompute_pca();
        self.recompute_volcano();
    }

    pub fn toggle_group(&mut self, value: &MetadataValue) {
        if !self.selected_groups.remove(value) {
            self.selected_groups.insert(value.clone());
        }
        self.recompute_pca();
    }

    pub fn select_all_groups(&mut self) {
        if let Some(ds) = &self.de {
            self.selected_groups = ds.groups.clone();
            self.recompute_pca();
        }
    }

    pub fn select_no_groups(&mut self) {
        self.selected_groups.clear();
        self.recompute_pca();
    }

    pub fn set_color_column(&mut self, column: String) {
        if let Some(ds) = &self.de {
            self.color_map = ColorMap::for_column(&ds.metadata, &column);
        }
        self.color_column = Some(column);
    }

    pub fn set_log_transform(&mut self, on: bool) {
        self.log_transform = on;
        self.recompute_pca();
    }

    pub fn set_comparison(&mut self, name: String) {
        self.comparison = Some(name);
        self.recompute_volcano();
    }

    pub fn set_cutoffs(&mut self, cutoffs: Cutoffs) {
        self.cutoffs = cutoffs;
        self.recompute_volcano();
    }

    /// Samples currently picked by the group filter, in CPM column order.
    pub fn selected_samples(&self) -> Vec<String> {
        match &self.de {
            Some(ds) => selected_samples(&ds.metadata, &self.selected_groups, &ds.cpm.samples),
            None => Vec::new(),
        }
    }

    pub fn recompute_pca(&mut self) {
        let samples = self.selected_samples();
        let Some(ds) = &self.de else { return };
        let options = PcaOptions {
            log_transform: self.log_transform,
        };
        match run_pca(&ds.cpm, &samples, options) {
            Ok(result) => {
                self.pca = Some(result);
                self.pca_error = None;
            }
            Err(e) => {
                log::warn!("PCA unavailable: {e}");
                self.pca = None;
                self.pca_error = Some(e.to_string());
            }
        }
    }

    pub fn recompute_volcano(&mut self) {
        let points = self
            .de
            .as_ref()
            .zip(self.comparison.as_deref())
            .and_then(|(ds, name)| ds.comparison(name))
            .map(|cmp| volcano_points(cmp, self.cutoffs))
            .unwrap_or_default();
        self.volcano_summary = volcano::summarize(&points);
        self.volcano = points;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn portal_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "proj/tables/scores.tsv", "name\tscore\na\t1\nb\t3\n");
        write(
            root,
            "proj/de/metadata.csv",
            "sample,group\nA,ctrl\nB,ctrl\nC,treated\nD,treated\n",
        );
        write(root, "proj/de/process.txt", "differential-expression-table");
        write(
            root,
            "proj/de/treated_vs_ctrl/treated_vs_ctrl.results.csv",
            "GeneID,GeneName,logFC,PValue,FDR,A,B,C,D\n\
             g1,One,2.0,0.0001,0.04,10,12,40,44\n\
             g2,Two,-1.5,0.001,0.01,30,28,9,7\n\
             g3,Three,3.0,0.05,0.2,5,6,5,9\n",
        );
        dir
    }

    fn config(root: &Path) -> Config {
        Config {
            domains: BTreeMap::from([("lab".to_string(), root.to_path_buf())]),
            ..Config::default()
        }
    }

    #[test]
    fn test_query_restores_table_selection() {
        let dir = portal_tree();
        let initial = Selection::from_query("domain=lab&project=proj&dataset=tables&file=scores.tsv&sep=tab");
        let state = AppState::new(config(dir.path()), initial);

        assert_eq!(state.projects, vec!["proj"]);
        let table = state.table.as_ref().unwrap();
        assert_eq!(table.headers, vec!["name", "score"]);
        assert_eq!(state.column_summary[1].range, Some((1.0, 3.0)));
        assert_eq!(
            state.query_string(),
            "domain=lab&project=proj&dataset=tables&file=scores.tsv&sep=tab"
        );
    }

    #[test]
    fn test_stale_query_values_are_dropped() {
        let dir = portal_tree();
        let initial = Selection::from_query("project=proj&dataset=gone&file=scores.tsv");
        let state = AppState::new(config(dir.path()), initial);
        assert_eq!(state.selection.domain.as_deref(), Some("lab"));
        assert_eq!(state.selection.project.as_deref(), Some("proj"));
        assert_eq!(state.selection.dataset, None);
        assert_eq!(state.selection.file, None);
        assert!(state.table.is_none());
    }

    #[test]
    fn test_separator_change_reloads_file() {
        let dir = portal_tree();
        let initial = Selection::from_query("project=proj&dataset=tables&file=scores.tsv");
        let mut state = AppState::new(config(dir.path()), initial);
        assert_eq!(state.separator(), Separator::Comma);
        assert_eq!(state.table.as_ref().unwrap().headers.len(), 1);

        state.set_separator(Separator::Tab);
        assert_eq!(state.table.as_ref().unwrap().headers.len(), 2);
    }

    #[test]
    fn test_de_view_runs_pca_and_volcano() {
        let dir = portal_tree();
        let mut state = AppState::new(
            config(dir.path()),
            Selection::from_query("project=proj&dataset=de"),
        );
        state.set_view(ViewMode::DifferentialExpression);

        let ds = state.de.as_ref().expect("DE dataset loaded");
        assert_eq!(ds.cpm.samples, vec!["A", "B", "C", "D"]);
        assert_eq!(state.color_column.as_deref(), Some("group"));
        assert_eq!(state.comparison.as_deref(), Some("treated_vs_ctrl"));
        assert_eq!(state.pca.as_ref().unwrap().samples.len(), 4);
        assert_eq!(state.pca.as_ref().unwrap().genes_used, 3);
        assert!(ds.cpm.zero_columns.is_empty());
        assert_eq!(state.volcano.len(), 3);
        assert_eq!(state.volcano_summary.up, 1);
        assert_eq!(state.volcano_summary.down, 1);

        state.toggle_group(&MetadataValue::String("treated".into()));
        assert_eq!(state.selected_samples(), vec!["A", "B"]);
        assert!(state.pca.is_none());
        assert!(state.pca_error.as_ref().unwrap().contains("need at least 3 samples"));

        state.select_all_groups();
        assert!(state.pca.is_some());

        state.set_cutoffs(Cutoffs { fdr: 0.001, lfc: 1.0 });
        assert_eq!(state.volcano_summary.up + state.volcano_summary.down, 0);
    }

    #[test]
    fn test_dataset_type_filter_applies_to_both_views() {
        let dir = portal_tree();
        let mut cfg = config(dir.path());
        cfg.portal.dataset_types = vec!["differential-expression-table".into()];
        let mut state = AppState::new(
            cfg,
            Selection::from_query("project=proj&dataset=tables&file=scores.tsv"),
        );
        assert_eq!(state.datasets.len(), 2);
        let visible = state.visible_datasets();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "de");
        // A filtered-out dataset in the link is dropped like a stale one.
        assert_eq!(state.selection.dataset, None);
        assert!(state.table.is_none());

        state.set_view(ViewMode::DifferentialExpression);
        assert_eq!(state.visible_datasets().len(), 1);
    }

    #[test]
    fn test_unknown_domain_sets_status() {
        let dir = portal_tree();
        let state = AppState::new(config(dir.path()), Selection::from_query("domain=elsewhere"));
        assert!(state.projects.is_empty());
        assert!(state.status_message.as_ref().unwrap().contains("unknown domain"));
    }
}
