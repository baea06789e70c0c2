//! Dashboard controller: tab switching, lazily built maps, chart period,
//! worker tasks and the citizen counters.

use std::time::{Duration, Instant};

use ratatui::widgets::ListState;
use tracing::{debug, info};

use crate::data::{
    self, MapFocus, Period, PeriodData, Stats, Task, TaskStatus, CITY_CENTER, CITY_ZOOM, DEVIATIONS,
};
use crate::tab::Tab;

pub const COUNTER_DURATION: Duration = Duration::from_millis(1500);
const MAX_ZOOM: u8 = 18;
const MIN_ZOOM: u8 = 1;

/// A labelled point dropped on a map
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub position: (f64, f64),
    pub label: String,
}

/// Viewport over (lat, lng) space, sized in terminal cells.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub size: (u16, u16),
    pub needs_resize: bool,
    pub pins: Vec<Pin>,
}

impl MapView {
    pub fn new(center: (f64, f64), zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            size: (0, 0),
            needs_resize: true,
            pins: Vec::new(),
        }
    }

    pub fn set_view(&mut self, center: (f64, f64), zoom: u8) {
        self.center = center;
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn add_pin(&mut self, position: (f64, f64), label: &str) {
        if !self.pins.iter().any(|p| p.position == position) {
            self.pins.push(Pin {
                position,
                label: label.to_string(),
            });
        }
    }

    /// Flag the map for a re-fit on its next render. A map built while hidden
    /// has no size until then.
    pub fn invalidate_size(&mut self) {
        self.needs_resize = true;
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.size = (width, height);
        self.needs_resize = false;
    }

    /// Terminal cells are roughly twice as tall as wide.
    fn aspect(&self) -> f64 {
        let (width, height) = self.size;
        if width == 0 || height == 0 {
            0.5
        } else {
            (f64::from(height) * 2.0) / f64::from(width)
        }
    }

    fn lng_span(zoom: u8) -> f64 {
        360.0 / 2f64.powi(i32::from(zoom))
    }

    /// Visible `(lng_bounds, lat_bounds)` for the canvas.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let lng_span = Self::lng_span(self.zoom);
        let lat_span = lng_span * self.aspect();
        let (lat, lng) = self.center;
        (
            [lng - lng_span / 2.0, lng + lng_span / 2.0],
            [lat - lat_span / 2.0, lat + lat_span / 2.0],
        )
    }

    pub fn contains(&self, (lat, lng): (f64, f64)) -> bool {
        let ([west, east], [south, north]) = self.bounds();
        (west..=east).contains(&lng) && (south..=north).contains(&lat)
    }

    /// Centre on the points and pick the closest zoom that still shows all of
    /// them with some padding. A single point zooms all the way in.
    pub fn fit_bounds(&mut self, points: &[(f64, f64)]) {
        if points.is_empty() {
            return;
        }

        let (mut south, mut north) = (f64::MAX, f64::MIN);
        let (mut west, mut east) = (f64::MAX, f64::MIN);
        for &(lat, lng) in points {
            south = south.min(lat);
            north = north.max(lat);
            west = west.min(lng);
            east = east.max(lng);
        }

        self.center = ((south + north) / 2.0, (west + east) / 2.0);

        let padding = 1.25;
        let lng_extent = (east - west) * padding;
        let lat_extent = (north - south) * padding;
        let aspect = self.aspect();

        let mut zoom = MAX_ZOOM;
        while zoom > MIN_ZOOM {
            let lng_span = Self::lng_span(zoom);
            if lng_extent <= lng_span && lat_extent <= lng_span * aspect {
                break;
            }
            zoom -= 1;
        }
        self.zoom = zoom;
    }
}

/// A map slot that is built on first use and never rebuilt.
#[derive(Debug, Default)]
pub struct LazyMap {
    view: Option<MapView>,
    constructions: u32,
}

impl LazyMap {
    pub fn get_or_init(&mut self, init: impl FnOnce() -> MapView) -> &mut MapView {
        if self.view.is_none() {
            self.constructions += 1;
            info!(count = self.constructions, "constructing map view");
        }
        self.view.get_or_insert_with(init)
    }

    #[cfg(test)]
    pub fn get(&self) -> Option<&MapView> {
        self.view.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut MapView> {
        self.view.as_mut()
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.view.is_some()
    }

    #[cfg(test)]
    pub fn constructions(&self) -> u32 {
        self.constructions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayLayer {
    Trucks,
    Deviations,
    Reports,
}

impl OverlayLayer {
    pub fn all() -> [OverlayLayer; 3] {
        [OverlayLayer::Trucks, OverlayLayer::Deviations, OverlayLayer::Reports]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OverlayLayer::Trucks => "Active Trucks",
            OverlayLayer::Deviations => "Route Deviations",
            OverlayLayer::Reports => "Citizen Reports",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlays {
    pub trucks: bool,
    pub deviations: bool,
    pub reports: bool,
}

impl Default for Overlays {
    fn default() -> Self {
        Self {
            trucks: true,
            deviations: true,
            reports: true,
        }
    }
}

impl Overlays {
    pub fn is_visible(&self, layer: OverlayLayer) -> bool {
        match layer {
            OverlayLayer::Trucks => self.trucks,
            OverlayLayer::Deviations => self.deviations,
            OverlayLayer::Reports => self.reports,
        }
    }

    pub fn toggle(&mut self, layer: OverlayLayer) {
        let flag = match layer {
            OverlayLayer::Trucks => &mut self.trucks,
            OverlayLayer::Deviations => &mut self.deviations,
            OverlayLayer::Reports => &mut self.reports,
        };
        *flag = !*flag;
    }
}

/// Counts from zero to `target` over `COUNTER_DURATION` once started.
#[derive(Debug, Clone)]
pub struct AnimatedCounter {
    pub label: &'static str,
    pub target: u64,
    started_at: Option<Instant>,
}

impl AnimatedCounter {
    pub fn new(label: &'static str, target: u64) -> Self {
        Self {
            label,
            target,
            started_at: None,
        }
    }

    /// Only the first call has an effect.
    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    #[cfg(test)]
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn value_at(&self, now: Instant) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let elapsed = now.saturating_duration_since(started_at);
        let progress = (elapsed.as_secs_f64() / COUNTER_DURATION.as_secs_f64()).min(1.0);
        (progress * self.target as f64).floor() as u64
    }
}

/// Format with thousands separators, e.g. `185,400`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn admin_map_view() -> MapView {
    MapView::new(CITY_CENTER, CITY_ZOOM)
}

pub struct Dashboard {
    pub active_tab: Tab,
    pub period: Period,
    pub show_login: bool,

    // Admin view
    pub admin_map: LazyMap,
    pub overlays: Overlays,

    // Worker view
    pub worker_map: LazyMap,
    pub show_worker_map: bool,
    pub tasks: Vec<Task>,
    pub task_state: ListState,

    // Citizen view
    pub counters: Vec<AnimatedCounter>,
}

impl Dashboard {
    pub fn new(initial_tab: Tab, period: Period, now: Instant) -> Self {
        let counters = data::CITIZEN_STATS
            .iter()
            .map(|&(label, target)| AnimatedCounter::new(label, target))
            .collect();

        let mut dashboard = Self {
            active_tab: initial_tab,
            period,
            show_login: true,
            admin_map: LazyMap::default(),
            overlays: Overlays::default(),
            worker_map: LazyMap::default(),
            show_worker_map: false,
            tasks: data::worker_tasks(),
            task_state: ListState::default(),
            counters,
        };
        dashboard.activate_tab(initial_tab, now);
        dashboard
    }

    pub fn activate_tab(&mut self, tab: Tab, now: Instant) {
        debug!(tab = tab.as_str(), "activating tab");
        self.active_tab = tab;

        match tab {
            Tab::Admin => {
                self.admin_map.get_or_init(admin_map_view).invalidate_size();
            }
            Tab::Worker => {
                self.select_task(1);
            }
            Tab::Citizen => {
                for counter in &mut self.counters {
                    counter.start(now);
                }
            }
        }
    }

    pub fn dismiss_login(&mut self) {
        self.show_login = false;
    }

    // Admin

    pub fn period_data(&self) -> &'static PeriodData {
        data::period_data(self.period)
    }

    pub fn stats(&self) -> Stats {
        self.period_data().stats
    }

    pub fn set_period(&mut self, period: Period) {
        if self.period != period {
            debug!(period = period.as_str(), "switching chart period");
        }
        self.period = period;
    }

    pub fn toggle_layer(&mut self, layer: OverlayLayer) {
        self.overlays.toggle(layer);
    }

    /// Fit the admin map to the deviation markers. Returns false when there
    /// is nothing to fit or the map has not been built yet.
    pub fn focus_deviations(&mut self) -> bool {
        if DEVIATIONS.is_empty() {
            return false;
        }
        let points: Vec<(f64, f64)> = DEVIATIONS.iter().map(|d| (d.lat, d.lng)).collect();
        match self.admin_map.get_mut() {
            Some(map) => {
                map.fit_bounds(&points);
                true
            }
            None => false,
        }
    }

    // Worker

    pub fn selected_task(&self) -> Option<&Task> {
        self.task_state.selected().and_then(|i| self.tasks.get(i))
    }

    /// Show a task's details. Unknown ids are ignored.
    pub fn select_task(&mut self, id: u32) {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return;
        };
        self.task_state.select(Some(index));

        let task = &self.tasks[index];
        match task.map {
            Some(MapFocus { center, zoom }) => {
                let title = task.title;
                self.show_worker_map = true;
                let map = self.worker_map.get_or_init(|| MapView::new(center, zoom));
                map.set_view(center, zoom);
                map.add_pin(center, title);
                map.invalidate_size();
            }
            None => {
                self.show_worker_map = false;
            }
        }
    }

    pub fn task_nav_down(&mut self) {
        let len = self.tasks.len();
        if len > 0 {
            let i = self.task_state.selected().unwrap_or(0);
            let id = self.tasks[(i + 1).min(len - 1)].id;
            self.select_task(id);
        }
    }

    pub fn task_nav_up(&mut self) {
        let i = self.task_state.selected().unwrap_or(0);
        if let Some(task) = self.tasks.get(i.saturating_sub(1)) {
            let id = task.id;
            self.select_task(id);
        }
    }

    /// Press the detail-view button of a task. Returns the new status.
    pub fn task_action(&mut self, id: u32) -> Option<TaskStatus> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        let next = task.status.advanced()?;
        info!(task = id, from = task.status.label(), to = next.label(), "task status changed");
        task.status = next;
        Some(next)
    }

    /// Re-fit whichever maps are built, e.g. after a terminal resize.
    pub fn invalidate_maps(&mut self) {
        if let Some(map) = self.admin_map.get_mut() {
            map.invalidate_size();
        }
        if let Some(map) = self.worker_map.get_mut() {
            map.invalidate_size();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard(tab: Tab) -> Dashboard {
        Dashboard::new(tab, Period::default(), Instant::now())
    }

    #[test]
    fn admin_map_is_built_once_across_activations() {
        let now = Instant::now();
        let mut d = dashboard(Tab::Admin);
        assert_eq!(d.admin_map.constructions(), 1);

        d.admin_map.get_mut().unwrap().resize(80, 20);
        d.activate_tab(Tab::Worker, now);
        d.activate_tab(Tab::Admin, now);
        d.activate_tab(Tab::Admin, now);

        assert_eq!(d.admin_map.constructions(), 1);
        assert!(d.admin_map.get().unwrap().needs_resize);
    }

    #[test]
    fn maps_stay_unbuilt_until_their_tab_is_shown() {
        let d = dashboard(Tab::Citizen);
        assert!(!d.admin_map.is_initialized());
        assert!(!d.worker_map.is_initialized());
        assert!(d.counters.iter().all(|c| c.is_started()));
    }

    #[test]
    fn worker_map_is_built_once_and_follows_selected_task() {
        let mut d = dashboard(Tab::Worker);
        assert_eq!(d.selected_task().map(|t| t.id), Some(1));
        assert!(d.show_worker_map);

        d.select_task(2);
        d.select_task(3);
        d.select_task(2);
        assert_eq!(d.worker_map.constructions(), 1);

        let map = d.worker_map.get().unwrap();
        assert_eq!(map.center, (28.465, 77.498));
        assert_eq!(map.zoom, 16);
        assert_eq!(map.pins.len(), 3);
    }

    #[test]
    fn task_without_map_hides_worker_map() {
        let mut d = dashboard(Tab::Worker);
        d.select_task(4);
        assert!(!d.show_worker_map);
        assert_eq!(d.worker_map.constructions(), 1);
    }

    #[test]
    fn unknown_task_is_ignored() {
        let mut d = dashboard(Tab::Worker);
        d.select_task(99);
        assert_eq!(d.selected_task().map(|t| t.id), Some(1));
    }

    #[test]
    fn task_nav_clamps_at_ends() {
        let mut d = dashboard(Tab::Worker);
        d.task_nav_up();
        assert_eq!(d.selected_task().map(|t| t.id), Some(1));
        for _ in 0..10 {
            d.task_nav_down();
        }
        assert_eq!(d.selected_task().map(|t| t.id), Some(4));
    }

    #[test]
    fn task_action_advances_status() {
        let mut d = dashboard(Tab::Worker);
        assert_eq!(d.task_action(2), Some(TaskStatus::InProgress));
        assert_eq!(d.task_action(2), Some(TaskStatus::Completed));
        assert_eq!(d.task_action(2), None);
        assert_eq!(d.task_action(4), None);
        assert_eq!(d.task_action(42), None);
    }

    #[test]
    fn period_switch_replaces_stats() {
        let mut d = dashboard(Tab::Admin);
        assert_eq!(d.stats().co2, 2980);
        d.set_period(Period::ThreeMonths);
        assert_eq!(d.stats().deviations, 12);
        assert_eq!(d.period_data().labels.len(), 3);
        d.set_period(Period::OneYear);
        assert_eq!(d.stats().kwh, 395000);
    }

    #[test]
    fn layers_toggle_independently() {
        let mut d = dashboard(Tab::Admin);
        d.toggle_layer(OverlayLayer::Deviations);
        assert!(!d.overlays.is_visible(OverlayLayer::Deviations));
        assert!(d.overlays.is_visible(OverlayLayer::Trucks));
        d.toggle_layer(OverlayLayer::Deviations);
        assert!(d.overlays.is_visible(OverlayLayer::Deviations));
    }

    #[test]
    fn focus_deviations_needs_a_built_map() {
        let mut d = dashboard(Tab::Citizen);
        assert!(!d.focus_deviations());

        d.activate_tab(Tab::Admin, Instant::now());
        assert!(d.focus_deviations());
        let map = d.admin_map.get().unwrap();
        assert!(map.contains((DEVIATIONS[0].lat, DEVIATIONS[0].lng)));
        assert_eq!(map.zoom, MAX_ZOOM);
    }

    #[test]
    fn fit_bounds_keeps_all_points_visible() {
        let mut map = MapView::new(CITY_CENTER, CITY_ZOOM);
        map.resize(60, 20);
        let points = [(28.484, 77.513), (28.465, 77.498), (28.470, 77.530)];
        map.fit_bounds(&points);

        for p in points {
            assert!(map.contains(p), "{p:?} outside {:?}", map.bounds());
        }
        assert!(map.zoom < MAX_ZOOM);
    }

    #[test]
    fn counter_runs_from_zero_to_target() {
        let start = Instant::now();
        let mut counter = AnimatedCounter::new("Green Points", 1250);
        assert_eq!(counter.value_at(start), 0);

        counter.start(start);
        assert_eq!(counter.value_at(start), 0);
        let halfway = counter.value_at(start + COUNTER_DURATION / 2);
        assert!(halfway > 500 && halfway < 750, "{halfway}");
        assert_eq!(counter.value_at(start + COUNTER_DURATION), 1250);
        assert_eq!(counter.value_at(start + COUNTER_DURATION * 4), 1250);

        // Restarting later does not reset the animation
        counter.start(start + COUNTER_DURATION * 2);
        assert_eq!(counter.value_at(start + COUNTER_DURATION * 2), 1250);
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1450), "1,450");
        assert_eq!(format_thousands(185400), "185,400");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }
}
