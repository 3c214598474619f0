//! Everything the transit map UI remembers between messages.
//!
//! The seed `update` loop drives this struct through named transitions so the
//! same behavior can be tested natively without a browser.

use std::collections::BTreeSet;

use shared::{GeoPoint, PlanRequest, PlanResponse, RouteNumber, TravelMode, Waypoint};

/// Address searches shorter than this show no suggestions.
pub const MIN_QUERY_LEN: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub enum Drawer {
    Closed,
    Route(RouteNumber),
    Stop(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Origin,
    Destination,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapStyle {
    Streets,
    Satellite,
}

impl MapStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            MapStyle::Streets => "streets",
            MapStyle::Satellite => "satellite",
        }
    }
}

/// One side of the trip form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EndpointInput {
    pub query: String,
    pub suggestions: Vec<GeoPoint>,
    pub selected: Option<GeoPoint>,
}

impl EndpointInput {
    fn select(&mut self, point: GeoPoint) {
        self.query = point.label();
        self.suggestions.clear();
        self.selected = Some(point);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TripForm {
    pub origin: EndpointInput,
    pub destination: EndpointInput,
    pub mode: TravelMode,
}

impl TripForm {
    pub fn input(&self, endpoint: Endpoint) -> &EndpointInput {
        match endpoint {
            Endpoint::Origin => &self.origin,
            Endpoint::Destination => &self.destination,
        }
    }

    fn input_mut(&mut self, endpoint: Endpoint) -> &mut EndpointInput {
        match endpoint {
            Endpoint::Origin => &mut self.origin,
            Endpoint::Destination => &mut self.destination,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UiState {
    /// Every route the dataset offers, ascending and without duplicates.
    pub all_routes: Vec<RouteNumber>,
    pub visible_routes: BTreeSet<RouteNumber>,
    pub sidebar_open: bool,
    pub drawer: Drawer,
    pub planned: Option<PlanResponse>,
    pub pending: bool,
    pub selecting: Option<Endpoint>,
    pub temp_origin: Option<GeoPoint>,
    pub temp_destination: Option<GeoPoint>,
    pub trip: TripForm,
    pub stop_query: String,
    pub toast: Option<Toast>,
    pub hovered_stop: Option<String>,
    pub reset_view_requested: bool,
    pub map_style: MapStyle,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            all_routes: Vec::new(),
            visible_routes: BTreeSet::new(),
            sidebar_open: true,
            drawer: Drawer::Closed,
            planned: None,
            pending: false,
            selecting: None,
            temp_origin: None,
            temp_destination: None,
            trip: TripForm::default(),
            stop_query: String::new(),
            toast: None,
            hovered_stop: None,
            reset_view_requested: false,
            map_style: MapStyle::Streets,
        }
    }
}

impl UiState {
    pub fn new(routes: impl IntoIterator<Item = RouteNumber>) -> Self {
        let mut state = Self::default();
        state.set_available_routes(routes);
        state
    }

    /// Replaces the known route list and makes every route visible.
    pub fn set_available_routes(&mut self, routes: impl IntoIterator<Item = RouteNumber>) {
        self.all_routes = routes.into_iter().collect();
        self.all_routes.sort_unstable();
        self.all_routes.dedup();
        self.show_all_routes();
    }

    pub fn is_visible(&self, route: RouteNumber) -> bool {
        self.visible_routes.contains(&route)
    }

    /// Comma separated list for the `visible` query parameter.
    pub fn visible_param(&self) -> String {
        self.visible_routes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn toggle_route(&mut self, route: RouteNumber) {
        if !self.visible_routes.remove(&route) {
            self.visible_routes.insert(route);
        }
    }

    pub fn show_all_routes(&mut self) {
        self.visible_routes = self.all_routes.iter().copied().collect();
    }

    pub fn open_route(&mut self, route: RouteNumber) {
        self.drawer = Drawer::Route(route);
    }

    pub fn open_stop(&mut self, name: impl Into<String>) {
        self.drawer = Drawer::Stop(name.into());
    }

    pub fn close_drawer(&mut self) {
        self.drawer = Drawer::Closed;
    }

    pub fn begin_map_selection(&mut self, endpoint: Endpoint) {
        self.selecting = Some(endpoint);
        self.notify(
            match endpoint {
                Endpoint::Origin => "Click the map to set the starting point",
                Endpoint::Destination => "Click the map to set the destination",
            },
            ToastKind::Info,
        );
    }

    /// Applies a map click to the endpoint being picked. Returns that endpoint,
    /// or `None` when no selection was in progress.
    pub fn map_selected(&mut self, point: GeoPoint) -> Option<Endpoint> {
        let endpoint = self.selecting.take()?;
        match endpoint {
            Endpoint::Origin => self.temp_origin = Some(point.clone()),
            Endpoint::Destination => self.temp_destination = Some(point.clone()),
        }
        self.trip.input_mut(endpoint).select(point);
        self.toast = None;
        Some(endpoint)
    }

    pub fn begin_locating(&mut self) {
        self.selecting = None;
        self.notify("Finding your location…", ToastKind::Info);
    }

    /// Uses the device position as the trip origin. The caller reverse
    /// geocodes it afterwards, like a map-picked origin.
    pub fn located(&mut self, point: GeoPoint) {
        self.temp_origin = Some(point.clone());
        self.trip.origin.select(point);
        self.notify("Starting point set to your location", ToastKind::Success);
    }

    pub fn location_failed(&mut self, reason: &str) {
        self.notify(format!("Could not get your location: {reason}"), ToastKind::Error);
    }

    /// Labels a map-picked endpoint once reverse geocoding answers. Ignored if
    /// the user picked another point in the meantime.
    pub fn address_resolved(&mut self, endpoint: Endpoint, point: GeoPoint) {
        let input = self.trip.input_mut(endpoint);
        let same_point = input
            .selected
            .as_ref()
            .is_some_and(|p| p.lat == point.lat && p.lng == point.lng);
        if same_point {
            input.select(point);
        }
    }

    /// Updates a query. Returns true when the query is long enough to search.
    pub fn set_query(&mut self, endpoint: Endpoint, query: String) -> bool {
        let input = self.trip.input_mut(endpoint);
        input.selected = None;
        let searchable = query.trim().chars().count() >= MIN_QUERY_LEN;
        if !searchable {
            input.suggestions.clear();
        }
        input.query = query;
        searchable
    }

    /// Stores suggestions for `query`, dropping answers to an outdated query.
    pub fn set_suggestions(&mut self, endpoint: Endpoint, query: &str, suggestions: Vec<GeoPoint>) {
        let input = self.trip.input_mut(endpoint);
        if input.query != query {
            return;
        }
        if query.trim().chars().count() < MIN_QUERY_LEN {
            input.suggestions.clear();
        } else {
            input.suggestions = suggestions;
        }
    }

    pub fn choose_suggestion(&mut self, endpoint: Endpoint, index: usize) -> bool {
        let input = self.trip.input_mut(endpoint);
        match input.suggestions.get(index).cloned() {
            Some(point) => {
                input.select(point);
                true
            }
            None => false,
        }
    }

    pub fn set_mode(&mut self, mode: TravelMode) {
        self.trip.mode = mode;
    }

    pub fn can_plan(&self) -> bool {
        self.trip.origin.selected.is_some() && self.trip.destination.selected.is_some()
    }

    /// Marks a plan request in flight and builds it. `None` while another
    /// request is pending or an endpoint is missing.
    pub fn begin_planning(&mut self) -> Option<PlanRequest> {
        if self.pending {
            return None;
        }
        let (Some(origin), Some(destination)) = (
            self.trip.origin.selected.clone(),
            self.trip.destination.selected.clone(),
        ) else {
            self.notify("Choose a start and a destination first", ToastKind::Error);
            return None;
        };
        self.pending = true;
        Some(PlanRequest {
            origin: Waypoint::Point(origin),
            destination: Waypoint::Point(destination),
            mode: self.trip.mode,
        })
    }

    pub fn route_planned(&mut self, plan: PlanResponse) {
        self.pending = false;
        self.temp_origin = None;
        self.temp_destination = None;
        self.notify(plan.summary.clone(), ToastKind::Success);
        self.planned = Some(plan);
    }

    pub fn planning_failed(&mut self, message: impl Into<String>) {
        self.pending = false;
        self.notify(message, ToastKind::Error);
    }

    pub fn clear_route(&mut self) {
        self.planned = None;
        self.temp_origin = None;
        self.temp_destination = None;
        self.selecting = None;
        self.trip = TripForm {
            mode: self.trip.mode,
            ..TripForm::default()
        };
    }

    /// Back to the initial view: all routes shown, no plan, drawer closed.
    pub fn reset(&mut self) {
        self.show_all_routes();
        self.clear_route();
        self.close_drawer();
        self.hovered_stop = None;
        self.stop_query.clear();
        self.reset_view_requested = true;
    }

    pub fn view_reset_done(&mut self) {
        self.reset_view_requested = false;
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toast = Some(Toast {
            message: message.into(),
            kind,
        });
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    pub fn hover_stop(&mut self, name: Option<String>) {
        self.hovered_stop = name;
    }

    pub fn set_stop_query(&mut self, query: String) {
        self.stop_query = query;
    }

    pub fn toggle_map_style(&mut self) {
        self.map_style = match self.map_style {
            MapStyle::Streets => MapStyle::Satellite,
            MapStyle::Satellite => MapStyle::Streets,
        };
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }
}
