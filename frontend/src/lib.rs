pub mod state;

use seed::{prelude::*, virtual_dom::AtValue, *};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_wasm_bindgen::to_value;
use shared::{
    ApiError, GeoPoint, PlanRequest, PlanResponse, Route, RouteDetails, RouteNumber, Stop,
    TravelMode, colors::route_color,
};
use wasm_bindgen::{
    JsCast,
    prelude::{JsValue, wasm_bindgen},
};

use crate::state::{Drawer, Endpoint, ToastKind, UiState};

#[wasm_bindgen(module = "/transit_map.js")]
extern "C" {
    #[wasm_bindgen(js_name = initMap)]
    fn init_map();
    #[wasm_bindgen(js_name = showRoutes)]
    fn show_routes_js(routes: JsValue);
    #[wasm_bindgen(js_name = showStops)]
    fn show_stops_js(stops: JsValue);
    #[wasm_bindgen(js_name = showPlannedRoute)]
    fn show_planned_route_js(coordinates: JsValue);
    #[wasm_bindgen(js_name = showSelectionMarkers)]
    fn show_selection_markers(origin: JsValue, destination: JsValue);
    #[wasm_bindgen(js_name = fitBounds)]
    fn fit_bounds_js(bounds: JsValue);
    #[wasm_bindgen(js_name = setMapStyle)]
    fn set_map_style(style: &str);
    #[wasm_bindgen(js_name = highlightStop)]
    fn highlight_stop_js(name: JsValue);
    #[wasm_bindgen(js_name = resetView)]
    fn reset_view();
    #[wasm_bindgen(js_name = locateUser)]
    fn locate_user();
}

fn api_root() -> String {
    if let Some(url) = option_env!("FRONTEND_API_ROOT") {
        return url.trim_end_matches('/').to_string();
    }
    "http://localhost:8080/api".to_string()
}

/// Stops shown in the search list at most.
const STOP_RESULTS: usize = 8;

pub struct Model {
    state: UiState,
    routes: Vec<Route>,
    stops: Vec<Stop>,
    details: Option<RouteDetails>,
    stop: Option<Stop>,
}

pub enum Msg {
    RoutesFetched(Result<Vec<Route>, String>),
    StopsFetched(Result<Vec<Stop>, String>),
    ToggleRoute(RouteNumber),
    ShowAllRoutes,
    OpenRoute(RouteNumber),
    RouteDetailsFetched(Result<RouteDetails, String>),
    OpenStop(String),
    StopFetched(Result<Stop, String>),
    CloseDrawer,
    BeginMapSelection(Endpoint),
    MapClicked { lat: f64, lng: f64 },
    UseCurrentLocation,
    Located { lat: f64, lng: f64 },
    LocationFailed(String),
    AddressResolved(Endpoint, Result<GeoPoint, String>),
    QueryChanged(Endpoint, String),
    SuggestionsFetched(Endpoint, String, Result<Vec<GeoPoint>, String>),
    ChooseSuggestion(Endpoint, usize),
    ModeChanged(TravelMode),
    PlanTrip,
    TripPlanned(Result<PlanResponse, String>),
    ClearRoute,
    Reset,
    DismissToast,
    HoverStop(Option<String>),
    StopQueryChanged(String),
    ToggleMapStyle,
    ToggleSidebar,
}

#[derive(Deserialize)]
struct MapClickPayload {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct LocationErrorPayload {
    message: String,
}

#[derive(Deserialize)]
struct StopClickPayload {
    name: String,
}

#[derive(Serialize)]
struct StopMarker<'a> {
    name: &'a str,
    lat: f64,
    lng: f64,
    route: RouteNumber,
    color: &'static str,
}

pub fn init(_: Url, orders: &mut impl Orders<Msg>) -> Model {
    orders.stream(streams::window_event(Ev::from("map-click"), |event| {
        let event = event.dyn_into::<web_sys::CustomEvent>().ok()?;
        let payload: MapClickPayload = serde_wasm_bindgen::from_value(event.detail()).ok()?;
        web_sys::console::debug_1(
            &format!(
                "[frontend] map click lat={:.5} lng={:.5}",
                payload.lat, payload.lng
            )
            .into(),
        );
        Some(Msg::MapClicked {
            lat: payload.lat,
            lng: payload.lng,
        })
    }));
    orders.stream(streams::window_event(Ev::from("stop-click"), |event| {
        let event = event.dyn_into::<web_sys::CustomEvent>().ok()?;
        let payload: StopClickPayload = serde_wasm_bindgen::from_value(event.detail()).ok()?;
        Some(Msg::OpenStop(payload.name))
    }));
    orders.stream(streams::window_event(Ev::from("current-location"), |event| {
        let event = event.dyn_into::<web_sys::CustomEvent>().ok()?;
        let payload: MapClickPayload = serde_wasm_bindgen::from_value(event.detail()).ok()?;
        Some(Msg::Located {
            lat: payload.lat,
            lng: payload.lng,
        })
    }));
    orders.stream(streams::window_event(Ev::from("current-location-error"), |event| {
        let event = event.dyn_into::<web_sys::CustomEvent>().ok()?;
        let payload: LocationErrorPayload = serde_wasm_bindgen::from_value(event.detail()).ok()?;
        Some(Msg::LocationFailed(payload.message))
    }));

    orders.perform_cmd(async {
        Msg::RoutesFetched(fetch_json(get_request(format!("{}/routes", api_root()))).await)
    });
    orders.perform_cmd(async {
        Msg::StopsFetched(fetch_json(get_request(format!("{}/stops", api_root()))).await)
    });

    Model {
        state: UiState::default(),
        routes: Vec::new(),
        stops: Vec::new(),
        details: None,
        stop: None,
    }
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::RoutesFetched(Ok(routes)) => {
            model
                .state
                .set_available_routes(routes.iter().map(|r| r.number));
            model.routes = routes;
            sync_network(model);
        }
        Msg::StopsFetched(Ok(stops)) => {
            model.stops = stops;
            sync_network(model);
        }
        Msg::RoutesFetched(Err(err)) | Msg::StopsFetched(Err(err)) => {
            web_sys::console::error_1(&format!("[frontend] dataset fetch failed: {err}").into());
            model
                .state
                .notify("Could not load the transit network", ToastKind::Error);
        }
        Msg::ToggleRoute(number) => {
            model.state.toggle_route(number);
            sync_network(model);
        }
        Msg::ShowAllRoutes => {
            model.state.show_all_routes();
            sync_network(model);
        }
        Msg::OpenRoute(number) => {
            model.state.open_route(number);
            if model.details.as_ref().map(|d| d.route.number) != Some(number) {
                model.details = None;
                let url = format!("{}/routes/{}", api_root(), number);
                orders.perform_cmd(async move {
                    Msg::RouteDetailsFetched(fetch_json(get_request(url)).await)
                });
            }
        }
        Msg::RouteDetailsFetched(result) => match result {
            Ok(details) => model.details = Some(details),
            Err(err) => {
                model.state.close_drawer();
                model.state.notify(err, ToastKind::Error);
            }
        },
        Msg::OpenStop(name) => {
            if model.stop.as_ref().map(|s| s.name.as_str()) != Some(name.as_str()) {
                model.stop = None;
                let url = format!(
                    "{}/stops/{}",
                    api_root(),
                    Url::encode_uri_component(&name)
                );
                orders.perform_cmd(async move {
                    Msg::StopFetched(fetch_json(get_request(url)).await)
                });
            }
            model.state.open_stop(name);
        }
        Msg::StopFetched(result) => match result {
            Ok(stop) => model.stop = Some(stop),
            Err(err) => {
                model.state.close_drawer();
                model.state.notify(err, ToastKind::Error);
            }
        },
        Msg::CloseDrawer => model.state.close_drawer(),
        Msg::BeginMapSelection(endpoint) => model.state.begin_map_selection(endpoint),
        Msg::MapClicked { lat, lng } => {
            if let Some(endpoint) = model.state.map_selected(GeoPoint::new(lat, lng)) {
                sync_selection_markers(&model.state);
                let url = format!("{}/geocode/reverse?lat={lat}&lng={lng}", api_root());
                orders.perform_cmd(async move {
                    Msg::AddressResolved(endpoint, fetch_json(get_request(url)).await)
                });
            }
        }
        Msg::UseCurrentLocation => {
            model.state.begin_locating();
            locate_user();
        }
        Msg::Located { lat, lng } => {
            model.state.located(GeoPoint::new(lat, lng));
            sync_selection_markers(&model.state);
            let url = format!("{}/geocode/reverse?lat={lat}&lng={lng}", api_root());
            orders.perform_cmd(async move {
                Msg::AddressResolved(Endpoint::Origin, fetch_json(get_request(url)).await)
            });
        }
        Msg::LocationFailed(reason) => model.state.location_failed(&reason),
        Msg::AddressResolved(endpoint, result) => match result {
            Ok(point) => model.state.address_resolved(endpoint, point),
            Err(err) => {
                web_sys::console::warn_1(&format!("[frontend] reverse geocoding failed: {err}").into())
            }
        },
        Msg::QueryChanged(endpoint, query) => {
            if model.state.set_query(endpoint, query.clone()) {
                let url = format!(
                    "{}/geocode/search?q={}",
                    api_root(),
                    Url::encode_uri_component(&query)
                );
                orders.perform_cmd(async move {
                    Msg::SuggestionsFetched(endpoint, query, fetch_json(get_request(url)).await)
                });
            }
        }
        Msg::SuggestionsFetched(endpoint, query, result) => match result {
            Ok(points) => model.state.set_suggestions(endpoint, &query, points),
            Err(err) => model.state.notify(err, ToastKind::Error),
        },
        Msg::ChooseSuggestion(endpoint, index) => {
            if model.state.choose_suggestion(endpoint, index) {
                sync_selection_markers(&model.state);
            }
        }
        Msg::ModeChanged(mode) => model.state.set_mode(mode),
        Msg::PlanTrip => {
            if let Some(request) = model.state.begin_planning() {
                orders.perform_cmd(send_plan_request(request));
            }
        }
        Msg::TripPlanned(result) => match result {
            Ok(plan) => {
                push_plan_to_map(Some(&plan));
                if let Ok(bounds) = to_value(&plan.bounds) {
                    fit_bounds_js(bounds);
                }
                model.state.route_planned(plan);
                sync_selection_markers(&model.state);
            }
            Err(err) => model.state.planning_failed(err),
        },
        Msg::ClearRoute => {
            model.state.clear_route();
            push_plan_to_map(None);
            sync_selection_markers(&model.state);
        }
        Msg::Reset => {
            model.state.reset();
            push_plan_to_map(None);
            sync_selection_markers(&model.state);
            sync_network(model);
        }
        Msg::DismissToast => model.state.dismiss_toast(),
        Msg::HoverStop(name) => {
            highlight_stop_js(name.as_deref().map(JsValue::from).unwrap_or(JsValue::NULL));
            model.state.hover_stop(name);
        }
        Msg::StopQueryChanged(query) => model.state.set_stop_query(query),
        Msg::ToggleMapStyle => {
            model.state.toggle_map_style();
            set_map_style(model.state.map_style.as_str());
        }
        Msg::ToggleSidebar => model.state.toggle_sidebar(),
    }

    if model.state.reset_view_requested {
        reset_view();
        model.state.view_reset_done();
    }
}

fn get_request(url: String) -> Request<'static> {
    Request::new(url).method(Method::Get)
}

async fn fetch_json<T: DeserializeOwned + 'static>(request: Request<'static>) -> Result<T, String> {
    let response = request.fetch().await.map_err(|err| format!("{err:?}"))?;
    let status = response.status();
    if !status.is_ok() {
        let message = match response.json::<ApiError>().await {
            Ok(error) => error.message,
            Err(_) => format!("Request failed ({} {})", status.code, status.text),
        };
        return Err(message);
    }
    response.json::<T>().await.map_err(|err| format!("{err:?}"))
}

async fn send_plan_request(payload: PlanRequest) -> Msg {
    web_sys::console::debug_1(&format!("[frontend] planning {:?} trip", payload.mode).into());
    let response = match Request::new(format!("{}/plan", api_root()))
        .method(Method::Post)
        .json(&payload)
    {
        Err(err) => Err(format!("{err:?}")),
        Ok(request) => fetch_json::<PlanResponse>(request).await,
    };
    Msg::TripPlanned(response)
}

pub fn view(model: &Model) -> Node<Msg> {
    div![
        C!["app-container"],
        IF!(model.state.sidebar_open => view_sidebar(model)),
        button![
            C!["sidebar-toggle"],
            if model.state.sidebar_open { "◀" } else { "▶" },
            ev(Ev::Click, |_| Msg::ToggleSidebar),
        ],
        view_drawer(model),
        view_toast(model),
    ]
}

fn view_sidebar(model: &Model) -> Node<Msg> {
    aside![
        C!["sidebar"],
        h1!["Monterey Transit Explorer"],
        view_trip_planner(model),
        view_route_list(model),
        view_stop_search(model),
        fieldset![
            legend!["Map"],
            button![
                match model.state.map_style {
                    state::MapStyle::Streets => "Satellite view",
                    state::MapStyle::Satellite => "Street view",
                },
                ev(Ev::Click, |_| Msg::ToggleMapStyle),
                C!["map-toggle"],
            ],
            button!["Reset view", ev(Ev::Click, |_| Msg::Reset), C!["reset-btn"]],
        ],
    ]
}

fn view_trip_planner(model: &Model) -> Node<Msg> {
    let state = &model.state;
    let mode_option = |mode: TravelMode, label: &str| {
        label![
            input![
                attrs! {
                    At::Type => "radio",
                    At::Name => "travel-mode",
                    At::Checked => bool_attr(state.trip.mode == mode),
                },
                ev(Ev::Change, move |_| Msg::ModeChanged(mode)),
            ],
            span![label],
        ]
    };

    form![
        C!["trip-planner"],
        ev(Ev::Submit, |event| {
            event.prevent_default();
            Msg::PlanTrip
        }),
        legend!["Plan a trip"],
        view_endpoint_input(model, Endpoint::Origin, "From"),
        button![
            C!["locate-btn"],
            "Use my location",
            attrs! { At::Type => "button" },
            ev(Ev::Click, |_| Msg::UseCurrentLocation),
        ],
        view_endpoint_input(model, Endpoint::Destination, "To"),
        div![
            C!["travel-mode"],
            mode_option(TravelMode::Driving, "Drive"),
            mode_option(TravelMode::Walking, "Walk"),
        ],
        button![
            if state.pending { "Planning…" } else { "Plan route" },
            attrs! {
                At::Type => "submit",
                At::Disabled => bool_attr(state.pending || !state.can_plan()),
            },
        ],
        IF!(state.planned.is_some() => button![
            "Clear route",
            attrs! { At::Type => "button" },
            ev(Ev::Click, |_| Msg::ClearRoute),
        ]),
        state.planned.as_ref().map(view_plan_summary),
    ]
}

fn view_endpoint_input(model: &Model, endpoint: Endpoint, label: &str) -> Node<Msg> {
    let input = model.state.trip.input(endpoint);
    let picking = model.state.selecting == Some(endpoint);

    div![
        C!["input-field"],
        label![label],
        input![
            attrs! {
                At::Value => input.query,
                At::Placeholder => "Search an address",
                At::AutoComplete => "off",
                At::SpellCheck => "false",
            },
            input_ev(Ev::Input, move |value| Msg::QueryChanged(endpoint, value)),
        ],
        button![
            C!["pick-on-map", IF!(picking => "active")],
            attrs! { At::Type => "button", At::Title => "Pick on the map" },
            "📍",
            ev(Ev::Click, move |_| Msg::BeginMapSelection(endpoint)),
        ],
        IF!(!input.suggestions.is_empty() => ul![
            C!["suggestions"],
            input.suggestions.iter().enumerate().map(|(idx, point)| {
                li![
                    point.label(),
                    ev(Ev::Click, move |_| Msg::ChooseSuggestion(endpoint, idx)),
                ]
            }),
        ]),
    ]
}

fn view_plan_summary(plan: &PlanResponse) -> Node<Msg> {
    let stop_line = |label: &str, stop: Option<&Stop>| match stop {
        Some(stop) => p![format!("{label}: {} (Route {})", stop.name, stop.route)],
        None => p![format!("{label}: no nearby stop")],
    };

    div![
        C!["plan-summary"],
        p![C!["summary"], &plan.summary],
        stop_line("Nearest stop to start", plan.route.nearest_origin_stop.as_ref()),
        stop_line(
            "Nearest stop to destination",
            plan.route.nearest_destination_stop.as_ref()
        ),
        a![
            "Download GPX",
            attrs! {
                At::Href => format!("data:application/gpx+xml;base64,{}", plan.gpx_base64),
                At::Download => "trip.gpx",
            },
        ],
    ]
}

fn view_route_list(model: &Model) -> Node<Msg> {
    fieldset![
        C!["route-list"],
        legend!["Bus routes"],
        model.state.all_routes.iter().map(|&number| {
            let route = model.routes.iter().find(|r| r.number == number);
            let color = route.map_or(route_color(number), |r| r.color.as_str());
            let name = route.map_or("", |r| r.name.as_str());
            div![
                C!["route-toggle"],
                label![
                    input![
                        attrs! {
                            At::Type => "checkbox",
                            At::Checked => bool_attr(model.state.is_visible(number)),
                        },
                        ev(Ev::Change, move |_| Msg::ToggleRoute(number)),
                    ],
                    span![
                        C!["swatch"],
                        attrs! { At::Style => format!("background-color: {color}") },
                    ],
                    span![format!("Route {number} · {name}")],
                ],
                button![
                    "Details",
                    attrs! { At::Type => "button" },
                    ev(Ev::Click, move |_| Msg::OpenRoute(number)),
                ],
            ]
        }),
        button!["Show all", ev(Ev::Click, |_| Msg::ShowAllRoutes)],
    ]
}

fn view_stop_search(model: &Model) -> Node<Msg> {
    let needle = model.state.stop_query.trim().to_lowercase();
    let matches = model
        .stops
        .iter()
        .filter(|stop| model.state.is_visible(stop.route))
        .filter(|stop| !needle.is_empty() && stop.name.to_lowercase().contains(&needle))
        .take(STOP_RESULTS);

    fieldset![
        C!["stop-search"],
        legend!["Find a stop"],
        input![
            attrs! {
                At::Value => model.state.stop_query,
                At::Placeholder => "Stop name",
            },
            input_ev(Ev::Input, Msg::StopQueryChanged),
        ],
        ul![matches.map(|stop| {
            let name = stop.name.clone();
            let hovered = name.clone();
            li![
                C![IF!(model.state.hovered_stop.as_deref() == Some(stop.name.as_str()) => "hovered")],
                format!("{} (Route {})", stop.name, stop.route),
                ev(Ev::Click, move |_| Msg::OpenStop(name)),
                ev(Ev::MouseEnter, move |_| Msg::HoverStop(Some(hovered))),
                ev(Ev::MouseLeave, |_| Msg::HoverStop(None)),
            ]
        })],
    ]
}

fn view_drawer(model: &Model) -> Node<Msg> {
    let content = match &model.state.drawer {
        Drawer::Closed => return empty![],
        Drawer::Route(number) => match &model.details {
            Some(details) if details.route.number == *number => view_route_details(details),
            _ => p![format!("Loading route {number}…")],
        },
        Drawer::Stop(name) => match &model.stop {
            Some(stop) if &stop.name == name => view_stop_details(model, stop),
            _ => p![format!("Loading {name}…")],
        },
    };

    div![
        C!["drawer"],
        button![C!["close"], "✕", ev(Ev::Click, |_| Msg::CloseDrawer)],
        content,
    ]
}

fn view_route_details(details: &RouteDetails) -> Node<Msg> {
    div![
        h2![
            span![
                C!["swatch"],
                attrs! { At::Style => format!("background-color: {}", details.route.color) },
            ],
            format!("Route {} · {}", details.route.number, details.route.name),
        ],
        table![
            C!["timetable"],
            details.stops.iter().map(|stop| {
                let name = stop.name.clone();
                tr![
                    td![&stop.name, ev(Ev::Click, move |_| Msg::OpenStop(name))],
                    stop.schedule
                        .iter()
                        .map(|time| td![time.as_deref().unwrap_or("–")]),
                ]
            }),
        ],
    ]
}

fn view_stop_details(model: &Model, stop: &Stop) -> Node<Msg> {
    let route_name = model
        .routes
        .iter()
        .find(|r| r.number == stop.route)
        .map(|r| r.name.as_str())
        .unwrap_or("Unknown line");
    let times: Vec<&str> = stop.schedule.iter().flatten().map(String::as_str).collect();
    let number = stop.route;

    div![
        h2![&stop.name],
        p![
            span![
                C!["swatch"],
                attrs! { At::Style => format!("background-color: {}", route_color(number)) },
            ],
            format!("Route {number} · {route_name}"),
        ],
        if times.is_empty() {
            p!["No scheduled departures"]
        } else {
            p![format!("Departures: {}", times.join(", "))]
        },
        small![shared::format::format_coordinate(stop.location.lat, stop.location.lng)],
        button!["Show route", ev(Ev::Click, move |_| Msg::OpenRoute(number))],
    ]
}

fn view_toast(model: &Model) -> Node<Msg> {
    match &model.state.toast {
        Some(toast) => div![
            C![
                "toast",
                match toast.kind {
                    ToastKind::Info => "info",
                    ToastKind::Success => "success",
                    ToastKind::Error => "error",
                }
            ],
            span![&toast.message],
            button!["✕", ev(Ev::Click, |_| Msg::DismissToast)],
        ],
        None => empty![],
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    init_map();
    App::start("app", init, update, view);
}

fn sync_network(model: &Model) {
    let routes: Vec<&Route> = model
        .routes
        .iter()
        .filter(|r| model.state.is_visible(r.number))
        .collect();
    if let Ok(value) = to_value(&routes) {
        show_routes_js(value);
    }

    let stops: Vec<StopMarker> = model
        .stops
        .iter()
        .filter(|s| model.state.is_visible(s.route))
        .map(|s| StopMarker {
            name: &s.name,
            lat: s.location.lat,
            lng: s.location.lng,
            route: s.route,
            color: route_color(s.route),
        })
        .collect();
    if let Ok(value) = to_value(&stops) {
        show_stops_js(value);
    }
}

fn push_plan_to_map(plan: Option<&PlanResponse>) {
    let value = plan
        .and_then(|p| to_value(&p.route.road_geometry.coordinates).ok())
        .unwrap_or(JsValue::NULL);
    show_planned_route_js(value);
}

fn sync_selection_markers(state: &UiState) {
    let marker = |endpoint: Endpoint| {
        state
            .trip
            .input(endpoint)
            .selected
            .as_ref()
            .and_then(|point| to_value(point).ok())
            .unwrap_or(JsValue::NULL)
    };
    show_selection_markers(marker(Endpoint::Origin), marker(Endpoint::Destination));
}

fn bool_attr(value: bool) -> AtValue {
    if value {
        AtValue::Some("true".into())
    } else {
        AtValue::Ignored
    }
}
