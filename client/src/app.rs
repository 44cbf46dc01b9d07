use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Interval;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crowdmap_shared::{EntityId, LevelFilter};

use crate::config::ClientConfig;
use crate::debounce::{DebounceTimer, SEARCH_DEBOUNCE_MS, TimedDebounce};
use crate::fetch::fetch_payload;
use crate::kakao::{BrowserGeolocator, KakaoMap, KakaoSdk, MapEvents, SdkScript, load_sdk};
use crate::list_panel::{ListPanel, ListRow};
use crate::relayout::RelayoutScheduler;
use crate::session::{FetchOutcome, MapSession};
use crate::status::StatusLine;
use crate::view::ViewController;

const MAP_CONTAINER_ID: &str = "crowd-map";

#[derive(Clone, Copy)]
pub(crate) struct ListRows(pub RwSignal<Vec<ListRow>>);
#[derive(Clone, Copy)]
pub(crate) struct ListPages(pub RwSignal<usize>);
#[derive(Clone, Copy)]
pub(crate) struct ListOpen(pub RwSignal<bool>);

/// Signals the fetch and filter paths write into.
#[derive(Clone, Copy)]
struct Ui {
    status: RwSignal<StatusLine>,
    rows: RwSignal<Vec<ListRow>>,
    effective_search: RwSignal<String>,
    level_choice: RwSignal<LevelFilter>,
}

struct ResizeBinding {
    window: web_sys::Window,
    handler: Closure<dyn Fn()>,
    _scheduler: Rc<RelayoutScheduler>,
}

thread_local! {
    static SESSION: RefCell<Option<MapSession<KakaoMap>>> = const { RefCell::new(None) };
    static SDK_SCRIPT: RefCell<Option<SdkScript>> = const { RefCell::new(None) };
    static REFRESH_INTERVAL: RefCell<Option<Interval>> = const { RefCell::new(None) };
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
    static SEARCH_DEBOUNCE: RefCell<Option<TimedDebounce<String>>> = const { RefCell::new(None) };
    static MOUNTED: Cell<bool> = const { Cell::new(false) };
}

fn with_session<R>(f: impl FnOnce(&mut MapSession<KakaoMap>) -> R) -> Option<R> {
    SESSION.with(|slot| {
        let Ok(mut slot) = slot.try_borrow_mut() else {
            web_sys::console::warn_1(&"map session busy; dropping re-entrant call".into());
            return None;
        };
        slot.as_mut().map(f)
    })
}

fn visible_rows(session: &MapSession<KakaoMap>) -> Vec<ListRow> {
    session.visible_entities().map(ListRow::from_entity).collect()
}

/// List-row click: center on the entity and open its overlay.
pub(crate) fn focus_entity(id: &EntityId) {
    with_session(|s| s.focus_entity(id));
}

fn refresh(ui: Ui, url: String, timeout_ms: u32) {
    let Some(ticket) = with_session(|s| s.begin_fetch()) else {
        return;
    };
    ui.status.update(|line| {
        let next = StatusLine::loading(line);
        *line = next;
    });

    spawn_local(async move {
        let result = fetch_payload(&url, timeout_ms).await;
        // Session gone means we were torn down mid-flight; drop the result.
        let Some((outcome, rows, total, latest)) = with_session(|s| {
            let outcome = s.apply_fetch(ticket, result);
            (outcome, visible_rows(s), s.entity_count(), s.latest_update())
        }) else {
            return;
        };

        match outcome {
            FetchOutcome::Applied(report) => {
                web_sys::console::info_1(
                    &format!(
                        "fetch #{}: created={} updated={} unchanged={} pruned={} rejected={} visible={}",
                        ticket.seq(),
                        report.reconcile.created,
                        report.reconcile.updated,
                        report.reconcile.unchanged,
                        report.pruned,
                        report.diff.rejected,
                        report.visible,
                    )
                    .into(),
                );
                ui.rows.set(rows);
                ui.status.set(StatusLine::loaded(total, latest));
            }
            FetchOutcome::Rejected(err) => {
                web_sys::console::warn_1(&format!("fetch #{} failed: {err}", ticket.seq()).into());
                ui.status.set(StatusLine::failed(&err));
            }
            FetchOutcome::Discarded => {
                web_sys::console::info_1(
                    &format!("fetch #{} superseded; result dropped", ticket.seq()).into(),
                );
            }
        }
    });
}

fn start_periodic_refresh(ui: Ui, config: &ClientConfig) {
    if config.refresh_secs == 0 {
        return;
    }
    let url = config.endpoint();
    let timeout_ms = config.fetch_timeout_ms;
    let interval = Interval::new(config.refresh_secs.saturating_mul(1_000), move || {
        refresh(ui, url.clone(), timeout_ms);
    });
    REFRESH_INTERVAL.with(|slot| {
        *slot.borrow_mut() = Some(interval);
    });
}

fn bind_resize() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let scheduler = Rc::new(RelayoutScheduler::new(|| {
        with_session(|s| s.relayout());
    }));
    let scheduler_cb = scheduler.clone();
    let handler = Closure::<dyn Fn()>::new(move || scheduler_cb.request());
    if window
        .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
        .is_ok()
    {
        RESIZE_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(ResizeBinding {
                window: window.clone(),
                handler,
                _scheduler: scheduler,
            });
        });
    }
}

async fn boot(ui: Ui, config: ClientConfig) {
    ui.status.set(StatusLine::message("Loading map...", false));
    let script = match load_sdk(config.kakao_app_key.as_deref()).await {
        Ok(script) => script,
        Err(err) => {
            web_sys::console::warn_1(&format!("map SDK load failed: {err}").into());
            ui.status.set(StatusLine::message(format!("Map unavailable: {err}"), true));
            return;
        }
    };
    if !MOUNTED.with(Cell::get) {
        // Unmounted while the script was loading; dropping it removes it.
        return;
    }
    SDK_SCRIPT.with(|slot| {
        *slot.borrow_mut() = Some(script);
    });

    let events = MapEvents {
        marker_click: Rc::new(|id: EntityId| {
            with_session(|s| s.show_overlay(&id));
        }),
        map_click: Rc::new(|| {
            with_session(|s| s.hide_overlay());
        }),
    };
    let session = match MapSession::open(
        &KakaoSdk { events },
        MAP_CONTAINER_ID,
        ViewController::default(),
        config.contract,
    ) {
        Ok(session) => session,
        Err(err) => {
            web_sys::console::warn_1(&format!("map init failed: {err}").into());
            ui.status.set(StatusLine::message(format!("Map unavailable: {err}"), true));
            return;
        }
    };
    SESSION.with(|slot| {
        *slot.borrow_mut() = Some(session);
    });
    // Filters may have been set while the SDK was loading.
    with_session(|s| {
        s.set_search(&ui.effective_search.get_untracked());
        s.set_level_filter(ui.level_choice.get_untracked());
    });

    bind_resize();
    start_periodic_refresh(ui, &config);
    refresh(ui, config.endpoint(), config.fetch_timeout_ms);
}

fn teardown() {
    MOUNTED.with(|m| m.set(false));
    SEARCH_DEBOUNCE.with(|slot| {
        if let Some(debounce) = slot.borrow_mut().take() {
            debounce.cancel();
        }
    });
    REFRESH_INTERVAL.with(|slot| {
        slot.borrow_mut().take();
    });
    RESIZE_BINDING.with(|slot| {
        if let Some(binding) = slot.borrow_mut().take() {
            let _ = binding
                .window
                .remove_event_listener_with_callback("resize", binding.handler.as_ref().unchecked_ref());
        }
    });
    let session = SESSION.with(|slot| slot.borrow_mut().take());
    if let Some(mut session) = session {
        session.teardown();
    }
    SDK_SCRIPT.with(|slot| {
        slot.borrow_mut().take();
    });
}

/// Root application component.
#[component]
pub fn App() -> impl IntoView {
    let config = ClientConfig::from_build_env();

    let status: RwSignal<StatusLine> = RwSignal::new(StatusLine::default());
    let rows: RwSignal<Vec<ListRow>> = RwSignal::new(Vec::new());
    let pages: RwSignal<usize> = RwSignal::new(1);
    let list_open: RwSignal<bool> = RwSignal::new(false);
    // Raw keystrokes vs. the value the filter actually runs with.
    let search_input: RwSignal<String> = RwSignal::new(String::new());
    let effective_search: RwSignal<String> = RwSignal::new(String::new());
    let level_choice: RwSignal<LevelFilter> = RwSignal::new(LevelFilter::All);

    provide_context(ListRows(rows));
    provide_context(ListPages(pages));
    provide_context(ListOpen(list_open));

    let ui = Ui {
        status,
        rows,
        effective_search,
        level_choice,
    };

    Effect::new({
        let config = config.clone();
        move || {
            MOUNTED.with(|m| m.set(true));
            spawn_local(boot(ui, config.clone()));
            on_cleanup(teardown);
        }
    });

    // Search and category changes re-run the filter over the current store.
    Effect::new(move || {
        let search = effective_search.get();
        let level = level_choice.get();
        let Some(next) = with_session(|s| {
            s.set_search(&search);
            s.set_level_filter(level);
            visible_rows(s)
        }) else {
            return;
        };
        pages.set(1);
        rows.set(next);
    });

    let on_search = move |e: leptos::ev::Event| {
        let value = event_target_value(&e);
        search_input.set(value.clone());
        SEARCH_DEBOUNCE.with(|slot| {
            let mut slot = slot.borrow_mut();
            let debounce = slot.get_or_insert_with(|| {
                TimedDebounce::new(
                    effective_search.get_untracked(),
                    SEARCH_DEBOUNCE_MS,
                    DebounceTimer::default(),
                    move |settled| effective_search.set(settled),
                )
            });
            debounce.input(value);
        });
    };

    let on_level = move |e: leptos::ev::Event| {
        level_choice.set(LevelFilter::from_option(&event_target_value(&e)));
    };

    let endpoint = config.endpoint();
    let timeout_ms = config.fetch_timeout_ms;
    let on_refresh = move |_| refresh(ui, endpoint.clone(), timeout_ms);

    let on_locate = move |_| {
        let Some((view, map)) = with_session(|s| s.camera()) else {
            return;
        };
        spawn_local(async move {
            if let Err(err) = view.go_to_user_location(&*map, &BrowserGeolocator).await {
                web_sys::console::warn_1(&format!("geolocation failed: {err}").into());
                if let Some(window) = web_sys::window() {
                    let _ = window.alert_with_message(&format!("Could not get your location: {}", err.0));
                }
            }
        });
    };

    let button_style = "padding: 6px 12px; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 6px; color: #e2e0d8; cursor: pointer; font-size: 0.8rem;";

    view! {
        <div style="width: 100%; height: 100%; display: flex; flex-direction: column; background: #0c0e17; font-family: 'Inter', system-ui, sans-serif;">
            <header style="display: flex; flex-wrap: wrap; gap: 8px; align-items: center; padding: 10px 16px; border-bottom: 1px solid #282c3e; background: #13161f;">
                <input
                    data-search-input=""
                    type="text"
                    placeholder="Search places..."
                    style="flex: 1; min-width: 160px; padding: 8px 12px; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 6px; color: #e2e0d8; font-size: 0.9rem; outline: none;"
                    prop:value=move || search_input.get()
                    on:input=on_search
                />
                <select
                    style="padding: 8px 10px; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 6px; color: #e2e0d8; font-size: 0.85rem;"
                    prop:value=move || level_choice.with(|l| l.option_value().to_string())
                    on:change=on_level
                >
                    {LevelFilter::options()
                        .into_iter()
                        .map(|(value, label)| view! { <option value=value>{label}</option> })
                        .collect_view()}
                </select>
                <button style=button_style on:click=on_refresh>"Refresh"</button>
                <button style=button_style on:click=on_locate>"My location"</button>
                <button
                    style=button_style
                    on:click=move |_| {
                        with_session(|s| s.reset_view());
                    }
                >
                    "Reset view"
                </button>
                <button style=button_style on:click=move |_| list_open.update(|v| *v = !*v)>
                    {move || if list_open.get() { "Hide list" } else { "Show list" }}
                </button>
            </header>
            <div
                style="padding: 4px 16px; font-size: 0.72rem; border-bottom: 1px solid #1e2230;"
                style:color=move || if status.with(|s| s.is_error) { "#ef4444" } else { "#9a98a0" }
            >
                {move || status.with(|s| if s.loading { format!("{} (refreshing)", s.text) } else { s.text.clone() })}
            </div>
            <div style="position: relative; flex: 1; overflow: hidden;">
                <div id=MAP_CONTAINER_ID style="position: absolute; inset: 0;"></div>
                <ListPanel />
            </div>
        </div>
    }
}
