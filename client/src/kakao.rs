use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crowdmap_shared::{Bounds, EntityId, LatLng, LocationUnavailable};

use crate::icons::IconAsset;
use crate::sdk::{MapError, MapOptions, MapSdk, MapSurface};
use crate::view::Geolocator;

const SDK_URL: &str = "https://dapi.kakao.com/v2/maps/sdk.js";

fn js_err(e: JsValue) -> MapError {
    let message = Reflect::get(&e, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| e.as_string())
        .unwrap_or_else(|| format!("{e:?}"));
    MapError::Js(message)
}

fn warn(op: &str, err: &MapError) {
    web_sys::console::warn_1(&format!("kakao {op}: {err}").into());
}

fn get(target: &JsValue, key: &str) -> Result<JsValue, MapError> {
    let value = Reflect::get(target, &key.into()).map_err(js_err)?;
    if value.is_undefined() || value.is_null() {
        return Err(MapError::Js(format!("missing property {key}")));
    }
    Ok(value)
}

fn call(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, MapError> {
    let f: Function = get(target, method)?
        .dyn_into()
        .map_err(|_| MapError::Js(format!("{method} is not a function")))?;
    Reflect::apply(&f, target, args).map_err(js_err)
}

fn construct(ns: &JsValue, class: &str, args: &Array) -> Result<JsValue, MapError> {
    let ctor: Function = get(ns, class)?
        .dyn_into()
        .map_err(|_| MapError::Js(format!("kakao.maps.{class} is not a constructor")))?;
    Reflect::construct(&ctor, args).map_err(js_err)
}

fn object(entries: &[(&str, JsValue)]) -> Result<Object, MapError> {
    let obj = Object::new();
    for (key, value) in entries {
        Reflect::set(&obj, &(*key).into(), value).map_err(js_err)?;
    }
    Ok(obj)
}

/// `window.kakao.maps`, if the SDK has finished loading.
fn maps_namespace() -> Result<JsValue, MapError> {
    let window = web_sys::window().ok_or(MapError::SdkMissing)?;
    let kakao = get(&window, "kakao").map_err(|_| MapError::SdkMissing)?;
    let maps = get(&kakao, "maps").map_err(|_| MapError::SdkMissing)?;
    // Under autoload=false the namespace exists before `load` runs; the
    // constructors only appear afterwards.
    get(&maps, "LatLng").map_err(|_| MapError::SdkMissing)?;
    Ok(maps)
}

/// Callbacks from the native map back into the app. Both only carry ids or
/// nothing, so the app re-reads its own state when they fire.
#[derive(Clone)]
pub struct MapEvents {
    pub marker_click: Rc<dyn Fn(EntityId)>,
    pub map_click: Rc<dyn Fn()>,
}

pub struct KakaoSdk {
    pub events: MapEvents,
}

impl MapSdk for KakaoSdk {
    type Surface = KakaoMap;

    fn load_map(&self, container_id: &str, options: &MapOptions) -> Result<KakaoMap, MapError> {
        let maps = maps_namespace()?;
        let container = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(container_id))
            .ok_or_else(|| MapError::ContainerMissing(container_id.to_string()))?;

        let center = lat_lng(&maps, options.center)?;
        let map_options = object(&[
            ("center", center),
            ("level", JsValue::from(options.level)),
        ])?;
        let map = construct(&maps, "Map", &Array::of2(&container, &map_options))?;

        let clusterer_options = object(&[
            ("map", map.clone()),
            ("averageCenter", JsValue::TRUE),
            ("minLevel", JsValue::from(options.cluster.min_level)),
            ("gridSize", JsValue::from(options.cluster.grid_size)),
        ])?;
        let clusterer = construct(&maps, "MarkerClusterer", &Array::of1(&clusterer_options))?;

        let info_options = object(&[("removable", JsValue::FALSE)])?;
        let info_window = construct(&maps, "InfoWindow", &Array::of1(&info_options))?;

        let map_click = self.events.map_click.clone();
        let on_map_click = Closure::<dyn Fn()>::new(move || map_click());
        let event = get(&maps, "event")?;
        call(
            &event,
            "addListener",
            &Array::of3(&map, &"click".into(), on_map_click.as_ref()),
        )?;

        Ok(KakaoMap {
            maps,
            map,
            clusterer,
            info_window,
            images: RefCell::new(HashMap::new()),
            marker_click: self.events.marker_click.clone(),
            on_map_click,
        })
    }
}

fn lat_lng(maps: &JsValue, p: LatLng) -> Result<JsValue, MapError> {
    construct(maps, "LatLng", &Array::of2(&p.lat.into(), &p.lng.into()))
}

struct KakaoMarkerInner {
    marker: JsValue,
    on_click: RefCell<Option<Closure<dyn Fn()>>>,
}

/// Shared handle to a native marker and its click listener.
#[derive(Clone)]
pub struct KakaoMarker(Rc<KakaoMarkerInner>);

/// Kakao Maps binding. Every call goes through `js_sys::Reflect` against the
/// `kakao.maps` namespace the SDK script installs on `window`.
pub struct KakaoMap {
    maps: JsValue,
    map: JsValue,
    clusterer: JsValue,
    info_window: JsValue,
    /// MarkerImage per data URI; at most one per icon asset.
    images: RefCell<HashMap<String, JsValue>>,
    marker_click: Rc<dyn Fn(EntityId)>,
    on_map_click: Closure<dyn Fn()>,
}

impl KakaoMap {
    fn marker_image(&self, icon: &IconAsset) -> Result<JsValue, MapError> {
        if let Some(image) = self.images.borrow().get(&icon.src) {
            return Ok(image.clone());
        }
        let size = construct(
            &self.maps,
            "Size",
            &Array::of2(&icon.width.into(), &icon.height.into()),
        )?;
        let image = construct(&self.maps, "MarkerImage", &Array::of2(&icon.src.as_str().into(), &size))?;
        self.images.borrow_mut().insert(icon.src.clone(), image.clone());
        Ok(image)
    }

    fn event_ns(&self) -> Result<JsValue, MapError> {
        get(&self.maps, "event")
    }

    fn try_create_marker(&self, position: LatLng, icon: &IconAsset, title: &str) -> Result<JsValue, MapError> {
        let options = object(&[
            ("position", lat_lng(&self.maps, position)?),
            ("image", self.marker_image(icon)?),
            ("title", title.into()),
        ])?;
        construct(&self.maps, "Marker", &Array::of1(&options))
    }

    fn try_bind_click(&self, marker: &KakaoMarker, id: &EntityId) -> Result<(), MapError> {
        let sink = self.marker_click.clone();
        let id = id.clone();
        let handler = Closure::<dyn Fn()>::new(move || sink(id.clone()));
        call(
            &self.event_ns()?,
            "addListener",
            &Array::of3(&marker.0.marker, &"click".into(), handler.as_ref()),
        )?;
        if let Some(old) = marker.0.on_click.replace(Some(handler)) {
            self.unbind(&marker.0.marker, &old);
        }
        Ok(())
    }

    fn unbind(&self, target: &JsValue, handler: &Closure<dyn Fn()>) {
        let result = self.event_ns().and_then(|event| {
            call(
                &event,
                "removeListener",
                &Array::of3(target, &"click".into(), handler.as_ref()),
            )
        });
        if let Err(err) = result {
            warn("removeListener", &err);
        }
    }

    fn try_set_center(&self, center: LatLng, level: u8) -> Result<(), MapError> {
        call(&self.map, "setLevel", &Array::of1(&level.into()))?;
        call(&self.map, "setCenter", &Array::of1(&lat_lng(&self.maps, center)?))?;
        Ok(())
    }

    fn try_set_bounds(&self, bounds: Bounds) -> Result<(), MapError> {
        let sw = lat_lng(&self.maps, bounds.south_west)?;
        let ne = lat_lng(&self.maps, bounds.north_east)?;
        let native = construct(&self.maps, "LatLngBounds", &Array::of2(&sw, &ne))?;
        call(&self.map, "setBounds", &Array::of1(&native))?;
        Ok(())
    }
}

fn log_failure(op: &str, result: Result<impl Sized, MapError>) {
    if let Err(err) = result {
        warn(op, &err);
    }
}

impl MapSurface for KakaoMap {
    type Marker = KakaoMarker;

    fn create_marker(&self, position: LatLng, icon: &IconAsset, title: &str) -> KakaoMarker {
        let marker = self.try_create_marker(position, icon, title).unwrap_or_else(|err| {
            // The handle stays in the mapping so later fetches update it in
            // place instead of retrying creation every cycle.
            warn("create marker", &err);
            JsValue::UNDEFINED
        });
        KakaoMarker(Rc::new(KakaoMarkerInner {
            marker,
            on_click: RefCell::new(None),
        }))
    }

    fn move_marker(&self, marker: &KakaoMarker, position: LatLng) {
        log_failure(
            "move marker",
            lat_lng(&self.maps, position)
                .and_then(|p| call(&marker.0.marker, "setPosition", &Array::of1(&p))),
        );
    }

    fn set_marker_icon(&self, marker: &KakaoMarker, icon: &IconAsset) {
        log_failure(
            "set marker icon",
            self.marker_image(icon)
                .and_then(|image| call(&marker.0.marker, "setImage", &Array::of1(&image))),
        );
    }

    fn bind_marker_click(&self, marker: &KakaoMarker, id: &EntityId) {
        log_failure("bind click", self.try_bind_click(marker, id));
    }

    fn detach_marker(&self, marker: &KakaoMarker) {
        if let Some(handler) = marker.0.on_click.borrow_mut().take() {
            self.unbind(&marker.0.marker, &handler);
        }
        log_failure(
            "detach marker",
            call(&marker.0.marker, "setMap", &Array::of1(&JsValue::NULL)),
        );
    }

    fn cluster_clear(&self) {
        log_failure("cluster clear", call(&self.clusterer, "clear", &Array::new()));
    }

    fn cluster_add(&self, markers: &[KakaoMarker]) {
        let natives: Array = markers.iter().map(|m| m.0.marker.clone()).collect();
        log_failure(
            "cluster add",
            call(&self.clusterer, "addMarkers", &Array::of1(&natives)),
        );
    }

    fn open_overlay(&self, anchor: &KakaoMarker, content: &str) {
        log_failure(
            "open overlay",
            call(&self.info_window, "setContent", &Array::of1(&content.into())).and_then(|_| {
                call(
                    &self.info_window,
                    "open",
                    &Array::of2(&self.map, &anchor.0.marker),
                )
            }),
        );
    }

    fn close_overlay(&self) {
        log_failure("close overlay", call(&self.info_window, "close", &Array::new()));
    }

    fn set_bounds(&self, bounds: Bounds) {
        log_failure("set bounds", self.try_set_bounds(bounds));
    }

    fn set_center(&self, center: LatLng, level: u8) {
        log_failure("set center", self.try_set_center(center, level));
    }

    fn set_level_limits(&self, min_level: u8, max_level: u8) {
        log_failure(
            "level limits",
            call(&self.map, "setMinLevel", &Array::of1(&min_level.into()))
                .and_then(|_| call(&self.map, "setMaxLevel", &Array::of1(&max_level.into()))),
        );
    }

    fn relayout(&self) {
        log_failure("relayout", call(&self.map, "relayout", &Array::new()));
    }
}

impl Drop for KakaoMap {
    fn drop(&mut self) {
        self.unbind(&self.map, &self.on_map_click);
    }
}

/// The injected SDK `<script>`. Dropping it removes the element again.
pub struct SdkScript {
    element: Option<web_sys::HtmlScriptElement>,
}

impl Drop for SdkScript {
    fn drop(&mut self) {
        if let Some(element) = self.element.take() {
            element.remove();
        }
    }
}

/// Make `kakao.maps` usable: inject the SDK script (autoload off) when it
/// is not already on the page, then wait for `kakao.maps.load`.
pub async fn load_sdk(app_key: Option<&str>) -> Result<SdkScript, MapError> {
    if maps_namespace().is_ok() {
        return Ok(SdkScript { element: None });
    }

    let window = web_sys::window().ok_or(MapError::SdkMissing)?;
    let already_injected = get(&window, "kakao").is_ok();
    let mut script = SdkScript { element: None };

    if !already_injected {
        let app_key = app_key.ok_or(MapError::SdkMissing)?;
        let document = window.document().ok_or(MapError::SdkMissing)?;
        let head = document.head().ok_or(MapError::SdkMissing)?;
        let element: web_sys::HtmlScriptElement = document
            .create_element("script")
            .map_err(js_err)?
            .dyn_into()
            .map_err(|_| MapError::Js("script element".into()))?;
        element.set_src(&format!(
            "{SDK_URL}?appkey={app_key}&autoload=false&libraries=clusterer"
        ));
        element.set_async(true);

        let loaded = Promise::new(&mut |resolve, reject| {
            element.set_onload(Some(&resolve));
            element.set_onerror(Some(&reject));
        });
        head.append_child(&element).map_err(js_err)?;
        script.element = Some(element.clone());

        let outcome = JsFuture::from(loaded).await;
        element.set_onload(None);
        element.set_onerror(None);
        outcome.map_err(|_| MapError::SdkMissing)?;
    }

    let maps = get(&window, "kakao")
        .and_then(|kakao| get(&kakao, "maps"))
        .map_err(|_| MapError::SdkMissing)?;
    let mut load_error = None;
    let ready = Promise::new(&mut |resolve, _reject| {
        if let Err(err) = call(&maps, "load", &Array::of1(&resolve)) {
            load_error = Some(err);
        }
    });
    if let Some(err) = load_error {
        return Err(err);
    }
    JsFuture::from(ready).await.map_err(js_err)?;
    maps_namespace()?;
    Ok(script)
}

/// `navigator.geolocation`, one fix per request.
pub struct BrowserGeolocator;

impl Geolocator for BrowserGeolocator {
    async fn current_position(&self) -> Result<LatLng, LocationUnavailable> {
        let unavailable = |msg: &str| LocationUnavailable(msg.to_string());
        let window = web_sys::window().ok_or_else(|| unavailable("no window"))?;
        let geolocation = get(&window.navigator(), "geolocation")
            .map_err(|_| unavailable("geolocation is not supported by this browser"))?;

        let mut call_error = None;
        let promise = Promise::new(&mut |resolve, reject| {
            if let Err(err) = call(&geolocation, "getCurrentPosition", &Array::of2(&resolve, &reject)) {
                call_error = Some(err);
            }
        });
        if let Some(err) = call_error {
            return Err(LocationUnavailable(err.to_string()));
        }

        let position = JsFuture::from(promise).await.map_err(|e| {
            let message = Reflect::get(&e, &"message".into())
                .ok()
                .and_then(|m| m.as_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "location request failed".into());
            LocationUnavailable(message)
        })?;
        let coords = get(&position, "coords").map_err(|_| unavailable("position has no coords"))?;
        let read = |key: &str| {
            Reflect::get(&coords, &key.into())
                .ok()
                .and_then(|v| v.as_f64())
                .filter(|v| v.is_finite())
        };
        match (read("latitude"), read("longitude")) {
            (Some(lat), Some(lng)) => Ok(LatLng::new(lat, lng)),
            _ => Err(unavailable("position has no coordinates")),
        }
    }
}
