mod app;
mod cluster;
mod colors;
mod config;
mod debounce;
mod fetch;
mod icons;
mod kakao;
mod list_panel;
mod markers;
mod overlay;
mod relayout;
mod sdk;
mod session;
mod status;
mod view;

use leptos::mount::mount_to;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

thread_local! {
    static APP_MOUNT_HANDLE: RefCell<Option<Box<dyn Any>>> = RefCell::new(None);
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let mount_target = document
        .get_element_by_id("app")
        .and_then(|node| node.dyn_into::<web_sys::HtmlElement>().ok())
        .or_else(|| document.body());
    let Some(target) = mount_target else {
        return;
    };

    APP_MOUNT_HANDLE.with(move |slot| {
        // Re-entered main() (dev reloads): drop the old mount first so its
        // cleanup tears down the previous map session.
        let old = slot.borrow_mut().take();
        drop(old);
        let handle = mount_to(target, app::App);
        *slot.borrow_mut() = Some(Box::new(handle));
    });
}
