//! Browser bindings: `window.matchMedia` as a [`MediaEnvironment`], and a
//! JavaScript-facing matcher.
//!
//! Exposed to JS as:
//!
//! ```text
//! const mq = createMediaQueryMatch();
//! mq.register("(min-width: 768px)");
//! mq.register("desktop", "(min-width: 1024px)");
//! mq.on("change", matches => console.log(matches));
//! mq.getCurrentMatches();
//! mq.getCurrentSnapshot();
//! mq.destroy();
//! ```

use crate::environment::{
    same_listener, ChangeEventTarget, LegacyChangeListeners, MediaEnvironment, MediaQueryList,
    QueryListener,
};
use crate::error::{MatchError, Result};
use crate::matcher::{create_matcher, Matcher};
use crate::subscriptions::{CallbackRegistry, ChangeHandler};
use crate::types::MatcherEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Convert a `MatchError` into a JS `Error`.
pub fn to_js_error(e: MatchError) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

/// [`MediaEnvironment`] backed by the page's `window.matchMedia`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserEnvironment;

impl BrowserEnvironment {
    /// Fails when there is no `window` (e.g. inside a worker).
    pub fn new() -> Result<Self> {
        web_sys::window()
            .map(|_| BrowserEnvironment)
            .ok_or_else(|| MatchError::EnvironmentUnavailable("no window".to_string()))
    }
}

impl MediaEnvironment for BrowserEnvironment {
    fn match_media(&self, query: &str) -> Result<Arc<dyn MediaQueryList>> {
        let window = web_sys::window()
            .ok_or_else(|| MatchError::EnvironmentUnavailable("no window".to_string()))?;

        let list = window
            .match_media(query)
            .map_err(|e| MatchError::QueryRejected {
                query: query.to_string(),
                message: format!("{e:?}"),
            })?
            .ok_or_else(|| MatchError::QueryRejected {
                query: query.to_string(),
                message: "matchMedia returned null".to_string(),
            })?;

        Ok(Arc::new(BrowserQueryList::new(list)))
    }
}

/// A `MediaQueryList` plus the JS functions wrapping attached listeners.
struct BrowserQueryList {
    list: web_sys::MediaQueryList,
    has_event_target: bool,
    has_legacy: bool,
    /// JS wrappers are owned by the JS GC so a listener can be removed
    /// while it is running.
    attached: Mutex<Vec<(QueryListener, js_sys::Function)>>,
}

// SAFETY: WASM is single-threaded.
unsafe impl Send for BrowserQueryList {}
unsafe impl Sync for BrowserQueryList {}

impl BrowserQueryList {
    fn new(list: web_sys::MediaQueryList) -> Self {
        let has_event_target = has_method(&list, "addEventListener");
        let has_legacy = has_method(&list, "addListener");
        Self {
            list,
            has_event_target,
            has_legacy,
            attached: Mutex::new(Vec::new()),
        }
    }

    fn wrap(&self, listener: &QueryListener) -> js_sys::Function {
        let l = Arc::clone(listener);
        let function: js_sys::Function = Closure::<dyn Fn()>::new(move || l())
            .into_js_value()
            .unchecked_into();
        self.attached
            .lock()
            .push((Arc::clone(listener), function.clone()));
        function
    }

    fn unwrap(&self, listener: &QueryListener) -> Option<js_sys::Function> {
        let mut attached = self.attached.lock();
        let pos = attached.iter().position(|(l, _)| same_listener(l, listener))?;
        Some(attached.remove(pos).1)
    }
}

fn has_method(target: &JsValue, name: &str) -> bool {
    js_sys::Reflect::get(target, &JsValue::from_str(name))
        .map(|v| v.is_function())
        .unwrap_or(false)
}

impl MediaQueryList for BrowserQueryList {
    fn matches(&self) -> bool {
        self.list.matches()
    }

    fn media(&self) -> String {
        self.list.media()
    }

    fn event_target(&self) -> Option<&dyn ChangeEventTarget> {
        self.has_event_target.then_some(self as &dyn ChangeEventTarget)
    }

    fn legacy_listeners(&self) -> Option<&dyn LegacyChangeListeners> {
        self.has_legacy.then_some(self as &dyn LegacyChangeListeners)
    }
}

impl ChangeEventTarget for BrowserQueryList {
    fn add_event_listener(&self, event: &str, listener: &QueryListener) {
        let function = self.wrap(listener);
        if let Err(e) = self.list.add_event_listener_with_callback(event, &function) {
            tracing::warn!(error = ?e, media = %self.list.media(), "addEventListener failed");
        }
    }

    fn remove_event_listener(&self, event: &str, listener: &QueryListener) {
        if let Some(function) = self.unwrap(listener) {
            if let Err(e) = self.list.remove_event_listener_with_callback(event, &function) {
                tracing::warn!(error = ?e, media = %self.list.media(), "removeEventListener failed");
            }
        }
    }
}

impl LegacyChangeListeners for BrowserQueryList {
    fn add_listener(&self, listener: &QueryListener) {
        let function = self.wrap(listener);
        if let Err(e) = self.list.add_listener_with_opt_callback(Some(&function)) {
            tracing::warn!(error = ?e, media = %self.list.media(), "addListener failed");
        }
    }

    fn remove_listener(&self, listener: &QueryListener) {
        if let Some(function) = self.unwrap(listener) {
            if let Err(e) = self.list.remove_listener_with_opt_callback(Some(&function)) {
                tracing::warn!(error = ?e, media = %self.list.media(), "removeListener failed");
            }
        }
    }
}

/// Send+Sync wrapper for JS callbacks in single-threaded WASM.
struct SendSyncCallback(js_sys::Function);

// SAFETY: WASM is single-threaded.
unsafe impl Send for SendSyncCallback {}
unsafe impl Sync for SendSyncCallback {}

/// Call a JS handler with the matched keys as a string array.
///
/// Kept out of the closure so the closure captures the whole wrapper rather
/// than the non-Send function inside it.
fn call_js_handler(cb: &SendSyncCallback, matches: &[String]) {
    let array = js_sys::Array::new();
    for key in matches {
        array.push(&JsValue::from_str(key));
    }
    if let Err(e) = cb.0.call1(&JsValue::NULL, &array) {
        tracing::warn!(error = ?e, "change handler threw");
    }
}

/// Matcher exposed to JavaScript.
#[wasm_bindgen]
pub struct JsMatcher {
    matcher: Matcher,
    /// JS functions and the handlers standing in for them.
    handlers: CallbackRegistry<js_sys::Function>,
}

#[wasm_bindgen]
impl JsMatcher {
    /// Register a query. With one argument the query is its own key.
    pub fn register(&self, key_or_query: &str, query: Option<String>) -> std::result::Result<(), JsValue> {
        self.matcher
            .register_keyed(key_or_query, query.as_deref())
            .map_err(to_js_error)
    }

    pub fn unregister(&self, key: &str) {
        self.matcher.unregister(key);
    }

    pub fn on(&self, event: &str, handler: js_sys::Function) {
        if event.parse::<MatcherEvent>().is_err() {
            return;
        }
        let handler = self.handlers.handler_for(handler, |function| {
            let cb = SendSyncCallback(function.clone());
            ChangeHandler::new(move |matches| call_js_handler(&cb, matches))
        });
        self.matcher.on_change(&handler);
    }

    pub fn off(&self, event: &str, handler: js_sys::Function) {
        if event.parse::<MatcherEvent>().is_err() {
            return;
        }
        if let Some(handler) = self.handlers.take(&handler) {
            self.matcher.off_change(&handler);
        }
    }

    pub fn destroy(&self) {
        self.handlers.clear();
        self.matcher.destroy();
    }

    #[wasm_bindgen(js_name = "getCurrentMatches")]
    pub fn get_current_matches(&self) -> js_sys::Array {
        self.matcher
            .current_matches()
            .iter()
            .map(|key| JsValue::from_str(key))
            .collect()
    }

    #[wasm_bindgen(js_name = "getCurrentSnapshot")]
    pub fn get_current_snapshot(&self) -> std::result::Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.matcher.current_snapshot())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }
}

/// Create a matcher over the page's `window.matchMedia`.
#[wasm_bindgen(js_name = "createMediaQueryMatch")]
pub fn create_media_query_match() -> std::result::Result<JsMatcher, JsValue> {
    let env = BrowserEnvironment::new().map_err(to_js_error)?;
    Ok(JsMatcher {
        matcher: create_matcher(Arc::new(env)),
        handlers: CallbackRegistry::new(),
    })
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use crate::types::QueryState;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    // Matches in every browser viewport.
    const ALWAYS: &str = "(min-width: 0px)";

    fn recording_function() -> (js_sys::Function, Rc<RefCell<Vec<Vec<String>>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let c = Rc::clone(&calls);
        let function = Closure::<dyn Fn(JsValue)>::new(move |matches: JsValue| {
            let array: js_sys::Array = matches.unchecked_into();
            let keys = array.iter().filter_map(|v| v.as_string()).collect();
            c.borrow_mut().push(keys);
        })
        .into_js_value()
        .unchecked_into();
        (function, calls)
    }

    #[wasm_bindgen_test]
    fn test_register_one_and_two_arguments() {
        let mq = create_media_query_match().unwrap();
        mq.register(ALWAYS, None).unwrap();
        mq.register("any", Some(ALWAYS.to_string())).unwrap();

        let matches: Vec<String> = mq
            .get_current_matches()
            .iter()
            .filter_map(|v| v.as_string())
            .collect();
        assert_eq!(matches, vec!["(min-width: 0px)".to_string(), "any".to_string()]);
        mq.destroy();
    }

    #[wasm_bindgen_test]
    fn test_same_function_subscribes_once() {
        let mq = create_media_query_match().unwrap();
        let (function, calls) = recording_function();

        mq.on("change", function.clone());
        mq.on("change", function.clone());
        mq.register("any", Some(ALWAYS.to_string())).unwrap();
        assert_eq!(*calls.borrow(), vec![vec!["any".to_string()]]);

        mq.off("change", function);
        mq.unregister("any");
        assert_eq!(calls.borrow().len(), 1);
        mq.destroy();
    }

    #[wasm_bindgen_test]
    fn test_unknown_event_is_ignored() {
        let mq = create_media_query_match().unwrap();
        let (function, calls) = recording_function();

        mq.on("resize", function);
        mq.register("any", Some(ALWAYS.to_string())).unwrap();
        assert!(calls.borrow().is_empty());
        mq.destroy();
    }

    #[wasm_bindgen_test]
    fn test_snapshot_serializes_registrations() {
        let mq = create_media_query_match().unwrap();
        mq.register("any", Some(ALWAYS.to_string())).unwrap();

        let snapshot: Vec<QueryState> =
            serde_wasm_bindgen::from_value(mq.get_current_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].key, "any");
        assert_eq!(snapshot[0].raw, ALWAYS);
        assert!(snapshot[0].matches);
        mq.destroy();
    }
}
