use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::io;
use std::rc::Rc;

use activity_upload::{
    NamedFile, StatusSink, SubmitHandler, Transport, UploadConfig, UploadError, UploadPayload,
};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use leptos::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, FormData, HtmlInputElement, RequestInit, Response};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_COMMIT: &str = env!("UPLOAD_WEB_COMMIT");

pub const FORM_ID: &str = "directory-form";
pub const INPUT_ID: &str = "form-file";
pub const STATUS_ID: &str = "search-result";

thread_local! {
    static ACTIVE_BINDING: RefCell<Option<UploadBinding>> = RefCell::new(None);
}

#[derive(Clone)]
pub struct BrowserFile(pub web_sys::File);

impl NamedFile for BrowserFile {
    fn file_name(&self) -> String {
        self.0.name()
    }
}

/// Snapshot of the input's current selection, in the order the browser lists it.
fn files_from_input(input: &HtmlInputElement) -> Vec<BrowserFile> {
    let mut out = Vec::new();
    if let Some(files) = input.files() {
        for i in 0..files.length() {
            if let Some(file) = files.item(i) {
                out.push(BrowserFile(file));
            }
        }
    }
    out
}

fn network(err: JsValue) -> UploadError {
    UploadError::Network(format!("{err:?}"))
}

/// `window.fetch` with the payload as a `FormData` body.
pub struct FetchTransport;

async fn post_form(endpoint: String, payload: UploadPayload<BrowserFile>) -> Result<String, UploadError> {
    let window = web_sys::window().ok_or_else(|| UploadError::Network("no window".into()))?;
    let form = FormData::new().map_err(network)?;
    let field = payload.field_name().to_string();
    // No filename override: for a folder pick the browser sends the relative
    // path (`export/activities.csv`), which the server splits on `/`.
    if let Some(file) = payload.into_entry() {
        form.append_with_blob(&field, &file.0).map_err(network)?;
    }

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_body(&form);
    let resp = JsFuture::from(window.fetch_with_str_and_init(&endpoint, &init))
        .await
        .map_err(network)?;
    let resp: Response = resp.dyn_into().map_err(network)?;
    let text = JsFuture::from(resp.text().map_err(network)?)
        .await
        .map_err(network)?;
    text.as_string()
        .ok_or_else(|| UploadError::MalformedResponse("response body is not text".into()))
}

impl Transport<BrowserFile> for FetchTransport {
    fn send(
        &self,
        endpoint: &str,
        payload: UploadPayload<BrowserFile>,
    ) -> LocalBoxFuture<'static, Result<String, UploadError>> {
        post_form(endpoint.to_string(), payload).boxed_local()
    }
}

/// Writes status text straight into a DOM node.
pub struct ElementSink(web_sys::Element);

impl StatusSink for ElementSink {
    fn show(&self, text: &str) {
        self.0.set_text_content(Some(text));
    }
}

struct SignalSink(WriteSignal<String>);

impl StatusSink for SignalSink {
    fn show(&self, text: &str) {
        self.0.set(text.to_string());
    }
}

fn element(document: &Document, id: &str) -> Result<web_sys::Element, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("element #{id} not found")))
}

/// Submit listener on a server-rendered upload form.
///
/// Holds the form and its listener until [`UploadBinding::dispose`] removes it.
#[wasm_bindgen]
pub struct UploadBinding {
    form: web_sys::Element,
    listener: Closure<dyn FnMut(web_sys::Event)>,
}

impl UploadBinding {
    pub fn attach_to(document: &Document, config: UploadConfig) -> Result<Self, JsValue> {
        let form = element(document, FORM_ID)?;
        let input: HtmlInputElement = element(document, INPUT_ID)?
            .dyn_into()
            .map_err(|_| JsValue::from_str(&format!("#{INPUT_ID} is not an input")))?;
        let status = element(document, STATUS_ID)?;

        let handler = Rc::new(SubmitHandler::new(config, FetchTransport, ElementSink(status)));
        let listener = Closure::<dyn FnMut(web_sys::Event)>::new(move |ev: web_sys::Event| {
            ev.prevent_default();
            let files = files_from_input(&input);
            let handler = Rc::clone(&handler);
            spawn_local(async move {
                handler.submit(&files).await;
            });
        });
        form.add_event_listener_with_callback("submit", listener.as_ref().unchecked_ref())?;
        tracing::debug!(form = FORM_ID, "upload form bound");
        Ok(Self { form, listener })
    }
}

#[wasm_bindgen]
impl UploadBinding {
    /// Bind to the current document. `config` is an optional plain object
    /// with the same keys as the upload config.
    pub fn attach(config: JsValue) -> Result<UploadBinding, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            UploadConfig::default()
        } else {
            let cfg: UploadConfig = serde_wasm_bindgen::from_value(config)?;
            cfg.validate()
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            cfg
        };
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        Self::attach_to(&document, config)
    }

    pub fn dispose(self) {
        match self
            .form
            .remove_event_listener_with_callback("submit", self.listener.as_ref().unchecked_ref())
        {
            Ok(()) => tracing::debug!(form = FORM_ID, "upload form released"),
            Err(err) => tracing::warn!(form = FORM_ID, error = ?err, "could not remove submit listener"),
        }
    }
}

/// Drop the binding installed by `start`, if any.
#[wasm_bindgen]
pub fn detach_upload_form() -> bool {
    ACTIVE_BINDING.with(|slot| match slot.borrow_mut().take() {
        Some(binding) => {
            binding.dispose();
            true
        }
        None => false,
    })
}

#[component]
pub fn App() -> impl IntoView {
    let (status, set_status) = create_signal(String::new());
    let (busy, set_busy) = create_signal(false);
    let input_ref = create_node_ref::<html::Input>();

    let config = UploadConfig {
        block_while_in_flight: true,
        ..UploadConfig::default()
    };
    let target = config.target_filename.clone();
    let handler = Rc::new(SubmitHandler::new(config, FetchTransport, SignalSink(set_status)));

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let Some(input) = input_ref.get_untracked() else {
            return;
        };
        let files = files_from_input(&input);
        let handler = Rc::clone(&handler);
        set_busy.set(true);
        spawn_local(async move {
            handler.submit(&files).await;
            set_busy.set(handler.in_flight() > 0);
        });
    };

    view! {
        <main class="upload">
            <header>
                <h1>"Upload Activities"</h1>
                <p class="subtitle">"Choose your export folder; only "<code>{target}</code>" is sent."</p>
                <p class="note">{"Web version "}{APP_VERSION}{" ("}{APP_COMMIT}{")"}</p>
            </header>
            <form id=FORM_ID on:submit=on_submit>
                <input id=INPUT_ID type="file" multiple webkitdirectory="" node_ref=input_ref />
                <button class="btn" type="submit" disabled=move || busy.get()>"Upload"</button>
            </form>
            <p id=STATUS_ID class="note">{move || status.get()}</p>
        </main>
    }
}

#[cfg(target_arch = "wasm32")]
struct ConsoleWriter;

#[cfg(target_arch = "wasm32")]
impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = String::from_utf8_lossy(buf);
        let line = line.trim_end();
        if !line.is_empty() {
            web_sys::console::log_1(&JsValue::from_str(line));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_writer(|| ConsoleWriter)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    init_logging();

    let document = web_sys::window().and_then(|w| w.document());
    if let Some(document) = document.filter(|d| d.get_element_by_id(FORM_ID).is_some()) {
        match UploadBinding::attach_to(&document, UploadConfig::default()) {
            Ok(binding) => ACTIVE_BINDING.with(|slot| *slot.borrow_mut() = Some(binding)),
            Err(err) => tracing::error!(error = ?err, "could not bind upload form"),
        }
        return;
    }
    leptos::mount_to_body(|| view! { <App/> });
}
