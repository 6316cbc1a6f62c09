//! Browser WebSocket driver for the realtime channel (WASM only)
//!
//! Socket callbacks and the retry timer hold weak references to the shared
//! state, so dropping [`WebRealtime`] tears everything down.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};
use web_time::Instant;

use super::RealtimeEvent;
use super::connection::{ChannelStatus, ReconnectMachine, TimerSlot};
use super::message::{Inbound, Outbound, ws_url};
use crate::error::AppError;

type Sink = Rc<RefCell<dyn FnMut(RealtimeEvent)>>;

/// Closures installed on one socket.
struct Handlers {
    _open: Closure<dyn FnMut()>,
    _message: Closure<dyn FnMut(MessageEvent)>,
    _close: Closure<dyn FnMut(CloseEvent)>,
    _error: Closure<dyn FnMut(Event)>,
}

struct Shared {
    url: String,
    machine: ReconnectMachine,
    socket: Option<WebSocket>,
    handlers: Option<Handlers>,
    /// Handlers of the previous socket. They may still be on the call stack
    /// when the socket is detached, so they are dropped one generation later.
    retired: Option<Handlers>,
    retry: TimerSlot<Closure<dyn FnMut()>>,
}

impl Shared {
    fn detach(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.set_onopen(None);
            socket.set_onmessage(None);
            socket.set_onclose(None);
            socket.set_onerror(None);
            let _ = socket.close();
        }
        self.retired = self.handlers.take();
    }
}

fn dispatch(sink: &Sink, event: RealtimeEvent) {
    match sink.try_borrow_mut() {
        Ok(mut on_event) => (*on_event)(event),
        Err(_) => log::warn!("Dropping realtime event raised from inside the event handler"),
    }
}

/// Realtime channel backed by a browser `WebSocket`.
pub struct WebRealtime {
    shared: Rc<RefCell<Shared>>,
    sink: Sink,
}

impl WebRealtime {
    /// Connect to the `/ws` endpoint of `server_url`; `on_event` receives
    /// every status change and message.
    pub fn connect(
        server_url: &str,
        on_event: impl FnMut(RealtimeEvent) + 'static,
    ) -> Result<Self, AppError> {
        let shared = Rc::new(RefCell::new(Shared {
            url: ws_url(server_url)?,
            machine: ReconnectMachine::new(),
            socket: None,
            handlers: None,
            retired: None,
            retry: TimerSlot::new(),
        }));
        let sink: Sink = Rc::new(RefCell::new(on_event));

        let should_dial = shared.borrow_mut().machine.start();
        if should_dial {
            dial(&shared, &sink);
        }
        Ok(Self { shared, sink })
    }

    pub fn status(&self) -> ChannelStatus {
        self.shared.borrow().machine.status()
    }

    /// Send a message; fails unless the socket is open.
    pub fn send(&self, message: &Outbound) -> Result<(), AppError> {
        let state = self.shared.borrow();
        let socket = state
            .socket
            .as_ref()
            .filter(|socket| socket.ready_state() == WebSocket::OPEN)
            .ok_or(AppError::Disconnected)?;
        socket
            .send_with_str(&message.to_json()?)
            .map_err(|e| AppError::Network(format!("WebSocket send failed: {:?}", e)))
    }

    /// Stop the channel; no reconnect happens afterwards.
    pub fn close(&self) {
        {
            let mut state = self.shared.borrow_mut();
            if state.machine.is_closed() {
                return;
            }
            state.machine.close();
            if let Some(handle) = state.retry.cancel() {
                clear_timeout(handle);
            }
            state.detach();
        }
        dispatch(&self.sink, RealtimeEvent::Status(ChannelStatus::Closed));
    }
}

impl Drop for WebRealtime {
    fn drop(&mut self) {
        self.close();
    }
}

fn dial(shared: &Rc<RefCell<Shared>>, sink: &Sink) {
    let (url, status) = {
        let state = shared.borrow();
        (state.url.clone(), state.machine.status())
    };
    dispatch(sink, RealtimeEvent::Status(status));
    log::debug!("Dialing {}", url);

    match WebSocket::new(&url) {
        Ok(socket) => {
            let handlers = attach(&socket, Rc::downgrade(shared), sink);
            let mut state = shared.borrow_mut();
            state.socket = Some(socket);
            state.handlers = Some(handlers);
        }
        Err(e) => lost(shared, sink, format!("Failed to open {}: {:?}", url, e)),
    }
}

fn attach(socket: &WebSocket, weak: Weak<RefCell<Shared>>, sink: &Sink) -> Handlers {
    let open = {
        let (weak, sink) = (weak.clone(), sink.clone());
        Closure::<dyn FnMut()>::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let status = {
                let mut state = shared.borrow_mut();
                state.machine.on_open();
                state.machine.status()
            };
            dispatch(&sink, RealtimeEvent::Status(status));
        })
    };

    let message = {
        let sink = sink.clone();
        Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let Some(text) = event.data().as_string() else {
                log::debug!("Ignoring binary realtime frame");
                return;
            };
            match Inbound::parse(&text) {
                Ok(message) => dispatch(&sink, RealtimeEvent::Message(message)),
                Err(e) => log::warn!("Ignoring unrecognised realtime message: {}", e),
            }
        })
    };

    let close = {
        let (weak, sink) = (weak.clone(), sink.clone());
        Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
            if let Some(shared) = weak.upgrade() {
                lost(
                    &shared,
                    &sink,
                    format!("Connection closed (code {})", event.code()),
                );
            }
        })
    };

    let error = {
        let sink = sink.clone();
        Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(shared) = weak.upgrade() {
                lost(&shared, &sink, "Connection error".to_string());
            }
        })
    };

    socket.set_onopen(Some(open.as_ref().unchecked_ref()));
    socket.set_onmessage(Some(message.as_ref().unchecked_ref()));
    socket.set_onclose(Some(close.as_ref().unchecked_ref()));
    socket.set_onerror(Some(error.as_ref().unchecked_ref()));

    Handlers {
        _open: open,
        _message: message,
        _close: close,
        _error: error,
    }
}

/// Detach the socket and schedule the single retry.
fn lost(shared: &Rc<RefCell<Shared>>, sink: &Sink, reason: String) {
    let status = {
        let mut state = shared.borrow_mut();
        state.detach();
        if state.machine.on_close(Instant::now()).is_none() {
            return;
        }
        schedule_retry(&mut state, Rc::downgrade(shared), sink.clone());
        state.machine.status()
    };
    log::warn!("{}", reason);
    dispatch(sink, RealtimeEvent::Error(reason));
    dispatch(sink, RealtimeEvent::Status(status));
}

fn schedule_retry(state: &mut Shared, weak: Weak<RefCell<Shared>>, sink: Sink) {
    let Some(window) = web_sys::window() else {
        log::error!("No window object, cannot schedule reconnect");
        return;
    };
    let callback = Closure::<dyn FnMut()>::new(move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let redial = {
            let mut state = shared.borrow_mut();
            state.retry.fire();
            state.machine.retry_now()
        };
        if redial {
            dial(&shared, &sink);
        }
    });
    let delay_ms = i32::try_from(state.machine.delay().as_millis()).unwrap_or(i32::MAX);
    match window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.as_ref().unchecked_ref(),
        delay_ms,
    ) {
        Ok(handle) => {
            if let Some(previous) = state.retry.arm(handle, callback) {
                clear_timeout(previous);
            }
        }
        Err(e) => log::error!("Failed to schedule reconnect: {:?}", e),
    }
}

fn clear_timeout(handle: i32) {
    if let Some(window) = web_sys::window() {
        window.clear_timeout_with_handle(handle);
    }
}
