//! Lifecycle hook system.
//!
//! Hosts announce four lifecycle points; observers implement
//! [`LifecycleHooks`] and are attached through a [`LifecycleEventSource`].
//!
//! ## Phases
//!
//! - `request-start` - inbound HTTP request received
//! - `request-end` - HTTP response about to be sent
//! - `process-start` - console command (or other non-HTTP invocation) started
//! - `process-end` - console command finished
//!
//! Web applications expose the request phases, console applications the
//! process phases.
//!
//! ## Per-invocation state
//!
//! [`LifecycleDispatcher`] drives one invocation through
//! `Idle -> RequestObserved -> ResponseObserved` (or
//! `Idle -> ProcessStarted -> ProcessEnded`). The state lives in a scope
//! value owned by the invocation, so concurrent requests never share it. A
//! scope dropped without `complete()` (e.g. the request aborted) emits no
//! end event.
//!
//! ## Examples
//!
//! ```
//! use reqtrail_core::lifecycle::{LifecycleDispatcher, LifecycleHooks};
//! use reqtrail_core::{IncomingRequest, LifecyclePhase, RequestSnapshot, ResponseSnapshot};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl LifecycleHooks for Counter {
//!     fn on_request_start(&self, _request: &dyn IncomingRequest) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(Counter::default());
//! let mut dispatcher = LifecycleDispatcher::web();
//! dispatcher.register(LifecyclePhase::RequestStart, counter.clone());
//!
//! let request = RequestSnapshot::new("GET", "https://example.com/");
//! let scope = dispatcher.begin_request(&request);
//! scope.complete(&ResponseSnapshot::new(200));
//!
//! assert_eq!(counter.0.load(Ordering::SeqCst), 1);
//! ```

use crate::{IncomingRequest, LifecyclePhase, OutgoingResponse, ProcessInvocation};
use std::sync::Arc;

/// Kind of host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationKind {
    /// Serves HTTP requests
    Web,
    /// Runs console commands
    Console,
}

impl ApplicationKind {
    /// Lifecycle phases this kind of application emits
    pub fn phases(&self) -> &'static [LifecyclePhase] {
        match self {
            ApplicationKind::Web => &[LifecyclePhase::RequestStart, LifecyclePhase::RequestEnd],
            ApplicationKind::Console => &[LifecyclePhase::ProcessStart, LifecyclePhase::ProcessEnd],
        }
    }
}

/// Observer of lifecycle events
///
/// Hooks must not fail: any error is handled (and logged) inside the hook.
pub trait LifecycleHooks: Send + Sync {
    /// Called when a request arrives
    fn on_request_start(&self, _request: &dyn IncomingRequest) {}

    /// Called before the response is sent
    fn on_request_end(&self, _request: &dyn IncomingRequest, _response: &dyn OutgoingResponse) {}

    /// Called when a console command starts
    fn on_process_start(&self, _process: &dyn ProcessInvocation) {}

    /// Called when a console command ends
    fn on_process_end(&self, _process: &dyn ProcessInvocation) {}
}

/// Host facility accepting lifecycle hooks
pub trait LifecycleEventSource {
    fn kind(&self) -> ApplicationKind;

    /// Attach `hooks` to `phase`
    fn attach(&mut self, phase: LifecyclePhase, hooks: Arc<dyn LifecycleHooks>);
}

/// Invocation state, as tracked by a dispatcher scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationState {
    Idle,
    RequestObserved,
    ResponseObserved,
    ProcessStarted,
    ProcessEnded,
}

/// Dispatches lifecycle events to attached hooks, in attachment order
pub struct LifecycleDispatcher {
    kind: ApplicationKind,
    hooks: Vec<(LifecyclePhase, Arc<dyn LifecycleHooks>)>,
}

impl LifecycleDispatcher {
    /// Create a new dispatcher
    pub fn new(kind: ApplicationKind) -> Self {
        Self {
            kind,
            hooks: Vec::new(),
        }
    }

    pub fn web() -> Self {
        Self::new(ApplicationKind::Web)
    }

    pub fn console() -> Self {
        Self::new(ApplicationKind::Console)
    }

    /// Register a hook for `phase`
    pub fn register(&mut self, phase: LifecyclePhase, hooks: Arc<dyn LifecycleHooks>) {
        self.hooks.push((phase, hooks));
    }

    /// Number of hooks attached to `phase`
    pub fn hook_count(&self, phase: LifecyclePhase) -> usize {
        self.hooks_for(phase).count()
    }

    /// Clear all registered hooks
    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    /// Announce an inbound request and open its scope
    pub fn begin_request<'a>(&'a self, request: &'a dyn IncomingRequest) -> RequestScope<'a> {
        for hooks in self.hooks_for(LifecyclePhase::RequestStart) {
            hooks.on_request_start(request);
        }

        RequestScope {
            dispatcher: self,
            request,
            state: InvocationState::RequestObserved,
        }
    }

    /// Announce a process start and open its scope
    pub fn begin_process<'a>(&'a self, process: &'a dyn ProcessInvocation) -> ProcessScope<'a> {
        for hooks in self.hooks_for(LifecyclePhase::ProcessStart) {
            hooks.on_process_start(process);
        }

        ProcessScope {
            dispatcher: self,
            process,
            state: InvocationState::ProcessStarted,
        }
    }

    fn hooks_for(&self, phase: LifecyclePhase) -> impl Iterator<Item = &Arc<dyn LifecycleHooks>> {
        self.hooks
            .iter()
            .filter(move |(p, _)| *p == phase)
            .map(|(_, hooks)| hooks)
    }
}

impl LifecycleEventSource for LifecycleDispatcher {
    fn kind(&self) -> ApplicationKind {
        self.kind
    }

    fn attach(&mut self, phase: LifecyclePhase, hooks: Arc<dyn LifecycleHooks>) {
        self.register(phase, hooks);
    }
}

/// One in-flight HTTP request
pub struct RequestScope<'a> {
    dispatcher: &'a LifecycleDispatcher,
    request: &'a dyn IncomingRequest,
    state: InvocationState,
}

impl RequestScope<'_> {
    pub fn state(&self) -> InvocationState {
        self.state
    }

    /// Announce the response and close the scope
    pub fn complete(mut self, response: &dyn OutgoingResponse) -> InvocationState {
        for hooks in self.dispatcher.hooks_for(LifecyclePhase::RequestEnd) {
            hooks.on_request_end(self.request, response);
        }
        self.state = InvocationState::ResponseObserved;
        self.state
    }
}

/// One running console invocation
pub struct ProcessScope<'a> {
    dispatcher: &'a LifecycleDispatcher,
    process: &'a dyn ProcessInvocation,
    state: InvocationState,
}

impl ProcessScope<'_> {
    pub fn state(&self) -> InvocationState {
        self.state
    }

    /// Announce the process end and close the scope
    pub fn complete(mut self) -> InvocationState {
        for hooks in self.dispatcher.hooks_for(LifecyclePhase::ProcessEnd) {
            hooks.on_process_end(self.process);
        }
        self.state = InvocationState::ProcessEnded;
        self.state
    }
}
