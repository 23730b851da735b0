//! The runtime context.
//!
//! [`Runtime`] owns every object an application can name: the instance, the single live
//! session with its graphics backend, swapchains, spaces, actions and paths, plus the
//! preview surface and the pose source. Operations map one-to-one onto the OpenXR entry
//! points and take the caller's handles as plain values.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;
use tracing::{debug, info, warn};
use wxr_common::RuntimeConfig;

use crate::backend::{create_backend, GraphicsBackend, GraphicsBinding, NativeImage};
use crate::compositor::{should_log_frame, CompositionLayer, Compositor, FrameReport};
use crate::error::{XrError, XrResult};
use crate::event::{Event, EventQueue};
use crate::format::supported_formats;
use crate::handle::{
    ActionHandle, ActionSetHandle, HandleAllocator, InstanceHandle, SessionHandle, SpaceHandle,
    SwapchainHandle,
};
use crate::image::Image;
use crate::input::{ActionRegistry, ActionState, ActionType, PathTable, NULL_PATH, UNKNOWN_SOURCE_NAME};
use crate::pose::PoseSnapshot;
use crate::pose_source::{ControlMessage, PoseSource};
use crate::space::{ReferenceSpaceType, SpaceLocation, SpaceRegistry, STAGE_BOUNDS};
use crate::state::{SessionState, SessionStateMachine};
use crate::surface::{headless_factory, SurfaceEvent, SurfaceFactory, SurfaceSlot};
use crate::swapchain::{SwapchainCreateInfo, SwapchainManager};
use crate::system;
use crate::tracking::{locate_views, VelocityTracker, View, VIEW_COUNT};

/// Longest single sleep while pacing, so a late deadline change is noticed quickly.
const PACING_SLICE: Duration = Duration::from_millis(5);
const FIRST_SESSION_HANDLE: u64 = 0x1001;

/// Output of `xrWaitFrame`. Times are runtime nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameState {
    pub should_render: bool,
    pub predicted_display_time: i64,
    pub predicted_display_period: i64,
}

struct FramePacer {
    period: Duration,
    next_tick: Option<Instant>,
}

impl FramePacer {
    fn new(frame_rate: f64) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / frame_rate),
            next_tick: None,
        }
    }

    /// Deadline for the current frame. A deadline more than one period late is dropped
    /// and the cadence restarts from now.
    fn next_deadline(&mut self) -> Instant {
        self.next_deadline_at(Instant::now())
    }

    fn next_deadline_at(&mut self, now: Instant) -> Instant {
        let deadline = match self.next_tick {
            Some(tick) if now.saturating_duration_since(tick) <= self.period => tick,
            _ => now,
        };
        self.next_tick = Some(deadline + self.period);
        deadline
    }
}

/// The blocking half of `xrWaitFrame`, run without holding the runtime.
pub struct FrameWaiter {
    pose: Arc<PoseSource>,
    timeout: Option<Duration>,
    deadline: Instant,
}

impl FrameWaiter {
    /// Wait for tracking data, then sleep until the frame deadline.
    pub fn wait(self) -> Option<PoseSnapshot> {
        let snapshot = self.pose.wait_first(self.timeout);
        loop {
            let now = Instant::now();
            if now >= self.deadline {
                break;
            }
            thread::sleep((self.deadline - now).min(PACING_SLICE));
        }
        snapshot
    }
}

#[derive(Debug)]
struct InstanceRecord {
    handle: InstanceHandle,
    application_name: String,
    extensions: Vec<String>,
}

struct SessionRecord {
    handle: SessionHandle,
    backend: Box<dyn GraphicsBackend>,
    state: SessionStateMachine,
}

pub struct Runtime {
    config: RuntimeConfig,
    clock: Instant,
    pose: Arc<PoseSource>,
    surface_factory: SurfaceFactory,
    surface: SurfaceSlot,
    instance: Option<InstanceRecord>,
    instance_handles: HandleAllocator,
    session: Option<SessionRecord>,
    session_handles: HandleAllocator,
    events: EventQueue,
    swapchains: SwapchainManager,
    compositor: Compositor,
    paths: PathTable,
    actions: ActionRegistry,
    spaces: SpaceRegistry,
    pacer: FramePacer,
    snapshot: PoseSnapshot,
    velocity: VelocityTracker,
    frames_submitted: u64,
    pose_timeouts: u64,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, pose: Arc<PoseSource>, surface_factory: SurfaceFactory) -> Self {
        info!(
            preview_width = config.preview_width,
            preview_height = config.preview_height,
            view_mode = ?config.view_mode,
            layout = ?config.display_layout,
            frame_rate = config.frame_rate,
            hmd = %format!("{} {}", config.hmd_make, config.hmd_model),
            "runtime created"
        );
        Self {
            compositor: Compositor::new(&config),
            pacer: FramePacer::new(config.frame_rate),
            config,
            clock: Instant::now(),
            pose,
            surface_factory,
            surface: SurfaceSlot::new(),
            instance: None,
            instance_handles: HandleAllocator::starting_at(1),
            session: None,
            session_handles: HandleAllocator::starting_at(FIRST_SESSION_HANDLE),
            events: EventQueue::new(),
            swapchains: SwapchainManager::new(),
            paths: PathTable::new(),
            actions: ActionRegistry::new(),
            spaces: SpaceRegistry::new(),
            snapshot: PoseSnapshot::identity(),
            velocity: VelocityTracker::default(),
            frames_submitted: 0,
            pose_timeouts: 0,
        }
    }

    /// Runtime listening for tracking packets on the configured UDP port, previewing into
    /// a headless surface. If the port cannot be bound the runtime still comes up, with a
    /// source that never receives packets.
    pub fn from_config(config: RuntimeConfig) -> Self {
        let pose = match PoseSource::start(config.pose_port, config.control_port) {
            Ok(pose) => pose,
            Err(e) => {
                warn!(
                    port = config.pose_port,
                    error = %e,
                    "pose receiver unavailable, tracking disabled"
                );
                PoseSource::manual(SocketAddr::from((Ipv4Addr::LOCALHOST, config.control_port)))
            }
        };
        Self::new(config, Arc::new(pose), headless_factory())
    }

    pub fn pose_source(&self) -> &PoseSource {
        &self.pose
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn surface(&self) -> &SurfaceSlot {
        &self.surface
    }

    pub fn swapchains(&self) -> &SwapchainManager {
        &self.swapchains
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Runtime clock in nanoseconds.
    pub fn now(&self) -> i64 {
        self.clock.elapsed().as_nanos() as i64
    }

    // ---- instance ----

    /// Creating a second instance tears down the first.
    pub fn create_instance<S: AsRef<str>>(
        &mut self,
        application_name: &str,
        api_layers: &[S],
        extensions: &[S],
    ) -> XrResult<InstanceHandle> {
        if let Some(layer) = api_layers.first() {
            return Err(XrError::ApiLayerNotPresent(layer.as_ref().to_string()));
        }
        let extensions = system::validate_extensions(extensions)?;
        if let Some(previous) = self.instance.as_ref().map(|i| i.handle) {
            warn!(instance = %previous, "replacing live instance");
            self.destroy_instance(previous)?;
        }

        let handle = InstanceHandle::from_raw(self.instance_handles.next_raw());
        info!(
            instance = %handle,
            application = application_name,
            extensions = ?extensions,
            "instance created"
        );
        self.instance = Some(InstanceRecord {
            handle,
            application_name: application_name.to_string(),
            extensions,
        });
        if let Err(e) = self.pose.send_control(&ControlMessage::default()) {
            warn!(error = %e, "failed to notify tracking client");
        }
        Ok(handle)
    }

    pub fn check_instance(&self, handle: InstanceHandle) -> XrResult<()> {
        match &self.instance {
            Some(instance) if instance.handle == handle => Ok(()),
            _ => Err(XrError::handle(format!("instance {handle}"))),
        }
    }

    pub fn application_name(&self) -> Option<&str> {
        self.instance.as_ref().map(|i| i.application_name.as_str())
    }

    pub fn enabled_extensions(&self) -> &[String] {
        self.instance
            .as_ref()
            .map(|i| i.extensions.as_slice())
            .unwrap_or(&[])
    }

    /// Releases every session, swapchain, space, action and the preview surface.
    pub fn destroy_instance(&mut self, handle: InstanceHandle) -> XrResult<()> {
        self.check_instance(handle)?;
        if let Some(session) = self.session.as_ref().map(|s| s.handle) {
            self.destroy_session(session)?;
        }
        self.actions = ActionRegistry::new();
        self.paths = PathTable::new();
        self.events.clear();
        if self.surface.close() {
            debug!("preview surface closed");
        }
        self.instance = None;
        info!(instance = %handle, frames = self.frames_submitted, "instance destroyed");
        Ok(())
    }

    pub fn poll_event(&mut self, instance: InstanceHandle) -> XrResult<Option<Event>> {
        self.check_instance(instance)?;
        Ok(self.events.poll())
    }

    // ---- system ----

    pub fn get_system(&self, instance: InstanceHandle, form_factor: i32) -> XrResult<u64> {
        self.check_instance(instance)?;
        system::system_for_form_factor(form_factor)
    }

    pub fn check_system(&self, instance: InstanceHandle, system_id: u64) -> XrResult<()> {
        self.check_instance(instance)?;
        system::check_system(system_id)
    }

    // ---- session ----

    /// Creating a session while one is live destroys the old one first.
    pub fn create_session(
        &mut self,
        instance: InstanceHandle,
        system_id: u64,
        binding: Option<GraphicsBinding>,
    ) -> XrResult<SessionHandle> {
        self.check_system(instance, system_id)?;
        let binding =
            binding.ok_or_else(|| XrError::graphics("no supported graphics binding in chain"))?;
        let backend = create_backend(&binding)?;

        if let Some(previous) = self.session.as_ref().map(|s| s.handle) {
            warn!(session = %previous, "replacing live session");
            self.destroy_session(previous)?;
        }

        let handle = SessionHandle::from_raw(self.session_handles.next_raw());
        let now = self.now();
        let state = SessionStateMachine::created(handle, &mut self.events, now);
        info!(session = %handle, backend = backend.kind().name(), "session created");
        self.session = Some(SessionRecord {
            handle,
            backend,
            state,
        });
        Ok(handle)
    }

    fn session(&self, handle: SessionHandle) -> XrResult<&SessionRecord> {
        match &self.session {
            Some(session) if session.handle == handle => Ok(session),
            _ => Err(XrError::handle(format!("session {handle}"))),
        }
    }

    pub fn session_state(&self, handle: SessionHandle) -> XrResult<SessionState> {
        Ok(self.session(handle)?.state.current())
    }

    pub fn backend(&self, handle: SessionHandle) -> XrResult<&dyn GraphicsBackend> {
        Ok(self.session(handle)?.backend.as_ref())
    }

    /// Swapchains and spaces of the session go with it. The preview surface stays.
    pub fn destroy_session(&mut self, handle: SessionHandle) -> XrResult<()> {
        self.session(handle)?;
        let Some(mut session) = self.session.take() else {
            return Err(XrError::handle(format!("session {handle}")));
        };
        self.swapchains
            .destroy_session(handle, Some(&mut *session.backend));
        self.spaces.clear();
        session.state.reset();
        info!(session = %handle, "session destroyed");
        Ok(())
    }

    pub fn begin_session(&mut self, handle: SessionHandle, view_configuration: i32) -> XrResult<()> {
        self.session(handle)?;
        system::check_view_configuration(view_configuration)?;
        if !self.surface.is_open() {
            let surface =
                (self.surface_factory)(self.config.preview_width, self.config.preview_height)?;
            self.surface.open(surface);
            info!(
                width = self.config.preview_width,
                height = self.config.preview_height,
                "preview surface opened"
            );
        }
        let focused = self.surface.with(|s| s.has_focus()).unwrap_or(false);
        let now = self.now();
        let session = match &mut self.session {
            Some(session) if session.handle == handle => session,
            _ => return Err(XrError::handle(format!("session {handle}"))),
        };
        session.state.begin(focused, &mut self.events, now);
        Ok(())
    }

    pub fn end_session(&mut self, handle: SessionHandle) -> XrResult<()> {
        let now = self.now();
        let session = match &mut self.session {
            Some(session) if session.handle == handle => session,
            _ => return Err(XrError::handle(format!("session {handle}"))),
        };
        session.state.end(&mut self.events, now);
        Ok(())
    }

    pub fn request_exit(&mut self, handle: SessionHandle) -> XrResult<()> {
        let now = self.now();
        let session = match &mut self.session {
            Some(session) if session.handle == handle => session,
            _ => return Err(XrError::handle(format!("session {handle}"))),
        };
        session.state.request_exit(&mut self.events, now);
        Ok(())
    }

    /// Drain preview surface events into the session state machine. A close request asks
    /// the application to exit and drops the surface.
    pub fn pump_surface(&mut self) {
        let events = self.surface.with(|s| s.pump_events()).unwrap_or_default();
        if events.is_empty() {
            return;
        }
        let now = self.now();
        let mut close = false;
        for event in events {
            let Some(session) = self.session.as_mut() else {
                close |= event == SurfaceEvent::CloseRequested;
                continue;
            };
            match event {
                SurfaceEvent::FocusGained => session.state.focus_changed(true, &mut self.events, now),
                SurfaceEvent::FocusLost => session.state.focus_changed(false, &mut self.events, now),
                SurfaceEvent::CloseRequested => {
                    info!(session = %session.handle, "preview closed, requesting exit");
                    session.state.request_exit(&mut self.events, now);
                    close = true;
                }
                SurfaceEvent::Resized { width, height } => {
                    debug!(width, height, "preview resized");
                }
            }
        }
        if close {
            self.surface.close();
        }
    }

    // ---- swapchains ----

    pub fn swapchain_formats(&self, session: SessionHandle) -> XrResult<Vec<i64>> {
        let kind = self.session(session)?.backend.kind();
        Ok(supported_formats(kind).iter().map(|f| f.native(kind)).collect())
    }

    pub fn create_swapchain(
        &mut self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> XrResult<SwapchainHandle> {
        let record = match &mut self.session {
            Some(record) if record.handle == session => record,
            _ => return Err(XrError::handle(format!("session {session}"))),
        };
        self.swapchains
            .create(session, &mut *record.backend, info)
    }

    pub fn destroy_swapchain(&mut self, handle: SwapchainHandle) -> XrResult<()> {
        let owner = self.swapchains.get(handle)?.session();
        let backend = match &mut self.session {
            Some(record) if record.handle == owner => Some(&mut *record.backend),
            _ => None,
        };
        self.swapchains.destroy(handle, backend)
    }

    pub fn swapchain_images(&self, handle: SwapchainHandle) -> XrResult<Vec<NativeImage>> {
        self.swapchains.native_images(handle)
    }

    pub fn acquire_swapchain_image(&mut self, handle: SwapchainHandle) -> XrResult<u32> {
        self.swapchains.acquire(handle)
    }

    pub fn wait_swapchain_image(&mut self, handle: SwapchainHandle) -> XrResult<()> {
        self.swapchains.wait(handle)
    }

    pub fn release_swapchain_image(&mut self, handle: SwapchainHandle) -> XrResult<()> {
        self.swapchains.release(handle)
    }

    /// CPU view of one swapchain image, for rendering into it without a GPU.
    pub fn swapchain_image_mut(&mut self, handle: SwapchainHandle, index: u32) -> XrResult<&mut Image> {
        self.swapchains
            .get_mut(handle)?
            .image_mut(index)
            .map(|image| &mut image.image)
            .ok_or_else(|| XrError::validation(format!("image index {index} out of range")))
    }

    // ---- frame loop ----

    /// First half of `xrWaitFrame`: pump the surface and reserve the next frame slot.
    pub fn prepare_wait_frame(&mut self, session: SessionHandle) -> XrResult<FrameWaiter> {
        self.session(session)?;
        self.pump_surface();
        Ok(FrameWaiter {
            pose: self.pose.clone(),
            timeout: self.config.pose_wait_timeout_ms.map(Duration::from_millis),
            deadline: self.pacer.next_deadline(),
        })
    }

    /// Second half of `xrWaitFrame`: latch the pose for this frame.
    pub fn complete_wait_frame(
        &mut self,
        session: SessionHandle,
        snapshot: Option<PoseSnapshot>,
    ) -> XrResult<FrameState> {
        self.session(session)?;
        match snapshot {
            Some(snapshot) => self.snapshot = snapshot,
            None => {
                self.pose_timeouts += 1;
                if should_log_frame(self.pose_timeouts - 1) {
                    warn!(
                        timeouts = self.pose_timeouts,
                        "no tracking data yet, using identity pose"
                    );
                }
                self.snapshot = PoseSnapshot::identity();
            }
        }
        let period = self.pacer.period;
        self.velocity.update(&self.snapshot, period);
        let period_ns = period.as_nanos() as i64;
        Ok(FrameState {
            should_render: true,
            predicted_display_time: self.now() + period_ns,
            predicted_display_period: period_ns,
        })
    }

    /// Single-threaded `xrWaitFrame`.
    pub fn wait_frame(&mut self, session: SessionHandle) -> XrResult<FrameState> {
        let waiter = self.prepare_wait_frame(session)?;
        let snapshot = waiter.wait();
        self.complete_wait_frame(session, snapshot)
    }

    pub fn begin_frame(&mut self, session: SessionHandle) -> XrResult<()> {
        self.session(session).map(|_| ())
    }

    /// Composite and present the submitted layers. Without a preview surface the frame
    /// is accepted and dropped.
    pub fn end_frame(
        &mut self,
        session: SessionHandle,
        environment_blend_mode: i32,
        layers: &[CompositionLayer],
    ) -> XrResult<FrameReport> {
        self.session(session)?;
        if environment_blend_mode != system::BLEND_MODE_OPAQUE {
            return Err(XrError::validation(format!(
                "environment blend mode {environment_blend_mode} unsupported"
            )));
        }
        self.pump_surface();

        let frame = self.frames_submitted;
        self.frames_submitted += 1;
        let marker_id = self.snapshot.frame_id;
        let record = match &mut self.session {
            Some(record) if record.handle == session => record,
            _ => return Err(XrError::handle(format!("session {session}"))),
        };
        let compositor = &mut self.compositor;
        let swapchains = &self.swapchains;
        let backend = &mut *record.backend;
        match self.surface.with(|surface| {
            compositor.compose(frame, marker_id, layers, swapchains, backend, surface)
        }) {
            Some(result) => result,
            None => {
                if should_log_frame(frame) {
                    debug!(frame, "no preview surface, frame dropped");
                }
                Ok(FrameReport::default())
            }
        }
    }

    pub fn locate_views(
        &self,
        session: SessionHandle,
        view_configuration: i32,
    ) -> XrResult<[View; VIEW_COUNT]> {
        self.session(session)?;
        system::check_view_configuration(view_configuration)?;
        Ok(locate_views(&self.snapshot, self.config.effective_fov_degrees()))
    }

    /// Pose latched by the most recent `xrWaitFrame`.
    pub fn current_pose(&self) -> &PoseSnapshot {
        &self.snapshot
    }

    // ---- spaces ----

    pub fn reference_space_types(&self, session: SessionHandle) -> XrResult<&'static [ReferenceSpaceType]> {
        self.session(session)?;
        Ok(&ReferenceSpaceType::ALL)
    }

    pub fn create_reference_space(&mut self, session: SessionHandle, kind: i32) -> XrResult<SpaceHandle> {
        self.session(session)?;
        let kind = ReferenceSpaceType::from_raw(kind)?;
        Ok(self.spaces.create_reference(kind))
    }

    pub fn create_action_space(
        &mut self,
        session: SessionHandle,
        action: ActionHandle,
        subaction_path: u64,
    ) -> XrResult<SpaceHandle> {
        self.session(session)?;
        self.actions.action(action)?;
        Ok(self
            .spaces
            .create_action_space(action, subaction_path, &self.paths))
    }

    pub fn locate_space(&self, space: SpaceHandle, base: SpaceHandle) -> XrResult<SpaceLocation> {
        self.spaces.get(base)?;
        self.spaces.locate(space, &self.snapshot, &self.velocity)
    }

    pub fn destroy_space(&mut self, space: SpaceHandle) -> XrResult<()> {
        self.spaces.destroy(space)
    }

    /// `None` means bounds are unavailable for this space type.
    pub fn reference_space_bounds(
        &self,
        session: SessionHandle,
        kind: i32,
    ) -> XrResult<Option<(f32, f32)>> {
        self.session(session)?;
        Ok(match ReferenceSpaceType::from_raw(kind)? {
            ReferenceSpaceType::Stage => Some(STAGE_BOUNDS),
            _ => None,
        })
    }

    // ---- paths ----

    pub fn string_to_path(&mut self, instance: InstanceHandle, text: &str) -> XrResult<u64> {
        self.check_instance(instance)?;
        self.paths.intern(text)
    }

    pub fn path_to_string(&self, instance: InstanceHandle, path: u64) -> XrResult<&str> {
        self.check_instance(instance)?;
        self.paths.lookup(path)
    }

    // ---- actions ----

    pub fn create_action_set(
        &mut self,
        instance: InstanceHandle,
        name: &str,
        priority: u32,
    ) -> XrResult<ActionSetHandle> {
        self.check_instance(instance)?;
        self.actions.create_set(name, priority)
    }

    pub fn destroy_action_set(&mut self, set: ActionSetHandle) -> XrResult<()> {
        self.actions.destroy_set(set)
    }

    pub fn create_action(
        &mut self,
        set: ActionSetHandle,
        name: &str,
        action_type: i32,
        subaction_paths: &[u64],
    ) -> XrResult<ActionHandle> {
        let action_type = ActionType::from_raw(action_type)
            .ok_or_else(|| XrError::validation(format!("action type {action_type}")))?;
        self.actions
            .create_action(set, name, action_type, subaction_paths, &self.paths)
    }

    pub fn destroy_action(&mut self, action: ActionHandle) -> XrResult<()> {
        self.actions.destroy_action(action)
    }

    /// Suggested bindings are accepted and ignored; actions are resolved by name.
    pub fn suggest_bindings(
        &self,
        instance: InstanceHandle,
        interaction_profile: u64,
        binding_count: usize,
    ) -> XrResult<()> {
        self.check_instance(instance)?;
        let profile = self.paths.lookup(interaction_profile).unwrap_or("<unknown>");
        info!(profile, binding_count, "interaction profile bindings suggested");
        Ok(())
    }

    pub fn attach_action_sets(&mut self, session: SessionHandle, sets: &[ActionSetHandle]) -> XrResult<()> {
        self.session(session)?;
        self.actions.attach(sets)
    }

    pub fn sync_actions(&self, session: SessionHandle, active_sets: &[ActionSetHandle]) -> XrResult<()> {
        self.session(session)?;
        for set in active_sets {
            self.actions.set(*set)?;
        }
        Ok(())
    }

    pub fn action_state_boolean(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction_path: u64,
    ) -> XrResult<ActionState<bool>> {
        self.session(session)?;
        self.actions
            .boolean_state(action, subaction_path, &self.paths, &self.snapshot)
    }

    pub fn action_state_float(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction_path: u64,
    ) -> XrResult<ActionState<f32>> {
        self.session(session)?;
        self.actions
            .float_state(action, subaction_path, &self.paths, &self.snapshot)
    }

    pub fn action_state_vector2(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction_path: u64,
    ) -> XrResult<ActionState<Vec2>> {
        self.session(session)?;
        self.actions
            .vector2_state(action, subaction_path, &self.paths, &self.snapshot)
    }

    pub fn action_state_pose(&self, session: SessionHandle, action: ActionHandle) -> XrResult<bool> {
        self.session(session)?;
        self.actions.pose_active(action)
    }

    pub fn current_interaction_profile(&self, session: SessionHandle, top_level_path: u64) -> XrResult<u64> {
        self.session(session)?;
        debug!(top_level_path, "interaction profile queried");
        Ok(NULL_PATH)
    }

    pub fn bound_sources(&self, session: SessionHandle, action: ActionHandle) -> XrResult<Vec<u64>> {
        self.session(session)?;
        self.actions.action(action)?;
        Ok(Vec::new())
    }

    pub fn input_source_localized_name(
        &self,
        session: SessionHandle,
        source_path: u64,
    ) -> XrResult<&'static str> {
        self.session(session)?;
        debug!(source_path, "localized name queried");
        Ok(UNKNOWN_SOURCE_NAME)
    }

    // ---- haptics ----

    pub fn apply_haptic_feedback(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction_path: u64,
        amplitude: f32,
        duration_ns: i64,
    ) -> XrResult<()> {
        self.session(session)?;
        let hand = self.actions.resolve_hand(action, subaction_path, &self.paths)?;
        debug!(?hand, amplitude, duration_ns, "haptic feedback");
        Ok(())
    }

    pub fn stop_haptic_feedback(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction_path: u64,
    ) -> XrResult<()> {
        self.session(session)?;
        let hand = self.actions.resolve_hand(action, subaction_path, &self.paths)?;
        debug!(?hand, "haptic feedback stopped");
        Ok(())
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.as_ref().map(|i| i.handle) {
            let _ = self.destroy_instance(instance);
        }
    }
}
