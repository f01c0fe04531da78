//! USB permission handshake
//!
//! Bridges the platform's asynchronous device-access grant into one
//! deterministic outcome per discovery event. The fast path (access already
//! held) goes straight to ready; the slow path issues a tagged request
//! through the injected broker and waits for exactly one response, delivered
//! later as an event. Only one request may be outstanding at a time; a
//! discovery arriving while one is pending is rejected explicitly instead of
//! silently replacing its device context.

use crate::capture::CaptureProvider;
use crate::identity::resolve_key;
use crate::notify::{Notice, Notifier};
use crate::session::SettingsSession;
use crate::store::SettingsStore;
use common::{DeviceDescriptor, DeviceId, PermissionResponse, RequestId, RequestTag, Resolution};
use tracing::{debug, info, warn};

/// Action identifier attached to every permission request
///
/// Scoped to this application so responses aimed at other listeners are
/// never mistaken for ours.
pub const PERMISSION_ACTION: &str = "io.uvcview.USB_PERMISSION";

/// Issues permission requests toward the platform
///
/// The single response for a request does not come back through this trait:
/// it arrives later on the event channel as a [`PermissionResponse`]
/// carrying the request's tag.
pub trait PermissionBroker: Send {
    fn request(&mut self, device: &DeviceDescriptor, tag: &RequestTag) -> common::Result<()>;
}

/// Immediate result of a discovery event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Access was already held; settings loaded and capture signalled
    Ready,
    /// A request was issued; resolution arrives as a later event
    AwaitingPermission(RequestId),
}

/// Terminal result of an asynchronous permission response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Granted; settings loaded and capture signalled
    Ready,
    /// Denied; no retry is attempted, the user must re-scan
    Denied,
}

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("permission request {0:?} is still outstanding")]
    RequestInFlight(RequestId),
    #[error(transparent)]
    Failed(#[from] common::Error),
}

#[derive(Debug, Clone)]
struct Selection {
    device: DeviceDescriptor,
    key: String,
}

#[derive(Debug, Clone)]
struct OutstandingRequest {
    request: RequestId,
    device_id: DeviceId,
}

/// Coordinates device selection, the permission handshake, and the settings
/// session for the currently selected device
///
/// Owned by the hosting component; [`teardown`] must run when that component
/// goes away so a late response cannot touch dead state.
///
/// [`teardown`]: PermissionCoordinator::teardown
pub struct PermissionCoordinator {
    store: SettingsStore,
    broker: Box<dyn PermissionBroker>,
    capture: Box<dyn CaptureProvider>,
    notifier: Box<dyn Notifier>,
    selection: Option<Selection>,
    outstanding: Option<OutstandingRequest>,
    session: Option<SettingsSession>,
    next_request: u64,
    torn_down: bool,
}

impl PermissionCoordinator {
    pub fn new(
        store: SettingsStore,
        broker: Box<dyn PermissionBroker>,
        capture: Box<dyn CaptureProvider>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            broker,
            capture,
            notifier,
            selection: None,
            outstanding: None,
            session: None,
            next_request: 1,
            torn_down: false,
        }
    }

    /// React to a discovered device
    ///
    /// Ensures stored settings exist, records the device as the current
    /// selection, and either goes straight to ready (access already held) or
    /// issues an asynchronous permission request.
    pub fn handle_discovered_device(
        &mut self,
        device: &DeviceDescriptor,
        permission_granted: bool,
    ) -> Result<DiscoveryOutcome, HandshakeError> {
        let key = resolve_key(device);

        if self.store.exists(&key) {
            let label = self
                .store
                .name(&key)
                .map(str::to_string)
                .unwrap_or_else(|| device.label());
            self.notifier.notify(Notice::KnownDeviceFound {
                key: key.clone(),
                label,
            });
        } else {
            self.store
                .create_default(&key, device.product.as_deref())?;
            self.notifier.notify(Notice::NewDeviceFound {
                key: key.clone(),
                label: device.label(),
            });
        }

        self.selection = Some(Selection {
            device: device.clone(),
            key: key.clone(),
        });

        if permission_granted {
            debug!("Access already held for {}, skipping request", key);
            self.enter_ready();
            return Ok(DiscoveryOutcome::Ready);
        }

        if let Some(outstanding) = &self.outstanding {
            return Err(HandshakeError::RequestInFlight(outstanding.request));
        }

        let request = RequestId(self.next_request);
        self.next_request += 1;
        let tag = RequestTag {
            action: PERMISSION_ACTION.to_string(),
            request,
        };

        self.broker.request(device, &tag)?;
        self.outstanding = Some(OutstandingRequest {
            request,
            device_id: device.id,
        });

        info!("Requested permission for {} ({:?})", key, request);
        Ok(DiscoveryOutcome::AwaitingPermission(request))
    }

    /// Deliver the asynchronous response for an outstanding request
    ///
    /// Exactly one response is consumed per request. Late, unsolicited, or
    /// foreign responses (wrong action or request id) are ignored and return
    /// `None`. A denial is terminal: no retry is issued.
    pub fn on_permission_response(
        &mut self,
        response: PermissionResponse,
    ) -> Option<HandshakeOutcome> {
        if self.torn_down {
            debug!("Dropping permission response after teardown");
            return None;
        }

        let matches = response.tag.action == PERMISSION_ACTION
            && self
                .outstanding
                .as_ref()
                .is_some_and(|o| o.request == response.tag.request);
        if !matches {
            debug!(
                "Ignoring permission response with tag {:?}",
                response.tag
            );
            return None;
        }

        let outstanding = self.outstanding.take()?;
        let label = self
            .selection
            .as_ref()
            .map(|s| s.device.label())
            .unwrap_or_default();

        match response.device {
            Some(device) if response.granted && device.id == outstanding.device_id => {
                self.notifier.notify(Notice::PermissionGranted { label });
                self.enter_ready();
                Some(HandshakeOutcome::Ready)
            }
            _ => {
                self.notifier.notify(Notice::PermissionDenied { label });
                Some(HandshakeOutcome::Denied)
            }
        }
    }

    /// Load settings into the reconciliation session and signal capture
    ///
    /// A capture failure is surfaced to the user and logged; it does not
    /// undo the selection or the loaded session.
    fn enter_ready(&mut self) {
        let Some(selection) = &self.selection else {
            return;
        };

        self.session = Some(SettingsSession::for_device(&selection.key, &self.store));

        if let Err(e) = self.capture.open(selection.device.id) {
            warn!("Capture provider failed to open: {}", e);
            self.notifier.notify(Notice::CaptureError {
                message: e.to_string(),
            });
        }
    }

    /// Currently selected device, if any
    pub fn current_device(&self) -> Option<&DeviceDescriptor> {
        self.selection.as_ref().map(|s| &s.device)
    }

    /// Settings key of the currently selected device, if any
    pub fn current_key(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.key.as_str())
    }

    /// Settings session for the selected device; present once ready
    pub fn editor(&mut self) -> Option<&mut SettingsSession> {
        self.session.as_mut()
    }

    /// Open the settings editor, reloading the persisted baseline
    ///
    /// Returns false when no device has reached ready yet.
    pub fn open_editor(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) => {
                session.open(&self.store);
                true
            }
            None => false,
        }
    }

    /// Close the editor; see [`SettingsSession::close`]
    pub fn close_editor(&mut self) -> Option<crate::session::CloseOutcome> {
        self.session.as_mut().map(|s| s.close())
    }

    /// Commit pending edits for the selected device
    pub fn save_pending(&mut self) -> common::Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.save(&mut self.store)?;
        let key = session.device_key().to_string();
        self.notifier.notify(Notice::SettingsSaved { key });
        Ok(())
    }

    /// Drop pending edits for the selected device
    pub fn discard_pending(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.discard();
        }
    }

    /// Assign a human-readable name to the selected device
    pub fn set_device_name(&mut self, name: &str) -> common::Result<()> {
        let Some(key) = self.current_key().map(str::to_string) else {
            return Ok(());
        };
        self.store.set_name(&key, name)
    }

    /// Ask the capture provider for a preview resolution change
    ///
    /// Validates against the provider's supported sizes first; an
    /// unavailable size list is surfaced to the user.
    pub fn request_preview_resolution(&mut self, resolution: Resolution) -> common::Result<()> {
        let sizes = match self.capture.supported_resolutions() {
            Ok(sizes) => sizes,
            Err(e) => {
                warn!("Failed to get preview sizes: {}", e);
                self.notifier.notify(Notice::PreviewSizesUnavailable);
                return Err(e);
            }
        };

        if !sizes.contains(&resolution) {
            return Err(common::Error::Capture(format!(
                "resolution {} not offered by device",
                resolution
            )));
        }

        self.capture.request_resolution(resolution)
    }

    /// Tear down the handshake state
    ///
    /// Cancels any outstanding request (its late response will be ignored)
    /// and closes the capture provider. A second teardown is logged and
    /// swallowed, never propagated.
    pub fn teardown(&mut self) {
        if self.torn_down {
            warn!("Coordinator teardown called twice");
            return;
        }
        self.torn_down = true;

        if let Some(outstanding) = self.outstanding.take() {
            debug!(
                "Cancelling outstanding permission request {:?}",
                outstanding.request
            );
        }

        self.session = None;
        self.capture.close();
    }
}
