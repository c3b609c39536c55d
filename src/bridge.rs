// SPDX-License-Identifier: GPL-3.0-only

//! Declarative host bridge
//!
//! Declarative UI frameworks re-render a scanner view from a props snapshot
//! many times over its life. The bridge turns two consecutive snapshots into
//! the imperative controller calls that separate them, and keeps one
//! controller per view identity so a re-render never rebuilds the capture
//! pipeline.

use crate::backends::CapturePlatform;
use crate::config::{GuideStyle, SessionConfig};
use crate::errors::{ConfigError, ConfigResult};
use crate::overlay::Rect;
use crate::session::{ScannerBindings, SessionController};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// One render of a scanner view
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerProps {
    pub config: SessionConfig,
    pub visible: bool,
    /// Laid-out bounds, once known
    pub bounds: Option<Rect>,
}

impl ScannerProps {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            visible: false,
            bounds: None,
        }
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// An imperative controller call derived from a props change
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerCall {
    Attach(SessionConfig),
    UpdateGuideStyle(GuideStyle),
    BecomeVisible,
    BecomeHidden,
    LayoutChanged(Rect),
}

/// Calls that take a controller from `previous` to `next`
///
/// Ordered the way a view's lifecycle runs: configuration first, then
/// visibility, then layout. A change limited to the display-only guide
/// fields becomes `UpdateGuideStyle` rather than a full `Attach`.
pub fn diff(previous: Option<&ScannerProps>, next: &ScannerProps) -> Vec<ControllerCall> {
    let mut calls = Vec::new();

    match previous {
        None => calls.push(ControllerCall::Attach(next.config.clone())),
        Some(prev) if prev.config != next.config => {
            let mut restyled = prev.config.clone();
            restyled.guide.apply_style(&next.config.guide.style());
            if restyled == next.config {
                calls.push(ControllerCall::UpdateGuideStyle(next.config.guide.style()));
            } else {
                calls.push(ControllerCall::Attach(next.config.clone()));
            }
        }
        Some(_) => {}
    }

    let was_visible = previous.is_some_and(|p| p.visible);
    match (was_visible, next.visible) {
        (false, true) => calls.push(ControllerCall::BecomeVisible),
        (true, false) => calls.push(ControllerCall::BecomeHidden),
        _ => {}
    }

    let old_bounds = previous.and_then(|p| p.bounds);
    if let Some(bounds) = next.bounds
        && old_bounds != Some(bounds)
    {
        calls.push(ControllerCall::LayoutChanged(bounds));
    }

    calls
}

/// Apply one call to a controller
pub fn apply(controller: &mut SessionController, call: ControllerCall) -> ConfigResult<()> {
    match call {
        ControllerCall::Attach(config) => controller.attach(config)?,
        ControllerCall::UpdateGuideStyle(style) => controller.set_guide_style(style)?,
        ControllerCall::BecomeVisible => controller.become_visible(),
        ControllerCall::BecomeHidden => controller.become_hidden(),
        ControllerCall::LayoutChanged(bounds) => controller.layout_changed(bounds),
    }
    Ok(())
}

struct HostedView {
    controller: SessionController,
    props: ScannerProps,
}

type ControllerFactory = Box<dyn FnMut(Uuid) -> SessionController + Send>;

/// Stable controllers for a set of scanner views
pub struct ScannerHost {
    factory: ControllerFactory,
    views: HashMap<Uuid, HostedView>,
}

impl ScannerHost {
    /// Build controllers with `factory` the first time a view renders
    pub fn new(factory: impl FnMut(Uuid) -> SessionController + Send + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            views: HashMap::new(),
        }
    }

    /// Every view shares one platform
    pub fn with_platform(platform: Arc<dyn CapturePlatform>) -> Self {
        Self::new(move |id| SessionController::with_id(id, Arc::clone(&platform)))
    }

    /// A fresh view identity
    pub fn new_view_id() -> Uuid {
        Uuid::new_v4()
    }

    /// Render a view
    ///
    /// Every derived call is applied even if an earlier one fails; the first
    /// configuration error is returned.
    pub fn render(&mut self, id: Uuid, props: ScannerProps) -> ConfigResult<()> {
        let is_new = !self.views.contains_key(&id);
        if is_new {
            debug!(view = %id, "Creating controller for new view");
            let controller = (self.factory)(id);
            self.views.insert(
                id,
                HostedView {
                    controller,
                    props: props.clone(),
                },
            );
        }
        let Some(view) = self.views.get_mut(&id) else {
            return Ok(());
        };
        let calls = if is_new {
            diff(None, &props)
        } else {
            diff(Some(&view.props), &props)
        };

        let mut first_error: Option<ConfigError> = None;
        for call in calls {
            if let Err(e) = apply(&mut view.controller, call) {
                warn!(view = %id, error = %e, "Controller rejected render");
                first_error.get_or_insert(e);
            }
        }
        view.props = props;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Hide and drop a view's controller
    pub fn dismantle(&mut self, id: Uuid) -> bool {
        match self.views.remove(&id) {
            Some(mut view) => {
                view.controller.dismantle();
                debug!(view = %id, "View dismantled");
                true
            }
            None => false,
        }
    }

    pub fn controller(&self, id: Uuid) -> Option<&SessionController> {
        self.views.get(&id).map(|view| &view.controller)
    }

    pub fn controller_mut(&mut self, id: Uuid) -> Option<&mut SessionController> {
        self.views.get_mut(&id).map(|view| &mut view.controller)
    }

    pub fn bindings(&self, id: Uuid) -> Option<ScannerBindings> {
        self.controller(id).map(SessionController::bindings)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Apply ready events on every controller
    pub fn process_pending(&mut self) -> usize {
        self.views
            .values_mut()
            .map(|view| view.controller.process_pending())
            .sum()
    }

    /// Wait until any controller handled an event
    ///
    /// Returns the view that made progress, or `None` without views.
    pub async fn process_next(&mut self) -> Option<Uuid> {
        if self.views.is_empty() {
            return None;
        }

        let pending = self.views.iter_mut().map(|(id, view)| {
            let id = *id;
            Box::pin(async move {
                view.controller.process_next().await;
                id
            })
        });
        let (id, _, _) = futures::future::select_all(pending).await;
        Some(id)
    }
}

impl std::fmt::Debug for ScannerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerHost")
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .finish()
    }
}
