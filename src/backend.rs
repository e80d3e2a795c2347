//! Interface to the renderer that actually ray casts the volumes.
//!
//! The LOD controller never talks to a GPU. It decides which mapper and which
//! appearance each volume actor should use and hands them to a
//! [`RenderBackend`].

use log::debug;

use crate::enums::VolumeRole;
use crate::lod_unit::{TierMapper, VisualAppearance};

pub trait Camera {
    /// Multiply the current zoom by `factor`; values above 1 move closer.
    fn zoom(&mut self, factor: f64);
    fn set_position(&mut self, position: [f64; 3]);
    fn set_focal_point(&mut self, focal_point: [f64; 3]);
    fn set_view_up(&mut self, view_up: [f64; 3]);
}

pub trait RenderBackend {
    /// Create the volume actor for `role`, showing `mapper` with `appearance`.
    fn attach_volume(&mut self, role: VolumeRole, mapper: &TierMapper, appearance: &VisualAppearance);

    /// Make `mapper` the active mapper of the actor for `role`. Also called
    /// when the bound mapper's clipping planes change.
    fn bind_mapper(&mut self, role: VolumeRole, mapper: &TierMapper);

    fn update_appearance(&mut self, role: VolumeRole, appearance: &VisualAppearance);

    fn set_visibility(&mut self, role: VolumeRole, visible: bool);

    /// Remove the actor for `role` and release anything uploaded for it.
    fn detach_volume(&mut self, role: VolumeRole);

    fn render(&mut self);

    fn camera(&mut self) -> &mut dyn Camera;
}

/// One call received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Attach(VolumeRole, TierMapper),
    Bind(VolumeRole, TierMapper),
    Appearance(VolumeRole, VisualAppearance),
    Visibility(VolumeRole, bool),
    Detach(VolumeRole),
    Render,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCamera {
    pub position: [f64; 3],
    pub focal_point: [f64; 3],
    pub view_up: [f64; 3],
    /// Product of every zoom factor applied.
    pub zoom: f64,
}

impl Default for RecordedCamera {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 1.0],
            focal_point: [0.0; 3],
            view_up: [0.0, 1.0, 0.0],
            zoom: 1.0,
        }
    }
}

impl Camera for RecordedCamera {
    fn zoom(&mut self, factor: f64) {
        self.zoom *= factor;
    }

    fn set_position(&mut self, position: [f64; 3]) {
        self.position = position;
    }

    fn set_focal_point(&mut self, focal_point: [f64; 3]) {
        self.focal_point = focal_point;
    }

    fn set_view_up(&mut self, view_up: [f64; 3]) {
        self.view_up = view_up;
    }
}

/// Headless backend that keeps a log of every call.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub events: Vec<BackendEvent>,
    pub camera: RecordedCamera,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, BackendEvent::Render))
            .count()
    }

    /// The mapper most recently attached or bound for `role`.
    pub fn bound_mapper(&self, role: VolumeRole) -> Option<&TierMapper> {
        self.events.iter().rev().find_map(|event| match event {
            BackendEvent::Attach(r, mapper) | BackendEvent::Bind(r, mapper) if *r == role => {
                Some(mapper)
            }
            _ => None,
        })
    }

    /// The appearance most recently attached or pushed for `role`.
    pub fn appearance(&self, role: VolumeRole) -> Option<&VisualAppearance> {
        self.events.iter().rev().find_map(|event| match event {
            BackendEvent::Appearance(r, appearance) if *r == role => Some(appearance),
            _ => None,
        })
    }

    pub fn is_visible(&self, role: VolumeRole) -> bool {
        self.events
            .iter()
            .rev()
            .find_map(|event| match event {
                BackendEvent::Visibility(r, visible) if *r == role => Some(*visible),
                BackendEvent::Attach(r, _) if *r == role => Some(true),
                BackendEvent::Detach(r) if *r == role => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn attach_volume(&mut self, role: VolumeRole, mapper: &TierMapper, appearance: &VisualAppearance) {
        debug!("Attach {role:?} at {:?}", mapper.level());
        self.events.push(BackendEvent::Attach(role, mapper.clone()));
        self.events
            .push(BackendEvent::Appearance(role, appearance.clone()));
    }

    fn bind_mapper(&mut self, role: VolumeRole, mapper: &TierMapper) {
        debug!("Bind {role:?} to {:?} mapper", mapper.level());
        self.events.push(BackendEvent::Bind(role, mapper.clone()));
    }

    fn update_appearance(&mut self, role: VolumeRole, appearance: &VisualAppearance) {
        self.events
            .push(BackendEvent::Appearance(role, appearance.clone()));
    }

    fn set_visibility(&mut self, role: VolumeRole, visible: bool) {
        self.events.push(BackendEvent::Visibility(role, visible));
    }

    fn detach_volume(&mut self, role: VolumeRole) {
        debug!("Detach {role:?}");
        self.events.push(BackendEvent::Detach(role));
    }

    fn render(&mut self) {
        self.events.push(BackendEvent::Render);
    }

    fn camera(&mut self) -> &mut dyn Camera {
        &mut self.camera
    }
}
