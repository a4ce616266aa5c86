//! Errors raised while evaluating the right-hand side.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::forcing::ForcingError;
use crate::material::MaterialError;
use crate::mesh::MeshError;
use crate::types::{ElementIndex, RiverIndex};

/// Control volume a diagnostic refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Element(ElementIndex),
    River(RiverIndex),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Element(e) => write!(f, "element {e}"),
            Entity::River(r) => write!(f, "river segment {r}"),
        }
    }
}

/// State variable slot of a control volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateComponent {
    Surface,
    Unsaturated,
    Groundwater,
    RiverStage,
    RiverGroundwater,
}

impl fmt::Display for StateComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateComponent::Surface => "surface water",
            StateComponent::Unsaturated => "unsaturated water",
            StateComponent::Groundwater => "groundwater",
            StateComponent::RiverStage => "river stage",
            StateComponent::RiverGroundwater => "river groundwater",
        };
        f.write_str(name)
    }
}

/// Errors from building or evaluating a [`HydroSystem`](super::HydroSystem).
#[derive(Debug, Error, PartialEq)]
pub enum RhsError {
    #[error("State vector has length {actual}, expected {expected}")]
    StateLength { expected: usize, actual: usize },

    #[error("NaN in {component} derivative of {entity} at t = {time}")]
    NumericalSingularity {
        entity: Entity,
        component: StateComponent,
        time: f64,
    },

    #[error("Forcing lookup failed: {0}")]
    Forcing(#[from] ForcingError),

    #[error("Invalid mesh: {0}")]
    Mesh(#[from] MeshError),

    #[error("Invalid material tables: {0}")]
    Material(#[from] MaterialError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
