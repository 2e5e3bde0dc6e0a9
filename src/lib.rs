//! PixelGraph — a pixel-graph image engine with filters, layered images and
//! a line-oriented scripting language.
//!
//! The core types are [`PixelGraph`] (a mutable mesh of pixel nodes),
//! [`LayeredImage`] (a stack of same-size named layers) and [`Command`]
//! (one validated script line). [`Interpreter`] and [`Shell`] drive them from
//! text.

pub mod blend;
pub mod cli;
pub mod codec;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod interpreter;
pub mod layered;
pub mod logger;
pub mod mutator;
pub mod node;
pub mod persist;
pub mod settings;
pub mod shell;

pub use blend::{BlendStrategy, NormalBlend};
pub use codec::ImageFormat;
pub use command::{Command, Cursor, Target, Workspace, WorkspaceOptions};
pub use error::{Error, Result};
pub use graph::PixelGraph;
pub use interpreter::Interpreter;
pub use layered::{FixedSizeGraph, Layer, LayeredImage};
pub use mutator::{ColorTransform, Filter, Mutator, MutatorKind};
pub use node::{Direction, Node, NodeMut, Pixel};
pub use settings::EngineSettings;
pub use shell::Shell;
