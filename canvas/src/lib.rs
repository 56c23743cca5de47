//! Field annotation editor engine for document templates.
//!
//! This crate is compiled to WebAssembly and runs in the browser, drawing over
//! a rendered page raster. It owns the editing lifecycle of a template's field
//! elements: translating raw pointer and key events into element mutations,
//! converting between screen pixels and page units, hit-testing elements and
//! their resize handles, and rendering the page overlay. The host layer is
//! responsible only for wiring DOM events to the engine, prompting for data
//! paths and images, and persisting the resulting [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Element model and the ordered working set |
//! | [`transform`] | Page-unit / screen-pixel conversion |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against elements and corner handles |
//! | [`render`] | Render pass over a [`render::Surface`] and text layout |
//! | [`canvas2d`] | `Surface` implementation for the browser 2D context |
//! | [`images`] | Decoded-image cache for image elements |
//! | [`data_path`] | Dot/bracket data paths and example payloads |
//! | [`consts`] | Shared constants (handle size, gesture thresholds, A4) |

pub mod canvas2d;
pub mod consts;
pub mod data_path;
pub mod doc;
pub mod engine;
pub mod hit;
pub mod images;
pub mod input;
pub mod render;
pub mod transform;
