//! Template field mapping: collaborator client and editing session.
//!
//! The interactive editor lives in the `canvas` crate. This crate connects it
//! to the template service that stores templates, uploaded images and rendered
//! documents.
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Service configuration from the environment |
//! | [`services`] | `TemplateService` seam, wire types, HTTP implementation |
//! | [`session`] | One template bound to one editor core |

pub mod config;
pub mod services;
pub mod session;
